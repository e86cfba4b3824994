use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

use crate::error::{CoreError, CoreResult};

/// The alias ↔ type-tag collaborator consumed by `BinaryFormat`'s typed-object tag (`0xB6`) and by
/// the user marshalling registry above the codec. The codec only ever calls `name_of`/`type_of`;
/// mutation is a separate, explicit step the caller performs before first use.
pub trait ClassAlias: Send + Sync + std::fmt::Debug {
    fn name_of(&self, type_id: TypeId) -> Option<String>;
    fn type_of(&self, alias: &str) -> Option<TypeId>;
}

/// Default `ClassAlias` implementation: a two-way map built once and frozen for concurrent
/// lookup. Registration after the registry has started being read concurrently is still
/// memory-safe (it's a `RwLock`) but is a logic error the caller should avoid, per the steady
/// state lifecycle: "constructed once, mutated only before first use".
#[derive(Debug, Default)]
pub struct ClassAliasRegistry {
    by_alias: RwLock<HashMap<String, TypeId>>,
    by_type: RwLock<HashMap<TypeId, String>>,
}

impl ClassAliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `alias` to type `T`. Re-registering the same alias for a different type is a
    /// conflict; re-registering the same `(alias, T)` pair is a no-op.
    pub fn register<T: 'static>(&self, alias: impl Into<String>) -> CoreResult<()> {
        let alias = alias.into();
        let type_id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();

        let mut by_alias = self.by_alias.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = by_alias.get(&alias) {
            if *existing != type_id {
                let existing_name = self
                    .by_type
                    .read()
                    .unwrap_or_else(|e| e.into_inner())
                    .get(existing)
                    .cloned()
                    .unwrap_or_else(|| "<unknown>".to_string());
                return Err(CoreError::AliasConflict {
                    alias,
                    existing: Box::leak(existing_name.into_boxed_str()),
                    attempted: type_name,
                });
            }
            return Ok(());
        }
        tracing::debug!(%alias, type_name, "registering class alias");
        by_alias.insert(alias.clone(), type_id);
        self.by_type
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(type_id, alias);
        Ok(())
    }

    pub fn is_registered(&self, alias: &str) -> bool {
        self.by_alias
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(alias)
    }
}

impl ClassAlias for ClassAliasRegistry {
    fn name_of(&self, type_id: TypeId) -> Option<String> {
        self.by_type
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&type_id)
            .cloned()
    }

    fn type_of(&self, alias: &str) -> Option<TypeId> {
        self.by_alias
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(alias)
            .copied()
    }
}

/// Process-wide default registry, for callers that do not want to thread an explicit
/// `ClassAliasRegistry` through every `Wire`. Per-instance registries remain available for tests
/// and for callers that need isolation.
pub static DEFAULT_CLASS_ALIASES: LazyLock<ClassAliasRegistry> =
    LazyLock::new(ClassAliasRegistry::new);
