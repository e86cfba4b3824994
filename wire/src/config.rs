use std::time::Duration;

use wire_core::{BusyPauser, LongPauser, Pauser};

/// Which adaptive back-off strategy a `Wire` uses between CAS retries. See `wire_core::pauser`
/// for the strategies themselves; this is just the picked-at-construction-time selector, since a
/// `Box<dyn Pauser>` can't be cloned and every `Wire` needs its own instance.
#[derive(Debug, Clone)]
pub enum PauserKind {
    /// Pure spin-loop. Appropriate for short, latency-sensitive waits.
    Busy,
    /// Escalates spin -> yield -> exponential park, matching [`LongPauser`]'s defaults unless
    /// overridden.
    Long {
        spin_threshold: u32,
        yield_threshold: u32,
        park_ceiling: Duration,
    },
}

impl Default for PauserKind {
    fn default() -> Self {
        PauserKind::Busy
    }
}

impl PauserKind {
    pub fn long_default() -> Self {
        PauserKind::Long {
            spin_threshold: LongPauser::DEFAULT_SPIN_THRESHOLD,
            yield_threshold: LongPauser::DEFAULT_YIELD_THRESHOLD,
            park_ceiling: LongPauser::DEFAULT_PARK_CEILING,
        }
    }

    pub(crate) fn build(&self) -> Box<dyn Pauser> {
        match self {
            PauserKind::Busy => Box::new(BusyPauser::default()),
            PauserKind::Long {
                spin_threshold,
                yield_threshold,
                park_ceiling,
            } => Box::new(LongPauser::new(*spin_threshold, *yield_threshold, *park_ceiling)),
        }
    }
}

/// Construction-time knobs for a `Wire`. The defaults match the spec exactly (assertion mode on
/// in debug builds, busy-wait pauser, 64 KiB first-header ceiling, 1 MiB skip-ahead threshold, a
/// generous 5-second wait budget); everything here can be overridden through the builder.
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Gates the extra CAS-on-commit and post-end zero-check in `updateHeader`. Off by default in
    /// release builds: the extra store round-trip is pure overhead once a deployment is trusted,
    /// and the spec treats it as a diagnostic, not a correctness requirement.
    pub assertion_mode: bool,
    pub pauser: PauserKind,
    pub first_header_max_len: u32,
    pub skip_ahead_threshold: u64,
    /// Default wait budget passed to framing operations that can block (`writeHeader`'s
    /// scan-forward, `readFirstHeader`, `writeEndOfWire`) unless a caller overrides it per call.
    pub timeout: Duration,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            assertion_mode: cfg!(debug_assertions),
            pauser: PauserKind::default(),
            first_header_max_len: 64 * 1024,
            skip_ahead_threshold: 1024 * 1024,
            timeout: Duration::from_secs(5),
        }
    }
}

impl WireConfig {
    pub fn builder() -> WireConfigBuilder {
        WireConfigBuilder::default()
    }

    pub(crate) fn make_pauser(&self) -> Box<dyn Pauser> {
        self.pauser.build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WireConfigBuilder {
    config: WireConfig,
}

impl WireConfigBuilder {
    pub fn assertion_mode(mut self, on: bool) -> Self {
        self.config.assertion_mode = on;
        self
    }

    pub fn pauser(mut self, pauser: PauserKind) -> Self {
        self.config.pauser = pauser;
        self
    }

    pub fn first_header_max_len(mut self, bytes: u32) -> Self {
        self.config.first_header_max_len = bytes;
        self
    }

    pub fn skip_ahead_threshold(mut self, bytes: u64) -> Self {
        self.config.skip_ahead_threshold = bytes;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> WireConfig {
        self.config
    }
}

/// TOML convenience for applications that want to externalize `WireConfig` rather than build it
/// in code. Not part of the core: the engine itself never touches a filesystem or config format,
/// matching how the reference application layers a config crate over library defaults instead of
/// baking file I/O into the library.
///
/// Recognized keys (all optional, fall back to [`WireConfig::default`]):
///
/// ```toml
/// assertion_mode = true
/// first_header_max_len = 65536
/// skip_ahead_threshold = 1048576
/// timeout_millis = 5000
///
/// [pauser]
/// kind = "long"            # or "busy"
/// spin_threshold = 10
/// yield_threshold = 100
/// park_ceiling_millis = 10
/// ```
#[cfg(feature = "config-toml")]
impl TryFrom<&str> for WireConfig {
    type Error = crate::error::WireError;

    fn try_from(toml_source: &str) -> Result<Self, Self::Error> {
        let document: toml::Value = toml_source
            .parse()
            .map_err(|e: toml::de::Error| crate::error::WireError::Config(e.to_string()))?;
        let table = document
            .as_table()
            .ok_or_else(|| crate::error::WireError::Config("expected a TOML table at the document root".into()))?;

        let mut config = WireConfig::default();

        if let Some(v) = table.get("assertion_mode") {
            config.assertion_mode = v
                .as_bool()
                .ok_or_else(|| crate::error::WireError::Config("assertion_mode must be a bool".into()))?;
        }
        if let Some(v) = table.get("first_header_max_len") {
            config.first_header_max_len = v
                .as_integer()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| crate::error::WireError::Config("first_header_max_len must fit in a u32".into()))?;
        }
        if let Some(v) = table.get("skip_ahead_threshold") {
            config.skip_ahead_threshold = v
                .as_integer()
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| crate::error::WireError::Config("skip_ahead_threshold must fit in a u64".into()))?;
        }
        if let Some(v) = table.get("timeout_millis") {
            let millis = v
                .as_integer()
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| crate::error::WireError::Config("timeout_millis must fit in a u64".into()))?;
            config.timeout = Duration::from_millis(millis);
        }
        if let Some(pauser_table) = table.get("pauser").and_then(|v| v.as_table()) {
            let kind = pauser_table.get("kind").and_then(|v| v.as_str()).unwrap_or("busy");
            config.pauser = match kind {
                "busy" => PauserKind::Busy,
                "long" => {
                    let defaults = PauserKind::long_default();
                    let (default_spin, default_yield, default_ceiling) = match defaults {
                        PauserKind::Long { spin_threshold, yield_threshold, park_ceiling } => {
                            (spin_threshold, yield_threshold, park_ceiling)
                        }
                        PauserKind::Busy => unreachable!("long_default always returns Long"),
                    };
                    PauserKind::Long {
                        spin_threshold: pauser_table
                            .get("spin_threshold")
                            .and_then(|v| v.as_integer())
                            .map(|n| n as u32)
                            .unwrap_or(default_spin),
                        yield_threshold: pauser_table
                            .get("yield_threshold")
                            .and_then(|v| v.as_integer())
                            .map(|n| n as u32)
                            .unwrap_or(default_yield),
                        park_ceiling: pauser_table
                            .get("park_ceiling_millis")
                            .and_then(|v| v.as_integer())
                            .map(|n| Duration::from_millis(n as u64))
                            .unwrap_or(default_ceiling),
                    }
                }
                other => {
                    return Err(crate::error::WireError::Config(format!(
                        "unrecognized pauser kind '{other}', expected 'busy' or 'long'"
                    )))
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = WireConfig::builder()
            .assertion_mode(false)
            .first_header_max_len(1024)
            .timeout(Duration::from_millis(50))
            .build();
        assert!(!config.assertion_mode);
        assert_eq!(config.first_header_max_len, 1024);
        assert_eq!(config.timeout, Duration::from_millis(50));
    }

    #[test]
    fn default_pauser_is_busy() {
        assert!(matches!(WireConfig::default().pauser, PauserKind::Busy));
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn toml_round_trip_overrides_selected_fields() {
        let toml = r#"
            assertion_mode = false
            timeout_millis = 250

            [pauser]
            kind = "long"
            spin_threshold = 5
        "#;
        let config = WireConfig::try_from(toml).unwrap();
        assert!(!config.assertion_mode);
        assert_eq!(config.timeout, Duration::from_millis(250));
        match config.pauser {
            PauserKind::Long { spin_threshold, .. } => assert_eq!(spin_threshold, 5),
            PauserKind::Busy => panic!("expected long pauser"),
        }
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn toml_rejects_unknown_pauser_kind() {
        let err = WireConfig::try_from("[pauser]\nkind = \"nonsense\"\n").unwrap_err();
        assert!(matches!(err, crate::error::WireError::Config(_)));
    }
}
