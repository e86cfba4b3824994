// TODO: Fix doc comment generic types to use backticks
#![allow(rustdoc::invalid_html_tags)]
#![allow(rustdoc::broken_intra_doc_links)]

pub mod alias;
pub mod bound;
pub mod error;
pub mod pauser;
pub mod value;

pub use alias::{ClassAlias, ClassAliasRegistry};
pub use bound::{BoundRef, FixedWidth};
pub use error::{CoreError, CoreResult};
pub use pauser::{BusyPauser, LongPauser, Pauser};
pub use value::{Field, Value};
