//! Tabular data model
//!
//! Records are explicit name → [`Value`] maps; a [`Dataset`] resolves the
//! kind of each field once, at construction, into its [`Schema`].

mod dataset;
mod record;
mod value;

pub use dataset::{Dataset, Field, Schema, VariableKind};
pub use record::Record;
pub use value::Value;
pub(crate) use value::ValueKey;
