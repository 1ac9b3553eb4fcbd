//! The graph layer: manifest/script parsing, structural validation, and
//! topological resolution. Pure and I/O-free — it knows nothing about
//! sessions, envelopes, or storage.

mod manifest;
mod model;
mod script;
mod topo;
mod validate;

pub use manifest::manifest_parse;
pub use model::{
    Dag, ManifestHeader, Previous, PreviousSpec, SkipWarning, StageDef, SKIP_SENTINEL_KEY,
};
pub use script::script_parse;
pub use topo::topological_order;
pub use validate::{validate, ValidationReport};
