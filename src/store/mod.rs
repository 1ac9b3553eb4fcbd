//! The store layer: session lifecycle, artifact envelopes, materialized
//! paths, join-node convergence, and workflow position (§4.4).
//!
//! Everything here builds on the graph layer and the storage backend but
//! knows nothing about command routing or plugin dispatch — that's the
//! engine's job.

pub mod envelope;
pub mod join;
pub mod paths;
pub mod position;
pub mod session;

pub use envelope::{artifact_exists, artifact_read, artifact_write, ArtifactEnvelope, EnvelopeContent};
pub use join::{materialize_join, read_join_descriptor, JoinDescriptor};
pub use paths::{join_dir_name, resolve_stage_paths};
pub use position::{resolve_position, resolve_readiness, Progress, Readiness, WorkflowPosition};
pub use session::{session_create, session_resume, sessions_list, touch, Session};
