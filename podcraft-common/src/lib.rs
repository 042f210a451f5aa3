//! # Podcraft shared types (podcraft-common)
//!
//! Domain types and small utilities shared between the generation engine
//! and any future front-end modules: episode records, script shapes, id
//! and timestamp helpers.

pub mod episode;
pub mod ids;
pub mod script;
pub mod time;

pub use episode::{
    Episode, GenerationOutcome, Intent, MessageSet, NewEpisode, OutcomeStatus, RequestMetadata,
};
pub use script::{Script, ScriptMetadata, ScriptParseError, Segment, StructuredScript};
