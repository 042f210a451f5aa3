//! Generation pipelines.
//!
//! One [`runner::PipelineRunner`] drives the invariant four-phase contract
//! (script → audio → assembly → publish); per-intent behavior plugs in
//! through the [`runner::IntentPipeline`] trait, and the
//! [`dispatcher::Dispatcher`] maps intent identifiers to registered
//! pipelines, translating every failure into the uniform result envelope.

pub mod briefing;
pub mod dialogue;
pub mod dispatcher;
pub mod runner;
pub mod wellness;

pub use briefing::BriefingPipeline;
pub use dialogue::DialoguePipeline;
pub use dispatcher::Dispatcher;
pub use runner::{AssembledAudio, Collaborators, IntentPipeline, PipelineRunner, RunState};
pub use wellness::WellnessPipeline;
