//! Collaborator clients.
//!
//! The engine consumes the language model, text-to-speech service, and
//! object storage through traits so pipelines can be exercised against
//! fakes; the production implementations here speak HTTP via reqwest with
//! explicit timeouts.

pub mod llm;
pub mod storage;
pub mod tts;

pub use llm::{ChatMessage, OpenAiScriptModel, ScriptModel};
pub use storage::{HttpBucketStorage, ObjectStorage};
pub use tts::{OpenAiSpeech, SpeechSynthesizer};
