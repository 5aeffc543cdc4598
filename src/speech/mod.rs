//! Speech output
//!
//! Utterance queueing, SSML construction, and synthesis backends.

pub mod markup;
mod queue;
mod synthesizer;

pub use queue::{SpeechQueue, Utterance};
pub use synthesizer::{RestSynthesizer, SilentSynthesizer, Synthesizer};
