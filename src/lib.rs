//! Avatar Gateway - real-time talking-avatar chat client
//!
//! This library provides the core functionality for the avatar gateway:
//! - Streaming chat completion with sentence-level segmentation
//! - Single-flight speech synthesis queueing
//! - Relay-negotiated peer media session surface
//! - Session liveness monitoring (hang + idle detection)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Front end                         │
//! │        Console input  │  Recognized speech          │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Avatar Session                       │
//! │  Orchestrator │ Segmenter │ Speech Queue │ Liveness │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Cloud collaborators                     │
//! │  Chat completions │ Speech synthesis │ Media relay  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod media;
pub mod relay;
pub mod session;
pub mod speech;

pub use chat::{ChatClient, ChatOrchestrator, CompletionMode, Role, Transcript};
pub use config::Config;
pub use error::{Error, Result};
pub use relay::RelayClient;
pub use session::{AvatarSession, SessionState};
pub use speech::{RestSynthesizer, SilentSynthesizer, SpeechQueue, Synthesizer, Utterance};
