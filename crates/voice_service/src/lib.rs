//! Voice Service - what a chat bot calls to speak into voice channels
//!
//! Ties the synthesis gateway to the delivery pipeline and adds the
//! operator-facing pieces:
//! - `play` / `play_and_wait` - speak text into a destination
//! - `leave` - disconnect a group out of band
//! - `debug_dump` - keep synthesized audio and its provenance on disk
//! - `set_backend` / `set_voice` / `status` - runtime administration,
//!   persisted through `SettingsStore`

pub mod debug_dump;
pub mod error;
pub mod service;
pub mod settings;

pub use debug_dump::{DebugArtifact, DumpMetadata, DumpRequest};
pub use error::ServiceError;
pub use service::{PlayRequest, VoiceService};
pub use settings::{RuntimeSettings, SettingsStore};
