//! Voice Delivery - ordered playback of synthesized audio into voice channels
//!
//! Provides:
//! - `PlaybackScheduler` - per-key FIFO; unrelated keys run concurrently
//! - `VoiceDeliveryPipeline` - connection state machine with bounded waits
//!   and a trailing silence flush
//! - `Transcoder` - conversion into the transport's streaming codec
//!
//! # Architecture
//!
//! The voice SDK is reached only through the `transport` ports, and the
//! codec conversion only through the `Transcoder` port. `FfmpegTranscoder`
//! is the bundled adapter.
//!
//! # Example
//!
//! ```ignore
//! use voice_delivery::{Destination, VoiceDeliveryPipeline, DeliveryConfig, FfmpegTranscoder};
//!
//! let pipeline = VoiceDeliveryPipeline::new(transport, Arc::new(FfmpegTranscoder::new()), DeliveryConfig::default());
//!
//! let handle = pipeline.deliver(destination, async move { gateway.synthesize(&request).await });
//! handle.await??;
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod session;
pub mod transcoder;
pub mod transport;

pub use config::DeliveryConfig;
pub use error::{DeliveryError, SchedulerError, TransportError, WaitStage};
pub use pipeline::{LeaveOutcome, VoiceDeliveryPipeline};
pub use scheduler::{PlaybackHandle, PlaybackScheduler};
pub use session::{DeliveryState, SessionRegistry};
pub use transcoder::{FfmpegTranscoder, Transcoder};
pub use transport::{
    AudioPlayer, ChannelId, Destination, GroupId, PlaybackSource, SILENCE_FRAME, VoiceConnection,
    VoiceTransport,
};
