//! # silvi-core
//!
//! Silence detection and playback synchronisation for the Silvi player.
//!
//! ## Architecture
//!
//! ```text
//! MediaDecoder → SampleBuffer → DetectionExecutor(worker) → detect()
//!                                        │
//!                                  WorkerEvent::Completed
//!                                        │
//!                      PlaybackSkipController::tick() ← Player state
//!                                        │
//!                        seek(end) | set_playback_rate(4×)
//! ```
//!
//! The controller is single-threaded and tick-driven. Detection runs on an
//! isolated worker and hands its results back through a channel.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod buffering;
pub mod controller;
pub mod decode;
pub mod detect;
pub mod error;
pub mod ipc;
pub mod player;
pub mod worker;

// Convenience re-exports for downstream crates
pub use buffering::chunk::SampleBuffer;
pub use controller::{ControllerConfig, Granularity, PlaybackSkipController, ResponseMode};
pub use decode::{MediaDecoder, MediaSpan, MemoryDecoder, WavDecoder};
pub use detect::{detect, DetectionConfig, SilenceInterval};
pub use error::SilviError;
pub use ipc::events::{ControllerStatus, SkipEvent, SkipKind, StatusEvent};
pub use player::{simulated::SimulatedPlayer, PlaybackState, Player};
pub use worker::{DetectionExecutor, InlineExecutor, ThreadWorker};
