//! Playback engine for stemdeck - session, registry, arbiter, transport
//!
//! One [`Player`] per mounted player instance. It keeps an arbitrary
//! number of per-track media handles acting as a single logical
//! transport:
//! - PlaybackSession: the one authoritative position and play state
//! - TrackRegistry: lifecycle of every track's element and surface
//! - SeekArbiter: funnels every seek source into one clamped position
//! - Transport: play/pause plus the glitch-free track handoff machine
//! - LoopRegions and BeatGrid bind looping and quantization to it
//!
//! Hosts drive the engine with `tick(now)` on their render cadence and
//! consume [`PlayerEvent`]s from a crossbeam channel.

mod arbiter;
mod config;
mod error;
mod looper;
mod player;
mod registry;
mod session;
mod transcript;
mod transport;

pub use arbiter::SeekArbiter;
pub use config::PlayerConfig;
pub use error::EngineError;
pub use looper::{LoopId, LoopRegion, LoopRegions};
pub use player::{LoopSnapshot, Player, PlayerEvent, SessionSnapshot};
pub use registry::{Readiness, Track, TrackDescriptor, TrackKind, TrackRegistry};
pub use session::{DragState, PlaybackSession, TrackId};
pub use transcript::{Transcript, Word};
pub use transport::Transport;
