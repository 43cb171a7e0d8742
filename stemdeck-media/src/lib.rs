//! Media element abstraction for stemdeck
//!
//! The engine coordinates several independent media handles that must act
//! as one logical transport. This crate defines the handle contract:
//! - MediaElement: play/pause/seek/mute surface with asynchronous readiness
//! - SimulatedElement: an in-process element with scriptable latency and
//!   playback policy, used by the demo binary and the engine tests

mod element;
mod simulated;

pub use element::{MediaElement, MediaError, ReadyState};
pub use simulated::{PlaybackPolicy, SimulatedElement};
