//! Simulated media element with scriptable timing
//!
//! Stands in for a host media element in tests and the demo binary. All
//! asynchrony is modeled against an explicit simulated clock driven by
//! `advance()`, so metadata latency, seek acknowledgement latency, and
//! playback policy rejections are deterministic.

use crate::element::{MediaElement, MediaError, ReadyState};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Host playback policy applied to programmatic play() calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPolicy {
    /// play() always succeeds
    #[default]
    Allow,
    /// play() is rejected until `unlock_playback()` is called,
    /// mirroring a browser's gesture-gated autoplay policy
    RequireUnlock,
}

#[derive(Debug)]
struct Inner {
    src: String,
    ready: ReadyState,
    /// Simulated clock, seconds since construction
    now: f64,
    /// Simulated instant at which metadata becomes available
    metadata_at: f64,
    /// Latency between a seek request and its acknowledgement
    seek_latency: f64,
    pending_seek: Option<PendingSeek>,
    duration: f64,
    current_time: f64,
    paused: bool,
    muted: bool,
    volume: f32,
    policy: PlaybackPolicy,
    unlocked: bool,
}

#[derive(Debug, Clone, Copy)]
struct PendingSeek {
    target: f64,
    completes_at: f64,
}

/// A scriptable in-process media element.
///
/// Clones share state, so a host or test can keep a handle for advancing
/// the simulated clock while the engine owns the element itself.
#[derive(Debug, Clone)]
pub struct SimulatedElement {
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedElement {
    /// Create an element whose metadata is available immediately and
    /// whose seeks acknowledge on the next clock advance.
    pub fn ready(src: impl Into<String>, duration: f64) -> Self {
        Self::with_latency(src, duration, 0.0, 0.0)
    }

    /// Create an element with explicit metadata and seek latencies
    /// (simulated seconds).
    pub fn with_latency(
        src: impl Into<String>,
        duration: f64,
        metadata_latency: f64,
        seek_latency: f64,
    ) -> Self {
        let ready = if metadata_latency <= 0.0 {
            ReadyState::HaveMetadata
        } else {
            ReadyState::Loading
        };
        Self {
            inner: Arc::new(Mutex::new(Inner {
                src: src.into(),
                ready,
                now: 0.0,
                metadata_at: metadata_latency,
                seek_latency,
                pending_seek: None,
                duration,
                current_time: 0.0,
                paused: true,
                muted: false,
                volume: 1.0,
                policy: PlaybackPolicy::Allow,
                unlocked: false,
            })),
        }
    }

    /// Mark the source as permanently failed
    pub fn fail(&self, reason: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.ready = ReadyState::Failed;
        debug!(src = %inner.src, reason = %reason.into(), "simulated element failed");
    }

    pub fn set_policy(&self, policy: PlaybackPolicy) {
        self.inner.lock().policy = policy;
    }

    /// Simulate the user gesture that unlocks gesture-gated playback
    pub fn unlock_playback(&self) {
        self.inner.lock().unlocked = true;
    }

    pub fn src(&self) -> String {
        self.inner.lock().src.clone()
    }

    /// Advance the simulated clock by `dt` seconds: deliver metadata,
    /// acknowledge due seeks, and move the playhead while playing.
    pub fn advance(&self, dt: f64) {
        let mut inner = self.inner.lock();
        inner.now += dt;

        if inner.ready == ReadyState::Loading && inner.now >= inner.metadata_at {
            inner.ready = ReadyState::HaveMetadata;
        }

        if let Some(seek) = inner.pending_seek {
            if inner.now >= seek.completes_at {
                inner.current_time = seek.target.clamp(0.0, inner.duration);
                inner.pending_seek = None;
            }
        }

        if !inner.paused && inner.ready.has_metadata() && inner.pending_seek.is_none() {
            inner.current_time = (inner.current_time + dt).min(inner.duration);
            if inner.current_time >= inner.duration {
                inner.paused = true;
            }
        }
    }
}

impl MediaElement for SimulatedElement {
    fn play(&mut self) -> Result<(), MediaError> {
        let mut inner = self.inner.lock();
        if inner.ready == ReadyState::Failed {
            return Err(MediaError::SourceFailed(inner.src.clone()));
        }
        if inner.policy == PlaybackPolicy::RequireUnlock && !inner.unlocked {
            return Err(MediaError::PlaybackRejected);
        }
        inner.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.inner.lock().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }

    fn current_time(&self) -> f64 {
        self.inner.lock().current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut inner = self.inner.lock();
        if !inner.ready.has_metadata() {
            // No metadata yet: the request is dropped, as a host element
            // without metadata cannot seek
            return;
        }
        let target = seconds.clamp(0.0, inner.duration);
        if inner.seek_latency <= 0.0 {
            inner.current_time = target;
            inner.pending_seek = None;
        } else {
            let completes_at = inner.now + inner.seek_latency;
            inner.pending_seek = Some(PendingSeek {
                target,
                completes_at,
            });
        }
    }

    fn duration(&self) -> Option<f64> {
        let inner = self.inner.lock();
        inner.ready.has_metadata().then_some(inner.duration)
    }

    fn ready_state(&self) -> ReadyState {
        self.inner.lock().ready
    }

    fn seek_in_flight(&self) -> bool {
        self.inner.lock().pending_seek.is_some()
    }

    fn set_muted(&mut self, muted: bool) {
        self.inner.lock().muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.inner.lock().muted
    }

    fn set_volume(&mut self, volume: f32) {
        self.inner.lock().volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.inner.lock().volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_arrives_after_latency() {
        let el = SimulatedElement::with_latency("a.mp3", 10.0, 0.5, 0.0);
        assert_eq!(el.ready_state(), ReadyState::Loading);
        assert_eq!(el.duration(), None);

        el.advance(0.6);
        assert_eq!(el.ready_state(), ReadyState::HaveMetadata);
        assert_eq!(el.duration(), Some(10.0));
    }

    #[test]
    fn seek_acknowledges_after_latency() {
        let mut el = SimulatedElement::with_latency("a.mp3", 10.0, 0.0, 0.1);
        el.set_current_time(4.0);
        assert!(el.seek_in_flight());
        assert_eq!(el.current_time(), 0.0);

        el.advance(0.2);
        assert!(!el.seek_in_flight());
        assert_eq!(el.current_time(), 4.0);
    }

    #[test]
    fn playback_policy_rejects_until_unlocked() {
        let mut el = SimulatedElement::ready("a.mp3", 10.0);
        el.set_policy(PlaybackPolicy::RequireUnlock);
        assert_eq!(el.play(), Err(MediaError::PlaybackRejected));
        assert!(el.is_paused());

        el.unlock_playback();
        assert!(el.play().is_ok());
        assert!(!el.is_paused());
    }

    #[test]
    fn playhead_advances_while_playing_and_stops_at_end() {
        let mut el = SimulatedElement::ready("a.mp3", 2.0);
        el.play().unwrap();
        el.advance(1.0);
        assert!((el.current_time() - 1.0).abs() < 1e-9);

        el.advance(5.0);
        assert_eq!(el.current_time(), 2.0);
        assert!(el.is_paused());
    }

    #[test]
    fn seek_clamps_to_duration() {
        let mut el = SimulatedElement::ready("a.mp3", 10.0);
        el.set_current_time(25.0);
        assert_eq!(el.current_time(), 10.0);
        el.set_current_time(-3.0);
        assert_eq!(el.current_time(), 0.0);
    }

    #[test]
    fn seek_before_metadata_is_dropped() {
        let mut el = SimulatedElement::with_latency("a.mp3", 10.0, 1.0, 0.0);
        el.set_current_time(5.0);
        assert_eq!(el.current_time(), 0.0);
        assert!(!el.seek_in_flight());
    }
}
