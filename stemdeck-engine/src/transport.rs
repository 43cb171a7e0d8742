//! Transport controller: play/pause state and glitch-free track handoff
//!
//! Switching the audible track mid-playback is a small state machine
//! rather than a single call, because the incoming element may not have
//! metadata yet and its seek is acknowledged asynchronously. The element
//! is started synchronously inside the triggering gesture, kept muted
//! until its clock is confirmed at the resume position, then unmuted.
//! Each phase carries a deadline; on timeout the handoff degrades to
//! best effort instead of stalling the transport.

use crate::config::PlayerConfig;
use crate::error::EngineError;
use crate::registry::TrackRegistry;
use crate::session::{PlaybackSession, TrackId};
use stemdeck_media::{MediaElement, ReadyState};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
enum HandoffPhase {
    /// Waiting for the incoming element's metadata
    AwaitMetadata { deadline: f64 },
    /// Metadata present, seek issued, waiting for acknowledgement
    AwaitSeekAck { deadline: f64 },
}

#[derive(Debug, Clone, PartialEq)]
struct Handoff {
    target: TrackId,
    /// Position the new element must be at before it becomes audible
    resume_time: f64,
    phase: HandoffPhase,
}

/// Owns play/pause transitions and the active-track handoff machine
pub struct Transport {
    handoff: Option<Handoff>,
    metadata_timeout: f64,
    seek_ack_timeout: f64,
    /// Non-fatal degradations pending delivery on the event stream
    warnings: Vec<String>,
}

impl Transport {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            handoff: None,
            metadata_timeout: config.metadata_timeout,
            seek_ack_timeout: config.seek_ack_timeout,
            warnings: Vec::new(),
        }
    }

    /// Drain degradation notices accumulated since the last call
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// True while a handoff is mid-flight and the incoming element is
    /// still force-muted
    pub fn is_switching(&self) -> bool {
        self.handoff.is_some()
    }

    /// Start playback on the active element. Every element's clock is
    /// synchronized to the session position first, so a later track
    /// switch resumes from the right point. Propagates a playback
    /// rejection so the caller can surface it; the session stays paused.
    pub fn play<E: MediaElement>(
        &mut self,
        session: &mut PlaybackSession,
        registry: &mut TrackRegistry<E>,
    ) -> Result<(), EngineError> {
        let active = session.active_track.clone();
        registry.sync_clocks(session.current_time);
        registry.set_audible(&active);
        let track = registry
            .get_mut(&active)
            .ok_or_else(|| EngineError::UnknownTrack(active.clone()))?;
        track.element.play()?;
        session.is_playing = true;
        debug!(track = %active, "playback started");
        Ok(())
    }

    /// Pause everything. Cancels any in-flight handoff; the mute
    /// assignment is re-enforced so the state stays coherent.
    pub fn pause<E: MediaElement>(
        &mut self,
        session: &mut PlaybackSession,
        registry: &mut TrackRegistry<E>,
    ) {
        if self.handoff.take().is_some() {
            debug!("handoff cancelled by pause");
        }
        registry.pause_all();
        registry.set_audible(&session.active_track);
        session.is_playing = false;
    }

    /// Switch the audible track to `target`.
    ///
    /// While paused this is a plain pointer flip with a clock sync.
    /// While playing it captures the current position, pauses every
    /// element, starts the target muted inside this same call, and
    /// leaves the rest to `tick`. A rejected play() aborts the switch
    /// and reverts to the previous track.
    pub fn switch_track<E: MediaElement>(
        &mut self,
        session: &mut PlaybackSession,
        registry: &mut TrackRegistry<E>,
        target: &TrackId,
        now: f64,
    ) -> Result<(), EngineError> {
        if !registry.contains(target) {
            return Err(EngineError::UnknownTrack(target.clone()));
        }
        if *target == session.active_track && self.handoff.is_none() {
            return Ok(());
        }

        // Freshest position comes from the outgoing element itself
        let resume_time = registry
            .get(&session.active_track)
            .filter(|t| t.element.ready_state().has_metadata())
            .map(|t| t.element.current_time())
            .unwrap_or(session.current_time);
        let resume_time = session.clamp(resume_time);

        if self.handoff.take().is_some() {
            debug!("handoff superseded by a newer switch");
        }

        let previous = std::mem::replace(&mut session.active_track, target.clone());
        session.current_time = resume_time;
        registry.set_audible(target);

        if !session.is_playing {
            if let Some(track) = registry.get_mut(target) {
                track.element.set_current_time(resume_time);
            }
            info!(from = %previous, to = %target, "active track switched while paused");
            return Ok(());
        }

        registry.pause_all();
        let track = registry
            .get_mut(target)
            .ok_or_else(|| EngineError::UnknownTrack(target.clone()))?;
        // Force-muted until the clock is confirmed; set_audible restores
        // the remembered assignment once the handoff completes
        track.element.set_muted(true);

        if let Err(err) = track.element.play() {
            warn!(track = %target, %err, "switch aborted, play rejected");
            session.active_track = previous.clone();
            session.is_playing = false;
            registry.set_audible(&previous);
            return Err(err.into());
        }

        self.handoff = Some(Handoff {
            target: target.clone(),
            resume_time,
            phase: HandoffPhase::AwaitMetadata {
                deadline: now + self.metadata_timeout,
            },
        });
        info!(from = %previous, to = %target, t = resume_time, "handoff started");
        self.advance(session, registry, now);
        Ok(())
    }

    /// Drive the handoff machine; called from the engine tick and once
    /// immediately after a switch starts.
    pub fn advance<E: MediaElement>(
        &mut self,
        session: &mut PlaybackSession,
        registry: &mut TrackRegistry<E>,
        now: f64,
    ) {
        let Some(mut handoff) = self.handoff.take() else {
            return;
        };
        let Some(track) = registry.get_mut(&handoff.target) else {
            return;
        };

        if let HandoffPhase::AwaitMetadata { deadline } = handoff.phase {
            let state = track.element.ready_state();
            if state == ReadyState::Failed {
                warn!(track = %handoff.target, "source failed during handoff");
                self.warnings
                    .push(format!("track {} failed during switch", handoff.target));
                Self::finish(session, registry, handoff);
                return;
            }
            if !state.has_metadata() {
                if now < deadline {
                    self.handoff = Some(handoff);
                    return;
                }
                warn!(track = %handoff.target, "metadata timed out, degrading handoff");
                self.warnings.push(format!(
                    "track {} metadata timed out, continuing best effort",
                    handoff.target
                ));
            }
            track.element.set_current_time(handoff.resume_time);
            handoff.phase = HandoffPhase::AwaitSeekAck {
                deadline: now + self.seek_ack_timeout,
            };
        }

        if let HandoffPhase::AwaitSeekAck { deadline } = handoff.phase {
            if track.element.seek_in_flight() {
                if now < deadline {
                    self.handoff = Some(handoff);
                    return;
                }
                warn!(track = %handoff.target, "seek ack timed out, unmuting anyway");
                self.warnings.push(format!(
                    "track {} seek unacknowledged, unmuting anyway",
                    handoff.target
                ));
            }
        }
        Self::finish(session, registry, handoff);
    }

    /// A newer authoritative seek supersedes an in-flight handoff's
    /// captured position. The machine keeps running but now converges
    /// on the new target, so the stale position never clobbers the
    /// seek when the handoff completes.
    pub fn retarget(&mut self, target: f64) {
        if let Some(handoff) = &mut self.handoff {
            debug!(t = target, "handoff retargeted by a newer seek");
            handoff.resume_time = target;
        }
    }

    fn finish<E: MediaElement>(
        session: &mut PlaybackSession,
        registry: &mut TrackRegistry<E>,
        handoff: Handoff,
    ) {
        session.current_time = session.clamp(handoff.resume_time);
        registry.set_audible(&session.active_track);
        // Some hosts pause an element around a seek; restart it so the
        // switch never completes silent
        if session.is_playing {
            if let Some(track) = registry.get_mut(&session.active_track) {
                if track.element.is_paused() {
                    if let Err(err) = track.element.play() {
                        warn!(%err, "could not resume playback after handoff");
                        session.is_playing = false;
                    }
                }
            }
        }
        info!(track = %handoff.target, t = handoff.resume_time, "handoff complete");
    }
}
