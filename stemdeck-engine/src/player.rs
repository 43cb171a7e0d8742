//! The player facade: one object per mounted player instance
//!
//! Owns the session, the track registry, the beat grid, loop regions,
//! the seek arbiter, and the transport controller, and exposes the
//! operations hosts call. Hosts drive it with `tick(now)` on their
//! render cadence; state changes stream back over a crossbeam channel
//! as [`PlayerEvent`]s.

use crate::arbiter::SeekArbiter;
use crate::config::PlayerConfig;
use crate::error::EngineError;
use crate::looper::{LoopId, LoopRegions};
use crate::registry::{Readiness, Track, TrackDescriptor, TrackRegistry};
use crate::session::{PlaybackSession, TrackId};
use crate::transcript::{Transcript, Word};
use crate::transport::Transport;
use crossbeam_channel::{unbounded, Receiver, Sender};
use stemdeck_grid::{BeatGrid, GridLine, TapTempo};
use stemdeck_media::MediaElement;
use stemdeck_visual::SurfaceEvent;
use tracing::{debug, warn};

/// Loop region fields as carried in a snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSnapshot {
    pub id: LoopId,
    pub start: f64,
    pub end: f64,
    pub enabled: bool,
}

/// Immutable view of the session emitted after every tick
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub current_time: f64,
    pub duration: f64,
    pub is_playing: bool,
    /// True while a track handoff is mid-flight
    pub is_switching: bool,
    pub active_track: TrackId,
    pub bpm: f64,
    pub grid_enabled: bool,
    pub active_loop: Option<LoopSnapshot>,
    /// Index into the transcript of the word under the playhead
    pub current_word: Option<usize>,
}

/// Events streamed to the host
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    StateUpdate(SessionSnapshot),
    /// Non-fatal degradation the host may want to surface
    Warning(String),
    /// The host performs the actual export; the engine only validates
    /// and announces the selection
    ExportRequested {
        track: TrackId,
        start: f64,
        end: f64,
    },
}

pub struct Player<E> {
    config: PlayerConfig,
    session: PlaybackSession,
    registry: TrackRegistry<E>,
    grid: BeatGrid,
    tap: TapTempo,
    loops: LoopRegions,
    arbiter: SeekArbiter,
    transport: Transport,
    transcript: Transcript,
    events_tx: Sender<PlayerEvent>,
    events_rx: Receiver<PlayerEvent>,
}

impl<E: MediaElement> Player<E> {
    pub fn new(config: PlayerConfig) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            session: PlaybackSession::new(TrackId::new("")),
            registry: TrackRegistry::new(),
            grid: BeatGrid::default(),
            tap: TapTempo::new(),
            loops: LoopRegions::new(),
            arbiter: SeekArbiter::new(config.drag_throttle),
            transport: Transport::new(&config),
            transcript: Transcript::default(),
            config,
            events_tx,
            events_rx,
        }
    }

    /// Receiver for the event stream; clone freely
    pub fn events(&self) -> Receiver<PlayerEvent> {
        self.events_rx.clone()
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn grid(&self) -> &BeatGrid {
        &self.grid
    }

    pub fn loops(&self) -> &LoopRegions {
        &self.loops
    }

    pub fn track(&self, id: &TrackId) -> Option<&Track<E>> {
        self.registry.get(id)
    }

    pub fn track_ids(&self) -> &[TrackId] {
        self.registry.ids()
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.events_tx.send(event);
    }

    fn require_tracks(&self) -> Result<(), EngineError> {
        if self.registry.is_empty() {
            Err(EngineError::NoTracks)
        } else {
            Ok(())
        }
    }

    // ---- track set ----

    /// Replace the whole track set. Session-scoped state that referred
    /// to the old set (loops, tap history, transcript) is dropped; the
    /// first track becomes active and audible.
    pub fn load_tracks(&mut self, tracks: Vec<(TrackDescriptor, E)>) -> Result<(), EngineError> {
        self.registry.replace(tracks, &self.config);
        let first = self
            .registry
            .first_id()
            .cloned()
            .ok_or(EngineError::NoTracks)?;

        self.loops.clear();
        self.tap.reset();
        self.transcript = Transcript::default();
        self.session = PlaybackSession::new(first.clone());
        if let Some(track) = self.registry.get(&first) {
            self.session.duration = track.element.duration().unwrap_or(0.0);
        }
        self.registry.set_audible(&first);
        Ok(())
    }

    /// Attach the host-decoded sample buffer for one track's waveform
    pub fn attach_samples(
        &mut self,
        id: &TrackId,
        samples: &[f32],
        sample_rate: u32,
        duration: f64,
    ) -> Result<(), EngineError> {
        if !self
            .registry
            .attach_samples(id, samples, sample_rate, duration, &self.config)
        {
            return Err(EngineError::UnknownTrack(id.clone()));
        }
        Ok(())
    }

    pub fn set_transcript(&mut self, words: Vec<Word>, formatted_text: Option<String>) {
        self.transcript = Transcript::new(words, formatted_text);
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    // ---- transport ----

    pub fn play(&mut self) -> Result<(), EngineError> {
        self.require_tracks()?;
        // An enabled loop claims playback: start inside it
        if let Some(region) = self.loops.active().filter(|r| r.loop_enabled) {
            let (start, end) = (region.start, region.end);
            let t = self.session.current_time;
            if t < start || t >= end {
                self.arbiter
                    .seek(&mut self.session, &mut self.registry, None, start);
            }
        }
        self.transport.play(&mut self.session, &mut self.registry)
    }

    pub fn pause(&mut self) {
        self.transport.pause(&mut self.session, &mut self.registry);
    }

    pub fn toggle_play(&mut self) -> Result<(), EngineError> {
        if self.session.is_playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Make `target` the audible track; glitch-free when playing
    pub fn set_active_track(&mut self, target: &TrackId, now: f64) -> Result<(), EngineError> {
        self.transport
            .switch_track(&mut self.session, &mut self.registry, target, now)
    }

    /// Cycle to the next track in display order
    pub fn next_track(&mut self, now: f64) -> Result<(), EngineError> {
        self.require_tracks()?;
        let next = self
            .registry
            .next_id(&self.session.active_track)
            .or_else(|| self.registry.first_id())
            .cloned()
            .ok_or(EngineError::NoTracks)?;
        self.set_active_track(&next, now)
    }

    // ---- seeking ----

    /// Authoritative seek from the host API or a transcript click. A
    /// handoff in flight is retargeted so its stale captured position
    /// never wins over this seek.
    pub fn seek(&mut self, target: f64) -> f64 {
        let t = self
            .arbiter
            .seek(&mut self.session, &mut self.registry, None, target);
        self.transport.retarget(t);
        t
    }

    /// Seek by a signed delta in seconds, clamped at both ends
    pub fn step_seek(&mut self, delta_seconds: f64) -> f64 {
        self.seek(self.session.current_time + delta_seconds)
    }

    /// Seek by whole beats: snap the current position to the grid, then
    /// move `beats` beat durations from there
    pub fn step_beats(&mut self, beats: i32) -> f64 {
        let snapped = self
            .grid
            .snap_time(self.session.current_time, self.session.duration);
        let target = snapped + beats as f64 * self.grid.beat_duration();
        self.seek(target)
    }

    /// A pointer interaction on one track's surface at a
    /// viewport-relative x position. The resulting seek is folded in on
    /// the next tick via the surface's event queue.
    pub fn pointer_seek(&mut self, id: &TrackId, x_in_viewport: f64) -> Result<(), EngineError> {
        let track = self
            .registry
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownTrack(id.clone()))?;
        track.surface.pointer_seek(x_in_viewport);
        Ok(())
    }

    // ---- scrubbing ----

    pub fn begin_scrub(&mut self, id: &TrackId, now: f64) -> Result<(), EngineError> {
        if !self.registry.contains(id) {
            return Err(EngineError::UnknownTrack(id.clone()));
        }
        self.arbiter
            .begin_drag(&mut self.session, &mut self.registry, id, now);
        Ok(())
    }

    /// Throttled provisional scrub position; audio keeps playing at the
    /// old position until the scrub ends
    pub fn scrub_to(&mut self, now: f64, target: f64) -> bool {
        self.arbiter
            .drag_to(&mut self.session, &mut self.registry, now, target)
    }

    pub fn end_scrub(&mut self) -> Option<f64> {
        let folded = self.arbiter.end_drag(&mut self.session, &mut self.registry)?;
        self.transport.retarget(folded);
        Some(folded)
    }

    // ---- beat grid ----

    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), EngineError> {
        self.grid.set_bpm(bpm)?;
        Ok(())
    }

    pub fn set_beats_per_bar(&mut self, beats: u32) -> Result<(), EngineError> {
        self.grid.set_beats_per_bar(beats)?;
        Ok(())
    }

    /// Register a tempo tap; applies the inferred BPM when one is
    /// available and returns it
    pub fn tap_tempo(&mut self, now: f64) -> Option<f64> {
        let bpm = self.tap.tap(now)?;
        let rounded = (bpm * 10.0).round() / 10.0;
        // In range by construction of the estimator
        if self.grid.set_bpm(rounded).is_err() {
            return None;
        }
        debug!(bpm = rounded, "tap tempo applied");
        Some(rounded)
    }

    /// Drag the grid's start handle to a new phase offset
    pub fn set_grid_offset(&mut self, seconds: f64) {
        self.grid.set_offset(seconds, self.session.duration);
    }

    /// Drag a bar handle; infers and applies a new BPM
    pub fn drag_bar_handle(
        &mut self,
        bars_from_offset: u32,
        dragged_to: f64,
    ) -> Result<(), EngineError> {
        self.grid.drag_bar_handle(bars_from_offset, dragged_to)?;
        Ok(())
    }

    pub fn toggle_grid(&mut self) -> bool {
        self.grid.toggle();
        self.grid.is_enabled()
    }

    pub fn grid_lines(&self) -> Vec<GridLine> {
        self.grid.lines(self.session.duration)
    }

    // ---- loops ----

    /// Create an N-bar loop anchored at the snapped current position
    pub fn create_loop(&mut self, bars: u32) -> Result<LoopId, EngineError> {
        self.require_tracks()?;
        Ok(self.loops.create_bars(
            &self.grid,
            self.session.duration,
            self.session.current_time,
            bars,
        ))
    }

    /// Create a loop from a drag-selected time range
    pub fn create_loop_from_drag(&mut self, start: f64, end: f64) -> Result<LoopId, EngineError> {
        self.require_tracks()?;
        Ok(self
            .loops
            .create_from_drag(&self.grid, self.session.duration, start, end))
    }

    pub fn resize_loop(&mut self, id: LoopId, start: f64, end: f64) -> bool {
        self.loops
            .resize(&self.grid, self.session.duration, id, start, end)
    }

    pub fn remove_loop(&mut self, id: LoopId) {
        self.loops.remove(id);
    }

    pub fn set_active_loop(&mut self, id: LoopId) -> bool {
        self.loops.set_active(id)
    }

    pub fn toggle_loop(&mut self, id: LoopId) -> bool {
        self.loops.toggle_loop(id)
    }

    // ---- selection export ----

    /// Validate a selection on `track` and announce it for the host to
    /// export. Boundaries snap to the grid when it is enabled.
    pub fn export_selection(
        &mut self,
        track: &TrackId,
        start: f64,
        end: f64,
    ) -> Result<(), EngineError> {
        if !self.registry.contains(track) {
            return Err(EngineError::UnknownTrack(track.clone()));
        }
        let duration = self.session.duration;
        let start = self.grid.snap_time(start.clamp(0.0, duration), duration);
        let end = self.grid.snap_time(end.clamp(0.0, duration), duration);
        if end - start <= 0.0 {
            return Err(EngineError::InvalidSelection { start, end });
        }
        self.emit(PlayerEvent::ExportRequested {
            track: track.clone(),
            start,
            end,
        });
        Ok(())
    }

    // ---- mixing ----

    /// Per-track volume; the single-audible mute assignment is
    /// unaffected
    pub fn set_track_volume(&mut self, id: &TrackId, volume: f32) -> Result<(), EngineError> {
        let track = self
            .registry
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownTrack(id.clone()))?;
        track.volume = volume.clamp(0.0, 1.0);
        track.element.set_volume(track.volume);
        Ok(())
    }

    // ---- transcript ----

    pub fn current_word(&self) -> Option<&Word> {
        self.transcript.word_at(self.session.current_time)
    }

    // ---- viewport ----

    pub fn set_zoom(&mut self, id: &TrackId, zoom: f64) -> Result<(), EngineError> {
        let track = self
            .registry
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownTrack(id.clone()))?;
        track.surface.set_zoom(zoom);
        Ok(())
    }

    pub fn zoom_about(
        &mut self,
        id: &TrackId,
        zoom: f64,
        center_time: f64,
    ) -> Result<(), EngineError> {
        let track = self
            .registry
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownTrack(id.clone()))?;
        track.surface.zoom_about(zoom, center_time);
        Ok(())
    }

    /// Host container resized; every surface follows
    pub fn resize_viewports(&mut self, viewport_width: f64) {
        for (_, track) in self.registry.iter_mut() {
            track.surface.resize(viewport_width);
        }
    }

    // ---- tick ----

    /// Advance the engine at the host's render cadence. `now` is the
    /// host's monotonic clock in seconds.
    pub fn tick(&mut self, now: f64) {
        self.transport
            .advance(&mut self.session, &mut self.registry, now);
        for msg in self.transport.take_warnings() {
            self.emit(PlayerEvent::Warning(msg));
        }

        self.drain_surface_events();
        self.refresh_readiness();
        self.follow_active_clock();
        self.enforce_loop();
        self.update_cursors();

        // The programmatic-update token lives for exactly one tick
        self.arbiter.release_guard();
        self.emit(PlayerEvent::StateUpdate(self.snapshot()));
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_time: self.session.current_time,
            duration: self.session.duration,
            is_playing: self.session.is_playing,
            is_switching: self.transport.is_switching(),
            active_track: self.session.active_track.clone(),
            bpm: self.grid.bpm(),
            grid_enabled: self.grid.is_enabled(),
            active_loop: self.loops.active().map(|r| LoopSnapshot {
                id: r.id,
                start: r.start,
                end: r.end,
                enabled: r.loop_enabled,
            }),
            current_word: self.transcript.index_at(self.session.current_time),
        }
    }

    fn drain_surface_events(&mut self) {
        let ids: Vec<TrackId> = self.registry.ids().to_vec();
        for id in ids {
            let events = match self.registry.get_mut(&id) {
                Some(track) => track.surface.drain_events(),
                None => continue,
            };
            for event in events {
                match event {
                    SurfaceEvent::Ready { duration } => {
                        if id == self.session.active_track && self.session.duration <= 0.0 {
                            self.session.duration = duration;
                        }
                    }
                    SurfaceEvent::Seek { progress } => {
                        if let Some(t) = self.arbiter.surface_seek(
                            &mut self.session,
                            &mut self.registry,
                            &id,
                            progress,
                        ) {
                            self.transport.retarget(t);
                        }
                    }
                    SurfaceEvent::Redraw => {}
                }
            }
        }
    }

    fn refresh_readiness(&mut self) {
        let mut failed = Vec::new();
        for (id, track) in self.registry.iter_mut() {
            let before = track.readiness;
            track.refresh_readiness();
            if before != Readiness::Error && track.readiness == Readiness::Error {
                failed.push(id.clone());
            }
        }
        for id in failed {
            warn!(track = %id, "track source failed");
            self.emit(PlayerEvent::Warning(format!("track {id} failed to load")));
        }
    }

    /// The active element's clock is the authority while playing.
    /// Suspended during a drag (the provisional position rules the UI)
    /// and during a handoff (the machine owns the position).
    fn follow_active_clock(&mut self) {
        if self.session.is_dragging() || self.transport.is_switching() {
            return;
        }
        let Some(track) = self.registry.get(&self.session.active_track) else {
            return;
        };
        if let Some(duration) = track.element.duration() {
            self.session.duration = duration;
        }
        if !self.session.is_playing {
            return;
        }
        self.session.current_time = self.session.clamp(track.element.current_time());
        // With an enabled loop the wrap below owns the end of track
        let looping = self.loops.active().is_some_and(|r| r.loop_enabled);
        if !looping && track.element.is_paused() && self.session.current_time >= self.session.duration
        {
            debug!("playback reached end of track");
            self.session.is_playing = false;
        }
    }

    fn enforce_loop(&mut self) {
        if !self.session.is_playing {
            return;
        }
        let Some(region) = self.loops.active().filter(|r| r.loop_enabled) else {
            return;
        };
        let (start, end) = (region.start, region.end);
        if self.session.current_time < end - self.config.loop_epsilon {
            return;
        }
        self.arbiter
            .seek(&mut self.session, &mut self.registry, None, start);
        self.transport.retarget(start);
        // Wrapping at the track end can leave the element self-paused
        if let Some(track) = self.registry.get_mut(&self.session.active_track) {
            if track.element.is_paused() {
                if let Err(err) = track.element.play() {
                    warn!(%err, "loop wrap could not resume playback");
                    self.session.is_playing = false;
                }
            }
        }
    }

    fn update_cursors(&mut self) {
        let progress = self.session.progress(self.session.current_time);
        for (_, track) in self.registry.iter_mut() {
            track.surface.set_cursor(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TrackKind;
    use stemdeck_media::{PlaybackPolicy, SimulatedElement};

    fn descriptor(id: &str, kind: TrackKind) -> TrackDescriptor {
        TrackDescriptor {
            id: TrackId::from(id),
            label: id.to_uppercase(),
            kind,
            audio_url: format!("https://cdn.example/{id}.mp3"),
            download_url: None,
        }
    }

    /// Player over three simulated 40s tracks, plus handles to the
    /// shared elements for driving the simulated clock
    fn player_with_elements(
        elements: Vec<(&str, SimulatedElement)>,
    ) -> (Player<SimulatedElement>, Vec<SimulatedElement>) {
        let handles: Vec<_> = elements.iter().map(|(_, el)| el.clone()).collect();
        let mut player = Player::new(PlayerConfig::default());
        player
            .load_tracks(
                elements
                    .into_iter()
                    .enumerate()
                    .map(|(i, (id, el))| {
                        let kind = if i == 0 { TrackKind::Original } else { TrackKind::Stem };
                        (descriptor(id, kind), el)
                    })
                    .collect(),
            )
            .unwrap();
        (player, handles)
    }

    fn player() -> (Player<SimulatedElement>, Vec<SimulatedElement>) {
        player_with_elements(vec![
            ("mix", SimulatedElement::ready("mix", 40.0)),
            ("vocals", SimulatedElement::ready("vocals", 40.0)),
            ("drums", SimulatedElement::ready("drums", 40.0)),
        ])
    }

    fn unmuted_count(player: &Player<SimulatedElement>) -> usize {
        player
            .track_ids()
            .iter()
            .filter(|id| !player.track(id).unwrap().element.is_muted())
            .count()
    }

    #[test]
    fn load_tracks_activates_the_first() {
        let (player, _) = player();
        assert_eq!(player.session().active_track.as_str(), "mix");
        assert_eq!(player.session().duration, 40.0);
        assert_eq!(unmuted_count(&player), 1);
    }

    #[test]
    fn seek_converges_on_every_element() {
        let (mut player, _) = player();
        player.seek(10.0);
        player.tick(0.0);

        assert_eq!(player.session().current_time, 10.0);
        for id in player.track_ids().to_vec() {
            let track = player.track(&id).unwrap();
            assert_eq!(track.element.current_time(), 10.0);
            assert!((track.surface.cursor() - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn playing_follows_the_active_element_clock() {
        let (mut player, handles) = player();
        player.play().unwrap();
        handles[0].advance(2.0);
        player.tick(2.0);

        assert!((player.session().current_time - 2.0).abs() < 1e-9);
        let vocals = player.track(&TrackId::from("vocals")).unwrap();
        assert!((vocals.surface.cursor() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn midplayback_switch_keeps_at_most_one_audible() {
        let slow = SimulatedElement::with_latency("vocals", 40.0, 0.3, 0.05);
        let (mut player, handles) = player_with_elements(vec![
            ("mix", SimulatedElement::ready("mix", 40.0)),
            ("vocals", slow.clone()),
        ]);
        player.play().unwrap();
        handles[0].advance(5.0);
        player.tick(5.0);

        player
            .set_active_track(&TrackId::from("vocals"), 5.0)
            .unwrap();
        assert!(player.snapshot().is_switching);
        assert!(unmuted_count(&player) <= 1);

        let mut now = 5.0;
        while player.snapshot().is_switching {
            now += 0.05;
            slow.advance(0.05);
            player.tick(now);
            assert!(unmuted_count(&player) <= 1);
        }

        assert_eq!(player.session().active_track.as_str(), "vocals");
        assert_eq!(unmuted_count(&player), 1);
        let vocals = player.track(&TrackId::from("vocals")).unwrap();
        assert!(!vocals.element.is_muted());
        // Within the handoff budget of the captured position
        assert!((vocals.element.current_time() - 5.0).abs() < 0.25);
    }

    #[test]
    fn rejected_play_leaves_a_coherent_paused_session() {
        let gated = SimulatedElement::ready("mix", 40.0);
        gated.set_policy(PlaybackPolicy::RequireUnlock);
        let (mut player, _) =
            player_with_elements(vec![("mix", gated.clone()), ("vocals", SimulatedElement::ready("vocals", 40.0))]);

        assert!(matches!(player.play(), Err(EngineError::PlaybackRejected)));
        assert!(!player.session().is_playing);
        assert_eq!(unmuted_count(&player), 1);

        gated.unlock_playback();
        assert!(player.play().is_ok());
        assert!(player.session().is_playing);
    }

    #[test]
    fn loop_wrap_never_exceeds_the_region_end() {
        let (mut player, handles) = player();
        player.set_bpm(120.0).unwrap();
        player.toggle_grid();
        player.seek(1.3);
        let id = player.create_loop(1).unwrap(); // [1.5, 3.5]
        let region = player.loops().get(id).unwrap().clone();
        assert_eq!((region.start, region.end), (1.5, 3.5));

        player.play().unwrap();
        let eps = PlayerConfig::default().loop_epsilon;
        let mut now = 0.0;
        for _ in 0..400 {
            now += 0.01;
            handles[0].advance(0.01);
            player.tick(now);
            assert!(player.session().current_time <= region.end + eps);
        }
        // Still playing and back inside the region after wrapping
        assert!(player.session().is_playing);
        assert!(player.session().current_time >= region.start - eps);
    }

    #[test]
    fn scrub_leaves_audio_at_the_old_position_until_it_ends() {
        let (mut player, handles) = player();
        player.play().unwrap();
        handles[0].advance(4.0);
        player.tick(4.0);

        player.begin_scrub(&TrackId::from("mix"), 4.0).unwrap();
        assert!(player.scrub_to(4.1, 20.0));
        player.tick(4.1);

        // Transport and elements still at the pre-scrub position
        assert!((player.session().current_time - 4.0).abs() < 1e-9);
        let mix = player.track(&TrackId::from("mix")).unwrap();
        assert!((mix.element.current_time() - 4.0).abs() < 1e-9);

        assert_eq!(player.end_scrub(), Some(20.0));
        let mix = player.track(&TrackId::from("mix")).unwrap();
        assert_eq!(mix.element.current_time(), 20.0);
        assert!(player.session().is_playing);
    }

    #[test]
    fn failed_track_raises_a_warning_event() {
        let (mut player, handles) = player();
        let events = player.events();
        handles[1].fail("404");
        player.tick(0.0);

        let warned = events
            .try_iter()
            .any(|e| matches!(e, PlayerEvent::Warning(msg) if msg.contains("vocals")));
        assert!(warned);
    }

    #[test]
    fn export_selection_snaps_and_announces() {
        let (mut player, _) = player();
        player.set_bpm(120.0).unwrap();
        player.toggle_grid();
        let events = player.events();

        // Any track can be exported, not just the audible one
        player
            .export_selection(&TrackId::from("vocals"), 1.3, 4.6)
            .unwrap();
        let event = events
            .try_iter()
            .find(|e| matches!(e, PlayerEvent::ExportRequested { .. }))
            .unwrap();
        match event {
            PlayerEvent::ExportRequested { track, start, end } => {
                assert_eq!(track.as_str(), "vocals");
                assert_eq!(start, 1.5);
                assert_eq!(end, 4.5);
            }
            _ => unreachable!(),
        }

        assert!(matches!(
            player.export_selection(&TrackId::from("mix"), 2.0, 2.0),
            Err(EngineError::InvalidSelection { .. })
        ));
        assert!(matches!(
            player.export_selection(&TrackId::from("nope"), 1.0, 2.0),
            Err(EngineError::UnknownTrack(_))
        ));
    }

    #[test]
    fn seek_during_a_switch_wins_over_the_stale_handoff() {
        let slow = SimulatedElement::with_latency("vocals", 40.0, 0.5, 0.0);
        let (mut player, handles) = player_with_elements(vec![
            ("mix", SimulatedElement::ready("mix", 40.0)),
            ("vocals", slow.clone()),
        ]);
        player.play().unwrap();
        handles[0].advance(5.0);
        player.tick(5.0);

        player
            .set_active_track(&TrackId::from("vocals"), 5.0)
            .unwrap();
        assert!(player.snapshot().is_switching);

        // User seeks while the handoff is still waiting for metadata
        player.seek(20.0);

        slow.advance(0.6);
        player.tick(5.6);

        assert!(!player.snapshot().is_switching);
        assert_eq!(player.session().current_time, 20.0);
        let vocals = player.track(&TrackId::from("vocals")).unwrap();
        assert_eq!(vocals.element.current_time(), 20.0);
        assert_eq!(unmuted_count(&player), 1);
    }

    #[test]
    fn step_seek_applies_a_signed_delta_and_clamps() {
        let (mut player, _) = player();
        player.seek(5.0);
        assert_eq!(player.step_seek(2.5), 7.5);
        assert_eq!(player.step_seek(-100.0), 0.0);
        assert_eq!(player.step_seek(500.0), 40.0);
    }

    #[test]
    fn step_beats_moves_in_beat_durations() {
        let (mut player, _) = player();
        player.set_bpm(120.0).unwrap(); // beat = 0.5s
        player.toggle_grid();
        player.seek(1.3);
        assert_eq!(player.step_beats(2), 2.5); // snap to 1.5, +1.0
        assert_eq!(player.step_beats(-1), 2.0);
    }

    #[test]
    fn tap_tempo_applies_the_inferred_bpm() {
        let (mut player, _) = player();
        assert_eq!(player.tap_tempo(0.0), None);
        assert_eq!(player.tap_tempo(0.5), Some(120.0));
        assert_eq!(player.grid().bpm(), 120.0);
    }

    #[test]
    fn metadata_timeout_degrades_through_the_tick_path() {
        let stuck = SimulatedElement::with_latency("vocals", 40.0, 999.0, 0.0);
        let (mut player, _) = player_with_elements(vec![
            ("mix", SimulatedElement::ready("mix", 40.0)),
            ("vocals", stuck),
        ]);
        player.play().unwrap();
        player
            .set_active_track(&TrackId::from("vocals"), 0.0)
            .unwrap();
        assert!(player.snapshot().is_switching);

        let events = player.events();
        player.tick(1.0);
        assert!(player.snapshot().is_switching);
        player.tick(1.6);
        assert!(!player.snapshot().is_switching);
        assert_eq!(unmuted_count(&player), 1);
        assert!(events
            .try_iter()
            .any(|e| matches!(e, PlayerEvent::Warning(msg) if msg.contains("timed out"))));
    }

    #[test]
    fn every_tick_emits_a_state_update() {
        let (mut player, _) = player();
        let events = player.events();
        player.tick(0.0);
        let snapshot = events
            .try_iter()
            .find_map(|e| match e {
                PlayerEvent::StateUpdate(s) => Some(s),
                _ => None,
            })
            .unwrap();
        assert_eq!(snapshot.active_track.as_str(), "mix");
        assert_eq!(snapshot.duration, 40.0);
    }

    #[test]
    fn next_track_cycles_in_display_order() {
        let (mut player, _) = player();
        player.next_track(0.0).unwrap();
        assert_eq!(player.session().active_track.as_str(), "vocals");
        player.next_track(0.0).unwrap();
        player.next_track(0.0).unwrap();
        assert_eq!(player.session().active_track.as_str(), "mix");
    }

    #[test]
    fn transcript_word_follows_the_playhead() {
        let (mut player, _) = player();
        player.set_transcript(
            vec![
                Word { word: "hello".into(), start: 0.0, end: 1.0 },
                Word { word: "world".into(), start: 1.0, end: 2.0 },
            ],
            None,
        );
        player.seek(1.5);
        assert_eq!(player.current_word().unwrap().word, "world");
        assert_eq!(player.snapshot().current_word, Some(1));
    }
}
