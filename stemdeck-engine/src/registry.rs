//! Track registry: lifecycle of every track's media handle and visual
//!
//! A map keyed by stable track id, created and destroyed wholesale when
//! the host replaces the track list. Transport and arbiter operate on
//! the handles through the registry and never own them.

use crate::config::PlayerConfig;
use crate::session::TrackId;
use std::collections::HashMap;
use stemdeck_media::{MediaElement, ReadyState};
use stemdeck_visual::{PeakAnalyzer, WaveformSurface};
use tracing::{debug, info};

/// Which mix a track carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// The full original mix
    Original,
    /// One isolated instrument or vocal stem
    Stem,
}

/// Load state of a track's media source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    #[default]
    Unloaded,
    Loading,
    Ready,
    Error,
}

/// Host-supplied description of one available track
#[derive(Debug, Clone)]
pub struct TrackDescriptor {
    pub id: TrackId,
    pub label: String,
    pub kind: TrackKind,
    pub audio_url: String,
    pub download_url: Option<String>,
}

/// One registered track: media handle plus its waveform surface
pub struct Track<E> {
    pub descriptor: TrackDescriptor,
    pub element: E,
    pub surface: WaveformSurface,
    pub readiness: Readiness,
    /// Transport-trust flag: true for every track except the active one
    pub muted: bool,
    pub volume: f32,
}

impl<E: MediaElement> Track<E> {
    fn new(descriptor: TrackDescriptor, element: E, viewport_width: f64) -> Self {
        Self {
            descriptor,
            element,
            surface: WaveformSurface::new(viewport_width),
            readiness: Readiness::Unloaded,
            muted: true,
            volume: 1.0,
        }
    }

    /// Map the element's readiness into the track model
    pub fn refresh_readiness(&mut self) {
        self.readiness = match self.element.ready_state() {
            ReadyState::Empty => Readiness::Unloaded,
            ReadyState::Loading => Readiness::Loading,
            ReadyState::HaveMetadata => Readiness::Ready,
            ReadyState::Failed => Readiness::Error,
        };
    }
}

/// Registry of all tracks for one player
pub struct TrackRegistry<E> {
    tracks: HashMap<TrackId, Track<E>>,
    /// Host-supplied ordering, used for display and cycling
    order: Vec<TrackId>,
}

impl<E: MediaElement> TrackRegistry<E> {
    pub fn new() -> Self {
        Self {
            tracks: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Replace the whole track set. Existing tracks are destroyed; their
    /// elements are paused first so nothing keeps sounding.
    pub fn replace(&mut self, tracks: Vec<(TrackDescriptor, E)>, config: &PlayerConfig) {
        for track in self.tracks.values_mut() {
            track.element.pause();
        }
        self.tracks.clear();
        self.order.clear();

        for (descriptor, element) in tracks {
            let id = descriptor.id.clone();
            debug!(track = %id, label = %descriptor.label, "track registered");
            self.order.push(id.clone());
            self.tracks
                .insert(id, Track::new(descriptor, element, config.viewport_width));
        }
        info!(count = self.order.len(), "track list replaced");
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.contains_key(id)
    }

    /// Track ids in host-supplied order
    pub fn ids(&self) -> &[TrackId] {
        &self.order
    }

    pub fn first_id(&self) -> Option<&TrackId> {
        self.order.first()
    }

    /// Id of the track after `id` in display order, wrapping around
    pub fn next_id(&self, id: &TrackId) -> Option<&TrackId> {
        let pos = self.order.iter().position(|t| t == id)?;
        self.order.get((pos + 1) % self.order.len())
    }

    pub fn get(&self, id: &TrackId) -> Option<&Track<E>> {
        self.tracks.get(id)
    }

    pub fn get_mut(&mut self, id: &TrackId) -> Option<&mut Track<E>> {
        self.tracks.get_mut(id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&TrackId, &mut Track<E>)> {
        self.tracks.iter_mut()
    }

    /// Attach the host-decoded sample buffer for one track; builds the
    /// peak table its surface renders from.
    pub fn attach_samples(
        &mut self,
        id: &TrackId,
        samples: &[f32],
        sample_rate: u32,
        duration: f64,
        config: &PlayerConfig,
    ) -> bool {
        let Some(track) = self.tracks.get_mut(id) else {
            return false;
        };
        let mut analyzer = PeakAnalyzer::new(sample_rate);
        let peaks = analyzer.analyze(samples, config.peak_columns, duration);
        track.surface.set_peaks(peaks);
        true
    }

    /// Enforce the single-audible invariant: unmute exactly `active`,
    /// mute everything else, and apply each track's volume.
    pub fn set_audible(&mut self, active: &TrackId) {
        for (id, track) in self.tracks.iter_mut() {
            track.muted = id != active;
            track.element.set_muted(track.muted);
            track.element.set_volume(track.volume);
        }
    }

    /// Set every element's clock to `t` so a later active-track switch
    /// starts from the right point without re-seeking.
    pub fn sync_clocks(&mut self, t: f64) {
        for track in self.tracks.values_mut() {
            track.element.set_current_time(t);
        }
    }

    pub fn pause_all(&mut self) {
        for track in self.tracks.values_mut() {
            track.element.pause();
        }
    }

    /// Count of elements that are currently unmuted (diagnostics and
    /// invariant checks)
    pub fn unmuted_count(&self) -> usize {
        self.tracks.values().filter(|t| !t.element.is_muted()).count()
    }
}

impl<E: MediaElement> Default for TrackRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
