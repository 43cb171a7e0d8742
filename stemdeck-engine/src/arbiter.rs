//! Seek arbiter: one authoritative position per gesture
//!
//! Every seek, wherever it originates (a surface interaction, a drag, a
//! transcript click, the host API), funnels through here. The arbiter
//! clamps the target, writes the session, syncs every element clock, and
//! repositions every visual except the origin. A reentrancy guard makes
//! sure a programmatic reposition never echoes back as a new seek
//! origin: the guard is raised while repositioning and consumed on the
//! next tick, so last-write-wins per user gesture.

use crate::registry::TrackRegistry;
use crate::session::{DragState, PlaybackSession, TrackId};
use stemdeck_media::MediaElement;
use tracing::{debug, trace};

pub struct SeekArbiter {
    /// Programmatic-update token; surface seek events are dropped while
    /// this is raised, and it is consumed once per tick
    guard: bool,
    /// Minimum interval between provisional drag updates
    drag_throttle: f64,
    last_drag_update: f64,
}

impl SeekArbiter {
    pub fn new(drag_throttle: f64) -> Self {
        Self {
            guard: false,
            drag_throttle,
            last_drag_update: f64::NEG_INFINITY,
        }
    }

    pub fn guard_raised(&self) -> bool {
        self.guard
    }

    /// Consume the reentrancy guard; called once at the top of each tick
    pub fn release_guard(&mut self) {
        self.guard = false;
    }

    /// Authoritative seek. Clamps, writes the session, syncs every
    /// element clock, and repositions every visual except `origin`.
    pub fn seek<E: MediaElement>(
        &mut self,
        session: &mut PlaybackSession,
        registry: &mut TrackRegistry<E>,
        origin: Option<&TrackId>,
        target: f64,
    ) -> f64 {
        let t = session.clamp(target);
        session.current_time = t;
        registry.sync_clocks(t);

        let progress = session.progress(t);
        for (id, track) in registry.iter_mut() {
            if Some(id) != origin {
                track.surface.set_cursor(progress);
            }
        }
        self.guard = true;
        trace!(t, origin = ?origin.map(|o| o.as_str()), "authoritative seek");
        t
    }

    /// A seek event from a track's surface. Dropped while the guard is
    /// raised, since it is then the echo of our own reposition.
    pub fn surface_seek<E: MediaElement>(
        &mut self,
        session: &mut PlaybackSession,
        registry: &mut TrackRegistry<E>,
        origin: &TrackId,
        progress: f64,
    ) -> Option<f64> {
        if self.guard {
            trace!(origin = %origin, "surface seek suppressed by guard");
            return None;
        }
        let target = progress.clamp(0.0, 1.0) * session.duration;
        Some(self.seek(session, registry, Some(origin), target))
    }

    /// Begin a drag on one surface; the transport position is untouched
    /// until the drag ends.
    pub fn begin_drag<E: MediaElement>(
        &mut self,
        session: &mut PlaybackSession,
        registry: &mut TrackRegistry<E>,
        origin: &TrackId,
        now: f64,
    ) {
        if let Some(track) = registry.get_mut(origin) {
            track.surface.begin_drag();
        }
        session.drag = DragState::Dragging {
            origin: origin.clone(),
            provisional_time: session.current_time,
        };
        self.last_drag_update = now;
        debug!(origin = %origin, "drag started");
    }

    /// Update the provisional drag position, throttled to roughly one
    /// display frame. Only the origin's own cursor follows; audio
    /// elements are not touched.
    pub fn drag_to<E: MediaElement>(
        &mut self,
        session: &mut PlaybackSession,
        registry: &mut TrackRegistry<E>,
        now: f64,
        target: f64,
    ) -> bool {
        let DragState::Dragging { origin, .. } = &session.drag else {
            return false;
        };
        if now - self.last_drag_update < self.drag_throttle {
            return false;
        }
        let origin = origin.clone();
        let t = session.clamp(target);
        session.drag = DragState::Dragging {
            origin: origin.clone(),
            provisional_time: t,
        };
        // The dragging surface ignores programmatic cursor writes, so
        // move its cursor through its own drag channel: directly.
        if let Some(track) = registry.get_mut(&origin) {
            track.surface.end_drag();
            track.surface.set_cursor(session.progress(t));
            track.surface.begin_drag();
        }
        self.last_drag_update = now;
        true
    }

    /// End the drag: fold the provisional time into the authoritative
    /// position and issue one sync to all elements and visuals.
    pub fn end_drag<E: MediaElement>(
        &mut self,
        session: &mut PlaybackSession,
        registry: &mut TrackRegistry<E>,
    ) -> Option<f64> {
        let DragState::Dragging {
            origin,
            provisional_time,
        } = std::mem::replace(&mut session.drag, DragState::Idle)
        else {
            return None;
        };
        if let Some(track) = registry.get_mut(&origin) {
            track.surface.end_drag();
        }
        debug!(origin = %origin, t = provisional_time, "drag ended");
        Some(self.seek(session, registry, None, provisional_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerConfig;
    use crate::registry::{TrackDescriptor, TrackKind};
    use stemdeck_media::SimulatedElement;
    use stemdeck_visual::{PeakPoint, WaveformPeaks};

    fn setup() -> (PlaybackSession, TrackRegistry<SimulatedElement>, SeekArbiter) {
        let mut registry = TrackRegistry::new();
        let tracks = ["mix", "vocals"]
            .iter()
            .map(|id| {
                (
                    TrackDescriptor {
                        id: TrackId::from(*id),
                        label: id.to_string(),
                        kind: TrackKind::Original,
                        audio_url: format!("{id}.mp3"),
                        download_url: None,
                    },
                    SimulatedElement::ready(*id, 40.0),
                )
            })
            .collect();
        registry.replace(tracks, &PlayerConfig::default());
        for id in ["mix", "vocals"] {
            let track = registry.get_mut(&TrackId::from(id)).unwrap();
            track.surface.set_peaks(WaveformPeaks {
                points: vec![PeakPoint::default(); 100],
                duration_seconds: 40.0,
            });
        }
        let mut session = PlaybackSession::new(TrackId::from("mix"));
        session.duration = 40.0;
        (session, registry, SeekArbiter::new(0.016))
    }

    #[test]
    fn seek_moves_session_elements_and_visuals() {
        let (mut session, mut registry, mut arbiter) = setup();
        arbiter.seek(&mut session, &mut registry, None, 10.0);

        assert_eq!(session.current_time, 10.0);
        for id in ["mix", "vocals"] {
            let track = registry.get(&TrackId::from(id)).unwrap();
            assert_eq!(track.element.current_time(), 10.0);
            assert!((track.surface.cursor() - 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn seek_clamps_out_of_range_targets() {
        let (mut session, mut registry, mut arbiter) = setup();
        assert_eq!(arbiter.seek(&mut session, &mut registry, None, 99.0), 40.0);
        assert_eq!(arbiter.seek(&mut session, &mut registry, None, -3.0), 0.0);
    }

    #[test]
    fn origin_surface_is_not_repositioned() {
        let (mut session, mut registry, mut arbiter) = setup();
        let origin = TrackId::from("vocals");
        registry
            .get_mut(&origin)
            .unwrap()
            .surface
            .set_cursor(0.9);

        arbiter.seek(&mut session, &mut registry, Some(&origin), 10.0);
        assert_eq!(registry.get(&origin).unwrap().surface.cursor(), 0.9);
        let other = registry.get(&TrackId::from("mix")).unwrap();
        assert!((other.surface.cursor() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn guard_suppresses_echoed_surface_seek() {
        let (mut session, mut registry, mut arbiter) = setup();
        let origin = TrackId::from("vocals");
        arbiter.seek(&mut session, &mut registry, None, 10.0);

        // The reposition above would echo back from the surface; the
        // guard swallows it
        assert_eq!(
            arbiter.surface_seek(&mut session, &mut registry, &origin, 0.5),
            None
        );
        assert_eq!(session.current_time, 10.0);

        arbiter.release_guard();
        assert_eq!(
            arbiter.surface_seek(&mut session, &mut registry, &origin, 0.5),
            Some(20.0)
        );
    }

    #[test]
    fn drag_updates_are_throttled() {
        let (mut session, mut registry, mut arbiter) = setup();
        let origin = TrackId::from("mix");
        arbiter.begin_drag(&mut session, &mut registry, &origin, 0.0);

        assert!(!arbiter.drag_to(&mut session, &mut registry, 0.005, 5.0));
        assert!(arbiter.drag_to(&mut session, &mut registry, 0.020, 6.0));
        match &session.drag {
            DragState::Dragging {
                provisional_time, ..
            } => assert_eq!(*provisional_time, 6.0),
            other => panic!("unexpected drag state {other:?}"),
        }
    }

    #[test]
    fn audio_is_untouched_until_drag_ends() {
        let (mut session, mut registry, mut arbiter) = setup();
        let origin = TrackId::from("mix");
        arbiter.begin_drag(&mut session, &mut registry, &origin, 0.0);
        arbiter.drag_to(&mut session, &mut registry, 0.1, 12.0);

        assert_eq!(
            registry.get(&origin).unwrap().element.current_time(),
            0.0
        );
        assert_eq!(session.current_time, 0.0);

        let folded = arbiter.end_drag(&mut session, &mut registry);
        assert_eq!(folded, Some(12.0));
        assert_eq!(session.current_time, 12.0);
        assert_eq!(
            registry.get(&origin).unwrap().element.current_time(),
            12.0
        );
        assert_eq!(session.drag, DragState::Idle);
    }
}
