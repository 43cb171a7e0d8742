//! Loop regions: creation, grid-snapped boundaries, enforcement bounds
//!
//! Regions live only for the session. At most one region is active for
//! loop enforcement; others may exist visually but never drive playback.

use std::collections::BTreeMap;
use stemdeck_grid::BeatGrid;
use tracing::debug;

/// Identifier of one loop region within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopId(u64);

/// A time range that, while active and enabled, forces playback to
/// repeat within its bounds
#[derive(Debug, Clone, PartialEq)]
pub struct LoopRegion {
    pub id: LoopId,
    pub start: f64,
    pub end: f64,
    pub loop_enabled: bool,
}

/// All loop regions of one session, plus the single active one
#[derive(Debug, Default)]
pub struct LoopRegions {
    regions: BTreeMap<LoopId, LoopRegion>,
    active: Option<LoopId>,
    next_id: u64,
}

impl LoopRegions {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> LoopId {
        let id = LoopId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Snap and sanitize a candidate range: clamp into the track,
    /// order the edges, and expand degenerate ranges to at least one
    /// beat duration.
    fn sanitize(grid: &BeatGrid, duration: f64, start: f64, end: f64) -> (f64, f64) {
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        let mut lo = grid.snap_time(lo.clamp(0.0, duration), duration);
        let mut hi = grid.snap_time(hi.clamp(0.0, duration), duration);
        if hi - lo <= 0.0 {
            let beat = grid.beat_duration();
            hi = (lo + beat).min(duration);
            if hi - lo <= 0.0 {
                // Degenerate at the very end of the track; back off instead
                lo = (hi - beat).max(0.0);
            }
        }
        (lo, hi)
    }

    /// Create a region from a free-form drag-select. Boundaries snap to
    /// the grid when it is enabled; invalid input is auto-corrected.
    /// The new region becomes active.
    pub fn create_from_drag(
        &mut self,
        grid: &BeatGrid,
        duration: f64,
        start: f64,
        end: f64,
    ) -> LoopId {
        let (start, end) = Self::sanitize(grid, duration, start, end);
        let id = self.allocate_id();
        debug!(?id, start, end, "loop region created from drag");
        self.regions.insert(
            id,
            LoopRegion {
                id,
                start,
                end,
                loop_enabled: true,
            },
        );
        self.active = Some(id);
        id
    }

    /// Create an N-bar loop anchored at the snapped current time.
    /// Falls back to one beat when the computed length is non-positive.
    pub fn create_bars(
        &mut self,
        grid: &BeatGrid,
        duration: f64,
        current_time: f64,
        bars: u32,
    ) -> LoopId {
        let start = grid.snap_time(current_time, duration);
        let length = bars as f64 * grid.bar_duration();
        let end = if length > 0.0 {
            (start + length).min(duration)
        } else {
            (start + grid.beat_duration()).min(duration)
        };
        let (start, end) = Self::sanitize(grid, duration, start, end);
        let id = self.allocate_id();
        debug!(?id, start, end, bars, "bar loop created");
        self.regions.insert(
            id,
            LoopRegion {
                id,
                start,
                end,
                loop_enabled: true,
            },
        );
        self.active = Some(id);
        id
    }

    /// Resize or move a region; both boundaries re-snap
    pub fn resize(
        &mut self,
        grid: &BeatGrid,
        duration: f64,
        id: LoopId,
        start: f64,
        end: f64,
    ) -> bool {
        let (start, end) = Self::sanitize(grid, duration, start, end);
        match self.regions.get_mut(&id) {
            Some(region) => {
                region.start = start;
                region.end = end;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: LoopId) {
        self.regions.remove(&id);
        if self.active == Some(id) {
            self.active = None;
        }
    }

    /// Drop every region, e.g. when the track set changes
    pub fn clear(&mut self) {
        self.regions.clear();
        self.active = None;
    }

    pub fn set_active(&mut self, id: LoopId) -> bool {
        if self.regions.contains_key(&id) {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    pub fn toggle_loop(&mut self, id: LoopId) -> bool {
        match self.regions.get_mut(&id) {
            Some(region) => {
                region.loop_enabled = !region.loop_enabled;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: LoopId) -> Option<&LoopRegion> {
        self.regions.get(&id)
    }

    /// The region driving loop enforcement, if any
    pub fn active(&self) -> Option<&LoopRegion> {
        self.active.and_then(|id| self.regions.get(&id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoopRegion> {
        self.regions.values()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
