//! Procedural track streaming with pooled segments
//!
//! Segments are never destroyed. A despawned segment is deactivated and put
//! in its variant's recycle queue; spawning reuses a queued segment of the
//! chosen variant before allocating a new one.

use std::collections::VecDeque;

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::tuning::TrackTuning;

/// Index of a segment in the streamer's pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u32);

/// One fixed-length piece of road
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    pub variant_id: u32,
    /// Forward coordinate of the segment's start
    pub world_z: f32,
    /// True while deactivated in a recycle queue
    pub pooled: bool,
}

#[derive(Debug)]
pub struct TrackStreamer {
    segment_length: f32,
    maintain_count: usize,
    start_z: f32,
    variant_count: u32,
    enabled: bool,
    frontier: f32,
    segments: Vec<TrackSegment>,
    active: VecDeque<SegmentId>,
    recycled: Vec<VecDeque<SegmentId>>,
    rng: Pcg32,
}

impl TrackStreamer {
    /// Create a streamer and lay down the initial `maintain_count` segments.
    ///
    /// Unusable geometry (no variants, non-positive length) disables streaming
    /// with a logged error instead of failing.
    pub fn new(tuning: &TrackTuning, rng: Pcg32) -> Self {
        let enabled = tuning.variant_count > 0 && tuning.segment_length > 0.0 && tuning.maintain_count > 0;
        if !enabled {
            log::error!(
                "Track streaming disabled: {} variants, segment length {}, maintain {}",
                tuning.variant_count,
                tuning.segment_length,
                tuning.maintain_count
            );
        }

        let mut streamer = Self {
            segment_length: tuning.segment_length,
            maintain_count: tuning.maintain_count as usize,
            start_z: tuning.start_z,
            variant_count: tuning.variant_count,
            enabled,
            frontier: tuning.start_z,
            segments: Vec::new(),
            active: VecDeque::new(),
            recycled: vec![VecDeque::new(); tuning.variant_count as usize],
            rng,
        };
        streamer.prime();
        streamer
    }

    /// Recycle everything and rebuild the initial segments from the start
    pub fn reset(&mut self) {
        while let Some(id) = self.active.pop_front() {
            self.pool(id);
        }
        self.frontier = self.start_z;
        self.prime();
    }

    fn prime(&mut self) {
        if !self.enabled {
            return;
        }
        for _ in 0..self.maintain_count {
            self.spawn_segment();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Far end of the generated track
    pub fn frontier(&self) -> f32 {
        self.frontier
    }

    /// Length of road kept generated ahead of the player
    pub fn window_length(&self) -> f32 {
        self.maintain_count as f32 * self.segment_length
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Total segments ever allocated (active + pooled)
    pub fn allocated_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment(&self, id: SegmentId) -> Option<&TrackSegment> {
        self.segments.get(id.0 as usize)
    }

    /// Active segments, oldest first
    pub fn active_segments(&self) -> impl Iterator<Item = (SegmentId, &TrackSegment)> {
        self.active
            .iter()
            .map(|&id| (id, &self.segments[id.0 as usize]))
    }

    /// Oldest active segment
    pub fn head(&self) -> Option<SegmentId> {
        self.active.front().copied()
    }

    /// Active segment covering a forward coordinate
    pub fn segment_at(&self, z: f32) -> Option<SegmentId> {
        self.active_segments()
            .find(|(_, seg)| z >= seg.world_z && z < seg.world_z + self.segment_length)
            .map(|(id, _)| id)
    }

    /// Advance streaming for the player's forward position.
    ///
    /// At most one segment is spawned per call. Returns true if one was.
    pub fn tick(&mut self, player_z: f32) -> bool {
        if !self.enabled {
            return false;
        }
        if player_z <= self.frontier - self.window_length() {
            return false;
        }
        self.spawn_segment();
        self.despawn_oldest();
        true
    }

    /// Early recycle request. Honoured only for the oldest active segment so a
    /// segment still ahead of the player is never pulled.
    ///
    /// The active count drops to `maintain_count - 1` until the next
    /// streaming spawn; [`tick`](Self::tick) does not despawn while the
    /// count is at or below `maintain_count + 1`, so that spawn restores it.
    pub fn recycle(&mut self, id: SegmentId) -> bool {
        if self.active.front() != Some(&id) {
            log::debug!("Recycle of {:?} rejected: not the active head", id);
            return false;
        }
        self.active.pop_front();
        self.pool(id);
        true
    }

    fn spawn_segment(&mut self) {
        let variant_id = self.rng.random_range(0..self.variant_count);
        let id = match self.recycled[variant_id as usize].pop_front() {
            Some(id) => id,
            None => {
                let id = SegmentId(self.segments.len() as u32);
                self.segments.push(TrackSegment {
                    variant_id,
                    world_z: 0.0,
                    pooled: false,
                });
                id
            }
        };

        let segment = &mut self.segments[id.0 as usize];
        segment.pooled = false;
        segment.world_z = self.frontier;
        self.active.push_back(id);
        self.frontier += self.segment_length;
    }

    fn despawn_oldest(&mut self) {
        if self.active.len() <= self.maintain_count + 1 {
            return;
        }
        if let Some(id) = self.active.pop_front() {
            self.pool(id);
        }
    }

    fn pool(&mut self, id: SegmentId) {
        let segment = &mut self.segments[id.0 as usize];
        segment.pooled = true;
        self.recycled[segment.variant_id as usize].push_back(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::subsystem_rng;

    fn streamer(maintain: u32, variants: u32) -> TrackStreamer {
        let tuning = TrackTuning {
            maintain_count: maintain,
            variant_count: variants,
            ..TrackTuning::default()
        };
        TrackStreamer::new(&tuning, subsystem_rng(7, 0))
    }

    #[test]
    fn test_initial_fill() {
        let track = streamer(3, 1);
        assert_eq!(track.active_count(), 3);
        assert_eq!(track.frontier(), -20.0 + 3.0 * 20.0);
    }

    #[test]
    fn test_streaming_keeps_count_in_band() {
        let mut track = streamer(3, 1);

        // Frontier 40, window 60: threshold is -20
        assert!(track.tick(-19.0));
        assert_eq!(track.active_count(), 4);

        assert!(track.tick(1.0));
        assert_eq!(track.active_count(), 4);
        assert_eq!(track.allocated_count(), 5);

        for step in 0..50 {
            track.tick(step as f32 * 7.0);
            assert!((3..=4).contains(&track.active_count()));
        }
    }

    #[test]
    fn test_no_spawn_before_threshold() {
        let mut track = streamer(3, 1);
        assert!(!track.tick(-25.0));
        assert_eq!(track.active_count(), 3);
    }

    #[test]
    fn test_pool_reuse_keeps_variant() {
        let mut track = streamer(2, 3);
        for step in 0..200 {
            track.tick(step as f32 * 5.0);
        }
        for (id, seg) in track.active_segments() {
            assert!(!seg.pooled);
            assert_eq!(track.segment(id).unwrap().variant_id, seg.variant_id);
        }
        // Pool reuse bounds allocation well below one segment per spawn
        assert!(track.allocated_count() < 30);
    }

    #[test]
    fn test_recycle_only_head() {
        let mut track = streamer(3, 1);
        let ids: Vec<_> = track.active_segments().map(|(id, _)| id).collect();

        assert!(!track.recycle(ids[1]));
        assert_eq!(track.active_count(), 3);

        assert!(track.recycle(ids[0]));
        assert_eq!(track.active_count(), 2);
        assert!(track.segment(ids[0]).unwrap().pooled);

        // Next spawn refills the band without despawning
        assert!(track.tick(0.0));
        assert_eq!(track.active_count(), 3);
    }

    #[test]
    fn test_segment_at() {
        let track = streamer(3, 1);
        let id = track.segment_at(5.0).unwrap();
        assert_eq!(track.segment(id).unwrap().world_z, 0.0);
        assert!(track.segment_at(1000.0).is_none());
    }

    #[test]
    fn test_reset_reprimes_from_start() {
        let mut track = streamer(3, 1);
        for step in 0..20 {
            track.tick(step as f32 * 20.0);
        }
        track.reset();
        assert_eq!(track.active_count(), 3);
        assert_eq!(track.frontier(), 40.0);
        assert!(track.segment_at(-10.0).is_some());
    }

    #[test]
    fn test_disabled_without_variants() {
        let tuning = TrackTuning {
            variant_count: 0,
            ..TrackTuning::default()
        };
        let mut track = TrackStreamer::new(&tuning, subsystem_rng(1, 0));
        assert!(!track.is_enabled());
        assert_eq!(track.active_count(), 0);
        assert!(!track.tick(100.0));
    }
}
