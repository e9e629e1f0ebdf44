/*!
 * Playback synchronisation.
 *
 * Resolves the cues visible at a playback position, shifted by a user
 * offset. Lookup is a binary search over the sorted cue starts followed by a
 * short backward scan bounded by the track's longest cue, so per-tick calls
 * stay cheap. Drift samples are collected for diagnostics only; the offset
 * is never changed automatically.
 */

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::cue::{Cue, Track};

// @const: Drift samples kept when no capacity is configured
pub const DEFAULT_DRIFT_CAPACITY: usize = 120;

/// Drift diagnostics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SyncStats {
    pub sample_count: usize,
    /// Mean signed drift in milliseconds
    pub mean_drift_ms: f64,
    /// Largest absolute drift in milliseconds
    pub max_abs_drift_ms: i64,
}

/// Offset-aware active cue resolution for one track
#[derive(Debug)]
pub struct Synchronizer {
    track: Option<Arc<Track>>,
    offset_ms: i64,
    running: bool,
    last_update: Option<(u64, Instant)>,
    drift_samples: VecDeque<i64>,
    drift_capacity: usize,
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DRIFT_CAPACITY)
    }

    /// Create a synchronizer keeping at most `drift_capacity` samples
    pub fn with_capacity(drift_capacity: usize) -> Self {
        let drift_capacity = drift_capacity.max(1);
        Self {
            track: None,
            offset_ms: 0,
            running: false,
            last_update: None,
            drift_samples: VecDeque::with_capacity(drift_capacity),
            drift_capacity,
        }
    }

    pub fn load_track(&mut self, track: Arc<Track>) {
        debug!("Synchronizer loaded {} cues", track.len());
        self.track = Some(track);
        self.last_update = None;
    }

    pub fn track(&self) -> Option<&Arc<Track>> {
        self.track.as_ref()
    }

    /// Forget the track and drift history; the offset is kept
    pub fn clear(&mut self) {
        self.track = None;
        self.last_update = None;
        self.drift_samples.clear();
    }

    /// Positive offsets delay cues, negative offsets show them earlier
    pub fn set_offset(&mut self, offset_ms: i64) {
        self.offset_ms = offset_ms;
    }

    pub fn offset(&self) -> i64 {
        self.offset_ms
    }

    /// Shift the offset by `delta_ms`, returning the new value
    pub fn adjust_offset(&mut self, delta_ms: i64) -> i64 {
        self.offset_ms = self.offset_ms.saturating_add(delta_ms);
        self.offset_ms
    }

    pub fn start_synchronization(&mut self) {
        self.running = true;
        self.last_update = None;
    }

    pub fn stop_synchronization(&mut self) {
        self.running = false;
        self.last_update = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Cues whose `[start, end]` contains `position_ms - offset`
    pub fn active_cues_at(&self, position_ms: u64) -> Vec<Cue> {
        match &self.track {
            Some(track) => active_cues(track, position_ms, self.offset_ms),
            None => Vec::new(),
        }
    }

    /// Consume a position update while running.
    ///
    /// Returns `None` when synchronisation is stopped; nothing is recorded then.
    pub fn update_position(&mut self, position_ms: u64) -> Option<Vec<Cue>> {
        if !self.running {
            return None;
        }

        let now = Instant::now();
        if let Some((last_position, last_at)) = self.last_update {
            // Only forward progress says anything about drift; seeks reset the baseline
            if position_ms >= last_position {
                let media_elapsed = i64::try_from(position_ms - last_position).unwrap_or(i64::MAX);
                let wall_elapsed = i64::try_from(now.duration_since(last_at).as_millis()).unwrap_or(i64::MAX);
                self.record_drift(media_elapsed.saturating_sub(wall_elapsed));
            }
        }
        self.last_update = Some((position_ms, now));

        Some(self.active_cues_at(position_ms))
    }

    fn record_drift(&mut self, drift_ms: i64) {
        if self.drift_samples.len() >= self.drift_capacity {
            self.drift_samples.pop_front();
        }
        self.drift_samples.push_back(drift_ms);
    }

    pub fn stats(&self) -> SyncStats {
        let sample_count = self.drift_samples.len();
        if sample_count == 0 {
            return SyncStats::default();
        }
        let sum: i128 = self.drift_samples.iter().map(|&d| i128::from(d)).sum();
        SyncStats {
            sample_count,
            mean_drift_ms: sum as f64 / sample_count as f64,
            max_abs_drift_ms: self.drift_samples.iter().map(|d| d.saturating_abs()).max().unwrap_or(0),
        }
    }
}

/// Cues of `track` active at `position_ms` once `offset_ms` is applied
pub fn active_cues(track: &Track, position_ms: u64, offset_ms: i64) -> Vec<Cue> {
    // Negative or past the end of the timeline: nothing can be active
    let Ok(adjusted) = u64::try_from(i128::from(position_ms) - i128::from(offset_ms)) else {
        return Vec::new();
    };

    let cues = track.cues();
    // First cue starting after the position; everything active lies before it
    let upper = cues.partition_point(|cue| cue.start_ms() <= adjusted);
    let earliest_start = adjusted.saturating_sub(track.max_cue_duration_ms());

    let mut active: Vec<Cue> = cues[..upper]
        .iter()
        .rev()
        .take_while(|cue| cue.start_ms() >= earliest_start)
        .filter(|cue| cue.contains(adjusted))
        .cloned()
        .collect();
    active.reverse();
    active
}
