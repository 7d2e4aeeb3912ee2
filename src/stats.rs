//! Decoder-wide statistics, accumulated as frames are dispatched.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-frame-type counters and a min/max per field.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameTypeStats {
    pub bytes: u64,
    pub size_count: [u64; 256],
    pub valid_count: u64,
    pub corrupt_count: u64,
    pub field_min: Vec<i32>,
    pub field_max: Vec<i32>,
}

impl FrameTypeStats {
    fn new() -> Self {
        FrameTypeStats {
            bytes: 0,
            size_count: [0; 256],
            valid_count: 0,
            corrupt_count: 0,
            field_min: Vec::new(),
            field_max: Vec::new(),
        }
    }

    fn record_accepted(&mut self, frame: &[i32], size: usize) {
        self.valid_count += 1;
        self.bytes += size as u64;
        if size < 256 {
            self.size_count[size] += 1;
        }
        if self.field_min.len() != frame.len() {
            self.field_min = frame.to_vec();
            self.field_max = frame.to_vec();
        } else {
            for (i, &v) in frame.iter().enumerate() {
                if v < self.field_min[i] {
                    self.field_min[i] = v;
                }
                if v > self.field_max[i] {
                    self.field_max[i] = v;
                }
            }
        }
    }

    fn record_rejected(&mut self, size: usize) {
        self.bytes += size as u64;
        if size < 256 {
            self.size_count[size] += 1;
        }
    }

    fn record_corrupt(&mut self, size: usize) {
        self.corrupt_count += 1;
        self.bytes += size as u64;
        if size < 256 {
            self.size_count[size] += 1;
        }
    }
}

impl Default for FrameTypeStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoder-wide statistics surface. Indexed by frame-type marker
/// byte (`'I'`, `'P'`, `'G'`, `'H'`, `'S'`, `'E'`).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stats {
    pub total_bytes: u64,
    pub total_corrupt_frames: u64,
    pub intentionally_absent_iterations: u64,
    by_type: HashMap<char, FrameTypeStats>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Stats::new();
    }

    pub fn frame_type(&self, frame_type: char) -> Option<&FrameTypeStats> {
        self.by_type.get(&frame_type)
    }

    pub(crate) fn record_accepted(&mut self, frame_type: char, frame: &[i32], size: usize) {
        self.total_bytes += size as u64;
        self.by_type
            .entry(frame_type)
            .or_default()
            .record_accepted(frame, size);
    }

    pub(crate) fn record_rejected(&mut self, frame_type: char, size: usize) {
        self.total_bytes += size as u64;
        self.by_type
            .entry(frame_type)
            .or_default()
            .record_rejected(size);
    }

    pub(crate) fn record_corrupt(&mut self, frame_type: Option<char>, size: usize) {
        self.total_bytes += size as u64;
        self.total_corrupt_frames += 1;
        if let Some(t) = frame_type {
            self.by_type.entry(t).or_default().record_corrupt(size);
        }
    }
}
