//! Three-slot main-frame history ring, two-slot GPS-home ring, and the
//! acceptance validator that gates `lastIter`/`lastTime` advancement.
//!
//! Rather than aliasing slots with pointers (as the source does), the ring
//! is a flat `Vec<Vec<i32>>` backing store with plain slot indices for
//! "current", "previous" and "previous-previous" -- rotation is just
//! reassigning which index means what.

use crate::schema::{ITER_INDEX, TIME_INDEX};
use crate::sampling::count_intentionally_skipped_frames_to;
use crate::sysconfig::SysConfig;

/// Three-slot ring of main (I/P) frame field arrays.
#[derive(Clone)]
pub struct MainRing {
    slots: [Vec<i32>; 3],
    current: usize,
    previous: usize,
    previous2: usize,
    /// True once at least one main frame has ever been decoded into this
    /// ring (distinguishes "previous is slot 0 with all zeros" from "there
    /// truly is no previous frame yet").
    pub has_previous: bool,
    pub has_previous2: bool,
}

impl MainRing {
    pub fn new(field_count: usize) -> Self {
        MainRing {
            slots: [
                vec![0; field_count],
                vec![0; field_count],
                vec![0; field_count],
            ],
            current: 0,
            previous: 1,
            previous2: 2,
            has_previous: false,
            has_previous2: false,
        }
    }

    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.iter_mut().for_each(|v| *v = 0);
        }
        self.current = 0;
        self.previous = 1;
        self.previous2 = 2;
        self.has_previous = false;
        self.has_previous2 = false;
    }

    pub fn current_mut(&mut self) -> &mut [i32] {
        &mut self.slots[self.current]
    }

    pub fn current(&self) -> &[i32] {
        &self.slots[self.current]
    }

    pub fn previous(&self) -> Option<&[i32]> {
        self.has_previous.then(|| self.slots[self.previous].as_slice())
    }

    pub fn previous2(&self) -> Option<&[i32]> {
        self.has_previous2
            .then(|| self.slots[self.previous2].as_slice())
    }

    /// On I-frame completion both previous pointers alias the just-decoded
    /// frame: no older P-history carries across an I-frame reset.
    pub fn advance_after_i(&mut self) {
        let next = (self.current + 1) % 3;
        self.previous = self.current;
        self.previous2 = self.current;
        self.current = next;
        self.has_previous = true;
        self.has_previous2 = true;
    }

    /// On P-frame completion slots rotate: previous2 <- previous,
    /// previous <- current, current advances.
    pub fn advance_after_p(&mut self) {
        let next = (self.current + 1) % 3;
        self.previous2 = self.previous;
        self.previous = self.current;
        self.current = next;
        self.has_previous2 = self.has_previous;
        self.has_previous = true;
    }
}

/// Two-slot GPS-home ring: slot 1 is current home, slot 0 is the decode
/// target.
pub struct GpsHomeRing {
    slots: [Vec<i32>; 2],
    pub valid: bool,
}

impl GpsHomeRing {
    pub fn new(field_count: usize) -> Self {
        GpsHomeRing {
            slots: [vec![0; field_count], vec![0; field_count]],
            valid: false,
        }
    }

    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.iter_mut().for_each(|v| *v = 0);
        }
        self.valid = false;
    }

    pub fn target_mut(&mut self) -> &mut [i32] {
        &mut self.slots[0]
    }

    pub fn home(&self) -> Option<&[i32]> {
        self.valid.then(|| self.slots[1].as_slice())
    }

    /// Publishes the decode target as the new current home (on a
    /// successful H-frame).
    pub fn publish(&mut self) {
        self.slots[1].copy_from_slice(&self.slots[0]);
        self.valid = true;
    }

    /// Caller-side override; invalidates on
    /// length mismatch rather than partially applying.
    pub fn set_external(&mut self, values: &[i32]) {
        if values.len() == self.slots[1].len() {
            self.slots[1].copy_from_slice(values);
            self.valid = true;
        } else {
            self.valid = false;
        }
    }
}

const MAX_ITER_JUMP: i32 = 5000;
const MAX_TIME_JUMP: i64 = 10_000_000;

/// Tracks the dispatcher-visible acceptance state: last accepted iteration
/// and time, and the `mainStreamIsValid` flag.
pub struct StreamValidator {
    last_iter: i32,
    last_time: i64,
    pub main_stream_is_valid: bool,
    pub intentionally_absent_iterations: u64,
}

impl StreamValidator {
    pub fn new() -> Self {
        StreamValidator {
            last_iter: -1,
            last_time: -1,
            main_stream_is_valid: true,
            intentionally_absent_iterations: 0,
        }
    }

    pub fn reset(&mut self) {
        self.last_iter = -1;
        self.last_time = -1;
        self.main_stream_is_valid = true;
    }

    pub fn last_iter(&self) -> i32 {
        self.last_iter
    }

    /// Adopted directly by a LOGGING_RESUME event, which lets a forward
    /// jump through otherwise-missing frames be accepted.
    pub fn adopt(&mut self, iter: i32, time: i64) {
        self.last_iter = iter;
        self.last_time = time;
    }

    /// Validates a just-decoded main frame against the iteration/time jump
    /// limits and, on acceptance, advances `lastIter`/`lastTime` and credits
    /// intentionally-skipped iterations. Returns whether the frame is
    /// accepted.
    pub fn validate(&mut self, frame: &[i32], sys_config: &SysConfig) -> bool {
        let iter = frame.get(ITER_INDEX).copied().unwrap_or(0);
        let time = frame.get(TIME_INDEX).copied().unwrap_or(0) as i64;

        let accepted = if self.last_iter == -1 {
            true
        } else {
            iter >= self.last_iter
                && iter < self.last_iter + MAX_ITER_JUMP
                && time >= self.last_time
                && time < self.last_time + MAX_TIME_JUMP
        };

        if accepted {
            if self.last_iter != -1 {
                self.intentionally_absent_iterations += count_intentionally_skipped_frames_to(
                    sys_config,
                    self.last_iter,
                    iter,
                ) as u64;
            }
            self.last_iter = iter;
            self.last_time = time;
        } else {
            self.main_stream_is_valid = false;
        }

        accepted
    }
}

impl Default for StreamValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_ring_advance_after_i_aliases_both_previous_slots() {
        let mut ring = MainRing::new(2);
        ring.current_mut().copy_from_slice(&[1, 1000]);
        ring.advance_after_i();
        assert_eq!(ring.previous(), Some([1, 1000].as_slice()));
        assert_eq!(ring.previous2(), Some([1, 1000].as_slice()));
    }

    #[test]
    fn main_ring_advance_after_p_rotates() {
        let mut ring = MainRing::new(1);
        ring.current_mut()[0] = 10;
        ring.advance_after_i();
        ring.current_mut()[0] = 20;
        ring.advance_after_p();
        assert_eq!(ring.previous(), Some([20].as_slice()));
        assert_eq!(ring.previous2(), Some([10].as_slice()));
    }

    #[test]
    fn validator_accepts_first_frame_unconditionally() {
        let mut v = StreamValidator::new();
        let config = SysConfig::new();
        assert!(v.validate(&[0, 0], &config));
    }

    #[test]
    fn validator_rejects_large_iteration_jump() {
        let mut v = StreamValidator::new();
        let config = SysConfig::new();
        assert!(v.validate(&[0, 0], &config));
        assert!(!v.validate(&[10_000, 100], &config));
        assert!(!v.main_stream_is_valid);
    }
}
