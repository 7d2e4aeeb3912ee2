//! Reconciles logged loop iterations with intentionally-skipped ones.

use crate::sysconfig::SysConfig;

/// True iff loop iteration `k` is logged under the `I_int`/`P_num`/`P_denom`
/// sampling policy.
pub fn is_logged_iteration(sys_config: &SysConfig, k: i32) -> bool {
    let i_int = sys_config.frame_interval_i.max(1);
    let p_num = sys_config.frame_interval_p_num;
    let p_denom = sys_config.frame_interval_p_denom.max(1);

    (k.rem_euclid(i_int) + p_num - 1).rem_euclid(p_denom) < p_num
}

/// Counts un-logged iterations strictly between `last_iter` and the next
/// logged iteration (exclusive of both ends), i.e. `skippedFrames` fed to
/// the `Inc` predictor.
pub fn count_intentionally_skipped_frames(sys_config: &SysConfig, last_iter: i32) -> i32 {
    let mut k = last_iter + 1;
    let mut skipped = 0;
    // The next logged iteration is reached within one full P_denom cycle.
    let denom = sys_config.frame_interval_p_denom.max(1);
    for _ in 0..denom {
        if is_logged_iteration(sys_config, k) {
            break;
        }
        skipped += 1;
        k += 1;
    }
    skipped
}

/// Sums un-logged iterations in the open range `(last_iter, target)`.
pub fn count_intentionally_skipped_frames_to(
    sys_config: &SysConfig,
    last_iter: i32,
    target: i32,
) -> i32 {
    if target <= last_iter + 1 {
        return 0;
    }
    let mut skipped = 0;
    for k in (last_iter + 1)..target {
        if !is_logged_iteration(sys_config, k) {
            skipped += 1;
        }
    }
    skipped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(i_int: i32, p_num: i32, p_denom: i32) -> SysConfig {
        let mut c = SysConfig::new();
        c.frame_interval_i = i_int;
        c.frame_interval_p_num = p_num;
        c.frame_interval_p_denom = p_denom;
        c
    }

    #[test]
    fn every_iteration_logged_when_denom_is_one() {
        let c = config(32, 1, 1);
        for k in 0..100 {
            assert!(is_logged_iteration(&c, k));
        }
    }

    #[test]
    fn p_interval_one_quarter_skips_three_of_four() {
        let c = config(32, 1, 4);
        let logged: Vec<i32> = (0..8).filter(|&k| is_logged_iteration(&c, k)).collect();
        assert_eq!(logged, vec![0, 4]);
        assert_eq!(count_intentionally_skipped_frames(&c, 0), 3);
    }

    #[test]
    fn count_to_sums_open_range() {
        let c = config(32, 1, 4);
        assert_eq!(count_intentionally_skipped_frames_to(&c, 0, 4), 3);
        assert_eq!(count_intentionally_skipped_frames_to(&c, 0, 1), 0);
    }
}
