//! Software trajectory interpolation.
//!
//! Facades whose hardware has no native "go to" command sample a trajectory
//! at a fixed period and stream the intermediate goals.  The profile maps
//! normalised time `t ∈ [0, 1]` onto normalised progress.
//!
//! # Example
//!
//! ```rust
//! use animatron_hal::trajectory::ease;
//! use animatron_types::Interpolation;
//!
//! assert_eq!(ease(Interpolation::Linear, 0.25), 0.25);
//! assert_eq!(ease(Interpolation::MinimumJerk, 0.5), 0.5);
//! ```

use std::time::Duration;

use animatron_types::{GoalMap, Interpolation};

/// Progress along the trajectory at normalised time `t` (clamped to `[0, 1]`).
pub fn ease(profile: Interpolation, t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    match profile {
        Interpolation::Linear => t,
        // 10t³ − 15t⁴ + 6t⁵: zero velocity and acceleration at both ends.
        Interpolation::MinimumJerk => t * t * t * (10.0 - 15.0 * t + 6.0 * t * t),
    }
}

/// Goals at fraction `s` of the way from `start` to `goal`.
///
/// Joints missing from `start` jump straight to their goal.
pub fn blend(start: &GoalMap, goal: &GoalMap, s: f64) -> GoalMap {
    goal.iter()
        .map(|(joint, target)| {
            let from = start.get(joint).copied().unwrap_or(*target);
            (joint.clone(), from + (target - from) * s)
        })
        .collect()
}

/// Number of samples needed to cover `duration` at `period` (at least one).
pub fn sample_count(duration: Duration, period: Duration) -> u32 {
    if period.is_zero() {
        return 1;
    }
    let n = (duration.as_secs_f64() / period.as_secs_f64()).ceil();
    (n as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use animatron_types::JointId;

    #[test]
    fn profiles_start_and_end_on_the_endpoints() {
        for profile in [Interpolation::Linear, Interpolation::MinimumJerk] {
            assert_eq!(ease(profile, 0.0), 0.0);
            assert!((ease(profile, 1.0) - 1.0).abs() < 1e-12);
            assert_eq!(ease(profile, 2.0), ease(profile, 1.0));
            assert_eq!(ease(profile, -1.0), 0.0);
        }
    }

    #[test]
    fn minimum_jerk_is_slow_at_the_edges() {
        assert!(ease(Interpolation::MinimumJerk, 0.1) < 0.1);
        assert!(ease(Interpolation::MinimumJerk, 0.9) > 0.9);
    }

    #[test]
    fn blend_interpolates_known_joints_and_jumps_unknown_ones() {
        let mut start = GoalMap::new();
        start.insert("neck_yaw".into(), 0.0);
        let mut goal = GoalMap::new();
        goal.insert("neck_yaw".into(), 20.0);
        goal.insert("neck_pitch".into(), -10.0);

        let mid = blend(&start, &goal, 0.5);
        assert_eq!(mid[&JointId::from("neck_yaw")], 10.0);
        assert_eq!(mid[&JointId::from("neck_pitch")], -10.0);
    }

    #[test]
    fn sample_count_rounds_up() {
        let period = Duration::from_millis(10);
        assert_eq!(sample_count(Duration::from_millis(1000), period), 100);
        assert_eq!(sample_count(Duration::from_millis(1005), period), 101);
        assert_eq!(sample_count(Duration::ZERO, period), 1);
        assert_eq!(sample_count(Duration::from_secs(1), Duration::ZERO), 1);
    }
}
