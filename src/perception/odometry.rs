//! Dead-reckoning odometry from cumulative wheel encoder counts
//!
//! Each accepted sample advances the pose by exactly one step:
//!
//! ```text
//! d_heading  = (right_inc - left_inc) * rate / wheel_base
//! heading   += d_heading
//! d_distance = (left_inc + right_inc) / 2 * rate
//! x         += d_distance * cos(heading)
//! y         += d_distance * sin(heading)
//! ```
//!
//! The translation is projected with the heading *after* the increment.
//! Integration is tick driven; timestamps are only carried through.

use crate::common::types::{Pose2D, QuaternionXyzw, Stamp};
use crate::error::{OdometryError, SampleFault, Wheel};
use crate::perception::sensors::EncoderSample;

/// How the encoder baseline is chosen before the first sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaselinePolicy {
    /// The first sample only records the counts and leaves the pose at the origin
    #[default]
    SeedFromFirstSample,
    /// Treat zero as the previous count, so the first sample's absolute counts are integrated
    StartFromZero,
}

/// Running dead-reckoning state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorState {
    pub x: f64,
    pub y: f64,
    /// Accumulated heading in radians, not wrapped
    pub heading: f64,
    pub last_left_count: i64,
    pub last_right_count: i64,
    pub last_update_time: Stamp,
    /// False until a baseline for the encoder counts exists
    pub baseline_set: bool,
}

impl EstimatorState {
    /// State at the origin with a zero encoder baseline
    pub fn at_origin(now: Stamp) -> Self {
        EstimatorState {
            x: 0.0,
            y: 0.0,
            heading: 0.0,
            last_left_count: 0,
            last_right_count: 0,
            last_update_time: now,
            baseline_set: true,
        }
    }

    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.x, self.y, self.heading)
    }
}

/// Pose and velocity produced by one accepted sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseEstimate {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub orientation: QuaternionXyzw,
    /// Copied from the sample, not derived from encoder deltas
    pub linear_velocity: f64,
    /// Copied from the sample, not derived from encoder deltas
    pub angular_velocity: f64,
    pub timestamp: Stamp,
}

impl PoseEstimate {
    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.x, self.y, self.heading)
    }
}

/// Differential-drive dead-reckoning estimator
#[derive(Debug, Clone)]
pub struct OdometryEstimator {
    state: EstimatorState,
}

impl OdometryEstimator {
    /// Create an estimator at the origin, constructed at `now`
    pub fn new(now: Stamp, policy: BaselinePolicy) -> Self {
        let mut state = EstimatorState::at_origin(now);
        state.baseline_set = policy == BaselinePolicy::StartFromZero;
        OdometryEstimator { state }
    }

    /// Resume from an arbitrary state
    pub fn from_state(state: EstimatorState) -> Self {
        OdometryEstimator { state }
    }

    pub fn state(&self) -> &EstimatorState {
        &self.state
    }

    /// Integrate one encoder sample
    ///
    /// # Errors
    ///
    /// * [`OdometryError::InvalidSample`] for non-finite fields or counts beyond
    ///   2^53 in magnitude; state untouched.
    /// * [`OdometryError::DegenerateGeometry`] for a zero wheel base, or when the
    ///   step would leave the pose non-finite; state untouched.
    /// * [`OdometryError::EncoderDiscontinuity`] when either count decreased. Both
    ///   baselines are moved to the sample and nothing is integrated, so the next
    ///   sample continues from the new counts. `last_update_time` is kept.
    pub fn update(&mut self, sample: &EncoderSample) -> Result<PoseEstimate, OdometryError> {
        sample.validate()?;

        if sample.wheel_base == 0.0 {
            return Err(OdometryError::DegenerateGeometry {
                wheel_base: sample.wheel_base,
            });
        }

        if !self.state.baseline_set {
            self.resync_counts(sample);
            self.state.last_update_time = sample.timestamp;
            self.state.baseline_set = true;
            return Ok(self.estimate(sample));
        }

        let left_inc = increment("left_count", sample.left_count, self.state.last_left_count)?;
        let right_inc = increment("right_count", sample.right_count, self.state.last_right_count)?;

        if left_inc < 0 || right_inc < 0 {
            let (wheel, previous, current) = if left_inc < 0 {
                (Wheel::Left, self.state.last_left_count, sample.left_count)
            } else {
                (Wheel::Right, self.state.last_right_count, sample.right_count)
            };
            self.resync_counts(sample);
            return Err(OdometryError::EncoderDiscontinuity {
                wheel,
                previous,
                current,
            });
        }

        let rate = sample.tick_to_distance_rate;
        let delta_heading = (right_inc - left_inc) as f64 * rate / sample.wheel_base;
        let heading = self.state.heading + delta_heading;

        let delta_distance = (left_inc + right_inc) as f64 / 2.0 * rate;
        let x = self.state.x + delta_distance * heading.cos();
        let y = self.state.y + delta_distance * heading.sin();

        if !(heading.is_finite() && x.is_finite() && y.is_finite()) {
            return Err(OdometryError::DegenerateGeometry {
                wheel_base: sample.wheel_base,
            });
        }

        self.state.heading = heading;
        self.state.x = x;
        self.state.y = y;
        self.resync_counts(sample);
        self.state.last_update_time = sample.timestamp;

        Ok(self.estimate(sample))
    }

    fn resync_counts(&mut self, sample: &EncoderSample) {
        self.state.last_left_count = sample.left_count;
        self.state.last_right_count = sample.right_count;
    }

    fn estimate(&self, sample: &EncoderSample) -> PoseEstimate {
        PoseEstimate {
            x: self.state.x,
            y: self.state.y,
            heading: self.state.heading,
            orientation: QuaternionXyzw::from_yaw(self.state.heading),
            linear_velocity: sample.linear_velocity_hint,
            angular_velocity: sample.angular_velocity_hint,
            timestamp: sample.timestamp,
        }
    }
}

/// Tick increment since the previous count, bounded so later sums cannot overflow
fn increment(field: &'static str, current: i64, previous: i64) -> Result<i64, SampleFault> {
    const MAX_INCREMENT: i64 = 1 << 60;
    current
        .checked_sub(previous)
        .filter(|inc| inc.unsigned_abs() <= MAX_INCREMENT as u64)
        .ok_or(SampleFault::CountOutOfRange {
            field,
            value: current as f64,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn sample(left: i64, right: i64, rate: f64, base: f64) -> EncoderSample {
        EncoderSample {
            linear_velocity_hint: 0.3,
            angular_velocity_hint: -0.05,
            left_count: left,
            right_count: right,
            tick_to_distance_rate: rate,
            wheel_base: base,
            timestamp: Stamp::new(1, 0),
        }
    }

    fn from_zero() -> OdometryEstimator {
        OdometryEstimator::new(Stamp::default(), BaselinePolicy::StartFromZero)
    }

    #[test]
    fn straight_line_keeps_heading() {
        let mut odom = from_zero();
        let est = odom.update(&sample(10, 10, 0.01, 0.5)).unwrap();
        assert_eq!(est.heading, 0.0);
        assert_relative_eq!(est.x, 0.1, epsilon = 1e-12);
        assert_eq!(est.y, 0.0);
    }

    #[test]
    fn straight_line_follows_current_heading() {
        let mut odom = OdometryEstimator::from_state(EstimatorState {
            heading: std::f64::consts::FRAC_PI_2,
            ..EstimatorState::at_origin(Stamp::default())
        });
        let est = odom.update(&sample(50, 50, 0.02, 0.4)).unwrap();
        assert_eq!(est.heading, std::f64::consts::FRAC_PI_2);
        assert_abs_diff_eq!(est.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(est.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn idle_sample_does_not_move() {
        let mut odom = from_zero();
        odom.update(&sample(40, 70, 0.01, 0.5)).unwrap();
        let before = *odom.state();

        let est = odom.update(&sample(40, 70, 0.01, 0.5)).unwrap();
        assert_eq!(est.pose(), before.pose());
    }

    #[test]
    fn post_update_heading_projects_translation() {
        let mut odom = from_zero();
        odom.update(&sample(10, 10, 0.01, 0.5)).unwrap();
        let est = odom.update(&sample(20, 10, 0.01, 0.5)).unwrap();

        assert_relative_eq!(est.heading, -0.2, epsilon = 1e-12);
        assert_relative_eq!(est.x, 0.1 + 0.05 * (-0.2f64).cos(), epsilon = 1e-12);
        assert_relative_eq!(est.y, 0.05 * (-0.2f64).sin(), epsilon = 1e-12);
    }

    #[test]
    fn velocities_and_stamp_pass_through() {
        let mut odom = from_zero();
        let mut s = sample(4, 6, 0.01, 0.5);
        s.timestamp = Stamp::new(42, 7);
        let est = odom.update(&s).unwrap();
        assert_eq!(est.linear_velocity, 0.3);
        assert_eq!(est.angular_velocity, -0.05);
        assert_eq!(est.timestamp, Stamp::new(42, 7));
        assert_eq!(odom.state().last_update_time, Stamp::new(42, 7));
    }

    #[test]
    fn orientation_matches_heading() {
        let mut odom = from_zero();
        let est = odom.update(&sample(0, 25, 0.01, 0.5)).unwrap();
        assert_relative_eq!(est.heading, 0.5, epsilon = 1e-12);
        assert_relative_eq!(est.orientation.z, 0.25f64.sin(), epsilon = 1e-12);
        assert_relative_eq!(est.orientation.w, 0.25f64.cos(), epsilon = 1e-12);
    }

    #[test]
    fn first_sample_seeds_baseline_by_default() {
        let mut odom = OdometryEstimator::new(Stamp::default(), BaselinePolicy::default());
        let est = odom.update(&sample(5000, 5200, 0.01, 0.5)).unwrap();
        assert_eq!(est.pose(), Pose2D::origin());
        assert_eq!(odom.state().last_left_count, 5000);
        assert_eq!(odom.state().last_right_count, 5200);

        let est = odom.update(&sample(5010, 5210, 0.01, 0.5)).unwrap();
        assert_relative_eq!(est.x, 0.1, epsilon = 1e-12);
        assert_eq!(est.heading, 0.0);
    }

    #[test]
    fn zero_wheel_base_leaves_state_alone() {
        let mut odom = from_zero();
        odom.update(&sample(10, 10, 0.01, 0.5)).unwrap();
        let before = *odom.state();

        let err = odom.update(&sample(20, 30, 0.01, 0.0)).unwrap_err();
        assert_eq!(err, OdometryError::DegenerateGeometry { wheel_base: 0.0 });
        assert_eq!(*odom.state(), before);
    }

    #[test]
    fn tiny_wheel_base_overflow_is_rejected() {
        let mut odom = from_zero();
        let before = *odom.state();
        let err = odom.update(&sample(0, 10, 1e300, 1e-300)).unwrap_err();
        assert!(matches!(err, OdometryError::DegenerateGeometry { .. }));
        assert_eq!(*odom.state(), before);
    }

    #[test]
    fn non_finite_sample_is_bit_identical_noop() {
        let mut odom = from_zero();
        odom.update(&sample(3, 9, 0.01, 0.5)).unwrap();
        let before = *odom.state();

        let err = odom.update(&sample(8, 12, f64::NAN, 0.5)).unwrap_err();
        assert!(matches!(err, OdometryError::InvalidSample(_)));
        let after = *odom.state();
        assert_eq!(after.x.to_bits(), before.x.to_bits());
        assert_eq!(after.y.to_bits(), before.y.to_bits());
        assert_eq!(after.heading.to_bits(), before.heading.to_bits());
        assert_eq!(after, before);
    }

    #[test]
    fn backwards_counter_resynchronises() {
        let mut odom = from_zero();
        odom.update(&sample(20, 10, 0.01, 0.5)).unwrap();
        let before = *odom.state();

        let err = odom.update(&sample(5, 12, 0.01, 0.5)).unwrap_err();
        assert_eq!(
            err,
            OdometryError::EncoderDiscontinuity {
                wheel: Wheel::Left,
                previous: 20,
                current: 5
            }
        );
        let after = *odom.state();
        assert_eq!(after.last_left_count, 5);
        assert_eq!(after.last_right_count, 12);
        assert_eq!(after.pose(), before.pose());

        // integration resumes from the new baseline
        let est = odom.update(&sample(15, 22, 0.01, 0.5)).unwrap();
        assert_relative_eq!(est.heading, before.heading, epsilon = 1e-12);
        assert_relative_eq!(
            est.x,
            before.x + 0.1 * before.heading.cos(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn discontinuity_keeps_last_successful_update_time() {
        let mut odom = from_zero();
        let mut first = sample(20, 10, 0.01, 0.5);
        first.timestamp = Stamp::new(3, 0);
        odom.update(&first).unwrap();

        let mut reset = sample(1, 1, 0.01, 0.5);
        reset.timestamp = Stamp::new(4, 0);
        assert!(odom.update(&reset).is_err());
        assert_eq!(odom.state().last_update_time, Stamp::new(3, 0));
        assert_eq!(odom.state().last_left_count, 1);
    }

    #[test]
    fn oversized_hand_built_counts_are_rejected() {
        let mut odom = from_zero();
        odom.update(&sample(10, 10, 0.01, 0.5)).unwrap();
        let before = *odom.state();

        let err = odom
            .update(&sample(i64::MAX, i64::MAX, 0.01, 0.5))
            .unwrap_err();
        assert!(matches!(
            err,
            OdometryError::InvalidSample(SampleFault::CountOutOfRange { .. })
        ));
        assert_eq!(*odom.state(), before);
    }

    #[test]
    fn oversized_resumed_baseline_does_not_overflow() {
        let mut odom = OdometryEstimator::from_state(EstimatorState {
            last_left_count: i64::MIN,
            ..EstimatorState::at_origin(Stamp::default())
        });
        let before = *odom.state();

        let err = odom.update(&sample(100, 100, 0.01, 0.5)).unwrap_err();
        assert!(matches!(
            err,
            OdometryError::InvalidSample(SampleFault::CountOutOfRange {
                field: "left_count",
                ..
            })
        ));
        assert_eq!(*odom.state(), before);
    }

    #[test]
    fn right_wheel_discontinuity_is_named() {
        let mut odom = from_zero();
        odom.update(&sample(10, 10, 0.01, 0.5)).unwrap();
        let err = odom.update(&sample(11, 2, 0.01, 0.5)).unwrap_err();
        assert!(matches!(
            err,
            OdometryError::EncoderDiscontinuity {
                wheel: Wheel::Right,
                previous: 10,
                current: 2
            }
        ));
    }

    #[test]
    fn heading_is_not_wrapped() {
        let mut odom = from_zero();
        for _ in 0..10 {
            let right = odom.state().last_right_count + 100;
            odom.update(&sample(0, right, 0.01, 0.5)).unwrap();
        }
        // ten steps of +2 rad
        assert_relative_eq!(odom.state().heading, 20.0, epsilon = 1e-9);
    }
}
