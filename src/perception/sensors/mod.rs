//! Encoder sample intake
//!
//! The microcontroller feed delivers each reading as a flat array of six
//! numbers:
//!
//! | index | field                  |
//! |-------|------------------------|
//! | 0     | linear velocity hint   |
//! | 1     | angular velocity hint  |
//! | 2     | left encoder count     |
//! | 3     | right encoder count    |
//! | 4     | tick to distance rate  |
//! | 5     | wheel base             |
//!
//! [`EncoderSample::from_fields`] checks arity, finiteness and that both
//! counts are whole numbers before anything reaches the estimator.

use crate::common::types::Stamp;
use crate::error::SampleFault;

/// Number of fields in a raw encoder message
pub const SAMPLE_FIELDS: usize = 6;

/// Largest integer magnitude an `f64` represents exactly (2^53)
const MAX_EXACT_COUNT: f64 = 9_007_199_254_740_992.0;

const FIELD_NAMES: [&str; SAMPLE_FIELDS] = [
    "linear_velocity_hint",
    "angular_velocity_hint",
    "left_count",
    "right_count",
    "tick_to_distance_rate",
    "wheel_base",
];

/// One validated encoder reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderSample {
    pub linear_velocity_hint: f64,
    pub angular_velocity_hint: f64,
    pub left_count: i64,
    pub right_count: i64,
    /// Meters travelled per encoder tick
    pub tick_to_distance_rate: f64,
    /// Lateral distance between the wheel contact points, meters
    pub wheel_base: f64,
    /// Capture time of the reading
    pub timestamp: Stamp,
}

impl EncoderSample {
    /// Parse a raw feed message captured at `timestamp`
    pub fn from_fields(fields: &[f64], timestamp: Stamp) -> Result<Self, SampleFault> {
        if fields.len() != SAMPLE_FIELDS {
            return Err(SampleFault::WrongArity {
                expected: SAMPLE_FIELDS,
                found: fields.len(),
            });
        }

        for (&field, &value) in FIELD_NAMES.iter().zip(fields) {
            if !value.is_finite() {
                return Err(SampleFault::NonFinite { field, value });
            }
        }

        Ok(EncoderSample {
            linear_velocity_hint: fields[0],
            angular_velocity_hint: fields[1],
            left_count: count_from_field(FIELD_NAMES[2], fields[2])?,
            right_count: count_from_field(FIELD_NAMES[3], fields[3])?,
            tick_to_distance_rate: fields[4],
            wheel_base: fields[5],
            timestamp,
        })
    }

    /// Check an already constructed sample: finite floats, counts within 2^53
    pub fn validate(&self) -> Result<(), SampleFault> {
        let floats = [
            (FIELD_NAMES[0], self.linear_velocity_hint),
            (FIELD_NAMES[1], self.angular_velocity_hint),
            (FIELD_NAMES[4], self.tick_to_distance_rate),
            (FIELD_NAMES[5], self.wheel_base),
        ];
        if let Some(&(field, value)) = floats.iter().find(|(_, value)| !value.is_finite()) {
            return Err(SampleFault::NonFinite { field, value });
        }

        let counts = [
            (FIELD_NAMES[2], self.left_count),
            (FIELD_NAMES[3], self.right_count),
        ];
        match counts
            .iter()
            .find(|(_, count)| count.unsigned_abs() > MAX_EXACT_COUNT as u64)
        {
            Some(&(field, count)) => Err(SampleFault::CountOutOfRange {
                field,
                value: count as f64,
            }),
            None => Ok(()),
        }
    }
}

fn count_from_field(field: &'static str, value: f64) -> Result<i64, SampleFault> {
    if value.fract() != 0.0 {
        return Err(SampleFault::FractionalCount { field, value });
    }
    if value.abs() > MAX_EXACT_COUNT {
        return Err(SampleFault::CountOutOfRange { field, value });
    }
    Ok(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp() -> Stamp {
        Stamp::new(12, 500)
    }

    #[test]
    fn parses_well_formed_message() {
        let sample =
            EncoderSample::from_fields(&[0.2, -0.1, 120.0, 118.0, 0.01, 0.5], stamp()).unwrap();
        assert_eq!(sample.linear_velocity_hint, 0.2);
        assert_eq!(sample.angular_velocity_hint, -0.1);
        assert_eq!(sample.left_count, 120);
        assert_eq!(sample.right_count, 118);
        assert_eq!(sample.tick_to_distance_rate, 0.01);
        assert_eq!(sample.wheel_base, 0.5);
        assert_eq!(sample.timestamp, stamp());
    }

    #[test]
    fn rejects_short_and_long_messages() {
        let short = EncoderSample::from_fields(&[0.0, 0.0, 1.0, 1.0, 0.01], stamp());
        assert_eq!(
            short,
            Err(SampleFault::WrongArity {
                expected: 6,
                found: 5
            })
        );

        let long = EncoderSample::from_fields(&[0.0; 7], stamp());
        assert!(matches!(long, Err(SampleFault::WrongArity { found: 7, .. })));
    }

    #[test]
    fn rejects_non_finite_fields_by_name() {
        let err = EncoderSample::from_fields(&[0.0, 0.0, 1.0, 1.0, f64::INFINITY, 0.5], stamp())
            .unwrap_err();
        assert!(matches!(
            err,
            SampleFault::NonFinite {
                field: "tick_to_distance_rate",
                ..
            }
        ));

        let err =
            EncoderSample::from_fields(&[f64::NAN, 0.0, 1.0, 1.0, 0.01, 0.5], stamp()).unwrap_err();
        assert!(matches!(
            err,
            SampleFault::NonFinite {
                field: "linear_velocity_hint",
                ..
            }
        ));
    }

    #[test]
    fn rejects_fractional_and_oversized_counts() {
        let err =
            EncoderSample::from_fields(&[0.0, 0.0, 1.5, 1.0, 0.01, 0.5], stamp()).unwrap_err();
        assert_eq!(
            err,
            SampleFault::FractionalCount {
                field: "left_count",
                value: 1.5
            }
        );

        let err =
            EncoderSample::from_fields(&[0.0, 0.0, 1.0, 1e17, 0.01, 0.5], stamp()).unwrap_err();
        assert!(matches!(
            err,
            SampleFault::CountOutOfRange {
                field: "right_count",
                ..
            }
        ));
    }

    #[test]
    fn zero_wheel_base_passes_the_boundary() {
        // Geometry is the estimator's concern, not the parser's
        let sample = EncoderSample::from_fields(&[0.0, 0.0, 1.0, 1.0, 0.01, 0.0], stamp());
        assert!(sample.is_ok());
    }

    #[test]
    fn validate_flags_hand_built_oversized_count() {
        let sample = EncoderSample {
            linear_velocity_hint: 0.0,
            angular_velocity_hint: 0.0,
            left_count: 7,
            right_count: i64::MIN,
            tick_to_distance_rate: 0.01,
            wheel_base: 0.5,
            timestamp: stamp(),
        };
        assert!(matches!(
            sample.validate(),
            Err(SampleFault::CountOutOfRange {
                field: "right_count",
                ..
            })
        ));
    }

    #[test]
    fn validate_flags_hand_built_nan() {
        let sample = EncoderSample {
            linear_velocity_hint: 0.0,
            angular_velocity_hint: f64::NAN,
            left_count: 0,
            right_count: 0,
            tick_to_distance_rate: 0.01,
            wheel_base: 0.5,
            timestamp: stamp(),
        };
        assert!(matches!(
            sample.validate(),
            Err(SampleFault::NonFinite {
                field: "angular_velocity_hint",
                ..
            })
        ));
    }
}
