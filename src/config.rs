//! Runtime configuration for the odometry publisher
//!
//! Every field maps one-to-one onto a ROS parameter of the same name, see
//! `config/odometry_params.yaml`.

use crate::common::frames;
use crate::error::ConfigError;
use crate::perception::odometry::BaselinePolicy;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct OdometryConfig {
    /// Topic carrying the raw `Float64MultiArray` encoder feed
    pub input_topic: String,
    pub odom_topic: String,
    pub tf_topic: String,
    pub odom_frame: String,
    pub base_frame: String,
    pub publish_tf: bool,
    /// Wait before spinning, in seconds
    pub startup_delay_secs: f64,
    /// Use the first sample as the encoder baseline instead of zero
    pub seed_from_first_sample: bool,
}

impl Default for OdometryConfig {
    fn default() -> Self {
        OdometryConfig {
            input_topic: "/arduino/data".to_string(),
            odom_topic: "/odom".to_string(),
            tf_topic: "/tf".to_string(),
            odom_frame: frames::ODOM.to_string(),
            base_frame: frames::BASE_LINK.to_string(),
            publish_tf: true,
            startup_delay_secs: 1.0,
            seed_from_first_sample: true,
        }
    }
}

impl OdometryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("input_topic", &self.input_topic),
            ("odom_topic", &self.odom_topic),
            ("tf_topic", &self.tf_topic),
            ("odom_frame", &self.odom_frame),
            ("base_frame", &self.base_frame),
        ];
        if let Some(&(param, _)) = names.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Empty(param));
        }
        if self.odom_frame == self.base_frame {
            return Err(ConfigError::SameFrames(self.odom_frame.clone()));
        }
        if !self.startup_delay_secs.is_finite() || self.startup_delay_secs < 0.0 {
            return Err(ConfigError::InvalidStartupDelay(self.startup_delay_secs));
        }
        Ok(())
    }

    pub fn baseline_policy(&self) -> BaselinePolicy {
        if self.seed_from_first_sample {
            BaselinePolicy::SeedFromFirstSample
        } else {
            BaselinePolicy::StartFromZero
        }
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs_f64(self.startup_delay_secs)
    }
}
