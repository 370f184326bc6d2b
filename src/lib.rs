//! Wheel-encoder dead-reckoning odometry for differential-drive robots
//!
//! The numeric core lives in [`perception::odometry`]; [`messages`] turns its
//! estimates into `nav_msgs/Odometry` and `/tf` messages for the ROS 2 node.
pub mod common;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod messages;
pub mod perception;

pub use crate::config::OdometryConfig;
pub use crate::error::{ErrorKind, OdometryError, SampleFault};
pub use crate::perception::odometry::{
    BaselinePolicy, EstimatorState, OdometryEstimator, PoseEstimate,
};
pub use crate::perception::sensors::EncoderSample;
pub use crate::perception::{OdometryStack, SampleStats};
