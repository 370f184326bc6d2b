//! Conversions between odometry types and ROS messages

use crate::common::types::{QuaternionXyzw, Stamp};
use crate::perception::odometry::PoseEstimate;

use builtin_interfaces::msg::Time;
use geometry_msgs::msg::{Quaternion, TransformStamped};
use nav_msgs::msg::Odometry;
use std_msgs::msg::Header;
use tf2_msgs::msg::TFMessage;

/// Parent and child frame of the published pose
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameIds {
    pub odom: String,
    pub base: String,
}

impl Default for FrameIds {
    fn default() -> Self {
        FrameIds {
            odom: crate::common::frames::ODOM.to_string(),
            base: crate::common::frames::BASE_LINK.to_string(),
        }
    }
}

impl From<Stamp> for Time {
    fn from(stamp: Stamp) -> Self {
        Time {
            sec: stamp.sec,
            nanosec: stamp.nanosec,
        }
    }
}

impl From<Time> for Stamp {
    fn from(time: Time) -> Self {
        Stamp::new(time.sec, time.nanosec)
    }
}

fn quaternion_msg(q: &QuaternionXyzw) -> Quaternion {
    let mut msg = Quaternion::default();
    msg.x = q.x;
    msg.y = q.y;
    msg.z = q.z;
    msg.w = q.w;
    msg
}

fn header(stamp: Stamp, frame_id: &str) -> Header {
    let mut header = Header::default();
    header.stamp = stamp.into();
    header.frame_id = frame_id.to_string();
    header
}

/// Pose and twist record for the navigation stack
pub fn odometry_msg(estimate: &PoseEstimate, frames: &FrameIds) -> Odometry {
    let mut odom = Odometry::default();
    odom.header = header(estimate.timestamp, &frames.odom);
    odom.child_frame_id = frames.base.clone();

    odom.pose.pose.position.x = estimate.x;
    odom.pose.pose.position.y = estimate.y;
    odom.pose.pose.position.z = 0.0;
    odom.pose.pose.orientation = quaternion_msg(&estimate.orientation);

    odom.twist.twist.linear.x = estimate.linear_velocity;
    odom.twist.twist.angular.z = estimate.angular_velocity;
    odom
}

/// `odom -> base_link` transform for the same estimate
pub fn transform_msg(estimate: &PoseEstimate, frames: &FrameIds) -> TransformStamped {
    let mut tf = TransformStamped::default();
    tf.header = header(estimate.timestamp, &frames.odom);
    tf.child_frame_id = frames.base.clone();

    tf.transform.translation.x = estimate.x;
    tf.transform.translation.y = estimate.y;
    tf.transform.translation.z = 0.0;
    tf.transform.rotation = quaternion_msg(&estimate.orientation);
    tf
}

/// Wrap the transform for publication on `/tf`
pub fn tf_message(estimate: &PoseEstimate, frames: &FrameIds) -> TFMessage {
    let mut msg = TFMessage::default();
    msg.transforms = vec![transform_msg(estimate, frames)];
    msg
}
