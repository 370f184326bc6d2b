use anyhow::Result;
use encoder_odometry::{
    common::types::Stamp,
    lifecycle::LifecycleNode,
    logging::{self, LevelFilter},
    messages::{self, FrameIds},
    BaselinePolicy, OdometryStack,
};
use log::info;
use std::time::{SystemTime, UNIX_EPOCH};

const RATE: f64 = 0.01;
const WHEEL_BASE: f64 = 0.5;

fn wall_clock() -> Stamp {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default();
    Stamp::from_nanos(nanos)
}

/// A short drive: forward, a left arc, a counter reset, a bad message, forward again
fn script() -> Vec<Vec<f64>> {
    let mut samples = Vec::new();
    let (mut left, mut right) = (1000.0, 1000.0);

    samples.push(vec![0.0, 0.0, left, right, RATE, WHEEL_BASE]);
    for _ in 0..5 {
        left += 20.0;
        right += 20.0;
        samples.push(vec![0.2, 0.0, left, right, RATE, WHEEL_BASE]);
    }
    for _ in 0..5 {
        left += 10.0;
        right += 25.0;
        samples.push(vec![0.17, 0.3, left, right, RATE, WHEEL_BASE]);
    }

    // controller restart
    left = 0.0;
    right = 0.0;
    samples.push(vec![0.0, 0.0, left, right, RATE, WHEEL_BASE]);
    samples.push(vec![0.0, 0.0, left, right, RATE]);
    samples.push(vec![0.0, 0.0, left + 5.0, right + 5.0, RATE, 0.0]);

    for _ in 0..5 {
        left += 20.0;
        right += 20.0;
        samples.push(vec![0.2, 0.0, left, right, RATE, WHEEL_BASE]);
    }
    samples
}

fn main() -> Result<()> {
    logging::logger_init(LevelFilter::Info)?;

    let mut stack = OdometryStack::new(BaselinePolicy::SeedFromFirstSample, wall_clock);
    stack.on_configure()?;
    stack.on_activate()?;

    let frames = FrameIds::default();
    for (i, fields) in script().iter().enumerate() {
        let stamp = Stamp::new(i as i32, 0);
        if let Ok(estimate) = stack.process_fields(fields, stamp) {
            let odom = messages::odometry_msg(&estimate, &frames);
            info!(
                "#{:02} x={:.3} y={:.3} heading={:.3} q=({:.3}, {:.3}) v={:.2} w={:.2}",
                i,
                odom.pose.pose.position.x,
                odom.pose.pose.position.y,
                estimate.heading,
                odom.pose.pose.orientation.z,
                odom.pose.pose.orientation.w,
                odom.twist.twist.linear.x,
                odom.twist.twist.angular.z
            );
        }
    }

    stack.on_deactivate()?;
    stack.on_cleanup()?;
    stack.on_shutdown()?;
    Ok(())
}
