//! Common utilities and types for the odometry publisher

/// Frame identifiers used on the outbound messages
pub mod frames {
    /// Dead-reckoning frame, origin at the pose the estimator started from
    pub const ODOM: &str = "odom";

    /// Frame rigidly attached to the robot chassis
    pub const BASE_LINK: &str = "base_link";
}

/// Common types and utilities used across the codebase
pub mod types {
    use nalgebra::UnitQuaternion;

    /// A planar pose in the odometry frame
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Pose2D {
        pub x: f64,
        pub y: f64,
        pub heading: f64,
    }

    impl Pose2D {
        pub fn new(x: f64, y: f64, heading: f64) -> Self {
            Pose2D { x, y, heading }
        }

        pub fn origin() -> Self {
            Self::default()
        }
    }

    /// A point in time, split the same way as `builtin_interfaces/Time`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct Stamp {
        pub sec: i32,
        pub nanosec: u32,
    }

    impl Stamp {
        const NANOS_PER_SEC: i64 = 1_000_000_000;

        pub fn new(sec: i32, nanosec: u32) -> Self {
            Stamp { sec, nanosec }
        }

        /// Build a stamp from signed nanoseconds since the clock epoch
        ///
        /// Seconds outside the `i32` range saturate to the nearest representable stamp.
        pub fn from_nanos(nanos: i64) -> Self {
            let sec = nanos.div_euclid(Self::NANOS_PER_SEC);
            match i32::try_from(sec) {
                Ok(sec) => Stamp {
                    sec,
                    nanosec: nanos.rem_euclid(Self::NANOS_PER_SEC) as u32,
                },
                Err(_) if sec > 0 => Stamp::new(i32::MAX, (Self::NANOS_PER_SEC - 1) as u32),
                Err(_) => Stamp::new(i32::MIN, 0),
            }
        }

        pub fn as_nanos(&self) -> i64 {
            self.sec as i64 * Self::NANOS_PER_SEC + self.nanosec as i64
        }
    }

    /// Quaternion components in ROS order `(x, y, z, w)`
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct QuaternionXyzw {
        pub x: f64,
        pub y: f64,
        pub z: f64,
        pub w: f64,
    }

    impl QuaternionXyzw {
        /// Rotation about the vertical axis only (roll = pitch = 0)
        pub fn from_yaw(yaw: f64) -> Self {
            let q = UnitQuaternion::from_euler_angles(0.0, 0.0, yaw);
            QuaternionXyzw {
                x: q.i,
                y: q.j,
                z: q.k,
                w: q.w,
            }
        }

        /// Recover the yaw angle, wrapped to [-pi, pi]
        pub fn yaw(&self) -> f64 {
            let q = UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(
                self.w, self.x, self.y, self.z,
            ));
            q.euler_angles().2
        }
    }

    /// Wrap an angle to [-pi, pi]
    pub fn normalize_angle(angle: f64) -> f64 {
        angle.sin().atan2(angle.cos())
    }
}
