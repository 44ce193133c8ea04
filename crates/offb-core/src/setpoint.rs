use nalgebra::UnitQuaternion;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeSetpoint {
    pub stamp: Instant,
    pub orientation: UnitQuaternion<f32>,
}

impl AttitudeSetpoint {
    /// Yaw of the orientation, wrapped to (-pi, pi].
    pub fn yaw(&self) -> f32 {
        self.orientation.euler_angles().2
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrustSetpoint {
    pub stamp: Instant,
    pub thrust: f32,
}

/// Builds level, heading-only attitude setpoints and the matching thrust.
///
/// Thrust is the commanded forward speed passed through as-is; there is no
/// thrust curve.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetpointEncoder;

impl SetpointEncoder {
    pub fn encode(
        &self,
        effective_speed: f32,
        heading: f32,
        now: Instant,
    ) -> (AttitudeSetpoint, ThrustSetpoint) {
        let attitude = AttitudeSetpoint {
            stamp: now,
            orientation: UnitQuaternion::from_euler_angles(0.0, 0.0, heading),
        };
        let thrust = ThrustSetpoint { stamp: now, thrust: effective_speed };
        (attitude, thrust)
    }

    pub fn idle(&self, now: Instant) -> (AttitudeSetpoint, ThrustSetpoint) {
        self.encode(0.0, 0.0, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    #[test]
    fn idle_is_identity_and_zero_thrust() {
        let now = Instant::now();
        let (att, thr) = SetpointEncoder.idle(now);
        assert_eq!(att.orientation, UnitQuaternion::identity());
        assert_eq!(thr.thrust, 0.0);
        assert_eq!(att.stamp, now);
        assert_eq!(thr.stamp, now);
    }

    #[test]
    fn heading_maps_to_yaw_only_quaternion() {
        let (att, _) = SetpointEncoder.encode(1.0, FRAC_PI_2, Instant::now());
        let q = att.orientation.quaternion();
        assert!((q.w - FRAC_PI_4.cos()).abs() < 1e-6);
        assert!(q.i.abs() < 1e-6);
        assert!(q.j.abs() < 1e-6);
        assert!((q.k - FRAC_PI_4.sin()).abs() < 1e-6);

        let (roll, pitch, yaw) = att.orientation.euler_angles();
        assert!(roll.abs() < 1e-6 && pitch.abs() < 1e-6);
        assert!((yaw - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn unbounded_heading_wraps_in_the_quaternion() {
        let now = Instant::now();
        let (a, _) = SetpointEncoder.encode(0.0, 0.5 + 4.0 * PI, now);
        let (b, _) = SetpointEncoder.encode(0.0, 0.5, now);
        let (qa, qb) = (a.orientation.quaternion(), b.orientation.quaternion());
        assert!((qa.w - qb.w).abs() < 1e-4);
        assert!((qa.k - qb.k).abs() < 1e-4);
        assert!((a.yaw() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn thrust_is_speed_passthrough() {
        let now = Instant::now();
        for speed in [-1.5_f32, 0.0, 0.42, 2.0, 17.0] {
            assert_eq!(SetpointEncoder.encode(speed, 0.1, now).1.thrust, speed);
        }
    }
}
