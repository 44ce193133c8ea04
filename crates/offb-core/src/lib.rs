pub mod arbiter;
pub mod control;
pub mod doctor;
pub mod ingest;
pub mod link;
pub mod monitor;
pub mod setpoint;
pub mod yaw;

pub use control::{ControlLoop, InboundRx, InboundTx, TickReport};
pub use link::{ArmResponse, FlightLink, LinkError, SetModeResponse};

use serde::Deserialize;
use std::time::Duration;

use crate::yaw::YawConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Setpoint publish rate. PX4 leaves offboard when the stream drops below 2 Hz.
    pub rate_hz: f32,

    /// A velocity command older than this is replaced by zero.
    pub stale_after_ms: u64,

    /// Idle setpoints streamed after connect, before the first mode request.
    pub warmup_ticks: u32,

    /// Minimum spacing between two mode/arm requests (shared timer).
    pub request_cooldown_s: f32,

    /// Upper bound on one mode/arm request round trip.
    pub request_timeout_s: f32,

    /// Custom mode name requested from the FC.
    pub offboard_mode: String,

    pub yaw: YawConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            rate_hz: 20.0,
            stale_after_ms: 500,
            warmup_ticks: 100,
            request_cooldown_s: 5.0,
            request_timeout_s: 3.0,
            offboard_mode: "OFFBOARD".to_string(),
            yaw: YawConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Clamped to 2..=1000 Hz.
    pub fn tick_period(&self) -> Duration {
        let hz = f64::from(self.rate_hz.max(2.0).min(1000.0));
        Duration::from_secs_f64(1.0 / hz)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    pub fn request_cooldown(&self) -> Duration {
        secs(self.request_cooldown_s)
    }

    pub fn request_timeout(&self) -> Duration {
        secs(self.request_timeout_s)
    }
}

/// Negative and NaN become zero, out-of-range values saturate.
fn secs(s: f32) -> Duration {
    Duration::try_from_secs_f32(s.max(0.0)).unwrap_or(Duration::MAX)
}
