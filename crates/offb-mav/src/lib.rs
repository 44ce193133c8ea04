pub mod doctor;
pub mod link;
pub mod px4;
pub mod state;

pub use link::MavFlightLink;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MavConfig {
    /// mavlink::connect address. Examples:
    /// "udpin:0.0.0.0:14540" (PX4 SITL offboard port), "serial:/dev/ttyACM0:57600"
    pub connection: String,

    /// MAVLink ids we use (companion side)
    pub sys_id: u8,
    pub comp_id: u8,

    /// target system/component (FC side). 1/1 is the PX4 default.
    pub target_sys: u8,
    pub target_comp: u8,

    /// FC is reported disconnected after this long without a heartbeat
    pub heartbeat_timeout_ms: u64,

    /// Companion heartbeat send rate. Default 1 Hz.
    pub send_heartbeat_hz: f32,

    /// How long a COMMAND_LONG waits for its COMMAND_ACK
    pub ack_timeout_ms: u64,
}

impl Default for MavConfig {
    fn default() -> Self {
        Self {
            connection: "udpin:0.0.0.0:14540".to_string(),
            sys_id: 1,
            comp_id: 191,
            target_sys: 1,
            target_comp: 1,
            heartbeat_timeout_ms: 1500,
            send_heartbeat_hz: 1.0,
            ack_timeout_ms: 1500,
        }
    }
}
