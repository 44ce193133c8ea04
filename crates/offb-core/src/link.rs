//! Seam between the control loop and whatever carries its messages to the
//! flight controller.

use std::future::Future;
use thiserror::Error;

use crate::setpoint::{AttitudeSetpoint, ThrustSetpoint};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("flight controller not connected")]
    Disconnected,

    #[error("timeout waiting for {0}")]
    Timeout(&'static str),

    #[error("send failed: {0}")]
    Send(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetModeResponse {
    pub mode_sent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmResponse {
    pub success: bool,
}

/// Publish and request/response primitives the loop needs from its transport.
///
/// Each tick publishes its attitude first and then its thrust; a transport may
/// hold the attitude and send both together.
///
/// Publishing is fire-and-forget. Requests resolve once the flight controller
/// answered or the transport gave up; the caller bounds them with its own timeout.
pub trait FlightLink {
    fn publish_attitude(&mut self, sp: &AttitudeSetpoint) -> Result<(), LinkError>;

    fn publish_thrust(&mut self, sp: &ThrustSetpoint) -> Result<(), LinkError>;

    fn set_mode(
        &mut self,
        custom_mode: &str,
    ) -> impl Future<Output = Result<SetModeResponse, LinkError>> + Send;

    fn arm(&mut self, value: bool) -> impl Future<Output = Result<ArmResponse, LinkError>> + Send;
}
