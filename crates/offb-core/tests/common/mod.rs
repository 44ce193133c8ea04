#![allow(dead_code)]

use std::time::Duration;

use offb_core::control::{self, ControlLoop, InboundTx};
use offb_core::link::{ArmResponse, FlightLink, LinkError, SetModeResponse};
use offb_core::monitor::VehicleStatus;
use offb_core::setpoint::{AttitudeSetpoint, ThrustSetpoint};
use offb_core::BridgeConfig;
use tokio::time::Instant;

pub const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetMode(String),
    Arm(bool),
}

/// In-memory flight controller: records everything, answers as configured.
#[derive(Debug, Default)]
pub struct RecordingLink {
    pub attitudes: Vec<AttitudeSetpoint>,
    pub thrusts: Vec<ThrustSetpoint>,
    pub calls: Vec<(Instant, Call)>,
    pub mode_sent: bool,
    pub arm_success: bool,
    pub fail: bool,
    pub hang: bool,
}

impl FlightLink for RecordingLink {
    fn publish_attitude(&mut self, sp: &AttitudeSetpoint) -> Result<(), LinkError> {
        self.attitudes.push(*sp);
        Ok(())
    }

    fn publish_thrust(&mut self, sp: &ThrustSetpoint) -> Result<(), LinkError> {
        self.thrusts.push(*sp);
        Ok(())
    }

    async fn set_mode(&mut self, custom_mode: &str) -> Result<SetModeResponse, LinkError> {
        self.calls.push((Instant::now(), Call::SetMode(custom_mode.to_string())));
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.fail {
            return Err(LinkError::Send("link down".into()));
        }
        Ok(SetModeResponse { mode_sent: self.mode_sent })
    }

    async fn arm(&mut self, value: bool) -> Result<ArmResponse, LinkError> {
        self.calls.push((Instant::now(), Call::Arm(value)));
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.fail {
            return Err(LinkError::Send("link down".into()));
        }
        Ok(ArmResponse { success: self.arm_success })
    }
}

pub fn status(mode: &str, armed: bool) -> VehicleStatus {
    VehicleStatus { connected: true, armed, mode: mode.to_string() }
}

/// Loop already past a one-tick warm-up, one tick period after it.
pub async fn steady_loop(
    link: RecordingLink,
    initial: VehicleStatus,
) -> (ControlLoop<RecordingLink>, InboundTx) {
    let (tx, rx) = control::channel(10);
    let cfg = BridgeConfig { warmup_ticks: 1, ..BridgeConfig::default() };
    let mut lp = ControlLoop::new(cfg, link, rx);
    tx.status.send(initial).await.unwrap();
    lp.tick().await;
    tokio::time::advance(TICK).await;
    (lp, tx)
}
