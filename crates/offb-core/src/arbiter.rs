//! Offboard/arm handshake.
//!
//! PX4 only accepts OFFBOARD once it already receives a setpoint stream, so the
//! machine goes WAIT_CONNECTION -> WARMUP (idle stream) -> STEADY, and in STEADY
//! keeps asking for the mode and then for arming until both stick. Mode and arm
//! requests share a single cooldown timer.

use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{info, warn};

use crate::link::{FlightLink, LinkError};
use crate::monitor::VehicleStatus;
use crate::BridgeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitConnection,
    Warmup,
    Steady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    SetMode,
    Arm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestResult {
    Accepted,
    Rejected,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub kind: RequestKind,
    pub result: RequestResult,
}

#[derive(Debug)]
pub struct ModeArbiter {
    phase: Phase,
    warmup_ticks: u32,
    warmup_sent: u32,
    offboard_mode: String,
    cooldown: Duration,
    request_timeout: Duration,
    last_request: Option<Instant>,
}

impl ModeArbiter {
    pub fn new(cfg: &BridgeConfig) -> Self {
        Self {
            phase: Phase::WaitConnection,
            warmup_ticks: cfg.warmup_ticks,
            warmup_sent: 0,
            offboard_mode: cfg.offboard_mode.clone(),
            cooldown: cfg.request_cooldown(),
            request_timeout: cfg.request_timeout(),
            last_request: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn warmup_sent(&self) -> u32 {
        self.warmup_sent
    }

    /// When the last request attempt completed.
    pub fn last_request(&self) -> Option<Instant> {
        self.last_request
    }

    /// Leaves WAIT_CONNECTION on the first connected status.
    pub fn observe_connection(&mut self, status: &VehicleStatus) -> Phase {
        if self.phase == Phase::WaitConnection && status.connected {
            info!(
                "arbiter: FC connected (mode={:?}, armed={}), streaming {} idle setpoints",
                status.mode, status.armed, self.warmup_ticks
            );
            self.phase = if self.warmup_ticks == 0 { Phase::Steady } else { Phase::Warmup };
        }
        self.phase
    }

    /// Counts one idle setpoint published during WARMUP.
    pub fn record_warmup(&mut self) {
        if self.phase != Phase::Warmup {
            return;
        }
        self.warmup_sent += 1;
        if self.warmup_sent >= self.warmup_ticks {
            info!("arbiter: warm-up done after {} setpoints", self.warmup_sent);
            self.phase = Phase::Steady;
        }
    }

    fn cooled_down(&self, now: Instant) -> bool {
        match self.last_request {
            Some(t) => now.saturating_duration_since(t) >= self.cooldown,
            None => true,
        }
    }

    /// STEADY step: at most one request per call, none while cooling down.
    pub async fn evaluate<L: FlightLink>(
        &mut self,
        status: &VehicleStatus,
        link: &mut L,
        now: Instant,
    ) -> Option<RequestOutcome> {
        if self.phase != Phase::Steady || !self.cooled_down(now) {
            return None;
        }

        let outcome = if status.mode != self.offboard_mode {
            let res = bounded(self.request_timeout, "set_mode response", link.set_mode(&self.offboard_mode)).await;
            let result = match res {
                Ok(r) if r.mode_sent => {
                    info!("arbiter: {} enabled", self.offboard_mode);
                    RequestResult::Accepted
                }
                Ok(_) => {
                    warn!("arbiter: {} request not accepted (mode={:?})", self.offboard_mode, status.mode);
                    RequestResult::Rejected
                }
                Err(e) => {
                    warn!("arbiter: {} request failed: {}", self.offboard_mode, e);
                    RequestResult::Failed(e.to_string())
                }
            };
            RequestOutcome { kind: RequestKind::SetMode, result }
        } else if !status.armed {
            let result = match bounded(self.request_timeout, "arm response", link.arm(true)).await {
                Ok(r) if r.success => {
                    info!("arbiter: vehicle armed");
                    RequestResult::Accepted
                }
                Ok(_) => {
                    warn!("arbiter: arm request rejected");
                    RequestResult::Rejected
                }
                Err(e) => {
                    warn!("arbiter: arm request failed: {}", e);
                    RequestResult::Failed(e.to_string())
                }
            };
            RequestOutcome { kind: RequestKind::Arm, result }
        } else {
            return None;
        };

        // cooldown counts from completion of the attempt
        self.last_request = Some(Instant::now());
        Some(outcome)
    }
}

async fn bounded<T>(
    limit: Duration,
    what: &'static str,
    fut: impl Future<Output = Result<T, LinkError>>,
) -> Result<T, LinkError> {
    match timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(LinkError::Timeout(what)),
    }
}
