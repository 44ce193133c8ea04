use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::arbiter::{ModeArbiter, Phase, RequestOutcome};
use crate::ingest::{CommandIngest, Twist};
use crate::link::FlightLink;
use crate::monitor::{ConnectionMonitor, VehicleStatus};
use crate::setpoint::{AttitudeSetpoint, SetpointEncoder, ThrustSetpoint};
use crate::yaw::YawIntegrator;
use crate::BridgeConfig;

/// Producer side of the loop's inbound queues.
#[derive(Debug, Clone)]
pub struct InboundTx {
    pub status: mpsc::Sender<VehicleStatus>,
    pub commands: mpsc::Sender<Twist>,
}

/// Consumer side; drained by the loop once per tick.
#[derive(Debug)]
pub struct InboundRx {
    pub status: mpsc::Receiver<VehicleStatus>,
    pub commands: mpsc::Receiver<Twist>,
}

pub fn channel(capacity: usize) -> (InboundTx, InboundRx) {
    let (status_tx, status_rx) = mpsc::channel(capacity);
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
    (
        InboundTx { status: status_tx, commands: cmd_tx },
        InboundRx { status: status_rx, commands: cmd_rx },
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub phase: Phase,
    pub published: Option<(AttitudeSetpoint, ThrustSetpoint)>,
    pub request: Option<RequestOutcome>,
}

pub struct ControlLoop<L> {
    cfg: BridgeConfig,
    link: L,
    inbound: InboundRx,
    monitor: ConnectionMonitor,
    ingest: CommandIngest,
    yaw: YawIntegrator,
    encoder: SetpointEncoder,
    arbiter: ModeArbiter,
    was_stale: bool,
}

impl<L: FlightLink> ControlLoop<L> {
    pub fn new(cfg: BridgeConfig, link: L, inbound: InboundRx) -> Self {
        Self {
            ingest: CommandIngest::new(cfg.stale_after()),
            yaw: YawIntegrator::new(cfg.yaw.clone()),
            arbiter: ModeArbiter::new(&cfg),
            monitor: ConnectionMonitor::new(),
            encoder: SetpointEncoder,
            was_stale: true,
            cfg,
            link,
            inbound,
        }
    }

    pub fn phase(&self) -> Phase {
        self.arbiter.phase()
    }

    pub fn heading(&self) -> f32 {
        self.yaw.heading()
    }

    pub fn monitor(&self) -> &ConnectionMonitor {
        &self.monitor
    }

    pub fn ingest(&self) -> &CommandIngest {
        &self.ingest
    }

    pub fn arbiter(&self) -> &ModeArbiter {
        &self.arbiter
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    fn drain(&mut self, now: Instant) {
        while let Ok(status) = self.inbound.status.try_recv() {
            if status.connected != self.monitor.current().connected {
                info!("control: FC connected={}", status.connected);
            }
            self.monitor.update(status);
        }
        while let Ok(cmd) = self.inbound.commands.try_recv() {
            self.ingest.ingest(cmd, now);
        }
    }

    fn publish(&mut self, attitude: &AttitudeSetpoint, thrust: &ThrustSetpoint) {
        if let Err(e) = self.link.publish_attitude(attitude) {
            warn!("control: attitude publish failed: {}", e);
        }
        if let Err(e) = self.link.publish_thrust(thrust) {
            warn!("control: thrust publish failed: {}", e);
        }
    }

    /// One scheduler step. Does not sleep.
    pub async fn tick(&mut self) -> TickReport {
        let now = Instant::now();
        self.drain(now);

        let status = self.monitor.current().clone();
        let phase = self.arbiter.observe_connection(&status);

        let mut request = None;
        let published = match phase {
            Phase::WaitConnection => None,
            Phase::Warmup => {
                let (attitude, thrust) = self.encoder.idle(now);
                self.publish(&attitude, &thrust);
                self.arbiter.record_warmup();
                Some((attitude, thrust))
            }
            Phase::Steady => {
                let stale = self.ingest.is_stale(now);
                if stale != self.was_stale {
                    if stale {
                        info!("control: velocity command stale, holding zero");
                    } else {
                        info!("control: velocity commands flowing");
                    }
                    self.was_stale = stale;
                }

                let cmd = self.ingest.effective(now);
                let heading = self.yaw.integrate(cmd.yaw_rate, now);
                let (attitude, thrust) = self.encoder.encode(cmd.linear_speed, heading, now);
                debug!(
                    "control: speed={:.2} yaw_rate={:.2} heading={:.3}",
                    cmd.linear_speed, cmd.yaw_rate, heading
                );
                self.publish(&attitude, &thrust);

                request = self.arbiter.evaluate(&status, &mut self.link, now).await;
                Some((attitude, thrust))
            }
        };

        TickReport { phase, published, request }
    }

    /// Ticks at the configured rate until `shutdown` fires or its sender is dropped.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> L {
        let mut interval = tokio::time::interval(self.cfg.tick_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("control: running at {:.1} Hz", self.cfg.rate_hz);

        loop {
            interval.tick().await;
            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => {
                    info!("control: shutdown requested, stopping");
                    break;
                }
            }
            self.tick().await;
        }
        self.link
    }
}
