use anyhow::{Context, Result};
use mavlink::{
    common::{
        AttitudeTargetTypemask, MavAutopilot, MavCmd, MavMessage, MavModeFlag, MavResult,
        MavState, MavType, COMMAND_ACK_DATA, COMMAND_LONG_DATA, HEARTBEAT_DATA,
        SET_ATTITUDE_TARGET_DATA,
    },
    MavConnection, MavHeader,
};
use offb_core::link::{ArmResponse, FlightLink, LinkError, SetModeResponse};
use offb_core::monitor::VehicleStatus;
use offb_core::setpoint::{AttitudeSetpoint, ThrustSetpoint};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::px4;
use crate::state::LinkStatus;
use crate::MavConfig;

type Conn = Arc<dyn MavConnection<MavMessage> + Send + Sync>;

/// Outgoing half of the connection, shared with the heartbeat task.
#[derive(Clone)]
struct MavSender {
    conn: Conn,
    sys_id: u8,
    comp_id: u8,
    sequence: Arc<AtomicU8>,
}

impl MavSender {
    fn send(&self, msg: &MavMessage) -> Result<(), LinkError> {
        let hdr = MavHeader {
            system_id: self.sys_id,
            component_id: self.comp_id,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        };
        self.conn
            .send(&hdr, msg)
            .map_err(|e| LinkError::Send(format!("{:?}", e)))?;
        Ok(())
    }

    fn send_heartbeat(&self) -> Result<(), LinkError> {
        let hb = HEARTBEAT_DATA {
            custom_mode: 0,
            mavtype: MavType::MAV_TYPE_ONBOARD_CONTROLLER,
            autopilot: MavAutopilot::MAV_AUTOPILOT_INVALID,
            base_mode: MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED,
            system_status: MavState::MAV_STATE_ACTIVE,
            mavlink_version: 3,
        };
        self.send(&MavMessage::HEARTBEAT(hb))
    }
}

/// `FlightLink` over MAVLink to a PX4 autopilot.
pub struct MavFlightLink {
    tx: MavSender,
    target_sys: u8,
    target_comp: u8,
    boot: Instant,
    acks: mpsc::Receiver<COMMAND_ACK_DATA>,
    ack_timeout: Duration,
    status: Arc<Mutex<LinkStatus>>,
    /// Orientation of the current tick; sent together with the thrust.
    attitude: Option<AttitudeSetpoint>,
}

impl MavFlightLink {
    /// Connects and starts the reader and watchdog tasks; needs a tokio runtime.
    /// Vehicle status updates go to `status_tx`, which the control loop drains.
    pub fn open(cfg: &MavConfig, status_tx: mpsc::Sender<VehicleStatus>) -> Result<Self> {
        let conn: Conn = Arc::from(
            mavlink::connect::<MavMessage>(&cfg.connection)
                .with_context(|| format!("mavlink connect {}", cfg.connection))?,
        );
        info!("mav: link open on {}", cfg.connection);

        let tx = MavSender {
            conn: conn.clone(),
            sys_id: cfg.sys_id,
            comp_id: cfg.comp_id,
            sequence: Arc::new(AtomicU8::new(0)),
        };
        let status = Arc::new(Mutex::new(LinkStatus::default()));
        let (ack_tx, acks) = mpsc::channel(16);

        // mavlink recv blocks with no deadline; a detached thread does not hold up runtime shutdown
        let reader_status = status.clone();
        let reader_tx = status_tx.clone();
        let target_sys = cfg.target_sys;
        std::thread::Builder::new()
            .name("mav-reader".into())
            .spawn(move || read_loop(conn, target_sys, reader_status, reader_tx, ack_tx))
            .context("spawn mavlink reader")?;

        let hb_hz = cfg.send_heartbeat_hz.max(0.2);
        tokio::spawn(watchdog(
            tx.clone(),
            status.clone(),
            status_tx,
            Duration::from_millis(cfg.heartbeat_timeout_ms),
            Duration::from_secs_f32(1.0 / hb_hz),
        ));

        Ok(Self {
            tx,
            target_sys: cfg.target_sys,
            target_comp: cfg.target_comp,
            boot: Instant::now(),
            acks,
            ack_timeout: Duration::from_millis(cfg.ack_timeout_ms),
            status,
            attitude: None,
        })
    }

    pub fn status(&self) -> LinkStatus {
        lock(&self.status).clone()
    }

    async fn command_long(&mut self, command: MavCmd, params: [f32; 7]) -> Result<MavResult, LinkError> {
        // acks left over from a timed-out request
        while self.acks.try_recv().is_ok() {}

        let msg = command_long(self.target_sys, self.target_comp, command, params);
        debug!("mav: COMMAND_LONG {:?} {:?}", command, params);
        self.tx.send(&MavMessage::COMMAND_LONG(msg))?;

        let acks = &mut self.acks;
        let wait = async {
            while let Some(ack) = acks.recv().await {
                if ack.command == command {
                    return Ok(ack.result);
                }
            }
            Err(LinkError::Disconnected)
        };
        timeout(self.ack_timeout, wait)
            .await
            .map_err(|_| LinkError::Timeout("COMMAND_ACK"))?
    }
}

/// PX4 takes attitude and thrust from one SET_ATTITUDE_TARGET, so the attitude
/// is held until the tick's thrust arrives and both go out in a single message.
impl FlightLink for MavFlightLink {
    fn publish_attitude(&mut self, sp: &AttitudeSetpoint) -> Result<(), LinkError> {
        self.attitude = Some(*sp);
        Ok(())
    }

    fn publish_thrust(&mut self, sp: &ThrustSetpoint) -> Result<(), LinkError> {
        let msg = attitude_target(self.attitude.as_ref(), sp, self.boot, self.target_sys, self.target_comp);
        self.tx.send(&MavMessage::SET_ATTITUDE_TARGET(msg))
    }

    async fn set_mode(&mut self, custom_mode: &str) -> Result<SetModeResponse, LinkError> {
        let Some((main, sub)) = px4::mode_from_name(custom_mode) else {
            warn!("mav: unknown PX4 mode {:?}, not sent", custom_mode);
            return Ok(SetModeResponse { mode_sent: false });
        };
        let base = MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED.bits() as f32;
        let result = self
            .command_long(
                MavCmd::MAV_CMD_DO_SET_MODE,
                [base, main as f32, sub as f32, 0.0, 0.0, 0.0, 0.0],
            )
            .await?;
        info!("mav: set_mode {} -> {:?}", custom_mode, result);
        Ok(SetModeResponse { mode_sent: result == MavResult::MAV_RESULT_ACCEPTED })
    }

    async fn arm(&mut self, value: bool) -> Result<ArmResponse, LinkError> {
        let flag = if value { 1.0 } else { 0.0 };
        let result = self
            .command_long(
                MavCmd::MAV_CMD_COMPONENT_ARM_DISARM,
                [flag, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            )
            .await?;
        info!("mav: arm({}) -> {:?}", value, result);
        Ok(ArmResponse { success: result == MavResult::MAV_RESULT_ACCEPTED })
    }
}

fn time_boot_ms(stamp: Instant, boot: Instant) -> u32 {
    stamp.saturating_duration_since(boot).as_millis() as u32
}

fn rates_ignored() -> AttitudeTargetTypemask {
    AttitudeTargetTypemask::ATTITUDE_TARGET_TYPEMASK_BODY_ROLL_RATE_IGNORE
        | AttitudeTargetTypemask::ATTITUDE_TARGET_TYPEMASK_BODY_PITCH_RATE_IGNORE
        | AttitudeTargetTypemask::ATTITUDE_TARGET_TYPEMASK_BODY_YAW_RATE_IGNORE
}

/// Orientation plus thrust, body rates ignored. Level attitude until one was published.
fn attitude_target(
    attitude: Option<&AttitudeSetpoint>,
    thrust: &ThrustSetpoint,
    boot: Instant,
    target_sys: u8,
    target_comp: u8,
) -> SET_ATTITUDE_TARGET_DATA {
    let q = attitude.map_or([1.0, 0.0, 0.0, 0.0], |sp| {
        let q = sp.orientation.quaternion();
        [q.w, q.i, q.j, q.k]
    });
    SET_ATTITUDE_TARGET_DATA {
        time_boot_ms: time_boot_ms(thrust.stamp, boot),
        q,
        body_roll_rate: 0.0,
        body_pitch_rate: 0.0,
        body_yaw_rate: 0.0,
        thrust: thrust.thrust,
        target_system: target_sys,
        target_component: target_comp,
        type_mask: rates_ignored(),
        ..Default::default()
    }
}

fn command_long(target_sys: u8, target_comp: u8, command: MavCmd, p: [f32; 7]) -> COMMAND_LONG_DATA {
    COMMAND_LONG_DATA {
        target_system: target_sys,
        target_component: target_comp,
        command: command.into(),
        confirmation: 0,
        param1: p[0],
        param2: p[1],
        param3: p[2],
        param4: p[3],
        param5: p[4],
        param6: p[5],
        param7: p[6],
    }
}

fn lock(status: &Mutex<LinkStatus>) -> MutexGuard<'_, LinkStatus> {
    status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_loop(
    conn: Conn,
    target_sys: u8,
    status: Arc<Mutex<LinkStatus>>,
    status_tx: mpsc::Sender<VehicleStatus>,
    ack_tx: mpsc::Sender<COMMAND_ACK_DATA>,
) {
    loop {
        if status_tx.is_closed() {
            info!("mav: control loop gone, reader stopping");
            return;
        }
        match conn.recv() {
            Ok((hdr, MavMessage::HEARTBEAT(hb))) => {
                // GCS and companion heartbeats share the link
                if hdr.system_id != target_sys || hb.autopilot == MavAutopilot::MAV_AUTOPILOT_INVALID {
                    continue;
                }
                let (vs, was_connected) = {
                    let mut st = lock(&status);
                    let was = st.connected;
                    (st.on_heartbeat(&hb, std::time::Instant::now()), was)
                };
                if !was_connected {
                    info!("mav: FC heartbeat (mode={}, armed={})", vs.mode, vs.armed);
                }
                if status_tx.try_send(vs).is_err() {
                    debug!("mav: status queue full, update dropped");
                }
            }
            Ok((hdr, MavMessage::COMMAND_ACK(ack))) if hdr.system_id == target_sys => {
                debug!("mav: COMMAND_ACK {:?} {:?}", ack.command, ack.result);
                let _ = ack_tx.try_send(ack);
            }
            Ok(_) => {}
            Err(e) => {
                debug!("mav: recv failed: {:?}", e);
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

async fn watchdog(
    tx: MavSender,
    status: Arc<Mutex<LinkStatus>>,
    status_tx: mpsc::Sender<VehicleStatus>,
    hb_timeout: Duration,
    hb_interval: Duration,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let mut last_hb_send: Option<std::time::Instant> = None;

    loop {
        ticker.tick().await;
        if status_tx.is_closed() {
            return;
        }

        if last_hb_send.map_or(true, |t| t.elapsed() >= hb_interval) {
            if let Err(e) = tx.send_heartbeat() {
                debug!("mav: companion heartbeat failed: {}", e);
            }
            last_hb_send = Some(std::time::Instant::now());
        }

        let lost = lock(&status).check_timeout(hb_timeout, std::time::Instant::now());
        if let Some(vs) = lost {
            warn!("mav: no FC heartbeat for {:?}, link lost", hb_timeout);
            let _ = status_tx.send(vs).await;
        }
    }
}
