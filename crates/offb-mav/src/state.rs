use mavlink::common::{MavModeFlag, HEARTBEAT_DATA};
use offb_core::monitor::VehicleStatus;
use std::time::{Duration, Instant};

use crate::px4;

#[derive(Debug, Clone, Default)]
pub struct LinkStatus {
    pub connected: bool,
    pub armed: bool,
    pub mode: String,
    pub last_heartbeat: Option<Instant>,
    pub heartbeats: u64,
}

impl LinkStatus {
    pub fn hb_age(&self, now: Instant) -> Option<Duration> {
        self.last_heartbeat.map(|t| now.saturating_duration_since(t))
    }

    pub fn on_heartbeat(&mut self, hb: &HEARTBEAT_DATA, now: Instant) -> VehicleStatus {
        self.connected = true;
        self.armed = hb.base_mode.contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED);
        self.mode = px4::mode_name(hb.custom_mode);
        self.last_heartbeat = Some(now);
        self.heartbeats += 1;
        self.snapshot()
    }

    /// Marks the link lost once heartbeats stop. Returns a status only on that transition.
    pub fn check_timeout(&mut self, timeout: Duration, now: Instant) -> Option<VehicleStatus> {
        if !self.connected {
            return None;
        }
        match self.hb_age(now) {
            Some(age) if age <= timeout => None,
            _ => {
                self.connected = false;
                Some(self.snapshot())
            }
        }
    }

    pub fn snapshot(&self) -> VehicleStatus {
        VehicleStatus {
            connected: self.connected,
            armed: self.armed,
            mode: self.mode.clone(),
        }
    }
}
