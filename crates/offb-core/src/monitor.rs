#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleStatus {
    pub connected: bool,
    pub armed: bool,
    pub mode: String,
}

/// Last status reported by the flight controller link.
#[derive(Debug, Default)]
pub struct ConnectionMonitor {
    current: VehicleStatus,
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, status: VehicleStatus) {
        self.current = status;
    }

    pub fn current(&self) -> &VehicleStatus {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected_disarmed_without_mode() {
        let mon = ConnectionMonitor::new();
        assert!(!mon.current().connected);
        assert!(!mon.current().armed);
        assert!(mon.current().mode.is_empty());
    }

    #[test]
    fn update_overwrites_every_field() {
        let mut mon = ConnectionMonitor::new();
        mon.update(VehicleStatus { connected: true, armed: true, mode: "OFFBOARD".into() });
        mon.update(VehicleStatus { connected: true, armed: false, mode: String::new() });
        assert_eq!(
            mon.current(),
            &VehicleStatus { connected: true, armed: false, mode: String::new() }
        );
    }
}
