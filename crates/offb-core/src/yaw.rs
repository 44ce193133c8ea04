use serde::Deserialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YawConfig {
    /// Gaps at or above this many seconds between updates are not integrated.
    pub max_dt_s: f32,
    /// Rates at or above this (rad/s) are not integrated. Only the upper side is checked.
    pub max_rate: f32,
}

impl Default for YawConfig {
    fn default() -> Self {
        Self { max_dt_s: 1.0, max_rate: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YawState {
    pub heading: f32,
    pub last_update: Option<Instant>,
}

/// Integrates commanded yaw rate into an unbounded heading (radians).
#[derive(Debug)]
pub struct YawIntegrator {
    cfg: YawConfig,
    state: YawState,
}

impl YawIntegrator {
    pub fn new(cfg: YawConfig) -> Self {
        Self { cfg, state: YawState { heading: 0.0, last_update: None } }
    }

    pub fn heading(&self) -> f32 {
        self.state.heading
    }

    pub fn state(&self) -> YawState {
        self.state
    }

    pub fn integrate(&mut self, angular_velocity: f32, now: Instant) -> f32 {
        if let Some(last) = self.state.last_update {
            let dt = now.saturating_duration_since(last).as_secs_f32();
            if dt < self.cfg.max_dt_s && angular_velocity < self.cfg.max_rate {
                self.state.heading += angular_velocity * dt;
            }
        }
        self.state.last_update = Some(now);
        self.state.heading
    }
}
