use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;

/// Velocity command as it arrives from upstream, before it is stamped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Twist {
    pub linear_speed: f32,
    pub yaw_rate: f32,
}

impl Twist {
    pub const ZERO: Twist = Twist { linear_speed: 0.0, yaw_rate: 0.0 };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityCommand {
    pub linear_speed: f32,
    pub yaw_rate: f32,
    pub received_at: Instant,
}

/// Latest-value slot for upstream velocity commands.
#[derive(Debug)]
pub struct CommandIngest {
    latest: Option<VelocityCommand>,
    stale_after: Duration,
}

impl CommandIngest {
    pub fn new(stale_after: Duration) -> Self {
        Self { latest: None, stale_after }
    }

    pub fn ingest(&mut self, cmd: Twist, now: Instant) -> VelocityCommand {
        let stamped = VelocityCommand {
            linear_speed: cmd.linear_speed,
            yaw_rate: cmd.yaw_rate,
            received_at: now,
        };
        self.latest = Some(stamped);
        stamped
    }

    pub fn latest(&self) -> Option<VelocityCommand> {
        self.latest
    }

    /// True when the last command is older than the threshold, or there never was one.
    pub fn is_stale(&self, now: Instant) -> bool {
        match self.latest {
            Some(cmd) => now.saturating_duration_since(cmd.received_at) > self.stale_after,
            None => true,
        }
    }

    /// Command values to encode this tick. The stored command is left untouched.
    pub fn effective(&self, now: Instant) -> Twist {
        match self.latest {
            Some(cmd) if !self.is_stale(now) => Twist {
                linear_speed: cmd.linear_speed,
                yaw_rate: cmd.yaw_rate,
            },
            _ => Twist::ZERO,
        }
    }
}
