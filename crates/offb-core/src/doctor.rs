use anyhow::Result;
use crate::BridgeConfig;

pub fn check_bridge(cfg: &BridgeConfig) -> Result<()> {
    anyhow::ensure!(cfg.rate_hz >= 2.0, "bridge.rate_hz must be >= 2 (PX4 offboard timeout)");
    anyhow::ensure!(cfg.rate_hz <= 250.0, "bridge.rate_hz unreasonably high");
    anyhow::ensure!(cfg.warmup_ticks > 0, "bridge.warmup_ticks must be > 0");
    anyhow::ensure!(cfg.stale_after_ms > 0, "bridge.stale_after_ms must be > 0");
    anyhow::ensure!(
        cfg.request_cooldown_s > 0.0 && cfg.request_cooldown_s <= 3600.0,
        "bridge.request_cooldown_s must be in (0, 3600]"
    );
    anyhow::ensure!(
        cfg.request_timeout_s > 0.0 && cfg.request_timeout_s <= 60.0,
        "bridge.request_timeout_s must be in (0, 60]"
    );
    anyhow::ensure!(!cfg.offboard_mode.is_empty(), "bridge.offboard_mode missing");
    anyhow::ensure!(cfg.yaw.max_dt_s > 0.0, "bridge.yaw.max_dt_s must be > 0");
    Ok(())
}
