use anyhow::Result;
use crate::MavConfig;

pub fn check_link(cfg: &MavConfig) -> Result<()> {
    let scheme = cfg.connection.split(':').next().unwrap_or_default();
    anyhow::ensure!(
        matches!(scheme, "udpin" | "udpout" | "udpbcast" | "tcpin" | "tcpout" | "serial"),
        "mavlink.connection has unknown scheme {:?}",
        scheme
    );
    anyhow::ensure!(cfg.target_sys > 0, "mavlink.target_sys must be > 0");
    anyhow::ensure!(
        (cfg.sys_id, cfg.comp_id) != (cfg.target_sys, cfg.target_comp),
        "mavlink sys_id/comp_id collide with the FC target"
    );
    anyhow::ensure!(cfg.heartbeat_timeout_ms >= 500, "mavlink.heartbeat_timeout_ms too short");
    anyhow::ensure!(cfg.ack_timeout_ms > 0, "mavlink.ack_timeout_ms must be > 0");
    Ok(())
}
