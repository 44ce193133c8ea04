use anyhow::{Context, Result};
use std::net::SocketAddr;

use crate::TeleopConfig;

pub fn check_listen(cfg: &TeleopConfig) -> Result<()> {
    let addr: SocketAddr = cfg
        .listen
        .parse()
        .with_context(|| format!("teleop.listen is not host:port: {}", cfg.listen))?;
    anyhow::ensure!(addr.port() != 0, "teleop.listen needs a fixed port");
    anyhow::ensure!(cfg.max_datagram >= 64, "teleop.max_datagram too small; set >= 64");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listen_is_valid() {
        check_listen(&TeleopConfig::default()).unwrap();
    }

    #[test]
    fn rejects_hostname_and_port_zero() {
        let named = TeleopConfig { listen: "localhost:9870".into(), ..TeleopConfig::default() };
        assert!(check_listen(&named).is_err());
        let ephemeral = TeleopConfig { listen: "127.0.0.1:0".into(), ..TeleopConfig::default() };
        assert!(check_listen(&ephemeral).is_err());
    }
}
