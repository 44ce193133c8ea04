//! Velocity commands over UDP, one JSON object per datagram:
//! `{"linear_speed": 1.2, "yaw_rate": -0.1}`

pub mod doctor;

use anyhow::{Context, Result};
use offb_core::ingest::Twist;
use serde::Deserialize;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TeleopConfig {
    pub listen: String,
    /// Larger datagrams are truncated and then fail to parse
    pub max_datagram: usize,
}

impl Default for TeleopConfig {
    fn default() -> Self {
        Self { listen: "0.0.0.0:9870".to_string(), max_datagram: 1024 }
    }
}

pub fn parse_twist(payload: &[u8]) -> Result<Twist> {
    let twist: Twist = serde_json::from_slice(payload).context("parse teleop json")?;
    anyhow::ensure!(
        twist.linear_speed.is_finite() && twist.yaw_rate.is_finite(),
        "non-finite velocity command"
    );
    Ok(twist)
}

pub struct TeleopListener {
    socket: UdpSocket,
    max_datagram: usize,
}

impl TeleopListener {
    pub async fn bind(cfg: &TeleopConfig) -> Result<Self> {
        let socket = UdpSocket::bind(&cfg.listen)
            .await
            .with_context(|| format!("bind teleop socket {}", cfg.listen))?;
        info!("teleop: listening on {}", socket.local_addr()?);
        Ok(Self { socket, max_datagram: cfg.max_datagram.max(64) })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Forwards commands until the control loop drops its receiver.
    pub async fn run(self, tx: mpsc::Sender<Twist>) -> Result<()> {
        let mut buf = vec![0u8; self.max_datagram];
        loop {
            let (n, peer) = self.socket.recv_from(&mut buf).await.context("teleop recv")?;
            let twist = match parse_twist(&buf[..n]) {
                Ok(t) => t,
                Err(e) => {
                    warn!("teleop: dropping datagram from {}: {:#}", peer, e);
                    continue;
                }
            };
            match tx.try_send(twist) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => debug!("teleop: queue full, command dropped"),
                Err(TrySendError::Closed(_)) => {
                    info!("teleop: control loop gone, stopping");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parses_documented_shape() {
        let t = parse_twist(br#"{"linear_speed": 2.0, "yaw_rate": 0.3}"#).unwrap();
        assert_eq!(t, Twist { linear_speed: 2.0, yaw_rate: 0.3 });
    }

    #[test]
    fn rejects_garbage_and_missing_fields() {
        assert!(parse_twist(b"not json").is_err());
        assert!(parse_twist(br#"{"linear_speed": 2.0}"#).is_err());
        assert!(parse_twist(br#"{"linear_speed": "fast", "yaw_rate": 0}"#).is_err());
    }

    #[tokio::test]
    async fn forwards_datagrams_and_skips_bad_ones() {
        let cfg = TeleopConfig { listen: "127.0.0.1:0".into(), ..TeleopConfig::default() };
        let listener = TeleopListener::bind(&cfg).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        let task = tokio::spawn(listener.run(tx));

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"{broken", addr).await.unwrap();
        sender
            .send_to(br#"{"linear_speed": -0.5, "yaw_rate": 0.25}"#, addr)
            .await
            .unwrap();

        let got = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("command forwarded")
            .unwrap();
        assert_eq!(got, Twist { linear_speed: -0.5, yaw_rate: 0.25 });

        drop(rx);
        sender
            .send_to(br#"{"linear_speed": 0.0, "yaw_rate": 0.0}"#, addr)
            .await
            .unwrap();
        let res = tokio::time::timeout(Duration::from_secs(2), task).await.expect("listener stops");
        assert!(res.unwrap().is_ok());
    }
}
