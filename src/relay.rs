//! # Relay Module
//!
//! Republishes received frames on a secondary short-range channel.
//!
//! The payload is the raw wire-format frame, forwarded verbatim with no
//! re-encoding. The production relay is a UDP broadcast on the local network.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::config::RelayConfig;
use crate::error::{Result, TelemetryError};

/// Secondary broadcast channel for received frames
#[async_trait]
pub trait RelayForwarder: Send {
    async fn forward(&mut self, frame: &str) -> Result<()>;
}

/// UDP broadcast relay
#[derive(Debug)]
pub struct UdpRelay {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpRelay {
    /// Bind the relay socket and enable broadcast
    ///
    /// # Errors
    ///
    /// Returns error if an address does not parse or the socket cannot be bound
    pub async fn bind(config: &RelayConfig) -> Result<Self> {
        let bind_addr: SocketAddr = config.bind_addr.parse().map_err(|_| {
            TelemetryError::Initialization(format!("invalid relay bind_addr '{}'", config.bind_addr))
        })?;
        let target: SocketAddr = config.target_addr.parse().map_err(|_| {
            TelemetryError::Initialization(format!("invalid relay target_addr '{}'", config.target_addr))
        })?;

        let socket = UdpSocket::bind(bind_addr).await?;
        socket.set_broadcast(true)?;

        info!("Relaying frames from {} to {}", socket.local_addr()?, target);
        Ok(Self { socket, target })
    }

    /// Destination of relayed frames
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait]
impl RelayForwarder for UdpRelay {
    async fn forward(&mut self, frame: &str) -> Result<()> {
        let sent = self.socket.send_to(frame.as_bytes(), self.target).await?;
        debug!("Relayed {} bytes to {}", sent, self.target);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_udp_relay_forwards_frame_verbatim() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = RelayConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            target_addr: receiver.local_addr().unwrap().to_string(),
        };

        let mut relay = UdpRelay::bind(&config).await.unwrap();
        assert_eq!(relay.target(), receiver.local_addr().unwrap());
        relay.forward("[2;101.32,22.50,15.00]").await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"[2;101.32,22.50,15.00]");
    }

    #[tokio::test]
    async fn test_udp_relay_rejects_bad_address() {
        let config = RelayConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            target_addr: "broadcast".to_string(),
        };

        assert!(matches!(
            UdpRelay::bind(&config).await,
            Err(TelemetryError::Initialization(_))
        ));
    }
}
