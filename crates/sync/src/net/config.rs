use std::time::Duration;

use super::protocol::{DEFAULT_TCP_PORT, DEFAULT_UDP_PORT};

#[derive(Debug, Clone)]
pub struct NetConfig {
    pub host: String,
    pub tcp_port: u16,
    pub udp_port: u16,
    pub connect_timeout: Duration,
    /// Upper bound on a single wait for socket readiness; each expiry is a liveness check.
    pub poll_timeout: Duration,
    /// Bound on finishing a packet once its header has arrived.
    pub read_timeout: Duration,
    /// Bound on a single stream write; a server that stops reading trips it.
    pub write_timeout: Duration,
    /// Silence longer than this is treated as a dead connection.
    pub liveness_timeout: Duration,
    pub inbound_capacity: usize,
    pub outbound_capacity: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            tcp_port: DEFAULT_TCP_PORT,
            udp_port: DEFAULT_UDP_PORT,
            connect_timeout: Duration::from_secs(5),
            poll_timeout: Duration::from_millis(100),
            read_timeout: Duration::from_secs(2),
            write_timeout: Duration::from_secs(2),
            liveness_timeout: Duration::from_secs(30),
            inbound_capacity: 1024,
            outbound_capacity: 256,
        }
    }
}
