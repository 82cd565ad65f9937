use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

use super::config::NetConfig;
use super::error::NetError;
use super::packets::Payload;
use super::protocol::{Packet, PacketError, PacketType};
use super::receiver::ReceiveWorker;
use super::sender::{Outbound, SendWorker};
use super::stats::{NetworkStats, SharedStats};
use super::transport::{Channel, ShutdownHandle};

/// What the worker threads tell the router.
#[derive(Debug)]
pub enum InboundEvent {
    Packet(Packet),
    /// The receive worker's poll expired; `idle` is the time since anything arrived.
    LivenessCheck { idle: Duration },
    SendFailed { kind: PacketType, error: NetError },
    Stopped(NetError),
}

/// Result of one `fetch_pending_updates` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    Packets(Vec<Packet>),
    /// The connection is gone; this is the only item of its batch.
    Shutdown { reason: String },
    NotConnected,
}

/// Owns the network workers and the queues between them and the gameplay thread.
pub struct NetworkRouter {
    config: NetConfig,
    outbound: Option<Sender<Outbound>>,
    inbound: Receiver<InboundEvent>,
    running: Arc<AtomicBool>,
    connected: bool,
    pending_shutdown: Option<String>,
    stats: Arc<SharedStats>,
    shutdown_handle: ShutdownHandle,
    receive_worker: Option<JoinHandle<()>>,
    send_worker: Option<JoinHandle<()>>,
}

impl NetworkRouter {
    pub fn connect(config: NetConfig) -> Result<Self, NetError> {
        let channel = Channel::connect(&config)?;
        let (receive_half, send_half, shutdown_handle) = channel.split()?;

        let (inbound_tx, inbound_rx) = bounded(config.inbound_capacity);
        let (outbound_tx, outbound_rx) = bounded(config.outbound_capacity);
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(SharedStats::default());

        let receive = ReceiveWorker::new(
            receive_half,
            inbound_tx.clone(),
            Arc::clone(&running),
            Arc::clone(&stats),
            config.poll_timeout,
        );
        let send = SendWorker::new(
            send_half,
            outbound_rx,
            inbound_tx,
            Arc::clone(&running),
            Arc::clone(&stats),
        );

        let mut router = Self {
            config,
            outbound: Some(outbound_tx),
            inbound: inbound_rx,
            running,
            connected: true,
            pending_shutdown: None,
            stats,
            shutdown_handle,
            receive_worker: None,
            send_worker: None,
        };

        // On a spawn failure `router` drops here and stops whatever did start.
        router.receive_worker = Some(
            thread::Builder::new()
                .name("floorsync-recv".to_string())
                .spawn(move || receive.run())
                .map_err(NetError::Spawn)?,
        );
        router.send_worker = Some(
            thread::Builder::new()
                .name("floorsync-send".to_string())
                .spawn(move || send.run())
                .map_err(NetError::Spawn)?,
        );

        log::info!(
            "Connected to {}:{} (tcp) / {} (udp)",
            router.config.host,
            router.config.tcp_port,
            router.config.udp_port
        );

        Ok(router)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn stats(&self) -> NetworkStats {
        self.stats.snapshot()
    }

    /// Drains everything the receive worker has queued since the last call.
    ///
    /// Call at most once per tick. Never blocks.
    pub fn fetch_pending_updates(&mut self) -> Fetch {
        if !self.connected {
            return Fetch::NotConnected;
        }

        if let Some(reason) = self.pending_shutdown.take() {
            return self.close(reason);
        }

        let mut packets = Vec::new();
        loop {
            match self.inbound.try_recv() {
                Ok(InboundEvent::Packet(packet)) => packets.push(packet),
                Ok(InboundEvent::LivenessCheck { idle }) => {
                    if idle > self.config.liveness_timeout {
                        let reason =
                            format!("No data from the server for {:.1}s", idle.as_secs_f32());
                        if !self.defer_shutdown(&packets, reason.clone()) {
                            return self.close(reason);
                        }
                        break;
                    }
                }
                Ok(InboundEvent::SendFailed { kind, error }) => {
                    log::warn!("Outbound {:?} was lost: {}", kind, error);
                }
                Ok(InboundEvent::Stopped(error)) => {
                    let reason = error.to_string();
                    if !self.defer_shutdown(&packets, reason.clone()) {
                        return self.close(reason);
                    }
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let reason = "The network workers stopped.".to_string();
                    if !self.defer_shutdown(&packets, reason.clone()) {
                        return self.close(reason);
                    }
                    break;
                }
            }
        }

        // A worker that died without saying so (a panic) still ends the connection.
        if packets.is_empty()
            && self
                .receive_worker
                .as_ref()
                .is_some_and(|handle| handle.is_finished())
        {
            return self.close("The receive worker stopped unexpectedly.".to_string());
        }

        Fetch::Packets(packets)
    }

    /// Hands out already-decoded packets first; the shutdown follows next call.
    fn defer_shutdown(&mut self, packets: &[Packet], reason: String) -> bool {
        if packets.is_empty() {
            return false;
        }
        self.pending_shutdown = Some(reason);
        true
    }

    /// Queues a packet for the send worker. Never blocks.
    ///
    /// A full queue means the worker is not draining, usually because the
    /// server stopped reading; that is reported instead of waited out.
    pub fn enqueue_outbound(&self, kind: PacketType, payload: Vec<u8>) -> Result<(), NetError> {
        let outbound = match &self.outbound {
            Some(outbound) if self.connected && self.pending_shutdown.is_none() => outbound,
            _ => return Err(NetError::NotConnected),
        };

        let expected = kind.payload_size();
        if payload.len() != expected {
            return Err(PacketError::PayloadSize {
                kind,
                expected,
                actual: payload.len(),
            }
            .into());
        }

        match outbound.try_send(Outbound { kind, payload }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(NetError::ResourceExhaustion(
                "outbound queue full".to_string(),
            )),
            Err(TrySendError::Disconnected(_)) => Err(NetError::NotConnected),
        }
    }

    pub fn send<T: Payload>(&self, kind: PacketType, payload: &T) -> Result<(), NetError> {
        self.enqueue_outbound(kind, bytemuck::bytes_of(payload).to_vec())
    }

    pub fn shutdown(&mut self) {
        if self.receive_worker.is_none() && self.send_worker.is_none() {
            return;
        }
        log::info!("Shutting down network");
        self.stop();
    }

    fn close(&mut self, reason: String) -> Fetch {
        log::warn!("Connection lost: {}", reason);
        self.stop();
        Fetch::Shutdown { reason }
    }

    /// Both workers are joined before the sockets they borrow are released.
    fn stop(&mut self) {
        self.connected = false;
        self.running.store(false, Ordering::SeqCst);
        self.outbound.take();
        self.shutdown_handle.shutdown();

        for handle in [self.receive_worker.take(), self.send_worker.take()]
            .into_iter()
            .flatten()
        {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                log::error!("Network thread {} panicked", name);
            }
        }
    }
}

impl Drop for NetworkRouter {
    fn drop(&mut self) {
        self.stop();
    }
}
