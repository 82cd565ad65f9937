use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use super::error::NetError;
use super::protocol::{self, PacketType, Reliability};
use super::router::InboundEvent;
use super::stats::SharedStats;
use super::transport::SendHalf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub kind: PacketType,
    pub payload: Vec<u8>,
}

/// Drains the outbound queue onto whichever transport each packet type uses.
pub struct SendWorker {
    channel: SendHalf,
    outbound: Receiver<Outbound>,
    events: Sender<InboundEvent>,
    running: Arc<AtomicBool>,
    stats: Arc<SharedStats>,
}

impl SendWorker {
    pub fn new(
        channel: SendHalf,
        outbound: Receiver<Outbound>,
        events: Sender<InboundEvent>,
        running: Arc<AtomicBool>,
        stats: Arc<SharedStats>,
    ) -> Self {
        Self {
            channel,
            outbound,
            events,
            running,
            stats,
        }
    }

    pub fn run(mut self) {
        log::debug!("Send worker started");

        // Ends once the router drops its side of the queue.
        while let Ok(item) = self.outbound.recv() {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            match self.send(&item) {
                Ok(bytes) => {
                    self.stats.record_sent(bytes);
                    log::trace!("Sent {:?} ({} bytes)", item.kind, bytes);
                }
                Err(error) => {
                    log::warn!("Failed to send {:?}: {}", item.kind, error);
                    self.stats.record_send_failure();
                    self.report(item.kind, error);
                }
            }
        }

        log::debug!("Send worker stopped");
    }

    fn send(&mut self, item: &Outbound) -> Result<usize, NetError> {
        match item.kind.reliability() {
            Reliability::Reliable => {
                let header = self
                    .channel
                    .send_reliable(&protocol::frame_header(item.kind))?;
                let body = self.channel.send_reliable(&item.payload)?;
                Ok(header + body)
            }
            Reliability::Unreliable => {
                let datagram = protocol::encode_datagram(item.kind, &item.payload)?;
                Ok(self.channel.send_unreliable(&datagram)?)
            }
        }
    }

    fn report(&self, kind: PacketType, error: NetError) {
        match self.events.try_send(InboundEvent::SendFailed { kind, error }) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => {
                log::debug!("Inbound queue full; send failure for {:?} not reported", kind);
            }
        }
    }
}
