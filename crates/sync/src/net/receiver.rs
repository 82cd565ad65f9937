use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{SendTimeoutError, Sender};

use super::error::NetError;
use super::protocol::{self, Packet};
use super::router::InboundEvent;
use super::stats::SharedStats;
use super::transport::{Readiness, ReceiveHalf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveState {
    Polling,
    ReliableReady,
    UnreliableReady,
    TimedOut,
    Error,
    Stopped,
}

/// Owns the receive side of both sockets and feeds decoded packets to the router.
pub struct ReceiveWorker {
    channel: ReceiveHalf,
    events: Sender<InboundEvent>,
    running: Arc<AtomicBool>,
    stats: Arc<SharedStats>,
    poll_timeout: Duration,
    next_sequence: u64,
    last_heard: Instant,
    state: ReceiveState,
}

impl ReceiveWorker {
    pub fn new(
        channel: ReceiveHalf,
        events: Sender<InboundEvent>,
        running: Arc<AtomicBool>,
        stats: Arc<SharedStats>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            channel,
            events,
            running,
            stats,
            poll_timeout,
            next_sequence: 0,
            last_heard: Instant::now(),
            state: ReceiveState::Polling,
        }
    }

    pub fn run(mut self) {
        log::debug!("Receive worker started");

        while self.running.load(Ordering::SeqCst) {
            if let Err(err) = self.step() {
                self.transition(ReceiveState::Error);
                // Errors caused by our own shutdown are not worth reporting.
                if self.running.load(Ordering::SeqCst) {
                    log::error!("Receive worker failed: {}", err);
                    self.emit(InboundEvent::Stopped(err));
                }
                break;
            }
        }

        self.transition(ReceiveState::Stopped);
        log::debug!("Receive worker stopped");
    }

    fn transition(&mut self, next: ReceiveState) {
        if self.state != next {
            log::trace!("Receive worker {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn step(&mut self) -> Result<(), NetError> {
        self.transition(ReceiveState::Polling);

        match self.channel.poll(self.poll_timeout)? {
            Readiness::Reliable => {
                self.transition(ReceiveState::ReliableReady);
                self.handle_reliable()
            }
            Readiness::Unreliable => {
                self.transition(ReceiveState::UnreliableReady);
                self.handle_unreliable()
            }
            Readiness::TimedOut => {
                self.transition(ReceiveState::TimedOut);
                self.emit(InboundEvent::LivenessCheck {
                    idle: self.last_heard.elapsed(),
                });
                Ok(())
            }
        }
    }

    fn handle_reliable(&mut self) -> Result<(), NetError> {
        let Some(bytes) = self.channel.receive_reliable()? else {
            self.last_heard = Instant::now();
            self.stats.record_keepalive();
            return Ok(());
        };
        self.last_heard = Instant::now();

        match protocol::decode(&bytes) {
            Ok((kind, payload)) => {
                let timestamp = self.next_sequence;
                self.next_sequence += 1;
                self.stats.record_received(bytes.len());
                self.emit(InboundEvent::Packet(Packet::new(kind, payload, timestamp)));
            }
            Err(e) => {
                log::warn!("Dropping corrupted TCP packet: {}", e);
                self.stats.record_corrupted();
            }
        }

        Ok(())
    }

    fn handle_unreliable(&mut self) -> Result<(), NetError> {
        let Some(bytes) = self.channel.receive_unreliable()? else {
            log::debug!("Server UDP port unreachable");
            self.stats.record_unreachable();
            return Ok(());
        };
        self.last_heard = Instant::now();

        match protocol::decode_datagram(&bytes) {
            Ok((kind, payload, timestamp)) => {
                self.stats.record_received(bytes.len());
                self.emit(InboundEvent::Packet(Packet::new(kind, payload, timestamp)));
            }
            Err(e) => {
                log::warn!("Dropping corrupted UDP packet: {}", e);
                self.stats.record_corrupted();
            }
        }

        Ok(())
    }

    /// Queues an event, retrying while the router is slow to drain.
    fn emit(&mut self, mut event: InboundEvent) {
        loop {
            match self.events.send_timeout(event, self.poll_timeout) {
                Ok(()) => return,
                Err(SendTimeoutError::Timeout(returned)) => {
                    if !self.running.load(Ordering::SeqCst) {
                        return;
                    }
                    event = returned;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    log::debug!("Router went away; stopping receive worker");
                    self.running.store(false, Ordering::SeqCst);
                    return;
                }
            }
        }
    }
}
