use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use super::config::NetConfig;
use super::error::TransportError;
use super::protocol::{self, HEADER_SIZE, MAX_DATAGRAM_SIZE, PacketType};

/// Slice used when alternating between the two sockets while polling.
const POLL_SLICE: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Reliable,
    Unreliable,
    TimedOut,
}

/// Both transports to a single server.
pub struct Channel {
    stream: TcpStream,
    socket: UdpSocket,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl Channel {
    pub fn connect(config: &NetConfig) -> Result<Self, TransportError> {
        let tcp_addr = resolve(&config.host, config.tcp_port)?;
        let udp_addr = resolve(&config.host, config.udp_port)?;

        log::info!("Connecting to {} (udp {})", tcp_addr, udp_addr);

        let stream = TcpStream::connect_timeout(&tcp_addr, config.connect_timeout)
            .map_err(TransportError::Connect)?;
        stream.set_nodelay(true).map_err(TransportError::Connect)?;

        let bind_addr = if udp_addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).map_err(TransportError::Connect)?;
        socket.connect(udp_addr).map_err(TransportError::Connect)?;

        Ok(Self {
            stream,
            socket,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        })
    }

    /// Splits into independently owned halves for the two worker threads.
    pub fn split(self) -> Result<(ReceiveHalf, SendHalf, ShutdownHandle), TransportError> {
        let clone_stream = |s: &TcpStream| s.try_clone().map_err(TransportError::Connect);

        let send_stream = clone_stream(&self.stream)?;
        send_stream
            .set_write_timeout(Some(self.write_timeout))
            .map_err(TransportError::Connect)?;
        let send = SendHalf {
            stream: send_stream,
            socket: self.socket.try_clone().map_err(TransportError::Connect)?,
            stream_broken: false,
        };
        let shutdown = ShutdownHandle {
            stream: clone_stream(&self.stream)?,
        };
        let receive = ReceiveHalf {
            stream: self.stream,
            socket: self.socket,
            read_timeout: self.read_timeout,
            datagram: vec![0u8; MAX_DATAGRAM_SIZE],
        };

        Ok((receive, send, shutdown))
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    (host, port)
        .to_socket_addrs()
        .map_err(TransportError::Connect)?
        .next()
        .ok_or_else(|| {
            TransportError::Connect(io::Error::new(
                io::ErrorKind::NotFound,
                format!("could not resolve {}", host),
            ))
        })
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn stream_error(err: io::Error) -> TransportError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        TransportError::ConnectionClosed
    } else {
        TransportError::Receive(err)
    }
}

pub struct ReceiveHalf {
    stream: TcpStream,
    socket: UdpSocket,
    read_timeout: Duration,
    datagram: Vec<u8>,
}

impl ReceiveHalf {
    /// Waits until either socket has data, checking TCP first.
    pub fn poll(&mut self, timeout: Duration) -> Result<Readiness, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut probe = [0u8; 1];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Readiness::TimedOut);
            }
            let slice = remaining.min(POLL_SLICE);

            self.stream
                .set_read_timeout(Some(slice))
                .map_err(TransportError::Receive)?;
            match self.stream.peek(&mut probe) {
                // A zero-length peek means the peer closed; the read reports it.
                Ok(_) => return Ok(Readiness::Reliable),
                Err(e) if is_timeout(&e) || e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(TransportError::Receive(e)),
            }

            self.socket
                .set_read_timeout(Some(slice))
                .map_err(TransportError::Receive)?;
            match self.socket.peek(&mut probe) {
                Ok(_) => return Ok(Readiness::Unreliable),
                Err(e) if is_timeout(&e) || e.kind() == io::ErrorKind::Interrupted => {}
                // ICMP port unreachable from an earlier send; not fatal for UDP.
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                    log::debug!("UDP peer unreachable: {}", e);
                }
                Err(e) => return Err(TransportError::Receive(e)),
            }
        }
    }

    /// Reads one `[type][payload]` frame from the stream.
    ///
    /// Returns `Ok(None)` for keep-alives. An unknown type yields only the
    /// header bytes so the codec can report the corruption.
    pub fn receive_reliable(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        self.stream
            .set_read_timeout(Some(self.read_timeout))
            .map_err(TransportError::Receive)?;

        let mut header = [0u8; HEADER_SIZE];
        let first = loop {
            match self.stream.read(&mut header) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Receive(e)),
            }
        };
        if first == 0 {
            return Err(TransportError::ConnectionClosed);
        }
        self.stream
            .read_exact(&mut header[first..])
            .map_err(stream_error)?;

        let raw = u32::from_le_bytes(header);
        if raw == PacketType::KeepAlive.id() {
            return Ok(None);
        }

        let Ok(size) = protocol::size_of(raw) else {
            return Ok(Some(header.to_vec()));
        };

        let total = HEADER_SIZE + size;
        let mut frame = Vec::new();
        frame
            .try_reserve_exact(total)
            .map_err(|_| TransportError::OutOfMemory(total))?;
        frame.extend_from_slice(&header);
        frame.resize(total, 0);

        self.stream
            .read_exact(&mut frame[HEADER_SIZE..])
            .map_err(stream_error)?;

        Ok(Some(frame))
    }

    /// Reads one datagram. `Ok(None)` means an ICMP unreachable was reported
    /// instead of data.
    pub fn receive_unreliable(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        self.socket
            .set_read_timeout(Some(self.read_timeout))
            .map_err(TransportError::Receive)?;

        match self.socket.recv(&mut self.datagram) {
            Ok(len) => Ok(Some(self.datagram[..len].to_vec())),
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => Ok(None),
            Err(e) => Err(TransportError::Receive(e)),
        }
    }
}

pub struct SendHalf {
    stream: TcpStream,
    socket: UdpSocket,
    stream_broken: bool,
}

impl SendHalf {
    /// Writes to the stream under the configured write timeout.
    ///
    /// A failed write may leave half a frame on the wire, so the stream is
    /// shut down and every later reliable send fails fast.
    pub fn send_reliable(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        if self.stream_broken {
            return Err(TransportError::ConnectionClosed);
        }
        if let Err(e) = self.stream.write_all(bytes) {
            self.stream_broken = true;
            if let Err(shutdown) = self.stream.shutdown(Shutdown::Both) {
                log::debug!("TCP shutdown after failed write: {}", shutdown);
            }
            return Err(TransportError::Send(e));
        }
        Ok(bytes.len())
    }

    pub fn send_unreliable(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        self.socket.send(bytes).map_err(TransportError::Send)
    }
}

/// Lets the owner of the connection unblock a pending stream read.
pub struct ShutdownHandle {
    stream: TcpStream,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            if e.kind() != io::ErrorKind::NotConnected {
                log::debug!("TCP shutdown failed: {}", e);
            }
        }
    }
}
