use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::core::{Error, Result, MAX_DATAGRAM_SIZE};

/// Capacity of the unsolicited datagram queue
const INBOUND_QUEUE: usize = 100;

/// A datagram that arrived while no blocking send was waiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Sender address
    pub peer: SocketAddr,
    /// Raw datagram bytes
    pub data: Bytes,
}

type ReplySlot = Arc<Mutex<Option<oneshot::Sender<Bytes>>>>;

/// State shared with the listener task
struct SharedState {
    /// UDP socket for communication
    socket: Arc<UdpSocket>,
    /// Device address
    remote: SocketAddr,
    /// Waiter for the next inbound datagram, if a blocking send is in flight
    pending: ReplySlot,
}

/// A UDP channel to one remote device
///
/// The channel owns its socket and one listener task. Every inbound datagram
/// goes to the blocking send currently waiting for a reply, or to the
/// unsolicited queue when none is.
pub struct UdpChannel {
    shared: Arc<SharedState>,
    /// Serializes blocking exchanges
    exchange: tokio::sync::Mutex<()>,
    listener: JoinHandle<()>,
}

/// Clears the reply slot when a blocking send finishes or is dropped
struct PendingReply<'a> {
    slot: &'a ReplySlot,
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

fn bind_socket(local: SocketAddr) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(local), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    if local.is_ipv4() {
        socket.set_broadcast(true)?;
    }
    socket.set_nonblocking(true)?;
    socket
        .bind(&local.into())
        .map_err(|e| Error::network(format!("Failed to bind socket to {}: {}", local, e)))?;

    Ok(UdpSocket::from_std(socket.into())?)
}

impl UdpChannel {
    /// Binds a local socket and starts listening for datagrams
    ///
    /// Returns the channel and the queue of unsolicited datagrams.
    pub async fn open(
        local: SocketAddr,
        remote: SocketAddr,
    ) -> Result<(Self, mpsc::Receiver<Datagram>)> {
        let socket = Arc::new(bind_socket(local)?);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);

        let shared = Arc::new(SharedState {
            socket,
            remote,
            pending: Arc::new(Mutex::new(None)),
        });

        let listener = tokio::spawn(listen(Arc::clone(&shared), inbound_tx));

        info!(
            "Opened UDP channel {} -> {}",
            shared.socket.local_addr()?,
            remote
        );

        let channel = UdpChannel {
            shared,
            exchange: tokio::sync::Mutex::new(()),
            listener,
        };
        Ok((channel, inbound_rx))
    }

    /// Returns the local socket address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.shared
            .socket
            .local_addr()
            .map_err(|e| Error::network(format!("Failed to get local address: {}", e)))
    }

    /// Returns the device address
    pub fn remote_addr(&self) -> SocketAddr {
        self.shared.remote
    }

    async fn write(&self, buffer: &[u8]) -> Result<()> {
        let written = self.shared.socket.send_to(buffer, self.shared.remote).await?;
        if written != buffer.len() {
            return Err(Error::network(format!(
                "Short write to {}: {} of {} bytes",
                self.shared.remote,
                written,
                buffer.len()
            )));
        }
        trace!("Wrote {} bytes to {}", written, self.shared.remote);
        Ok(())
    }

    /// Sends a buffer to the device
    ///
    /// Without `blocking` this returns `None` once the datagram is written.
    /// With `blocking` it waits up to `timeout` for the next inbound datagram
    /// and fails with [`Error::Timeout`] if none arrives. The reply is not
    /// correlated to the request beyond arrival order, so blocking sends on
    /// one channel are serialized.
    pub async fn send(
        &self,
        buffer: Bytes,
        blocking: bool,
        timeout: Duration,
    ) -> Result<Option<Bytes>> {
        if !blocking {
            self.write(&buffer).await?;
            return Ok(None);
        }

        let _exchange = self.exchange.lock().await;
        let (reply_tx, reply_rx) = oneshot::channel();
        *self.shared.pending.lock() = Some(reply_tx);
        let _pending = PendingReply {
            slot: &self.shared.pending,
        };

        self.write(&buffer).await?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => {
                debug!("Received {} byte reply from {}", reply.len(), self.shared.remote);
                Ok(Some(reply))
            }
            Ok(Err(_)) => Err(Error::network("Channel listener stopped")),
            Err(_) => Err(Error::Timeout(timeout)),
        }
    }
}

impl Drop for UdpChannel {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Receives datagrams until the channel is dropped
async fn listen(shared: Arc<SharedState>, inbound_tx: mpsc::Sender<Datagram>) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        let (size, peer) = match shared.socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                // ICMP errors for earlier writes surface here
                warn!("Receive on UDP channel to {} failed: {}", shared.remote, e);
                continue;
            }
        };
        let data = Bytes::copy_from_slice(&buf[..size]);

        let waiter = shared.pending.lock().take();
        let data = match waiter {
            Some(reply_tx) => match reply_tx.send(data) {
                Ok(()) => continue,
                Err(data) => data,
            },
            None => data,
        };

        if let Err(e) = inbound_tx.try_send(Datagram { peer, data }) {
            debug!("Dropping unsolicited datagram from {}: {}", peer, e);
        }
    }
}
