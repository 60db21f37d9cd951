use std::io::{self, ErrorKind};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, error, info, trace, warn};

use crate::error::MonitorError;
use crate::param::Param;
use crate::session::MonitorSession;
use crate::{decode_with, TagPolicy};

/// Receive buffer size; tracker messages are far smaller.
pub const MAX_DATAGRAM: usize = 1024;

/// Decode one datagram and apply its first argument if the path is known.
///
/// Returns `true` if the session was updated. Anything else is dropped.
pub fn dispatch(session: &MonitorSession, data: &[u8], policy: TagPolicy) -> bool {
    let Some(msg) = decode_with(data, policy) else {
        return false;
    };
    let (Some(param), Some(value)) = (Param::from_path(&msg.path), msg.first_arg()) else {
        trace!(path = %msg.path, "ignoring message");
        return false;
    };
    session.apply(param, value);
    true
}

/// Bind a datagram socket with `SO_REUSEADDR` set.
fn bind_reusable(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

/// Owns the receive thread. Running from [`Listener::start`] until
/// [`Listener::stop`] or a transport error.
pub struct Listener {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Listener {
    pub fn start(
        addr: SocketAddr,
        recv_timeout: Duration,
        policy: TagPolicy,
        session: Arc<MonitorSession>,
    ) -> Result<Self, MonitorError> {
        let socket = bind_reusable(addr).map_err(|source| MonitorError::Bind { addr, source })?;
        socket
            .set_read_timeout(Some(recv_timeout))
            .map_err(MonitorError::Transport)?;
        let local_addr = socket.local_addr().map_err(MonitorError::Transport)?;

        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let handle = std::thread::Builder::new()
            .name("osc-listener".into())
            .spawn(move || receive_loop(socket, &session, policy, &flag))?;

        info!(%local_addr, ?policy, "listening for OSC packets");
        Ok(Self {
            local_addr,
            running,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop receiving and wait for the thread; at most one receive timeout.
    ///
    /// The receive thread owns the socket, so it is closed when that thread
    /// exits, before this returns.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("listener thread panicked");
            }
            debug!(local_addr = %self.local_addr, "listener stopped");
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Decide whether the receive loop survives `err`.
///
/// Timeouts retry. Anything else stops the loop; it is only logged if the
/// listener was still meant to be running.
fn keep_receiving(err: &io::Error, running: &AtomicBool) -> bool {
    if matches!(
        err.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    ) {
        return true;
    }
    if running.swap(false, Ordering::AcqRel) {
        warn!(error = %err, "receive failed, listener stopping");
    }
    false
}

fn receive_loop(
    socket: UdpSocket,
    session: &MonitorSession,
    policy: TagPolicy,
    running: &AtomicBool,
) {
    let mut buf = [0u8; MAX_DATAGRAM];
    while running.load(Ordering::Acquire) {
        match socket.recv_from(&mut buf) {
            Ok((len, src)) => {
                trace!(len, %src, "datagram");
                dispatch(session, &buf[..len], policy);
            }
            Err(e) if keep_receiving(&e, running) => continue,
            Err(_) => break,
        }
    }
}
