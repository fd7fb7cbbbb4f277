use std::io;
use std::net::{ToSocketAddrs, UdpSocket};
use std::time::Duration;

/// A connected datagram endpoint shared by the generator (send side) and the
/// collector (receive side).
///
/// Implementations must allow `send` and `recv` to be called concurrently from
/// two threads. `recv` blocks for at most the configured poll interval and
/// then fails with `WouldBlock` or `TimedOut`.
pub trait Datagram: Send + Sync {
    fn send(&self, frame: &[u8]) -> io::Result<usize>;

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    fn set_poll_interval(&self, interval: Duration) -> io::Result<()>;
}

impl Datagram for UdpSocket {
    fn send(&self, frame: &[u8]) -> io::Result<usize> {
        UdpSocket::send(self, frame)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        UdpSocket::recv(self, buf)
    }

    fn set_poll_interval(&self, interval: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(interval))
    }
}

/// Binds `local` and connects to `remote`, so replies from any other peer are
/// filtered by the kernel.
pub fn connect_udp(local: impl ToSocketAddrs, remote: impl ToSocketAddrs) -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind(local)?;
    socket.connect(remote)?;
    tracing::info!(
        local = %socket.local_addr()?,
        remote = %socket.peer_addr()?,
        "udp socket connected"
    );
    Ok(socket)
}

/// True for the errors a receive with a read timeout reports when nothing
/// arrived in time.
pub(crate) fn is_poll_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
