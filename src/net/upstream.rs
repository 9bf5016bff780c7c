//! Persistent backend connections.
//!
//! # Responsibilities
//! - Open the long-lived connection to each backend at startup
//! - Send a request and perform one bounded receive through a shared `&self`
//! - Close the socket for every holder when a session gives up on it
//!
//! # Design Decisions
//! - One connection per backend, shared by every session routed there
//! - Send/receive are not serialized: concurrent sessions on the same
//!   backend interleave on the socket and may read each other's replies
//! - A closed connection is never reopened here; sessions that need a
//!   fresh link open their own

use std::io;
use std::net::{Shutdown, SocketAddr};
use tokio::net::TcpStream;

/// A TCP connection to one backend, usable through a shared reference.
#[derive(Debug)]
pub struct UpstreamConnection {
    addr: SocketAddr,
    stream: TcpStream,
}

impl UpstreamConnection {
    /// Connect to a backend.
    pub async fn connect(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        tracing::debug!(backend_addr = %addr, "Upstream connection established");

        Ok(Self { addr, stream })
    }

    /// The backend address this connection points at.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Write the whole buffer to the backend.
    pub async fn send(&self, payload: &[u8]) -> io::Result<()> {
        let mut written = 0;
        while written < payload.len() {
            self.stream.writable().await?;
            match self.stream.try_write(&payload[written..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "backend stopped accepting data",
                    ))
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Perform a single receive of at most `buf.len()` bytes.
    ///
    /// Whatever the first successful read returns is the whole response;
    /// no framing is applied. A read of zero bytes means the backend closed
    /// the connection and is reported as an error.
    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            self.stream.readable().await?;
            match self.stream.try_read(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "backend closed the connection",
                    ))
                }
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Shut the socket down in both directions.
    ///
    /// Every session holding this connection sees the shutdown on its next
    /// send or receive.
    pub fn close(&self) {
        if let Err(e) = socket2::SockRef::from(&self.stream).shutdown(Shutdown::Both) {
            if e.kind() != io::ErrorKind::NotConnected {
                tracing::debug!(backend_addr = %self.addr, error = %e, "Upstream shutdown failed");
            }
        }
    }
}
