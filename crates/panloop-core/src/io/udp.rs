//! UDP datagram sender.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// A connected UDP socket aimed at one destination.
#[derive(Debug)]
pub struct UdpSender {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpSender {
    /// Bind an ephemeral local port and connect it to `host:port`.
    pub fn connect(host: &str, port: u16) -> io::Result<Self> {
        let peer = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("no address found for {host}:{port}"),
                )
            })?;
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.connect(peer)?;
        Ok(Self { socket, peer })
    }

    /// Send one datagram. Returns the number of bytes sent.
    pub fn send(&self, data: &[u8]) -> io::Result<usize> {
        self.socket.send(data)
    }

    /// The configured destination.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// The local address the socket bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}
