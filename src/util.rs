//! Socket setup shared by the agent.

use std::io;
use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Bind the agent's UDP socket.
///
/// `SO_REUSEADDR` is set so a restarted agent can rebind its port at once.
/// IPv6 sockets are dual-stack (`IPV6_V6ONLY = false`), so `[::]:161`
/// serves IPv4 managers too. The requested receive buffer is a hint; the
/// kernel caps it at `net.core.rmem_max` and a refusal is not an error.
pub(crate) fn bind_udp_socket(
    addr: SocketAddr,
    recv_buffer_size: Option<usize>,
) -> io::Result<UdpSocket> {
    let domain = Domain::for_address(addr);
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

    if addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;

    if let Some(size) = recv_buffer_size
        && let Err(e) = socket.set_recv_buffer_size(size)
    {
        tracing::debug!(target: "snmp_mib_agent::agent", { requested = size, error = %e }, "receive buffer size not applied");
    }

    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;

    UdpSocket::from_std(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ipv4_ephemeral() {
        let socket = bind_udp_socket("127.0.0.1:0".parse().unwrap(), None).unwrap();
        let local = socket.local_addr().unwrap();
        assert!(local.is_ipv4());
        assert_ne!(local.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_ipv6_loopback() {
        let socket = bind_udp_socket("[::1]:0".parse().unwrap(), None).unwrap();
        assert!(socket.local_addr().unwrap().is_ipv6());
    }

    #[tokio::test]
    async fn test_rebind_after_drop() {
        let socket = bind_udp_socket("127.0.0.1:0".parse().unwrap(), Some(1024 * 1024)).unwrap();
        let addr = socket.local_addr().unwrap();
        drop(socket);

        let again = bind_udp_socket(addr, Some(1024 * 1024)).unwrap();
        assert_eq!(again.local_addr().unwrap(), addr);
    }
}
