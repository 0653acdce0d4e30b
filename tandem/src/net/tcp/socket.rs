//! Blocking connection establishment.
//!
//! A socket is opened first, then the host is resolved, then the handshake
//! runs in blocking mode. Only a fully connected descriptor, already switched
//! to non-blocking mode, leaves this module.

use super::builder::ClientConfig;
use crate::error::ClientError;
use crate::reactor::poller::platform::{
    sys_connect, sys_domain, sys_set_nodelay, sys_set_nonblocking, sys_socket,
};

use libc::{AF_INET, AF_INET6};
use tracing::{debug, error};

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::os::fd::{AsRawFd, OwnedFd};

/// Opens, resolves and connects, returning a non-blocking connected socket.
///
/// Every failure closes whatever socket was opened.
pub(crate) fn establish(
    host: &str,
    port: u16,
    config: &ClientConfig,
) -> Result<OwnedFd, ClientError> {
    let socket = sys_socket(AF_INET).map_err(|err| {
        error!(error = %err, "could not create socket");
        ClientError::SocketCreationFailed(err)
    })?;

    let addr = resolve(host, port)?;

    // IPv6-only hosts need a socket of the matching family.
    let socket = if sys_domain(&addr) == AF_INET6 {
        sys_socket(AF_INET6).map_err(|err| {
            error!(error = %err, "could not create IPv6 socket");
            ClientError::SocketCreationFailed(err)
        })?
    } else {
        socket
    };

    let connect_failed = |source: io::Error| {
        error!(host, port, error = %source, "could not connect");
        ClientError::ConnectFailed {
            host: host.to_owned(),
            port,
            source,
        }
    };

    sys_connect(&socket, &addr).map_err(connect_failed)?;

    let fd = socket.as_raw_fd();
    sys_set_nonblocking(fd).map_err(connect_failed)?;

    if config.nodelay {
        sys_set_nodelay(fd).map_err(connect_failed)?;
    }

    debug!(fd, %addr, "handshake completed");
    Ok(socket)
}

/// Resolves `host`, preferring IPv4 addresses.
fn resolve(host: &str, port: u16) -> Result<SocketAddr, ClientError> {
    let resolution_failed = |source: io::Error| {
        error!(host, error = %source, "could not resolve host");
        ClientError::HostResolutionFailed {
            host: host.to_owned(),
            source,
        }
    };

    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(resolution_failed)?
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| {
            resolution_failed(io::Error::new(
                io::ErrorKind::NotFound,
                "host resolved to no addresses",
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::TcpListener;

    #[test]
    fn test_resolve_ip_literal() {
        let addr = resolve("127.0.0.1", 6379).expect("Failed to resolve literal");

        assert_eq!(addr, "127.0.0.1:6379".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_establish_connects_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let port = listener.local_addr().expect("Failed to get local address").port();

        let socket = establish("127.0.0.1", port, &ClientConfig::default())
            .expect("Failed to connect");

        assert!(socket.as_raw_fd() >= 0);
    }

    #[test]
    fn test_establish_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let port = listener.local_addr().expect("Failed to get local address").port();
        drop(listener);

        let err = establish("127.0.0.1", port, &ClientConfig::default())
            .expect_err("Connect should fail");

        assert!(matches!(err, ClientError::ConnectFailed { port: p, .. } if p == port));
    }
}
