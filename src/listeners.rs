use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;

// Binds the serving socket. A host of "*" asks for a wildcard listener,
// preferring an IPv6 socket with dual-stack enabled and falling back to
// plain IPv4 when IPv6 is unavailable.
pub async fn create_listener(
    host: &str,
    port: u16,
) -> std::io::Result<(String, tokio::net::TcpListener)> {
    if host == "*" {
        return bind_wildcard(port);
    }

    let addr = format!("{}:{}", host, port);
    tracing::info!("Binding server to {}...", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    Ok((addr, listener))
}

fn bind_wildcard(port: u16) -> std::io::Result<(String, tokio::net::TcpListener)> {
    match bind_dual_stack(port) {
        Ok(bound) => Ok(bound),
        Err(e) => {
            tracing::warn!("IPv6 wildcard bind failed ({}), falling back to IPv4", e);
            bind_ipv4_wildcard(port)
        }
    }
}

fn bind_dual_stack(port: u16) -> std::io::Result<(String, tokio::net::TcpListener)> {
    let str_addr = format!("[::]:{}", port);
    let addr: SocketAddr = str_addr.parse().expect("wildcard IPv6 address");

    tracing::info!("Binding server to {} (IPv6 + IPv4 dual-stack)...", str_addr);

    let socket = Socket::new(Domain::IPV6, Type::STREAM, Some(Protocol::TCP))?;

    // Dual-stack mode may be refused on some systems; a v6-only listener is
    // still better than none.
    if let Err(e) = socket.set_only_v6(false) {
        tracing::warn!("Could not enable dual-stack mode: {}. Continuing anyway.", e);
    }

    into_tokio_listener(socket, &addr).map(|l| (str_addr, l))
}

fn bind_ipv4_wildcard(port: u16) -> std::io::Result<(String, tokio::net::TcpListener)> {
    let str_addr = format!("0.0.0.0:{}", port);
    let addr: SocketAddr = str_addr.parse().expect("wildcard IPv4 address");

    tracing::info!("Binding server to {} (IPv4)...", str_addr);

    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    into_tokio_listener(socket, &addr).map(|l| (str_addr, l))
}

fn into_tokio_listener(
    socket: Socket,
    addr: &SocketAddr,
) -> std::io::Result<tokio::net::TcpListener> {
    socket.set_reuse_address(true)?;
    socket.bind(&(*addr).into())?;
    socket.listen(1024)?;
    // tokio requires the socket in non-blocking mode
    socket.set_nonblocking(true)?;

    let std_listener: std::net::TcpListener = socket.into();
    tokio::net::TcpListener::from_std(std_listener)
}
