use socket2::{Domain, Socket, Type};
use std::io;
use std::net::{AddrParseError, SocketAddr};
use tokio::net::TcpListener;

/// Non-blocking listening socket with `SO_REUSEPORT`, so a restarted process
/// can bind while the old one drains.
pub fn listen_reuse_socket(addr: &SocketAddr) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, None)?;
    socket.set_nonblocking(true)?;
    socket.set_reuse_port(true)?;
    socket.set_reuse_address(true)?;
    socket.bind(&(*addr).into())?;
    socket.listen(128)?;
    Ok(socket)
}

/// Tokio listener on a reuse-port socket. Must be called inside a runtime.
pub fn listen(addr: &SocketAddr) -> io::Result<TcpListener> {
    let socket = listen_reuse_socket(addr)?;
    TcpListener::from_std(socket.into())
}

/// Parses `host:port`; a bare `:port` listens on all IPv4 interfaces.
pub fn parse_address(addr: &str) -> Result<SocketAddr, AddrParseError> {
    if addr.starts_with(':') {
        return format!("0.0.0.0{}", addr).parse();
    }

    addr.parse()
}
