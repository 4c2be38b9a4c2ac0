// Copyright PingCAP Inc. 2025.
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; version 2 of the License.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use crate::http::StateHttpHandler;
use async_trait::async_trait;
use axum::Router;
use std::net::SocketAddr;

#[async_trait]
pub trait ConnectionManager: Send + Sync + 'static {
    async fn serve(&self, addr: SocketAddr)
        -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Bind a TCP listener with TCP_NODELAY and SO_REUSEADDR set.
pub fn bind_listener(addr: SocketAddr) -> std::io::Result<tokio::net::TcpListener> {
    use socket2::{Domain, Protocol, Socket, Type};

    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // State documents are small and lock calls are latency-bound
    socket.set_nodelay(true)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(1024)?;

    tokio::net::TcpListener::from_std(socket.into())
}

async fn serve_router(
    name: &'static str,
    app: Router,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = bind_listener(addr)?;
    tracing::info!(listener = name, addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Serves the state, delete and lock endpoints.
#[derive(Clone)]
pub struct HttpConnectionManager {
    handler: StateHttpHandler,
}

impl HttpConnectionManager {
    pub fn new(handler: StateHttpHandler) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl ConnectionManager for HttpConnectionManager {
    async fn serve(
        &self,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        serve_router("state", self.handler.clone().router(), addr).await
    }
}

/// Serves /health and /metrics on a separate address.
#[derive(Clone)]
pub struct OpsConnectionManager {
    handler: StateHttpHandler,
}

impl OpsConnectionManager {
    pub fn new(handler: StateHttpHandler) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl ConnectionManager for OpsConnectionManager {
    async fn serve(
        &self,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        serve_router("ops", self.handler.clone().ops_router(), addr).await
    }
}
