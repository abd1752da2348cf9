//! Register transport abstraction and its Modbus TCP implementation.
//!
//! [`RegisterTransport`] is the wire session the collector drives. It is
//! a trait so the polling machinery can be exercised without a device on
//! the network; [`TcpTransport`] is the production implementation on top
//! of `tokio-modbus`.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio_modbus::client::{tcp, Client, Context, Reader};
use tokio_modbus::slave::{Slave, SlaveContext};

/// Errors raised by a single transport operation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("transport I/O error: {0}")]
    Io(String),

    #[error("device returned exception {0}")]
    Exception(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport is not connected")]
    NotConnected,

    #[error("expected {expected} registers, got {got}")]
    ShortResponse { expected: u16, got: usize },
}

/// A session able to read holding registers from one endpoint.
pub trait RegisterTransport: Send + 'static {
    /// Open the session, replacing any existing one.
    fn connect(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Function 0x03 against `unit_id`.
    fn read_holding_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, TransportError>> + Send;

    /// Close the session. Safe to call when already closed.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;

    fn is_connected(&self) -> bool;
}

/// Builds transports for a device endpoint.
pub trait TransportFactory: Send + Sync + 'static {
    type Transport: RegisterTransport;

    fn create(&self, host: &str, port: u16, timeout: Duration) -> Self::Transport;
}

/// Modbus TCP session. Every network call is bounded by `timeout`.
pub struct TcpTransport {
    host: String,
    port: u16,
    timeout: Duration,
    ctx: Option<Context>,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            ctx: None,
        }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl RegisterTransport for TcpTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.disconnect().await;

        let address = self.address();
        let open = async {
            let socket_addr = tokio::net::lookup_host(address.as_str())
                .await?
                .next()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "host did not resolve"))?;
            tcp::connect_slave(socket_addr, Slave::tcp_device()).await
        };

        let result = tokio::time::timeout(self.timeout, open).await;
        match result {
            Err(_) => Err(TransportError::Timeout(self.timeout)),
            Ok(Err(e)) => Err(TransportError::Connect {
                address,
                reason: e.to_string(),
            }),
            Ok(Ok(ctx)) => {
                self.ctx = Some(ctx);
                Ok(())
            }
        }
    }

    async fn read_holding_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let timeout = self.timeout;
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;
        ctx.set_slave(Slave(unit_id));

        match tokio::time::timeout(timeout, ctx.read_holding_registers(address, count)).await {
            Err(_) => Err(TransportError::Timeout(timeout)),
            Ok(Err(e)) => Err(TransportError::Io(e.to_string())),
            Ok(Ok(Err(code))) => Err(TransportError::Exception(format!("{code:?}"))),
            Ok(Ok(Ok(words))) => Ok(words),
        }
    }

    async fn disconnect(&mut self) {
        let Some(mut ctx) = self.ctx.take() else {
            return;
        };
        match tokio::time::timeout(self.timeout, ctx.disconnect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(address = %self.address(), error = %e, "Error closing Modbus session");
            }
            Err(_) => {
                tracing::debug!(address = %self.address(), "Timed out closing Modbus session");
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }
}

/// Creates a [`TcpTransport`] per device.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransportFactory;

impl TransportFactory for TcpTransportFactory {
    type Transport = TcpTransport;

    fn create(&self, host: &str, port: u16, timeout: Duration) -> TcpTransport {
        TcpTransport::new(host, port, timeout)
    }
}
