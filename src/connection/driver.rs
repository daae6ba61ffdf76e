//! Tokio transport driver for the connection module.
//!
//! [`run`] dials the link's target, hands the established socket to the
//! [`ConnLink`] and pumps received bytes into it until the stream ends.
//! The caller owns the task:
//!
//! ```no_run
//! # async fn demo() -> slirc_client::Result<()> {
//! use slirc_client::connection::{driver, ClientConnection};
//! use slirc_client::Irc;
//!
//! let irc = Irc::new();
//! let conn = irc.load(|irc| ClientConnection::new(irc, "irc.example.org"))?;
//! tokio::spawn(driver::run(conn.link()));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::Result;

use super::link::{ConnLink, Socket};

const READ_BUFFER_SIZE: usize = 4096;

/// Dials the link's target and drives the transport until it closes.
///
/// Begins the connection attempt on the link (a no-op returning early if
/// the link is not currently disconnected), performs the TCP handshake
/// (plus TLS for `ircs://` targets with the `tls` feature), then reads
/// until EOF or error. Status changes surface on the context queue as
/// `StatusChangeEvent`s; the OS error behind a failure is logged, not part
/// of the event surface.
pub async fn run(link: Arc<ConnLink>) -> Result<()> {
    if !link.begin_connect() {
        debug!(server = %link.target(), "connect ignored: link not disconnected");
        return Ok(());
    }

    let target = link.target().clone();
    let stream = match TcpStream::connect((target.host.as_str(), target.port)).await {
        Ok(stream) => stream,
        Err(error) => {
            warn!(%error, server = %target, "connect failed");
            link.transport_closed();
            return Err(error.into());
        }
    };

    if let Err(error) = enable_keepalive(&stream) {
        warn!(%error, "failed to enable TCP keepalive");
    }

    if target.tls {
        #[cfg(feature = "tls")]
        {
            let tls_stream = match tls::upgrade(stream, &target.host).await {
                Ok(stream) => stream,
                Err(error) => {
                    warn!(%error, server = %target, "TLS handshake failed");
                    link.transport_closed();
                    return Err(error);
                }
            };
            return pump(link, tls_stream).await;
        }
        #[cfg(not(feature = "tls"))]
        {
            warn!(server = %target, "ircs:// target but TLS support not compiled in");
            link.transport_closed();
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "TLS support not compiled in",
            )
            .into());
        }
    }

    pump(link, stream).await
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));
    sock.set_tcp_keepalive(&keepalive)
}

/// Commands from the connection module to the writer task.
enum WriteCommand {
    Data(Vec<u8>),
    Shutdown,
}

/// Egress handle handed to the link; forwards writes to the writer task.
struct ChannelSocket {
    tx: mpsc::UnboundedSender<WriteCommand>,
}

impl Socket for ChannelSocket {
    fn send(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.tx
            .send(WriteCommand::Data(data.to_vec()))
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "writer task gone"))
    }

    fn shutdown(&mut self) -> std::io::Result<()> {
        self.tx
            .send(WriteCommand::Shutdown)
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "writer task gone"))
    }
}

/// Pumps the established stream: spawns the writer task and reads until
/// the stream ends, feeding bytes into the link.
async fn pump<S>(link: Arc<ConnLink>, stream: S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let writer_task = tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                WriteCommand::Data(data) => {
                    if let Err(error) = writer.write_all(&data).await {
                        warn!(%error, "transport write failed");
                        break;
                    }
                }
                WriteCommand::Shutdown => {
                    if let Err(error) = writer.shutdown().await {
                        debug!(%error, "transport shutdown failed");
                    }
                    break;
                }
            }
        }
    });

    if !link.transport_connected(Box::new(ChannelSocket { tx })) {
        // The attempt was aborted while dialing.
        link.transport_closed();
        writer_task.abort();
        return Ok(());
    }

    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    let result = loop {
        match reader.read_buf(&mut buf).await {
            Ok(0) => break Ok(()),
            Ok(_) => {
                link.receive(&buf);
                buf.clear();
            }
            Err(error) => {
                warn!(%error, "transport read failed");
                break Err(error.into());
            }
        }
    };

    link.transport_closed();
    writer_task.abort();
    result
}

#[cfg(feature = "tls")]
mod tls {
    use std::sync::Arc;

    use tokio::net::TcpStream;
    use tokio_rustls::client::TlsStream;
    use tokio_rustls::rustls::pki_types::ServerName;
    use tokio_rustls::rustls::{ClientConfig, RootCertStore};
    use tokio_rustls::TlsConnector;
    use tracing::warn;

    use crate::error::Result;

    /// Upgrades a TCP stream to TLS using the system root certificates.
    pub(super) async fn upgrade(stream: TcpStream, hostname: &str) -> Result<TlsStream<TcpStream>> {
        let mut roots = RootCertStore::empty();
        let certs = rustls_native_certs::load_native_certs();
        for cert in certs.certs {
            if let Err(error) = roots.add(cert) {
                warn!(%error, "failed to add root certificate");
            }
        }
        for error in &certs.errors {
            warn!(%error, "error loading native certificates");
        }

        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(config));
        let server_name = ServerName::try_from(hostname.to_string())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        Ok(connector.connect(server_name, stream).await?)
    }
}
