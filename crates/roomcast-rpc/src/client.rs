//! Endpoint resolution, stream setup and the client side of the handshake.

use std::path::PathBuf;
use std::str::FromStr;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{ClientEvent, ServerEvent};
use crate::transport::EventCodec;

/// Byte stream an [`EventStream`] can run over.
pub trait AsyncIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncIo for T {}

/// Framed event connection over any byte stream
pub type EventStream = Framed<Box<dyn AsyncIo>, EventCodec>;

/// Where the realtime server listens.
///
/// Written as `tcp:<host>:<port>` or `unix:<path>`. A bare value is a Unix
/// socket path when it contains `/`, otherwise a TCP address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Endpoint {
    Tcp(String),
    Unix(PathBuf),
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Tcp("127.0.0.1:5000".to_string())
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(addr) = s.strip_prefix("tcp:") {
            if addr.is_empty() {
                return Err(Error::InvalidEndpoint(s.to_string()));
            }
            return Ok(Endpoint::Tcp(addr.to_string()));
        }
        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(Error::InvalidEndpoint(s.to_string()));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if s.is_empty() {
            return Err(Error::InvalidEndpoint(s.to_string()));
        }
        if s.contains('/') {
            Ok(Endpoint::Unix(PathBuf::from(s)))
        } else {
            Ok(Endpoint::Tcp(s.to_string()))
        }
    }
}

impl TryFrom<String> for Endpoint {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp:{addr}"),
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Open a framed stream to `endpoint`. No frames are exchanged yet.
///
/// # Errors
///
/// Returns `Error::Io` if the socket connection fails.
pub async fn open(endpoint: &Endpoint) -> Result<EventStream> {
    let io: Box<dyn AsyncIo> = match endpoint {
        Endpoint::Tcp(addr) => {
            let stream = TcpStream::connect(addr.as_str()).await?;
            stream.set_nodelay(true)?;
            Box::new(stream)
        }
        #[cfg(unix)]
        Endpoint::Unix(path) => Box::new(tokio::net::UnixStream::connect(path).await?),
        #[cfg(not(unix))]
        Endpoint::Unix(path) => {
            return Err(Error::InvalidEndpoint(path.display().to_string()));
        }
    };
    Ok(Framed::new(io, EventCodec::new()))
}

/// Authenticate a freshly opened stream.
///
/// Sends the `handshake` frame carrying `token` and waits for the server's
/// verdict.
///
/// # Errors
///
/// Returns `Error::Rejected` when the server answers `connect_error`,
/// `Error::Disconnected` if the stream closes first, and
/// `Error::UnexpectedEvent` for any other first frame.
pub async fn handshake(stream: &mut EventStream, token: &str) -> Result<()> {
    stream
        .send(ClientEvent::handshake(token).into_frame()?)
        .await?;

    let frame = match stream.next().await {
        Some(frame) => frame?,
        None => return Err(Error::Disconnected),
    };

    debug!("Handshake reply: {}", frame.event);
    match ServerEvent::from_frame(frame)? {
        ServerEvent::Connected => Ok(()),
        ServerEvent::ConnectRejected(reason) => Err(Error::Rejected(reason.message)),
        ServerEvent::Room { kind, .. } => Err(Error::UnexpectedEvent(kind.wire_name().to_string())),
        ServerEvent::Unknown(frame) => Err(Error::UnexpectedEvent(frame.event)),
    }
}

/// Wrap an already connected byte stream, e.g. one half of an in-memory pipe.
#[must_use]
pub fn framed<T: AsyncIo + 'static>(io: T) -> EventStream {
    Framed::new(Box::new(io), EventCodec::new())
}
