//! Text-message transport to the server.
//!
//! The WebSocket runs on a blocking `TcpStream` with a short read timeout, so
//! `poll` doubles as the event loop's only wait.

use std::io;
use std::net::TcpStream;
use std::time::Duration;

use thiserror::Error;
use tungstenite::handshake::HandshakeError;
use tungstenite::http::Uri;
use tungstenite::{Message, WebSocket};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid server url `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: tungstenite::http::uri::InvalidUri,
    },

    #[error("unsupported scheme in `{0}` (expected ws://)")]
    UnsupportedScheme(String),

    #[error("server url `{0}` has no host")]
    MissingHost(String),

    #[error("failed to connect to {addr}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("websocket handshake failed")]
    Handshake(#[source] tungstenite::Error),

    #[error("failed to configure socket")]
    Socket(#[source] io::Error),

    #[error("websocket error")]
    WebSocket(#[from] tungstenite::Error),

    #[error("binary message is not valid UTF-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

/// Result of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Message(String),
    /// Nothing arrived within the poll interval.
    Idle,
    /// The peer closed the connection.
    Closed,
}

/// Bidirectional channel of text messages.
pub trait Transport {
    fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Waits up to the poll interval for the next message.
    fn poll(&mut self) -> Result<Received, TransportError>;

    /// Best effort; errors are logged, not returned.
    fn close(&mut self);
}

/// Plain `ws://` client.
pub struct WsTransport {
    socket: WebSocket<TcpStream>,
}

impl WsTransport {
    pub fn connect(url: &str, poll_interval: Duration) -> Result<Self, TransportError> {
        let (host, port) = server_address(url)?;

        let addr = if host.contains(':') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };
        let stream = TcpStream::connect((host.as_str(), port)).map_err(|source| TransportError::Connect {
            addr: addr.clone(),
            source,
        })?;
        stream.set_nodelay(true).map_err(TransportError::Socket)?;

        let (socket, _response) = tungstenite::client(url, stream).map_err(|e| match e {
            HandshakeError::Failure(err) => TransportError::Handshake(err),
            HandshakeError::Interrupted(_) => TransportError::Handshake(
                tungstenite::Error::Io(io::ErrorKind::WouldBlock.into()),
            ),
        })?;

        // Zero would mean "block forever".
        let timeout = poll_interval.max(Duration::from_millis(1));
        socket
            .get_ref()
            .set_read_timeout(Some(timeout))
            .map_err(TransportError::Socket)?;

        log::info!("connected to {addr}");
        Ok(Self { socket })
    }
}

/// Host and port to dial for a `ws://` URL. IPv6 literals come back without
/// their brackets.
fn server_address(url: &str) -> Result<(String, u16), TransportError> {
    let uri: Uri = url.parse().map_err(|source| TransportError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    if uri.scheme_str() != Some("ws") {
        return Err(TransportError::UnsupportedScheme(url.to_string()));
    }
    let host = uri
        .host()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| TransportError::MissingHost(url.to_string()))?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    Ok((host.to_string(), uri.port_u16().unwrap_or(80)))
}

impl Transport for WsTransport {
    fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        log::trace!("-> {text}");
        self.socket.send(Message::text(text))?;
        Ok(())
    }

    fn poll(&mut self) -> Result<Received, TransportError> {
        match self.socket.read() {
            Ok(Message::Text(text)) => Ok(Received::Message(text.as_str().to_owned())),
            Ok(Message::Binary(bytes)) => Ok(Received::Message(String::from_utf8(bytes.to_vec())?)),
            Ok(Message::Close(_)) => Ok(Received::Closed),
            // Pings are answered by tungstenite on the next read/write.
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => Ok(Received::Idle),
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                Ok(Received::Idle)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(Received::Closed)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) {
        match self.socket.close(None) {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {}
            Err(e) => log::debug!("close: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn poll_until(t: &mut WsTransport, want: fn(&Received) -> bool) -> Received {
        for _ in 0..500 {
            let got = t.poll().unwrap();
            if want(&got) {
                return got;
            }
        }
        panic!("timed out waiting on the transport");
    }

    #[test]
    fn exchanges_text_and_sees_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            ws.send(Message::text(r#"{"cmd":"get_controller"}"#)).unwrap();

            let reply = ws.read().unwrap();
            ws.close(None).unwrap();
            while ws.read().is_ok() {}
            reply.into_text().unwrap().as_str().to_owned()
        });

        let mut t = WsTransport::connect(&format!("ws://127.0.0.1:{port}"), Duration::from_millis(10)).unwrap();

        let got = poll_until(&mut t, |r| matches!(r, Received::Message(_)));
        assert_eq!(got, Received::Message(r#"{"cmd":"get_controller"}"#.to_string()));

        t.send_text(r#"{"continue":true}"#.to_string()).unwrap();
        assert_eq!(poll_until(&mut t, |r| *r == Received::Closed), Received::Closed);
        t.close();

        assert_eq!(server.join().unwrap(), r#"{"continue":true}"#);
    }

    #[test]
    fn rejects_non_ws_urls() {
        let err = WsTransport::connect("http://127.0.0.1:1", Duration::from_millis(5)).err().unwrap();
        assert!(matches!(err, TransportError::UnsupportedScheme(_)));

        let err = WsTransport::connect("wss://127.0.0.1:1", Duration::from_millis(5)).err().unwrap();
        assert!(matches!(err, TransportError::UnsupportedScheme(_)));
    }

    #[test]
    fn server_address_unwraps_ipv6_literals() {
        assert_eq!(server_address("ws://[::1]:9001").unwrap(), ("::1".to_string(), 9001));
        assert_eq!(server_address("ws://10.0.0.2:7000/").unwrap(), ("10.0.0.2".to_string(), 7000));
        assert_eq!(server_address("ws://game").unwrap(), ("game".to_string(), 80));
    }

    #[test]
    fn refused_connection_is_an_error() {
        // Bind then drop to get a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let err = WsTransport::connect(&format!("ws://127.0.0.1:{port}"), Duration::from_millis(5)).err().unwrap();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
