//! WebSocket transport adapter.
//!
//! The core consumes any message-framed binary duplex stream; this adapter
//! provides the WebSocket instance of that contract. Binary WebSocket
//! messages map 1:1 to ARCHIVE frames (message boundaries preserved).
//! Text messages are protocol noise and are ignored; ping/pong keepalive is
//! handled inside tungstenite and never surfaces.

use std::net::SocketAddr;

use bytes::Bytes;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    WebSocketStream, accept_async,
    tungstenite::protocol::{
        Message,
        frame::{CloseFrame, coding::CloseCode},
    },
};

use crate::error::ServerError;

/// WebSocket listener.
pub struct WsListener {
    listener: TcpListener,
}

impl WsListener {
    /// Bind a TCP listener for WebSocket upgrades.
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Accept one connection and complete the WebSocket handshake.
    pub async fn accept(&self) -> Result<(WsConnection, SocketAddr), ServerError> {
        let (stream, peer) = self.listener.accept().await?;
        let inner = accept_async(stream)
            .await
            .map_err(|e| ServerError::Transport(format!("websocket handshake failed: {e}")))?;
        Ok((WsConnection { inner }, peer))
    }

    /// Local address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(Into::into)
    }
}

/// One accepted WebSocket session.
pub struct WsConnection {
    inner: WebSocketStream<TcpStream>,
}

impl WsConnection {
    /// Split into independently owned send and receive halves.
    ///
    /// The runtime gives the sink to the connection's single writer task and
    /// the source to its reader task.
    #[must_use]
    pub fn split(self) -> (WsSink, WsSource) {
        let (sink, stream) = self.inner.split();
        (WsSink { sink }, WsSource { stream })
    }
}

/// Outbound half of a WebSocket session.
pub struct WsSink {
    sink: SplitSink<WebSocketStream<TcpStream>, Message>,
}

impl WsSink {
    /// Send one binary message (one ARCHIVE frame).
    pub async fn send(&mut self, bytes: Bytes) -> Result<(), ServerError> {
        self.sink
            .send(Message::binary(bytes))
            .await
            .map_err(|e| ServerError::Transport(e.to_string()))
    }

    /// Best-effort graceful close with a reason.
    pub async fn close(&mut self, reason: &str) {
        let frame = CloseFrame { code: CloseCode::Normal, reason: reason.to_string().into() };
        let _ = self.sink.send(Message::Close(Some(frame))).await;
        let _ = self.sink.close().await;
    }
}

/// Inbound half of a WebSocket session.
pub struct WsSource {
    stream: SplitStream<WebSocketStream<TcpStream>>,
}

impl WsSource {
    /// Next complete binary message.
    ///
    /// `Ok(None)` is a clean close; `Err` is a transport failure (terminal
    /// for the connection, surfaced as `CONNECTION_ERROR`).
    pub async fn recv(&mut self) -> Result<Option<Bytes>, ServerError> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Binary(data)) => return Ok(Some(Bytes::from(data))),
                Ok(Message::Text(_)) => {
                    tracing::warn!("text message on binary transport, ignoring");
                },
                // Keepalive is answered inside tungstenite
                Ok(Message::Ping(_) | Message::Pong(_)) => {},
                Ok(Message::Close(_)) => return Ok(None),
                Ok(Message::Frame(_)) => {},
                Err(e) => return Err(ServerError::Transport(e.to_string())),
            }
        }
        Ok(None)
    }
}
