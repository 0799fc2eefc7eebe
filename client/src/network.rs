use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use shared::{ClientMessage, ProtocolError, ServerMessage};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("world registration failed with status {0}")]
    Registration(u16),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("connection closed: {}", .0.as_deref().unwrap_or("no reason given"))]
    Closed(Option<String>),
    #[error("timed out waiting for a message")]
    Timeout,
}

/// Turns an `http(s)://` base URL into the matching `ws(s)://` one.
pub fn websocket_url(base: &str, world: &str) -> String {
    let base = base.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/{}", base, world)
}

/// Loads the world page once, which is what registers a world name.
///
/// A 404 only means the server has no client page installed; the name is
/// registered either way.
pub async fn register_world(base: &str, world: &str) -> Result<(), ClientError> {
    let url = format!("{}/{}", base.trim_end_matches('/'), world);
    let status = reqwest::get(&url).await?.status();

    if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
        debug!("Registered {} ({})", url, status);
        Ok(())
    } else {
        Err(ClientError::Registration(status.as_u16()))
    }
}

/// One connection to one world.
pub struct WorldClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WorldClient {
    /// Opens the WebSocket for `world`. `base` may be an `http://` or `ws://` URL.
    pub async fn connect(base: &str, world: &str) -> Result<Self, ClientError> {
        let url = websocket_url(base, world);
        let (stream, _) = connect_async(url.as_str()).await?;
        info!("Connected to {}", url);
        Ok(Self { stream })
    }

    pub async fn send(&mut self, message: &ClientMessage) -> Result<(), ClientError> {
        let json = message.to_json()?;
        self.send_raw(json).await
    }

    /// Sends a text frame verbatim, valid or not.
    pub async fn send_raw(&mut self, text: impl Into<String>) -> Result<(), ClientError> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    pub async fn send_move(
        &mut self,
        x: f64,
        y: f64,
        direction: Option<String>,
    ) -> Result<(), ClientError> {
        self.send(&ClientMessage::Move { x, y, direction }).await
    }

    pub async fn send_viewport(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), ClientError> {
        self.send(&ClientMessage::Viewport {
            x,
            y,
            width,
            height,
        })
        .await
    }

    /// Waits for the next server message, skipping control frames.
    pub async fn next_message(&mut self) -> Result<ServerMessage, ClientError> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                Message::Text(text) => return Ok(ServerMessage::parse(&text)?),
                Message::Close(frame) => {
                    return Err(ClientError::Closed(
                        frame.map(|frame| frame.reason.into_owned()),
                    ))
                }
                _ => {}
            }
        }
        Err(ClientError::Closed(None))
    }

    pub async fn next_message_within(
        &mut self,
        timeout: Duration,
    ) -> Result<ServerMessage, ClientError> {
        tokio::time::timeout(timeout, self.next_message())
            .await
            .map_err(|_| ClientError::Timeout)?
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
