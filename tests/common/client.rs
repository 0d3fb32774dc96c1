//! Test WebSocket client.
//!
//! Connects to a test server's upgrade endpoint and receives the JSON
//! frames the server pushes; there is nothing to send.

use anyhow::anyhow;
use futures_util::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// A test client bound to one live connection.
pub struct TestClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect and upgrade.
    pub async fn connect(ws_url: &str) -> anyhow::Result<Self> {
        let (stream, _response) = connect_async(ws_url).await?;
        Ok(Self { stream })
    }

    /// Receive a single JSON frame, with the default timeout.
    pub async fn recv_json(&mut self) -> anyhow::Result<Value> {
        self.recv_json_timeout(Duration::from_secs(5)).await
    }

    /// Receive a single JSON frame within `dur`.
    pub async fn recv_json_timeout(&mut self, dur: Duration) -> anyhow::Result<Value> {
        let frame = timeout(dur, self.stream.next())
            .await
            .map_err(|_| anyhow!("timed out waiting for a frame"))?
            .ok_or_else(|| anyhow!("connection closed"))??;

        match frame {
            Message::Text(text) => Ok(serde_json::from_str(&text)?),
            other => Err(anyhow!("expected a text frame, got: {other:?}")),
        }
    }

    /// Assert that no frame arrives for the given duration.
    pub async fn expect_silence(&mut self, dur: Duration) -> anyhow::Result<()> {
        match timeout(dur, self.stream.next()).await {
            Err(_) => Ok(()),
            Ok(None) => Err(anyhow!("connection closed during expected silence")),
            Ok(Some(Ok(frame))) => Err(anyhow!("expected silence, got: {frame:?}")),
            Ok(Some(Err(e))) => Err(e.into()),
        }
    }

    /// Close the connection cleanly.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
