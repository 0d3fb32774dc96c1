//! Test server management.
//!
//! Spawns and manages newswired instances for integration testing.

use std::process::{Child, Command};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::time::sleep;

/// Fast poll cadence for tests; production default is five minutes.
const TEST_POLL_INTERVAL_MS: u64 = 200;

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    _data_dir: TempDir,
}

impl TestServer {
    /// Spawn a new test server scraping the given listing URL.
    pub async fn spawn(port: u16, source_url: &str) -> anyhow::Result<Self> {
        Self::spawn_with(port, source_url, TEST_POLL_INTERVAL_MS).await
    }

    /// Spawn with an explicit poll interval.
    pub async fn spawn_with(
        port: u16,
        source_url: &str,
        poll_interval_ms: u64,
    ) -> anyhow::Result<Self> {
        let data_dir = TempDir::new()?;

        let config_path = data_dir.path().join("config.toml");
        let config_content = format!(
            r#"
[server]
listen = "127.0.0.1:{port}"

[scrape]
source_url = "{source_url}"
poll_interval_ms = {poll_interval_ms}
window_secs = 300

[database]
path = "{db_path}"
"#,
            db_path = data_dir.path().join("test.db").display(),
        );
        std::fs::write(&config_path, config_content)?;

        // Cargo builds and points us at the binary under test.
        let binary_path = env!("CARGO_BIN_EXE_newswired");

        let child = Command::new(binary_path)
            .arg(config_path.to_str().expect("utf-8 temp path"))
            .spawn()?;

        let server = Self {
            child,
            port,
            _data_dir: data_dir,
        };

        server.wait_until_ready().await?;

        Ok(server)
    }

    /// WebSocket URL of the upgrade endpoint.
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Base HTTP URL.
    pub fn http_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Fetch the Prometheus metrics page and return the value of one metric.
    pub async fn metric(&self, name: &str) -> anyhow::Result<f64> {
        let body = reqwest::get(format!("{}/metrics", self.http_url()))
            .await?
            .text()
            .await?;
        for line in body.lines() {
            if let Some(rest) = line.strip_prefix(name)
                && let Some(value) = rest.trim().split_whitespace().next_back()
            {
                return Ok(value.parse()?);
            }
        }
        anyhow::bail!("metric {name} not found")
    }

    /// Wait until the listener accepts connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(("127.0.0.1", self.port)).await.is_ok() {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("server on port {} never became ready", self.port)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
