//! Stub listing site.
//!
//! A minimal HTTP server that answers every request with the current canned
//! listing page, shaped like the real front-page markup (athing rows plus
//! sibling subtext rows). Tests swap the page content at runtime to
//! simulate the listing changing between scrape cycles.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// One story on the stub listing.
pub struct Story {
    pub id: &'static str,
    pub title: &'static str,
    pub url: &'static str,
    /// Age relative to now, in seconds.
    pub age_secs: i64,
    pub points: i64,
    pub author: &'static str,
}

/// A stub listing server with swappable content.
pub struct StubListing {
    addr: SocketAddr,
    body: Arc<Mutex<String>>,
}

impl StubListing {
    /// Bind to an ephemeral port and start serving.
    pub async fn start() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let body = Arc::new(Mutex::new(render(&[])));

        let served = Arc::clone(&body);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let html = served.lock().unwrap().clone();
                tokio::spawn(async move {
                    // Drain the request head, then answer with the canned page.
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        html.len(),
                        html
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Ok(Self { addr, body })
    }

    /// Listing URL for the server config.
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Replace the served listing.
    pub fn set_listing(&self, stories: &[Story]) {
        *self.body.lock().unwrap() = render(stories);
    }
}

/// Render stories as front-page-shaped HTML.
fn render(stories: &[Story]) -> String {
    let now = chrono::Utc::now().timestamp();
    let mut rows = String::new();

    for story in stories {
        let published = now - story.age_secs;
        let iso = chrono::DateTime::from_timestamp(published, 0)
            .expect("fixture timestamp in range")
            .format("%Y-%m-%dT%H:%M:%S");
        rows.push_str(&format!(
            r#"<tr class='athing' id='{id}'>
  <td class="title"><span class="titleline"><a href="{url}">{title}</a></span></td>
</tr>
<tr>
  <td class="subtext">
    <span class="score" id="score_{id}">{points} points</span> by
    <a class="hnuser" href="user?id={author}">{author}</a>
    <span class="age" title="{iso} {published}"><a href="item?id={id}">recently</a></span>
  </td>
</tr>
"#,
            id = story.id,
            url = story.url,
            title = story.title,
            points = story.points,
            author = story.author,
            iso = iso,
            published = published,
        ));
    }

    format!("<html><body><table>\n{rows}</table></body></html>")
}
