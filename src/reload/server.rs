// src/reload/server.rs

//! Development server: static output directory plus the reload event stream.
//!
//! HTML pages leave the server with a `<script>` tag for the reload client
//! inserted before `</body>`, so built pages need no changes to pick up
//! reloads.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures::{Stream, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use super::ViewerRegistry;
use crate::config::ServerSection;
use crate::errors::Result;

/// Path of the Server-Sent Events stream.
pub const EVENTS_PATH: &str = "/__assetpipe/events";

/// Path of the browser client script.
pub const CLIENT_PATH: &str = "/__assetpipe/client.js";

/// Pages larger than this are served without the client script.
const MAX_INJECT_BYTES: usize = 16 * 1024 * 1024;

/// Browser side: listens on [`EVENTS_PATH`], reloads the page on `refresh`
/// and re-fetches stylesheets on `inject`.
const CLIENT_JS: &str = r#"(function () {
  var source = new EventSource("/__assetpipe/events");
  source.addEventListener("refresh", function () {
    window.location.reload();
  });
  source.addEventListener("inject", function () {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    for (var i = 0; i < links.length; i++) {
      var url = new URL(links[i].href);
      url.searchParams.set("assetpipe", Date.now().toString());
      links[i].href = url.toString();
    }
  });
})();
"#;

/// Running server. Dropping the handle stops it.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Routes: reload stream, client script, and the output directory for
/// everything else.
pub fn router(registry: ViewerRegistry, out_dir: impl Into<PathBuf>) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(events))
        .route(CLIENT_PATH, get(client_script))
        .fallback_service(ServeDir::new(out_dir.into()).append_index_html_on_directories(true))
        .layer(middleware::map_response(inject_client))
        .with_state(registry)
}

/// `html` with the client `<script>` tag before the last `</body>`, or
/// appended when there is none.
pub fn with_client_script(html: &str) -> String {
    let tag = format!(r#"<script src="{CLIENT_PATH}"></script>"#);
    // ASCII lowercasing keeps byte offsets intact.
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => format!("{}{tag}{}", &html[..at], &html[at..]),
        None => format!("{html}{tag}"),
    }
}

async fn inject_client(resp: Response) -> Response {
    let is_page = resp.status() == StatusCode::OK
        && resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"));
    if !is_page {
        return resp;
    }

    let (mut parts, body) = resp.into_parts();
    let bytes = match to_bytes(body, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "could not buffer page for reload client");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let page = with_client_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(page))
}

/// Bind `host:port` and serve in the background.
pub async fn spawn_server(
    cfg: &ServerSection,
    out_dir: impl Into<PathBuf>,
    registry: ViewerRegistry,
) -> Result<ServerHandle> {
    let out_dir = out_dir.into();
    let listener = TcpListener::bind((cfg.host.as_str(), cfg.port))
        .await
        .with_context(|| format!("binding live-reload server to {}:{}", cfg.host, cfg.port))?;
    let addr = listener.local_addr()?;

    let app = router(registry, out_dir.clone());
    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!(error = %err, "live-reload server stopped");
        }
    });

    info!(%addr, root = ?out_dir, "live-reload server listening");
    Ok(ServerHandle { addr, task })
}

async fn events(
    State(registry): State<ViewerRegistry>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let session = registry.connect();
    let stream = session.map(|ev| {
        Ok(Event::default()
            .event(ev.kind.to_string())
            .data(ev.task))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], CLIENT_JS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn serves_client_script() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(ViewerRegistry::new(), dir.path());

        let resp = app
            .oneshot(Request::get(CLIENT_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("EventSource"));
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn served_pages_load_the_reload_client() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html><body>hi</body></html>").unwrap();
        let app = router(ViewerRegistry::new(), dir.path());

        let (status, body) = get_body(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            format!(r#"<html><body>hi<script src="{CLIENT_PATH}"></script></body></html>"#)
        );
    }

    #[tokio::test]
    async fn other_assets_are_served_untouched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/main.min.css"), "body{}").unwrap();
        let app = router(ViewerRegistry::new(), dir.path());

        let (status, body) = get_body(app, "/css/main.min.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body{}");
    }

    #[test]
    fn client_tag_goes_before_the_last_body_close() {
        let tag = format!(r#"<script src="{CLIENT_PATH}"></script>"#);
        assert_eq!(
            with_client_script("<p></p></BODY>"),
            format!("<p></p>{tag}</BODY>")
        );
        assert_eq!(with_client_script("<h1>hi</h1>"), format!("<h1>hi</h1>{tag}"));
    }

    #[tokio::test]
    async fn event_stream_registers_a_viewer() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ViewerRegistry::new();
        let app = router(registry.clone(), dir.path());

        let resp = app
            .oneshot(Request::get(EVENTS_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(registry.len(), 1);

        drop(resp);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn spawned_server_binds_ephemeral_port() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ServerSection {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let handle = spawn_server(&cfg, dir.path(), ViewerRegistry::new())
            .await
            .unwrap();
        assert_ne!(handle.local_addr().port(), 0);
    }
}
