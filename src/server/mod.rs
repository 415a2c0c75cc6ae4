//! Preview server for the generated site

use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::commands::generate;
use crate::Site;

/// Router serving `public_dir` under the site's base path, with
/// `index.html` for directory paths
pub fn router(public_dir: PathBuf, base_path: &str) -> Router {
    let files = ServeDir::new(public_dir).append_index_html_on_directories(true);

    let prefix = base_path.trim_matches('/');
    let router = if prefix.is_empty() {
        Router::new().fallback_service(files)
    } else {
        Router::new().nest_service(&format!("/{}", prefix), files)
    };
    router.layer(TraceLayer::new_for_http())
}

/// Start the preview server, regenerating on change when `watch` is set
pub async fn start(site: &Site, ip: &str, port: u16, watch: bool) -> Result<()> {
    let app = router(site.public_dir.clone(), &site.config.base_path());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}{}", ip, port, site.config.base_path());
    println!("Press Ctrl+C to stop.");

    if watch {
        let site = site.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = generate::watch(&site) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Serve `dir` under `base_path` and return the raw response to `GET path`
    async fn get(dir: &TempDir, base_path: &str, path: &str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(dir.path().to_path_buf(), base_path);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    fn site_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("2023/08/27/fargate")).unwrap();
        std::fs::write(
            dir.path().join("2023/08/27/fargate/index.html"),
            "<h1>Fargate</h1>",
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_serves_index_for_directories() {
        let dir = site_dir();
        let response = get(&dir, "/", "/2023/08/27/fargate/").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("<h1>Fargate</h1>"));
    }

    #[tokio::test]
    async fn test_serves_under_base_path() {
        let dir = site_dir();
        let response = get(&dir, "/blog/", "/blog/2023/08/27/fargate/").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("<h1>Fargate</h1>"));

        let outside = get(&dir, "/blog/", "/2023/08/27/fargate/").await;
        assert!(outside.starts_with("HTTP/1.1 404"));
    }
}
