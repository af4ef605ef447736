//! Static assets compiled into the binary.
//!
//! `/static/{*path}` and `/favicon.ico` are served from the embedded table
//! unless `assets.dir` points at a directory on disk, which then replaces it.

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::path::Path as FsPath;
use tower_http::services::{ServeDir, ServeFile};

struct Asset {
    path: &'static str,
    content_type: &'static str,
    body: &'static [u8],
}

const FAVICON: Asset = Asset {
    path: "favicon.ico",
    content_type: "image/x-icon",
    body: include_bytes!("../../static/favicon.ico"),
};

const ASSETS: &[Asset] = &[
    Asset {
        path: "app.css",
        content_type: "text/css; charset=utf-8",
        body: include_bytes!("../../static/app.css"),
    },
    FAVICON,
];

fn lookup(path: &str) -> Option<&'static Asset> {
    ASSETS.iter().find(|asset| asset.path == path)
}

fn respond(asset: &Asset) -> Response {
    (
        [
            (header::CONTENT_TYPE, asset.content_type),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        asset.body,
    )
        .into_response()
}

async fn embedded(Path(path): Path<String>) -> Response {
    match lookup(&path) {
        Some(asset) => respond(asset),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

async fn favicon() -> Response {
    respond(&FAVICON)
}

/// Asset routes, from `dir` when given and the embedded table otherwise.
pub fn assets_router(dir: Option<&FsPath>) -> Router {
    match dir {
        Some(dir) => Router::new()
            .nest_service("/static", ServeDir::new(dir))
            .route_service("/favicon.ico", ServeFile::new(dir.join("favicon.ico"))),
        None => Router::new()
            .route("/static/{*path}", get(embedded))
            .route("/favicon.ico", get(favicon)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn fetch(router: Router, path: &str) -> Response {
        router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn serves_embedded_stylesheet() {
        let response = fetch(assets_router(None), "/static/app.css").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/css; charset=utf-8"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(!body.is_empty());
    }

    #[tokio::test]
    async fn serves_embedded_favicon() {
        let response = fetch(assets_router(None), "/favicon.ico").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        // ICO header: reserved 0, type 1.
        assert_eq!(&body[..4], &[0, 0, 1, 0]);
    }

    #[tokio::test]
    async fn unknown_asset_is_not_found() {
        let response = fetch(assets_router(None), "/static/missing.js").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn directory_override_serves_from_disk() {
        let dir = FsPath::new(env!("CARGO_MANIFEST_DIR")).join("static");
        let response = fetch(assets_router(Some(&dir)), "/static/app.css").await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = fetch(assets_router(Some(&dir)), "/favicon.ico").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
