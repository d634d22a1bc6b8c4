// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::discover_links;
use crate::engines::reqwest_engine::{ReqwestEngine, DEFAULT_USER_AGENT};
use crate::engines::traits::{FetchErrorKind, PageFetcher};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use std::time::Duration;
use tokio::net::TcpListener;

fn large_page(links: usize) -> String {
    let anchors: String = (0..links)
        .map(|i| format!(r#"<p>item {i}</p><a href="/items/{i}">Item {i}</a>"#))
        .collect();
    format!("<html><body>{}</body></html>", anchors)
}

async fn start_test_server() -> String {
    let app = Router::new()
        .route(
            "/test",
            get(|| async {
                Response::builder()
                    .header("content-type", "text/html")
                    .body(
                        r#"<html><body>Test content
                            <a href="/about">About</a>
                            <a href="https://other.test/x#frag">Other</a>
                        </body></html>"#
                            .to_string(),
                    )
                    .unwrap()
            }),
        )
        .route("/moved", get(|| async { Redirect::permanent("/test") }))
        .route(
            "/error",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR.into_response() }),
        )
        .route(
            "/file.pdf",
            get(|| async {
                Response::builder()
                    .header("content-type", "application/pdf")
                    .body("%PDF-1.7".to_string())
                    .unwrap()
            }),
        )
        .route(
            "/large",
            get(|| async {
                Response::builder()
                    .header("content-type", "text/html; charset=utf-8")
                    .body(large_page(500))
                    .unwrap()
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn engine(timeout: Duration) -> ReqwestEngine {
    ReqwestEngine::new(DEFAULT_USER_AGENT, timeout).unwrap()
}

#[tokio::test]
async fn test_reqwest_engine_basic_fetch() {
    let server_url = start_test_server().await;
    let url = format!("{}/test", server_url);

    let snapshot = engine(Duration::from_secs(10)).fetch(&url).await.unwrap();

    assert_eq!(snapshot.status_code, 200);
    assert_eq!(snapshot.url, url);
    assert!(snapshot.content.contains("Test content"));
    assert!(snapshot.is_html());
    assert!(snapshot.links.contains(&format!("{}/about", server_url)));
    assert!(snapshot.links.contains("https://other.test/x"));
    assert_eq!(snapshot.links.len(), 2);
}

#[tokio::test]
async fn test_reqwest_engine_follows_redirects() {
    let server_url = start_test_server().await;
    let url = format!("{}/moved", server_url);

    let snapshot = engine(Duration::from_secs(10)).fetch(&url).await.unwrap();

    assert_eq!(snapshot.url, url);
    assert_eq!(snapshot.final_url, format!("{}/test", server_url));
}

#[tokio::test]
async fn test_reqwest_engine_error_status_is_network_error() {
    let server_url = start_test_server().await;
    let err = engine(Duration::from_secs(10))
        .fetch(&format!("{}/error", server_url))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FetchErrorKind::Network);
    assert!(err.message.contains("500"));
}

#[tokio::test]
async fn test_reqwest_engine_rejects_non_html() {
    let server_url = start_test_server().await;
    let err = engine(Duration::from_secs(10))
        .fetch(&format!("{}/file.pdf", server_url))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FetchErrorKind::ParseFailure);
}

#[tokio::test]
async fn test_reqwest_engine_timeout() {
    let server_url = start_test_server().await;
    let err = engine(Duration::from_millis(200))
        .fetch(&format!("{}/slow", server_url))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FetchErrorKind::Timeout);
}

#[tokio::test]
async fn test_reqwest_engine_connection_refused() {
    // bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = engine(Duration::from_secs(5))
        .fetch(&format!("http://{}/", addr))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FetchErrorKind::Network);
}

#[test]
fn test_reqwest_engine_name() {
    assert_eq!(engine(Duration::from_secs(1)).name(), "reqwest");
}

#[tokio::test]
async fn test_reqwest_engine_extracts_links_from_large_page() {
    let base_url = start_test_server().await;
    let snapshot = engine(Duration::from_secs(5))
        .fetch(&format!("{}/large", base_url))
        .await
        .unwrap();

    assert_eq!(snapshot.links.len(), 500);
    assert!(snapshot.links.contains(&format!("{}/items/499", base_url)));
    assert!(snapshot.content.contains("item 499"));
}

#[tokio::test(flavor = "current_thread")]
async fn test_link_discovery_does_not_block_the_runtime() {
    let (tick_tx, mut tick_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = tick_tx.send(());
    });

    let (content, links) = discover_links(large_page(2000), "https://a.test/".to_string())
        .await
        .unwrap();

    // the single runtime thread ran the other task while parsing was in progress
    assert!(tick_rx.try_recv().is_ok());
    assert_eq!(links.len(), 2000);
    assert!(content.starts_with("<html>"));
}

#[tokio::test]
async fn test_link_discovery_rejects_invalid_base() {
    let err = discover_links(large_page(1), "not a url".to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FetchErrorKind::ParseFailure);
}
