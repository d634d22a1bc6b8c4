// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{http::StatusCode, response::Html, routing::get, Router};
use tokio::net::TcpListener;

const HEAD: &str =
    r#"<head><meta name="viewport" content="width=device-width, initial-scale=1"></head>"#;

/// 启动一个小型测试站点，返回根地址（不带结尾斜杠）
///
/// 站点结构：
/// - `/` 链接到 `/about`、`/about/`、`/wide`、`/missing`、`/private` 和外部主机
/// - `/about` 链接回首页
/// - `/wide` 没有 viewport meta，包含一个 1200px 宽的表格
/// - `/missing` 返回 404
/// - `/robots.txt` 禁止 `/private`
pub async fn start_site() -> String {
    let app = Router::new()
        .route(
            "/",
            get(|| async {
                Html(format!(
                    r#"<html>{}<body>
                        <nav><a href="/about">About</a> <a href="/about/">About again</a></nav>
                        <a href="/wide">Wide</a>
                        <a href="/missing">Missing</a>
                        <a href="/private">Private</a>
                        <a href="https://elsewhere.test/x">Elsewhere</a>
                    </body></html>"#,
                    HEAD
                ))
            }),
        )
        .route(
            "/about",
            get(|| async {
                Html(format!(
                    r#"<html>{}<body><nav><a href="/">Home</a></nav></body></html>"#,
                    HEAD
                ))
            }),
        )
        .route(
            "/wide",
            get(|| async {
                Html(r#"<html><body><table width="1200"><tr><td>x</td></tr></table></body></html>"#)
            }),
        )
        .route(
            "/private",
            get(|| async {
                Html(format!(r#"<html>{}<body><nav>secret</nav></body></html>"#, HEAD))
            }),
        )
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/robots.txt",
            get(|| async { "User-agent: *\nDisallow: /private\n" }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
