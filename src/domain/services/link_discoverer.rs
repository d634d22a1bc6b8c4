// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::utils::errors::UrlError;
use crate::utils::url_utils;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use url::Url;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static anchor selector"));
static BASE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("base[href]").expect("static base selector"));

/// 链接发现器
///
/// 负责从HTML内容中提取链接
pub struct LinkDiscoverer;

impl LinkDiscoverer {
    /// 从HTML内容中提取链接
    ///
    /// # 参数
    ///
    /// * `html_content` - HTML内容
    /// * `base_url` - 用于解析相对链接的页面URL
    ///
    /// # 返回值
    ///
    /// * `Ok(BTreeSet<String>)` - 提取到的 http/https 绝对链接，已去掉片段
    /// * `Err(UrlError)` - `base_url` 不是合法的绝对URL
    pub fn extract_links(html_content: &str, base_url: &str) -> Result<BTreeSet<String>, UrlError> {
        let base = Url::parse(base_url).map_err(|e| UrlError::invalid(base_url, e.to_string()))?;
        let document = Html::parse_document(html_content);

        // <base href> overrides the document URL for relative links
        let base = document
            .select(&BASE_SELECTOR)
            .next()
            .and_then(|el| el.value().attr("href"))
            .and_then(|href| url_utils::resolve_url(&base, href).ok())
            .unwrap_or(base);

        let mut links = BTreeSet::new();
        for element in document.select(&ANCHOR_SELECTOR) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            // Ignore fragment identifiers, mailto, tel and javascript links
            if href.is_empty()
                || href.starts_with('#')
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
                || href.starts_with("javascript:")
            {
                continue;
            }

            if let Ok(mut url) = url_utils::resolve_url(&base, href) {
                if url.scheme() == "http" || url.scheme() == "https" {
                    url.set_fragment(None);
                    links.insert(url.to_string());
                }
            }
        }

        Ok(links)
    }
}

/// 链接过滤器
///
/// 决定发现的链接是否应该继续爬取
#[derive(Debug, Clone, Default)]
pub struct LinkFilter {
    /// 只允许该主机（含端口）下的链接；为 `None` 时不限制
    allowed_host: Option<String>,
    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl LinkFilter {
    /// 创建过滤器
    ///
    /// # 参数
    ///
    /// * `start_url` - 起始URL，`same_host_only` 为 true 时用来确定允许的主机
    /// * `same_host_only` - 是否只爬取起始URL所在主机
    /// * `include_patterns` - 非空时链接必须包含其中至少一个子串
    /// * `exclude_patterns` - 链接不能包含其中任何一个子串
    pub fn new(
        start_url: &str,
        same_host_only: bool,
        include_patterns: Vec<String>,
        exclude_patterns: Vec<String>,
    ) -> Self {
        let allowed_host = if same_host_only {
            Url::parse(start_url).ok().and_then(|u| host_key(&u))
        } else {
            None
        };
        Self {
            allowed_host,
            include_patterns,
            exclude_patterns,
        }
    }

    /// 不做任何过滤
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn allows(&self, link: &str) -> bool {
        if let Some(allowed) = &self.allowed_host {
            let same_host = Url::parse(link)
                .ok()
                .and_then(|u| host_key(&u))
                .is_some_and(|host| &host == allowed);
            if !same_host {
                return false;
            }
        }

        let matches_include = self.include_patterns.is_empty()
            || self.include_patterns.iter().any(|p| link.contains(p.as_str()));
        let matches_exclude = self.exclude_patterns.iter().any(|p| link.contains(p.as_str()));

        matches_include && !matches_exclude
    }
}

fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links() {
        let html = r##"
            <html>
                <body>
                    <a href="https://example.com/page1">Page 1</a>
                    <a href="/page2">Page 2</a>
                    <a href="page3.html#section">Page 3</a>
                    <a href="#fragment">Fragment</a>
                    <a href="mailto:test@example.com">Email</a>
                    <a href="tel:+123">Phone</a>
                    <a href="javascript:void(0)">JS</a>
                    <a href="ftp://example.com/file">FTP</a>
                    <a>No href</a>
                </body>
            </html>
        "##;

        let links = LinkDiscoverer::extract_links(html, "https://example.com").unwrap();

        assert!(links.contains("https://example.com/page1"));
        assert!(links.contains("https://example.com/page2"));
        assert!(links.contains("https://example.com/page3.html"));
        assert_eq!(links.len(), 3);
    }

    #[test]
    fn test_extract_links_honours_base_element() {
        let html = r#"<html><head><base href="https://cdn.example.com/docs/"></head>
            <body><a href="intro">Intro</a></body></html>"#;
        let links = LinkDiscoverer::extract_links(html, "https://example.com/a").unwrap();
        assert!(links.contains("https://cdn.example.com/docs/intro"));
    }

    #[test]
    fn test_extract_links_rejects_relative_base() {
        assert!(LinkDiscoverer::extract_links("<a href='/x'>x</a>", "/relative").is_err());
    }

    #[test]
    fn test_filter_same_host_only() {
        let filter = LinkFilter::new("https://a.test", true, vec![], vec![]);
        assert!(filter.allows("https://a.test/b"));
        assert!(filter.allows("https://A.test/c"));
        assert!(!filter.allows("https://b.test/"));
        assert!(!filter.allows("https://a.test:8443/"));
    }

    #[test]
    fn test_filter_patterns() {
        let filter = LinkFilter::new(
            "https://example.com",
            false,
            vec!["blog".to_string(), "about".to_string()],
            vec!["shop".to_string()],
        );

        assert!(filter.allows("https://example.com/blog/1"));
        assert!(filter.allows("https://other.com/about"));
        assert!(!filter.allows("https://example.com/shop/item"));
        assert!(!filter.allows("https://example.com/contact"));
    }

    #[test]
    fn test_allow_all() {
        let filter = LinkFilter::allow_all();
        assert!(filter.allows("https://anything.test/x"));
    }
}
