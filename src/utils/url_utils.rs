// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::UrlError;
use sha2::{Digest, Sha256};
use std::fmt;
use url::{ParseError, Url};

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 规范化后的绝对URL
///
/// 只保留 scheme、host、端口（非默认端口）和路径，去掉查询串、片段、
/// 用户信息以及路径末尾的斜杠。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// 计算URL指纹
    pub fn fingerprint(&self) -> Fingerprint {
        let digest = Sha256::digest(self.0.as_bytes());
        Fingerprint(hex::encode(digest))
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// URL指纹，用于去重
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 规范化URL
///
/// # 参数
///
/// * `raw` - 原始URL，必须是 http/https 绝对地址
///
/// # 返回值
///
/// * `Ok(NormalizedUrl)` - 规范化后的URL
/// * `Err(UrlError)` - URL无法解析或不是绝对的 http/https 地址
pub fn normalize_url(raw: &str) -> Result<NormalizedUrl, UrlError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| UrlError::invalid(trimmed, e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::invalid(
            trimmed,
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| UrlError::invalid(trimmed, "missing host"))?;

    let mut normalized = format!("{}://{}", url.scheme(), host);
    // Url::port() is None for the scheme's default port
    if let Some(port) = url.port() {
        normalized.push(':');
        normalized.push_str(&port.to_string());
    }
    normalized.push_str(url.path().trim_end_matches('/'));

    Ok(NormalizedUrl(normalized))
}
