// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use validator::Validate;

/// 视口
///
/// 响应式测试使用的屏幕尺寸
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
pub struct Viewport {
    /// 视口名称，例如 `desktop`、`mobile`
    #[validate(length(min = 1))]
    pub name: String,
    /// 宽度（像素）
    #[validate(range(min = 1, max = 10000))]
    pub width: u32,
    /// 高度（像素）
    #[validate(range(min = 1, max = 10000))]
    pub height: u32,
}

impl Viewport {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }

    /// 默认的桌面、平板、手机三种视口
    pub fn defaults() -> Vec<Viewport> {
        vec![
            Viewport::new("desktop", 1920, 1080),
            Viewport::new("tablet", 768, 1024),
            Viewport::new("mobile", 375, 667),
        ]
    }
}

impl Viewport {
    /// 返回第一个重复出现的视口名称
    ///
    /// 判定以 (URL, 视口名称) 为键，名称必须唯一
    pub fn duplicate_name(viewports: &[Viewport]) -> Option<&str> {
        let mut seen = HashSet::new();
        viewports
            .iter()
            .map(|v| v.name.as_str())
            .find(|name| !seen.insert(*name))
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({}x{})", self.name, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name() {
        assert_eq!(Viewport::duplicate_name(&Viewport::defaults()), None);
        let viewports = vec![
            Viewport::new("mobile", 375, 667),
            Viewport::new("desktop", 1920, 1080),
            Viewport::new("mobile", 1920, 1080),
        ];
        assert_eq!(Viewport::duplicate_name(&viewports), Some("mobile"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Viewport::new("tablet", 768, 1024).to_string(), "tablet (768x1024)");
    }
}
