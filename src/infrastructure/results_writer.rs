// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::test_results::TestResults;
use crate::utils::errors::ResultsWriteError;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// 将测试结果写成缩进的 JSON 文件
///
/// 父目录不存在时自动创建，已存在的文件会被覆盖
pub async fn write_results(
    results: &TestResults,
    path: impl AsRef<Path>,
) -> Result<(), ResultsWriteError> {
    let path = path.as_ref();
    let data = serde_json::to_vec_pretty(results)?;
    write_file(path, &data).await?;
    info!(
        path = %path.display(),
        verdicts = results.stats.verdicts,
        "Results written"
    );
    Ok(())
}

/// 写入分析插件的文本输出
pub async fn write_text(path: impl AsRef<Path>, text: &str) -> Result<(), ResultsWriteError> {
    write_file(path.as_ref(), text.as_bytes()).await
}

async fn write_file(path: &Path, data: &[u8]) -> Result<(), ResultsWriteError> {
    let io_error = |source| ResultsWriteError::Io {
        path: path.display().to_string(),
        source,
    };

    // 确保目录存在
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_error)?;
    }

    let mut file = fs::File::create(path).await.map_err(io_error)?;
    file.write_all(data).await.map_err(io_error)?;
    file.flush().await.map_err(io_error)?;
    Ok(())
}
