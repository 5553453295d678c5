//! 调试截图服务 - 业务能力层
//!
//! 只负责"保存诊断截图"能力，不关心流程

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::{AppResult, FileError};
use crate::infrastructure::PageDriver;

/// 调试截图服务
///
/// 职责：
/// - 在构造时确定是否启用以及保存目录
/// - 截图失败只记录日志，不影响调用方
/// - 清理过期截图
#[derive(Debug, Clone)]
pub struct Diagnostics {
    enabled: bool,
    dir: PathBuf,
}

impl Diagnostics {
    /// 创建调试截图服务
    pub fn new(enabled: bool, dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled,
            dir: dir.into(),
        }
    }

    /// 不保存任何截图
    pub fn disabled() -> Self {
        Self::new(false, "debug-screenshots")
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 保存当前页面截图
    ///
    /// # 参数
    /// - `page`: 页面
    /// - `step`: 步骤名，用作文件名前缀
    ///
    /// # 返回
    /// 成功时返回截图路径；未启用或失败返回 None
    pub async fn snapshot(&self, page: &dyn PageDriver, step: &str) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        let path = self.dir.join(snapshot_file_name(step));
        match self.write_screenshot(page, &path).await {
            Ok(()) => {
                debug!("📸 调试截图: {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("⚠️ 调试截图失败 ({}): {}", step, e);
                None
            }
        }
    }

    async fn write_screenshot(&self, page: &dyn PageDriver, path: &Path) -> AppResult<()> {
        let bytes = page.screenshot().await?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| FileError::CreateDirFailed {
                path: self.dir.display().to_string(),
                source,
            })?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|source| FileError::WriteFailed {
                path: path.display().to_string(),
                source,
            })?;
        Ok(())
    }

    /// 删除超过 `max_age` 的截图
    ///
    /// # 返回
    /// 删除的文件数量
    pub async fn prune(&self, max_age: Duration) -> usize {
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return 0;
        };
        let now = SystemTime::now();
        let mut removed = 0;

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            let expired = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > max_age);
            if expired && tokio::fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("清理了 {} 张过期截图", removed);
        }
        removed
    }
}

fn snapshot_file_name(step: &str) -> String {
    let step: String = step
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!(
        "{}-{}.png",
        step,
        chrono::Local::now().format("%Y%m%d-%H%M%S%3f")
    )
}
