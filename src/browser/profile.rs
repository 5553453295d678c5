//! Profile 目录管理
//!
//! 每个 profile 对应一个持久化的浏览器数据目录（Cookie、LocalStorage 等）

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::FileError;

/// 默认 profile 名称
pub const DEFAULT_PROFILE: &str = "default";

/// 异常退出后残留的锁文件
const LOCK_ARTIFACTS: &[&str] = &["SingletonLock", "SingletonSocket", "SingletonCookie"];

/// 登录态相关文件（位于 `Default/` 下）
const CREDENTIAL_ENTRIES: &[&str] = &[
    "Cookies",
    "Cookies-journal",
    "Login Data",
    "Login Data-journal",
    "Login Data For Account",
    "Login Data For Account-journal",
    "Local Storage",
    "Session Storage",
    "IndexedDB",
];

/// 已解析的 profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDir {
    /// 展示用名称
    pub name: String,
    /// 数据目录
    pub dir: PathBuf,
}

impl ProfileDir {
    /// 会话注册表使用的键
    pub fn key(&self) -> String {
        self.dir.to_string_lossy().into_owned()
    }
}

/// Profile 仓库
#[derive(Debug, Clone)]
pub struct ProfileStore {
    base_dir: PathBuf,
}

impl ProfileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// 解析 profile 引用并确保目录存在
    ///
    /// # 参数
    /// - `reference`: profile 名称；绝对路径直接作为数据目录使用，空值使用默认 profile
    pub fn resolve(&self, reference: &str) -> Result<ProfileDir, FileError> {
        let reference = reference.trim();
        let reference = if reference.is_empty() {
            DEFAULT_PROFILE
        } else {
            reference
        };

        let candidate = Path::new(reference);
        let (name, dir) = if candidate.is_absolute() {
            let name = candidate
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
            (name, candidate.to_path_buf())
        } else {
            (reference.to_string(), self.base_dir.join(reference))
        };

        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|source| FileError::CreateDirFailed {
                path: dir.display().to_string(),
                source,
            })?;
            debug!("创建 profile 目录: {}", dir.display());
        }

        Ok(ProfileDir { name, dir })
    }
}

/// 清理浏览器异常退出后残留的锁文件
///
/// # 返回
/// 实际删除的文件数量
pub fn clear_lock_artifacts(dir: &Path) -> usize {
    LOCK_ARTIFACTS
        .iter()
        .filter(|name| remove_entry(&dir.join(name)))
        .count()
}

/// 删除登录态相关文件，单个文件失败不影响其他文件
///
/// # 返回
/// 实际删除的条目数量
pub fn clear_credentials(dir: &Path) -> usize {
    let default_dir = dir.join("Default");
    CREDENTIAL_ENTRIES
        .iter()
        .filter(|name| remove_entry(&default_dir.join(name)))
        .count()
}

fn remove_entry(path: &Path) -> bool {
    // 锁文件通常是悬空的符号链接，exists() 会返回 false
    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return false;
    };
    let result = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => {
            debug!("已删除: {}", path.display());
            true
        }
        Err(e) => {
            warn!("⚠️ 删除 {} 失败: {}", path.display(), e);
            false
        }
    }
}
