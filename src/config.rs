use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{AppResult, ConfigError};

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 是否无头模式运行浏览器
    pub headless: bool,
    /// 默认 profile 名称（或绝对路径）
    pub profile: String,
    /// profile 根目录
    pub profile_base_dir: PathBuf,
    /// 违禁词词库路径（文件或目录）
    pub forbidden_path: PathBuf,
    /// 是否保存调试截图
    pub debug_screenshots: bool,
    /// 调试截图目录
    pub screenshot_dir: PathBuf,
    /// 控制服务监听地址
    pub server_host: String,
    /// 控制服务监听端口
    pub server_port: u16,
    /// 自定义 Chrome 可执行文件
    pub chrome_executable: Option<PathBuf>,
    /// 日志级别
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            headless: true,
            profile: "default".to_string(),
            profile_base_dir: PathBuf::from("data/browser-data"),
            forbidden_path: PathBuf::from("data/sensitive-lexicon/Vocabulary"),
            debug_screenshots: false,
            screenshot_dir: PathBuf::from("debug-screenshots"),
            server_host: "127.0.0.1".to_string(),
            server_port: 11415,
            chrome_executable: None,
            log_level: "info".to_string(),
        }
    }
}

/// 配置文件（publisher.toml）中的可选项
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    headless: Option<bool>,
    profile: Option<String>,
    profile_base_dir: Option<PathBuf>,
    forbidden_path: Option<PathBuf>,
    debug_screenshots: Option<bool>,
    screenshot_dir: Option<PathBuf>,
    server_host: Option<String>,
    server_port: Option<u16>,
    chrome_executable: Option<PathBuf>,
    log_level: Option<String>,
}

impl Config {
    /// 读取配置文件，再用环境变量覆盖
    pub fn load() -> AppResult<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "publisher.toml".to_string());
        let base = Self::from_file(Path::new(&path))?;
        let config = Self::from_env_with(base);
        config.validate()?;
        Ok(config)
    }

    /// 检查合并后的配置
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server_port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SERVER_PORT",
                reason: "端口不能为 0".to_string(),
            });
        }
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "LOG_LEVEL",
                reason: format!("'{}' 不是 {} 之一", self.log_level, LOG_LEVELS.join("|")),
            });
        }
        Ok(())
    }

    /// 只读取环境变量
    pub fn from_env() -> Self {
        Self::from_env_with(Self::default())
    }

    fn from_file(path: &Path) -> AppResult<Self> {
        let default = Self::default();
        if !path.exists() {
            return Ok(default);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::AppError::file_read_failed(path.display().to_string(), e))?;
        let file: FileConfig = toml::from_str(&content).map_err(|e| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        info!("✓ 已加载配置文件: {}", path.display());

        Ok(Self {
            headless: file.headless.unwrap_or(default.headless),
            profile: file.profile.unwrap_or(default.profile),
            profile_base_dir: file.profile_base_dir.unwrap_or(default.profile_base_dir),
            forbidden_path: file.forbidden_path.unwrap_or(default.forbidden_path),
            debug_screenshots: file.debug_screenshots.unwrap_or(default.debug_screenshots),
            screenshot_dir: file.screenshot_dir.unwrap_or(default.screenshot_dir),
            server_host: file.server_host.unwrap_or(default.server_host),
            server_port: file.server_port.unwrap_or(default.server_port),
            chrome_executable: file.chrome_executable.or(default.chrome_executable),
            log_level: file.log_level.unwrap_or(default.log_level),
        })
    }

    fn from_env_with(base: Self) -> Self {
        let profile = std::env::var("PROFILE")
            .or_else(|_| std::env::var("PROFILE_NAME"))
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(base.profile);

        Self {
            headless: std::env::var("HEADLESS").ok().map(|v| parse_flag(&v, base.headless)).unwrap_or(base.headless),
            profile,
            profile_base_dir: std::env::var("PROFILE_BASE_DIR").map(PathBuf::from).unwrap_or(base.profile_base_dir),
            forbidden_path: std::env::var("FORBIDDEN_PATH").map(PathBuf::from).unwrap_or(base.forbidden_path),
            debug_screenshots: std::env::var("DEBUG_SCREENSHOTS").ok().map(|v| parse_flag(&v, base.debug_screenshots)).unwrap_or(base.debug_screenshots),
            screenshot_dir: std::env::var("DEBUG_SCREENSHOT_DIR").map(PathBuf::from).unwrap_or(base.screenshot_dir),
            server_host: std::env::var("SERVER_HOST").unwrap_or(base.server_host),
            server_port: std::env::var("SERVER_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(base.server_port),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().map(PathBuf::from).or(base.chrome_executable),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(base.log_level),
        }
    }
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// 解析开关类环境变量
///
/// `false/0/off/no` 为关，`true/1/on/yes` 为开，其余取默认值
pub fn parse_flag(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "false" | "0" | "off" | "no" => false,
        "true" | "1" | "on" | "yes" => true,
        other => {
            warn!("⚠️ 无法识别的开关值 '{}'，使用默认值 {}", other, default);
            default
        }
    }
}
