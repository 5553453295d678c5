use serde::Serialize;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 请求校验错误（浏览器交互之前发现）
    #[error("参数错误: {0}")]
    Validation(#[from] ValidationError),
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 发布流程错误
    #[error("发布错误: {0}")]
    Publish(#[from] PublishError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 请求校验错误
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("请提供{field}")]
    MissingField { field: &'static str },
    #[error("标题长度 {len} 超过上限 {max} 个字")]
    TitleTooLong { len: usize, max: usize },
    #[error("正文长度 {len} 超过上限 {max} 个字")]
    ContentTooLong { len: usize, max: usize },
    #[error("请提供视频或图片（二选一）")]
    MissingMedia,
    #[error("视频与图片不能同时提供")]
    ConflictingMedia,
    #[error("{platform} 不支持发布{media}")]
    UnsupportedMedia {
        platform: &'static str,
        media: &'static str,
    },
    #[error("文件不存在: {path}")]
    MediaNotFound { path: String },
    #[error("内容包含违禁词: {}", .terms.join(", "))]
    ForbiddenContent { terms: Vec<String> },
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 两次启动均失败
    #[error("浏览器初始化失败 ({profile}): {reason}")]
    LaunchFailed { profile: String, reason: String },
    /// 当前 profile 没有存活的会话
    #[error("浏览器未初始化 ({profile})")]
    NotInitialized { profile: String },
    /// 同一 profile 上已有流程在执行
    #[error("会话忙碌中 ({profile})，请等待当前操作完成")]
    SessionBusy { profile: String },
    #[error("页面崩溃: {reason}")]
    PageCrashed { reason: String },
    #[error("导航到 {url} 超时")]
    NavigationTimeout { url: String },
    #[error("导航到 {url} 失败: {reason}")]
    NavigationFailed { url: String, reason: String },
    #[error("未找到元素: {target}")]
    ElementNotFound { target: String },
    #[error("执行脚本失败: {0}")]
    Script(String),
    #[error("CDP 调用失败: {0}")]
    Cdp(String),
}

/// 发布流程错误
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("未登录，请先调用 {platform} 登录接口完成扫码登录")]
    NotAuthenticated { platform: &'static str },
    #[error("未找到上传控件")]
    UploadControlNotFound,
    #[error("所有文件上传均失败")]
    UploadFailed,
    #[error("媒体处理失败: {text}")]
    UploadRejected { text: String },
    #[error("未找到发布按钮")]
    PublishControlNotFound,
    #[error("发布按钮不可用")]
    PublishControlDisabled,
    #[error("当前页面不是发布页: {url}")]
    WrongPage { url: String },
    #[error("当前平台不支持该操作")]
    Unsupported,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("创建目录失败 ({path}): {source}")]
    CreateDirFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML 解析失败 ({path}): {reason}")]
    TomlParseFailed { path: String, reason: String },
    #[error("无效的配置项 {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// 对外暴露的错误分类
///
/// 序列化进发布结果，调用方据此区分"需要人工登录"、"会话忙"等情况
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ValidationError,
    ForbiddenContent,
    NotAuthenticated,
    UploadFailed,
    ElementNotFound,
    PublishControlNotFound,
    PublishControlDisabled,
    SessionBusy,
    NotInitialized,
    LaunchFailed,
    PageCrashed,
    NavigationTimeout,
    Browser,
    Io,
    Config,
}

/// 结果中携带的结构化错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AppError> for ErrorInfo {
    fn from(err: &AppError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl AppError {
    /// 错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(ValidationError::ForbiddenContent { .. }) => {
                ErrorKind::ForbiddenContent
            }
            AppError::Validation(_) => ErrorKind::ValidationError,
            AppError::Browser(e) => match e {
                BrowserError::LaunchFailed { .. } => ErrorKind::LaunchFailed,
                BrowserError::NotInitialized { .. } => ErrorKind::NotInitialized,
                BrowserError::SessionBusy { .. } => ErrorKind::SessionBusy,
                BrowserError::PageCrashed { .. } => ErrorKind::PageCrashed,
                BrowserError::NavigationTimeout { .. } => ErrorKind::NavigationTimeout,
                BrowserError::ElementNotFound { .. } => ErrorKind::ElementNotFound,
                _ => ErrorKind::Browser,
            },
            AppError::Publish(e) => match e {
                PublishError::NotAuthenticated { .. } => ErrorKind::NotAuthenticated,
                PublishError::PublishControlNotFound => ErrorKind::PublishControlNotFound,
                PublishError::PublishControlDisabled => ErrorKind::PublishControlDisabled,
                PublishError::UploadControlNotFound
                | PublishError::UploadFailed
                | PublishError::UploadRejected { .. } => ErrorKind::UploadFailed,
                PublishError::WrongPage { .. } | PublishError::Unsupported => ErrorKind::Browser,
            },
            AppError::File(_) => ErrorKind::Io,
            AppError::Config(_) => ErrorKind::Config,
        }
    }
}

impl BrowserError {
    /// 页面崩溃或导航超时，可以重建会话后重试一次
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BrowserError::PageCrashed { .. } | BrowserError::NavigationTimeout { .. }
        )
    }
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        let reason = err.to_string();
        let lowered = reason.to_lowercase();
        if lowered.contains("crash") || lowered.contains("target closed") {
            BrowserError::PageCrashed { reason }
        } else {
            BrowserError::Cdp(reason)
        }
    }
}

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(err.into())
    }
}

impl From<serde_json::Error> for BrowserError {
    fn from(err: serde_json::Error) -> Self {
        BrowserError::Script(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::Io(err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 缺少必填字段
    pub fn missing(field: &'static str) -> Self {
        AppError::Validation(ValidationError::MissingField { field })
    }

    /// 未找到元素
    pub fn element_not_found(target: impl Into<String>) -> Self {
        AppError::Browser(BrowserError::ElementNotFound {
            target: target.into(),
        })
    }

    /// 读取文件失败
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 浏览器层结果类型
pub type BrowserResult<T> = Result<T, BrowserError>;
