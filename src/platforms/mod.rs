//! 平台配置
//!
//! 发布流程本身与平台无关，各平台之间的差异（地址、选择器、文案、超时、
//! 标签分隔键等）全部收敛在这里的声明式配置中。配置在启动时构造一次，
//! 之后只读共享。

pub mod douyin;
pub mod kuaishou;
pub mod xiaohongshu;

use std::time::Duration;

use serde::Serialize;

use crate::infrastructure::Key;

/// 目标平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Douyin,
    Kuaishou,
    Xiaohongshu,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Douyin, Platform::Kuaishou, Platform::Xiaohongshu];

    /// 展示名称
    pub fn name(self) -> &'static str {
        match self {
            Platform::Douyin => "抖音",
            Platform::Kuaishou => "快手",
            Platform::Xiaohongshu => "小红书",
        }
    }

    /// 控制接口使用的路由前缀（第一个为主前缀）
    pub fn prefixes(self) -> &'static [&'static str] {
        match self {
            Platform::Douyin => &["douyin", "api"],
            Platform::Kuaishou => &["kuaishou", "ks"],
            Platform::Xiaohongshu => &["xiaohongshu", "xhs"],
        }
    }

    /// 从路由前缀解析平台
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        let prefix = prefix.trim_matches('/').to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.prefixes().contains(&prefix.as_str()))
    }

    /// 平台配置
    pub fn config(self) -> PlatformConfig {
        match self {
            Platform::Douyin => douyin::config(),
            Platform::Kuaishou => kuaishou::config(),
            Platform::Xiaohongshu => xiaohongshu::config(),
        }
    }
}

/// 媒体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Images,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Video => "视频",
            MediaKind::Images => "图文",
        }
    }
}

/// 按文本定位元素
#[derive(Debug, Clone, Copy)]
pub struct TextTarget {
    /// 候选元素范围（CSS 选择器）
    pub scope: &'static str,
    pub text: &'static str,
    /// true 为文本完全相等，false 为包含
    pub exact: bool,
}

impl TextTarget {
    pub const fn exact(scope: &'static str, text: &'static str) -> Self {
        Self {
            scope,
            text,
            exact: true,
        }
    }

    pub const fn contains(scope: &'static str, text: &'static str) -> Self {
        Self {
            scope,
            text,
            exact: false,
        }
    }
}

/// 登录态探测：任一条件满足即视为已登录
#[derive(Debug, Clone)]
pub struct LoginMarkers {
    pub selectors: &'static [&'static str],
    pub button_texts: &'static [&'static str],
    pub page_texts: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct LoginConfig {
    /// 检查登录状态时打开的页面
    pub check_url: &'static str,
    /// 扫码登录页面
    pub manual_login_url: &'static str,
    pub markers: LoginMarkers,
}

/// 新手引导遮罩
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    pub button_texts: &'static [&'static str],
    pub selectors: &'static [&'static str],
    /// 按 Esc 后仍存在则直接从 DOM 移除
    pub overlay_selector: Option<&'static str>,
}

/// 发布后出现的人工验证标记
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub selectors: &'static [&'static str],
    pub texts: &'static [&'static str],
}

/// 主页作品列表
#[derive(Debug, Clone)]
pub struct ProfileFeedConfig {
    /// 包含 `{user_id}` 占位符
    pub url_template: &'static str,
    pub link_selector: &'static str,
    pub title_selector: &'static str,
    pub origin: &'static str,
    pub item_url_base: &'static str,
}

/// 内容限制
#[derive(Debug, Clone, Default)]
pub struct ContentLimits {
    pub title_required: bool,
    pub title_max_chars: Option<usize>,
    pub max_tags: Option<usize>,
    /// 正文加话题的总长度上限
    pub content_max_chars: Option<usize>,
    /// 未提供标签时从标题提取
    pub auto_tags: bool,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub file_input_selectors: &'static [&'static str],
    /// 没有可用的文件输入框时，点击该元素并拦截文件选择框
    pub chooser_trigger: Option<TextTarget>,
    /// 逐个上传时每个文件之间的间隔
    pub file_settle: Duration,
    /// 上传提交后的固定等待
    pub settle: Duration,
    /// 上传后页面会跳转到的地址片段
    pub post_upload_url: Option<&'static str>,
    pub post_upload_wait: Duration,
}

/// 媒体就绪信号
#[derive(Debug, Clone)]
pub enum ReadinessSignal {
    /// 进度条消失
    ProgressCleared { selector: &'static str },
    /// 出现完成文案，或必填字段已出现且不再显示上传中
    FieldsReady {
        complete_texts: &'static [&'static str],
        uploading_texts: &'static [&'static str],
        required_selectors: &'static [&'static str],
    },
    /// 发布按钮变为可用
    PublishEnabled,
    /// 没有可靠信号，固定等待
    FixedDelay,
}

#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    pub signal: ReadinessSignal,
    /// 出现即立即失败
    pub failure_texts: &'static [&'static str],
    pub max_wait: Duration,
    pub interval: Duration,
}

/// 输入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// 普通 input / textarea，直接清空后输入
    Plain,
    /// contenteditable 富文本，清空子节点后聚焦输入
    RichText,
}

#[derive(Debug, Clone)]
pub struct FieldConfig {
    pub label: &'static str,
    pub selectors: &'static [&'static str],
    pub mode: InputMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
    /// `#标签`
    Hash,
    Raw,
}

impl TagFormat {
    pub fn apply(self, tag: &str) -> String {
        match self {
            TagFormat::Hash => format!("#{}", tag),
            TagFormat::Raw => tag.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TagConfig {
    pub format: TagFormat,
    /// 提交话题的按键
    pub separator: Key,
    /// 输入话题后、按键前的等待
    pub settle: Duration,
    /// 每个话题之间的等待，平台联想框需要时间
    pub delay: Duration,
    /// 联想下拉项；出现时点击代替按键
    pub suggestion_selectors: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct MusicConfig {
    pub open: TextTarget,
    /// 文本匹配到多个时取最后一个
    pub open_pick_last: bool,
    pub search_input: Option<&'static str>,
    pub item_selector: &'static str,
    /// 列表项内的"使用"按钮
    pub item_action: Option<&'static str>,
    pub confirm_texts: &'static [&'static str],
    /// 未出现确认文案时是否视为失败
    pub confirm_required: bool,
    /// 可选的列表项数量上限
    pub max_items: usize,
    pub settle: Duration,
}

/// 平台机审
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    pub done_texts: &'static [&'static str],
    pub timeout: Duration,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub button: TextTarget,
    pub fallback_selectors: &'static [&'static str],
    /// 点击发布前必须停留在包含该片段的地址上
    pub expected_url: Option<&'static str>,
    /// 点击前滚到底部的容器
    pub scroll_container: Option<&'static str>,
    pub success_urls: &'static [&'static str],
    pub success_texts: &'static [&'static str],
    pub result_timeout: Duration,
    pub result_interval: Duration,
}

/// 某一媒体类型的发布页配置
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    pub url: &'static str,
    pub limits: ContentLimits,
    /// 上传前尽力点击的元素（切换标签页、放弃草稿等）
    pub pre_upload: &'static [TextTarget],
    pub upload: UploadConfig,
    pub readiness: ReadinessConfig,
    pub title: Option<FieldConfig>,
    pub description: FieldConfig,
    pub tags: TagConfig,
    pub music: Option<MusicConfig>,
    pub moderation: Option<ModerationConfig>,
    pub publish: PublishConfig,
}

/// 平台配置
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub platform: Platform,
    pub login: LoginConfig,
    pub onboarding: OnboardingConfig,
    pub verification: VerificationConfig,
    /// 退出登录时是否删除 profile 中的登录数据文件
    pub purge_credentials: bool,
    pub profile_feed: Option<ProfileFeedConfig>,
    pub video: Option<ComposerConfig>,
    pub images: Option<ComposerConfig>,
}

impl PlatformConfig {
    pub fn name(&self) -> &'static str {
        self.platform.name()
    }

    pub fn composer(&self, kind: MediaKind) -> Option<&ComposerConfig> {
        match kind {
            MediaKind::Video => self.video.as_ref(),
            MediaKind::Images => self.images.as_ref(),
        }
    }
}
