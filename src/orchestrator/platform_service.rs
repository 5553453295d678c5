//! 单个平台的服务 - 编排层
//!
//! ## 职责
//!
//! 把控制接口上的一个平台前缀映射为一组操作：
//!
//! 1. **登录**：打开扫码登录页、检查登录态、退出登录
//! 2. **发布**：委托给 `PublishFlow`，补上默认 profile / 无头模式
//! 3. **主页作品**：读取小红书主页的作品链接
//! 4. **远程查看**：截图、跳转、点击、输入（直接操作活动页面，不占用租约）

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};
use url::Url;

use crate::browser::{clear_credentials, SessionManager, Viewport};
use crate::error::{AppError, AppResult, BrowserError, PublishError};
use crate::infrastructure::PageDriver;
use crate::platforms::{MediaKind, PlatformConfig, ProfileFeedConfig};
use crate::workflow::{
    goto_with_recovery, is_authenticated, PublishFlow, PublishRequest, PublishResult,
    NAVIGATION_TIMEOUT, PAGE_SETTLE,
};

/// 登录页打开结果
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// 登录态
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginStatus {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 退出登录结果
#[derive(Debug, Clone, Serialize)]
pub struct LogoutResult {
    pub success: bool,
    pub message: String,
}

/// 页面里采集到的原始链接
#[derive(Debug, Clone, Deserialize)]
struct RawFeedLink {
    href: String,
    #[serde(default)]
    title: String,
}

/// 主页作品条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub href: String,
    pub title: String,
    pub absolute: String,
    /// 作品 ID，解析失败时为空
    pub id: String,
    pub final_url: String,
}

/// 主页作品列表
#[derive(Debug, Clone, Serialize)]
pub struct ProfileFeed {
    pub success: bool,
    pub url: String,
    pub links: Vec<FeedItem>,
}

/// 平台服务
pub struct PlatformService {
    config: Arc<PlatformConfig>,
    sessions: Arc<SessionManager>,
    flow: Arc<PublishFlow>,
    default_profile: String,
    default_headless: bool,
}

impl PlatformService {
    pub fn new(
        config: Arc<PlatformConfig>,
        sessions: Arc<SessionManager>,
        flow: Arc<PublishFlow>,
        default_profile: impl Into<String>,
        default_headless: bool,
    ) -> Self {
        Self {
            config,
            sessions,
            flow,
            default_profile: default_profile.into(),
            default_headless,
        }
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    fn profile<'a>(&'a self, profile: Option<&'a str>) -> &'a str {
        profile
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(self.default_profile.as_str())
    }

    // ========== 登录 ==========

    /// 打开扫码登录页（总是有头模式）
    pub async fn manual_login(&self, profile: Option<&str>) -> LoginResult {
        let profile = self.profile(profile);
        let url = self.config.login.manual_login_url;
        info!("🔑 {} 打开登录页: {}", self.config.name(), url);

        let opened = self.open_login_page(profile, url).await;
        match opened {
            Ok(()) => LoginResult {
                success: true,
                message: format!("已打开{}登录页，请在浏览器中完成扫码登录", self.config.name()),
                url: Some(url.to_string()),
            },
            Err(e) => {
                warn!("❌ {} 打开登录页失败: {}", self.config.name(), e);
                LoginResult {
                    success: false,
                    message: e.to_string(),
                    url: None,
                }
            }
        }
    }

    async fn open_login_page(&self, profile: &str, url: &str) -> AppResult<()> {
        let lease = self.sessions.acquire(profile, false, Viewport::LOGIN).await?;
        goto_with_recovery(&self.sessions, lease, url).await?;
        Ok(())
    }

    /// 检查登录态
    pub async fn check_login_status(&self, profile: Option<&str>) -> LoginStatus {
        let profile = self.profile(profile);
        let checked = self.check_login(profile).await;
        match checked {
            Ok((logged_in, url)) => {
                info!(
                    "{} {} 登录状态: {}",
                    if logged_in { "✓" } else { "⚠️" },
                    self.config.name(),
                    if logged_in { "已登录" } else { "未登录" }
                );
                LoginStatus {
                    logged_in,
                    url: Some(url),
                    error: None,
                }
            }
            Err(e) => {
                warn!("❌ {} 检查登录状态失败: {}", self.config.name(), e);
                LoginStatus {
                    logged_in: false,
                    url: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn check_login(&self, profile: &str) -> AppResult<(bool, String)> {
        let lease = self
            .sessions
            .acquire(profile, self.default_headless, Viewport::DEFAULT)
            .await?;
        let lease = goto_with_recovery(&self.sessions, lease, self.config.login.check_url).await?;
        sleep(PAGE_SETTLE).await;
        let page = lease.page();
        let logged_in = is_authenticated(page, &self.config.login.markers).await;
        let url = page.current_url().await.unwrap_or_default();
        Ok((logged_in, url))
    }

    /// 清除 Cookie、关闭会话，按平台配置删除凭据文件
    pub async fn logout(&self, profile: Option<&str>) -> LogoutResult {
        let profile = self.profile(profile);
        let cleared = self.clear_session(profile).await;
        match cleared {
            Ok(removed) => {
                let message = if self.config.purge_credentials {
                    info!("🧹 {} 已删除 {} 项登录数据", self.config.name(), removed);
                    "已退出登录，Cookie 和登录数据已清除"
                } else {
                    "已退出登录，Cookie 已清除"
                };
                info!("✓ {} {}", self.config.name(), message);
                LogoutResult {
                    success: true,
                    message: message.to_string(),
                }
            }
            Err(e) => {
                warn!("❌ {} 退出登录失败: {}", self.config.name(), e);
                LogoutResult {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }

    async fn clear_session(&self, profile: &str) -> AppResult<usize> {
        let resolved = self.sessions.profiles().resolve(profile)?;
        {
            let lease = self
                .sessions
                .acquire(profile, self.default_headless, Viewport::DEFAULT)
                .await?;
            if let Err(e) = lease.page().clear_cookies().await {
                warn!("⚠️ 清除 Cookie 失败: {}", e);
            }
        }
        self.sessions.release(profile).await;

        if !self.config.purge_credentials {
            return Ok(0);
        }
        Ok(clear_credentials(&resolved.dir))
    }

    // ========== 发布 ==========

    pub async fn publish_video(&self, request: &PublishRequest) -> PublishResult {
        self.publish(MediaKind::Video, request).await
    }

    pub async fn publish_images(&self, request: &PublishRequest) -> PublishResult {
        self.publish(MediaKind::Images, request).await
    }

    async fn publish(&self, kind: MediaKind, request: &PublishRequest) -> PublishResult {
        let profile = self.profile(request.profile.as_deref());
        let headless = request.headless.unwrap_or(self.default_headless);
        self.flow
            .run(&self.config, kind, request, profile, headless)
            .await
    }

    // ========== 主页作品 ==========

    /// 读取用户主页上的作品链接
    ///
    /// # 参数
    /// - `user_id`: 平台用户 ID
    ///
    /// # 返回
    /// 平台不支持时返回 `PublishError::Unsupported`
    pub async fn fetch_profile_html(
        &self,
        user_id: &str,
        profile: Option<&str>,
    ) -> AppResult<ProfileFeed> {
        let feed = self
            .config
            .profile_feed
            .as_ref()
            .ok_or(PublishError::Unsupported)?;
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::missing("userId"));
        }

        let url = feed.url_template.replace("{user_id}", user_id);
        info!("📄 {} 读取主页作品: {}", self.config.name(), url);
        let profile = self.profile(profile);
        let lease = self
            .sessions
            .acquire(profile, self.default_headless, Viewport::DEFAULT)
            .await?;
        let lease = goto_with_recovery(&self.sessions, lease, &url).await?;
        sleep(PAGE_SETTLE).await;

        let page = lease.page();
        let raw = collect_feed_links(page, feed).await?;
        let current = page.current_url().await.unwrap_or_else(|_| url.clone());
        let base = Url::parse(&current).or_else(|_| Url::parse(feed.origin));
        let links = match base {
            Ok(base) => raw
                .into_iter()
                .map(|link| resolve_feed_item(&base, feed, link.href, link.title))
                .collect(),
            Err(e) => {
                warn!("⚠️ 无法解析页面地址 {}: {}", current, e);
                Vec::new()
            }
        };
        info!("✓ 共 {} 条作品", links.len());

        Ok(ProfileFeed {
            success: true,
            url,
            links,
        })
    }

    // ========== 远程查看 ==========

    async fn active_page(&self, profile: Option<&str>) -> AppResult<Arc<dyn PageDriver>> {
        self.sessions.active_page(self.profile(profile)).await
    }

    /// 活动页面截图（PNG）
    pub async fn remote_screenshot(&self, profile: Option<&str>) -> AppResult<Vec<u8>> {
        let page = self.active_page(profile).await?;
        Ok(page.screenshot().await?)
    }

    pub async fn remote_goto(&self, url: &str, profile: Option<&str>) -> AppResult<String> {
        if url.trim().is_empty() {
            return Err(AppError::missing("url"));
        }
        let page = self.active_page(profile).await?;
        page.goto(url, NAVIGATION_TIMEOUT).await?;
        Ok(page.current_url().await.unwrap_or_else(|_| url.to_string()))
    }

    pub async fn remote_click(&self, x: f64, y: f64, profile: Option<&str>) -> AppResult<()> {
        let page = self.active_page(profile).await?;
        page.click_at(x, y).await?;
        Ok(())
    }

    pub async fn remote_type(&self, text: &str, profile: Option<&str>) -> AppResult<()> {
        let page = self.active_page(profile).await?;
        page.type_text(text, Duration::ZERO).await?;
        Ok(())
    }
}

/// 在页面里采集 `{href, title}`，跳过没有 href 的链接
async fn collect_feed_links(
    page: &dyn PageDriver,
    feed: &ProfileFeedConfig,
) -> AppResult<Vec<RawFeedLink>> {
    let script = format!(
        r#"Array.from(document.querySelectorAll({links}))
            .map(a => {{
                const href = a.getAttribute('href');
                if (!href) return null;
                const parent = a.parentElement;
                const span = parent ? parent.querySelector({title}) : null;
                return {{ href, title: span ? (span.textContent || '').trim() : '' }};
            }})
            .filter(Boolean)"#,
        links = serde_json::to_string(feed.link_selector).map_err(BrowserError::from)?,
        title = serde_json::to_string(feed.title_selector).map_err(BrowserError::from)?,
    );
    let value = page.evaluate(&script).await?;
    let links: Vec<RawFeedLink> = serde_json::from_value(value).map_err(BrowserError::from)?;
    Ok(links)
}

/// 把相对链接解析为作品地址
///
/// 路径形如 `/user/profile/<userId>/<noteId>` 时取第四段作为作品 ID，否则取最后一段
pub fn resolve_feed_item(
    base: &Url,
    feed: &ProfileFeedConfig,
    href: String,
    title: String,
) -> FeedItem {
    let joined = if href.starts_with("http") {
        Url::parse(&href)
    } else {
        base.join(&href)
    };
    let Ok(parsed) = joined else {
        return FeedItem {
            absolute: href.clone(),
            final_url: href.clone(),
            href,
            title,
            id: String::new(),
        };
    };

    let parts: Vec<&str> = parsed.path().split('/').filter(|p| !p.is_empty()).collect();
    let id = match parts.len() {
        n if n >= 4 => parts[3].to_string(),
        0 => String::new(),
        n => parts[n - 1].to_string(),
    };
    let absolute = parsed.to_string();
    let final_url = if id.is_empty() {
        absolute.clone()
    } else {
        let query = parsed.query().map(|q| format!("?{}", q)).unwrap_or_default();
        format!("{}{}{}", feed.item_url_base, id, query)
    };

    FeedItem {
        href,
        title,
        absolute,
        id,
        final_url,
    }
}
