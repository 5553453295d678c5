//! 发布流程 - 流程层
//!
//! 核心职责：定义"一次发布"的完整状态机，所有平台共用，差异全部来自 `PlatformConfig`
//!
//! 流程顺序：
//! 1. 前置校验（不触碰浏览器）
//! 2. 打开发布页（崩溃时重建会话重试一次）→ 登录检测
//! 3. 上传媒体 → 等待就绪
//! 4. 关闭引导 → 填写标题 / 正文 / 话题
//! 5. 背景音乐（尽力而为）→ 等待平台检测
//! 6. 发布前复核 → 点击发布 → 确认结果

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::browser::{SessionLease, SessionManager, Viewport};
use crate::error::{AppError, AppResult, ErrorInfo, PublishError};
use crate::infrastructure::{Key, PageDriver};
use crate::platforms::{
    ComposerConfig, LoginMarkers, MediaKind, OnboardingConfig, PlatformConfig, PublishConfig,
    ReadinessSignal, TextTarget, UploadConfig,
};
use crate::services::dom::{self, Located, Tick};
use crate::services::{music, Diagnostics, ForbiddenFilter};
use crate::utils::truncate_text;
use crate::workflow::publish_ctx::PublishCtx;
use crate::workflow::request::{PreparedPost, PublishRequest};
use crate::workflow::state::PublishState;

/// 导航超时
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
/// 页面加载后的固定等待
pub const PAGE_SETTLE: Duration = Duration::from_secs(3);
/// 上传前置点击之后的等待
const PRE_UPLOAD_SETTLE: Duration = Duration::from_secs(1);
/// 引导遮罩最多关闭几轮
const ONBOARDING_ROUNDS: usize = 3;
const ONBOARDING_SETTLE: Duration = Duration::from_millis(500);
/// 发布前复核比对的前缀长度
const TITLE_VERIFY_CHARS: usize = 5;
const DESCRIPTION_VERIFY_CHARS: usize = 10;
const SCROLL_SETTLE: Duration = Duration::from_millis(500);
/// 引导按钮的候选范围
const ONBOARDING_SCOPE: &str = r#"button, [role="button"]"#;

// ========== 结果 ==========

/// 发布内容摘要
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishDetails {
    pub title: Option<String>,
    pub description: String,
    /// 实际提交成功的话题
    pub tags: Vec<String>,
    pub media_count: usize,
    pub uploaded: usize,
    /// 音乐结果描述；未请求音乐时为空
    pub music: Option<String>,
    /// 等待媒体就绪超时后继续执行
    pub ready_timed_out: bool,
    pub moderation_timed_out: bool,
    /// 点击发布前发现内容被清空并重新填写
    pub refilled: bool,
}

/// 发布结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// 需要人工完成验证（不应自动重试）
    pub need_verify: bool,
    /// 结束时的页面地址
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 最后到达的状态
    pub state: PublishState,
    /// 经过的全部状态
    pub states: Vec<PublishState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<PublishDetails>,
}

impl PublishResult {
    /// 前置校验失败（没有经过任何浏览器交互）
    fn rejected(err: &AppError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            error: Some(err.into()),
            need_verify: false,
            url: None,
            state: PublishState::Failed,
            states: vec![PublishState::Idle, PublishState::Failed],
            details: None,
        }
    }
}

/// 点击发布后的判定
#[derive(Debug)]
enum Verdict {
    /// 命中成功地址或成功文案
    Confirmed(String),
    /// 出现人工验证
    NeedVerify(String),
    /// 超时且没有失败信号
    Unconfirmed,
}

/// 一次发布的运行状态
struct Run<'a> {
    ctx: PublishCtx,
    platform: &'a PlatformConfig,
    composer: &'a ComposerConfig,
    post: PreparedPost,
    state: PublishState,
    trail: Vec<PublishState>,
    details: PublishDetails,
    /// 标题与正文输入框，发布前复核用
    title_selector: Option<String>,
    description_selector: Option<String>,
}

impl Run<'_> {
    fn advance(&mut self, next: PublishState) {
        if !self.state.can_advance_to(next) {
            warn!("{} ⚠️ 非预期的状态转移: {:?} → {:?}", self.ctx, self.state, next);
        }
        self.state = next;
        self.trail.push(next);
        info!("{} ▶ {}", self.ctx, next);
    }
}

// ========== 流程 ==========

/// 发布流程
///
/// - 编排完整的发布状态机
/// - 只通过 `SessionManager` 获取页面，不直接创建浏览器
/// - 公共入口从不返回错误，所有失败都转换为 `PublishResult`
pub struct PublishFlow {
    sessions: Arc<SessionManager>,
    filter: Arc<ForbiddenFilter>,
    diagnostics: Diagnostics,
}

impl PublishFlow {
    pub fn new(
        sessions: Arc<SessionManager>,
        filter: Arc<ForbiddenFilter>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            sessions,
            filter,
            diagnostics,
        }
    }

    /// 执行一次发布
    ///
    /// # 参数
    /// - `platform`: 平台配置
    /// - `kind`: 调用的发布操作对应的媒体类型
    /// - `request`: 发布请求
    /// - `profile`: profile 名称
    /// - `headless`: 是否无头
    pub async fn run(
        &self,
        platform: &PlatformConfig,
        kind: MediaKind,
        request: &PublishRequest,
        profile: &str,
        headless: bool,
    ) -> PublishResult {
        let ctx = PublishCtx::new(platform.platform, kind, profile);
        info!("{} 🚀 开始发布", ctx);

        // ========== 前置校验 ==========
        let post = match PreparedPost::prepare(request, kind, platform, &self.filter) {
            Ok(post) => post,
            Err(e) => {
                warn!("{} ❌ 校验未通过: {}", ctx, e);
                return PublishResult::rejected(&e);
            }
        };
        let Some(composer) = platform.composer(kind) else {
            return PublishResult::rejected(&PublishError::Unsupported.into());
        };
        info!(
            "{} ✓ 校验通过: 标题={:?}, 话题={:?}, 文件={}",
            ctx,
            post.title,
            post.tags,
            post.media.len()
        );

        let mut run = Run {
            details: PublishDetails {
                title: post.title.clone(),
                description: post.description.clone(),
                media_count: post.media.len(),
                ..Default::default()
            },
            ctx,
            platform,
            composer,
            post,
            state: PublishState::Idle,
            trail: vec![PublishState::Idle],
            title_selector: None,
            description_selector: None,
        };

        // ========== 获取会话 ==========
        let acquired = self
            .sessions
            .acquire(profile, headless, Viewport::DEFAULT)
            .await;
        let lease = match acquired {
            Ok(lease) => lease,
            Err(e) => return self.fail(run, None, e).await,
        };

        // ========== Idle → PageOpened ==========
        let opened = self.open_composer(lease, &run).await;
        let lease = match opened {
            Ok(lease) => lease,
            Err(e) => return self.fail(run, None, e).await,
        };
        run.advance(PublishState::PageOpened);

        let page = lease.page();
        let outcome = self.drive(&mut run, page).await;
        match outcome {
            Ok(verdict) => self.finish(run, page, verdict).await,
            Err(e) => self.fail(run, Some(page), e).await,
        }
    }

    async fn open_composer(&self, lease: SessionLease, run: &Run<'_>) -> AppResult<SessionLease> {
        info!("{} 🌐 打开发布页: {}", run.ctx, run.composer.url);
        let lease = goto_with_recovery(&self.sessions, lease, run.composer.url).await?;
        sleep(PAGE_SETTLE).await;
        Ok(lease)
    }

    /// 从 PageOpened 推进到点击发布并拿到判定
    async fn drive(&self, run: &mut Run<'_>, page: &dyn PageDriver) -> AppResult<Verdict> {
        let platform = run.platform;
        let composer = run.composer;
        self.diagnostics.snapshot(page, "01-opened").await;

        // ========== PageOpened → Authenticated ==========
        if !is_authenticated(page, &platform.login.markers).await {
            return Err(PublishError::NotAuthenticated {
                platform: platform.name(),
            }
            .into());
        }
        run.advance(PublishState::Authenticated);

        // ========== Authenticated → MediaUploading ==========
        for target in composer.pre_upload {
            if dom::click_text_best_effort(page, target).await {
                debug!("{} 已点击 \"{}\"", run.ctx, target.text);
                sleep(PRE_UPLOAD_SETTLE).await;
            }
        }
        run.details.uploaded = upload_media(page, &composer.upload, &run.post.media, &run.ctx).await?;
        run.advance(PublishState::MediaUploading);

        // ========== MediaUploading → MediaReady ==========
        run.details.ready_timed_out = !wait_until_ready(page, composer, &run.ctx).await?;
        run.advance(PublishState::MediaReady);
        self.diagnostics.snapshot(page, "02-media-ready").await;

        // ========== MediaReady → MetadataFilled ==========
        dismiss_onboarding(page, &platform.onboarding).await;
        fill_title(page, run).await?;
        fill_description(page, run).await?;
        run.advance(PublishState::MetadataFilled);
        self.diagnostics.snapshot(page, "03-filled").await;

        // ========== MetadataFilled → MusicAttached（可选）==========
        if let Some(selection) = run.post.music.clone() {
            match &composer.music {
                Some(config) => match music::attach_music(page, config, &selection).await {
                    Ok(name) => {
                        run.details.music = Some(format!("已添加: {}", name));
                        run.advance(PublishState::MusicAttached);
                    }
                    Err(e) => {
                        warn!("{} ⚠️ 添加音乐失败，继续发布: {}", run.ctx, e);
                        run.details.music = Some(format!("添加失败: {}", e));
                    }
                },
                None => {
                    warn!("{} ⚠️ 当前发布页不支持背景音乐，已忽略", run.ctx);
                    run.details.music = Some("不支持".to_string());
                }
            }
        }

        // ========== → ModerationChecked ==========
        if let Some(moderation) = &composer.moderation {
            info!("{} 🔎 等待平台检测...", run.ctx);
            let start_url = page.current_url().await.unwrap_or_default();
            let outcome = dom::poll_until(moderation.timeout, moderation.interval, move || {
                let start_url = start_url.clone();
                async move {
                    if let Ok(Some(text)) = page.page_text_contains(moderation.done_texts).await {
                        return Ok(Tick::Ready(text));
                    }
                    // 页面跳转说明检测已经结束
                    match page.current_url().await {
                        Ok(url) if !start_url.is_empty() && url != start_url => {
                            Ok(Tick::Ready(format!("页面已跳转: {}", url)))
                        }
                        _ => Ok(Tick::Continue),
                    }
                }
            })
            .await?;
            match outcome {
                Some(signal) => info!("{} ✓ 检测完成 ({})", run.ctx, signal),
                None => {
                    warn!("{} ⚠️ 等待检测超时，继续发布", run.ctx);
                    run.details.moderation_timed_out = true;
                }
            }
        }
        run.advance(PublishState::ModerationChecked);

        // ========== ModerationChecked → Published ==========
        self.verify_before_publish(page, run).await?;
        ensure_on_composer(page, &composer.publish).await?;
        if let Some(container) = composer.publish.scroll_container {
            if let Err(e) = page.scroll_to_bottom(container).await {
                debug!("滚动 {} 失败: {}", container, e);
            }
            sleep(SCROLL_SETTLE).await;
        }

        let button = find_publish_control(page, &composer.publish)
            .await?
            .ok_or(PublishError::PublishControlNotFound)?;
        if let Err(e) = page.scroll_into_view(&button.selector).await {
            debug!("滚动到发布按钮失败: {}", e);
        }
        if !button.state.enabled {
            return Err(PublishError::PublishControlDisabled.into());
        }
        self.diagnostics.snapshot(page, "04-before-publish").await;
        info!("{} 📤 点击发布", run.ctx);
        page.click(&button.selector).await?;
        run.advance(PublishState::Published);

        // ========== Published → Confirmed ==========
        let verdict = await_confirmation(page, platform, &composer.publish).await?;
        self.diagnostics.snapshot(page, "05-after-publish").await;
        Ok(verdict)
    }

    /// 发布前复核：宿主页面偶尔会清空已填内容，发现后重新填写一次
    async fn verify_before_publish(&self, page: &dyn PageDriver, run: &mut Run<'_>) -> AppResult<()> {
        if let (Some(selector), Some(title)) = (run.title_selector.clone(), run.post.title.clone()) {
            if !field_starts_with(page, &selector, &title, TITLE_VERIFY_CHARS).await {
                warn!("{} ⚠️ 标题被清空，重新填写", run.ctx);
                run.details.refilled = true;
                fill_title(page, run).await?;
            }
        }

        if let Some(selector) = run.description_selector.clone() {
            let description = run.post.description.clone();
            if !description.is_empty()
                && !field_starts_with(page, &selector, &description, DESCRIPTION_VERIFY_CHARS).await
            {
                warn!("{} ⚠️ 正文被清空，重新填写", run.ctx);
                run.details.refilled = true;
                fill_description(page, run).await?;
            }
        }
        Ok(())
    }

    async fn finish(&self, run: Run<'_>, page: &dyn PageDriver, verdict: Verdict) -> PublishResult {
        let Run {
            ctx,
            mut state,
            mut trail,
            details,
            ..
        } = run;
        let url = page.current_url().await.ok();

        let (success, need_verify, message) = match verdict {
            Verdict::Confirmed(signal) => {
                state = PublishState::Confirmed;
                trail.push(state);
                info!("{} ✅ 发布成功 ({})", ctx, signal);
                (true, false, "发布成功".to_string())
            }
            Verdict::NeedVerify(marker) => {
                warn!("{} 🔐 需要人工验证: {}", ctx, marker);
                (false, true, format!("需要完成身份验证后再发布: {}", marker))
            }
            Verdict::Unconfirmed => {
                warn!("{} ⚠️ 未检测到发布结果，按已提交处理", ctx);
                (true, false, "已提交发布，未能确认结果".to_string())
            }
        };

        PublishResult {
            success,
            message,
            error: None,
            need_verify,
            url,
            state,
            states: trail,
            details: Some(details),
        }
    }

    async fn fail(&self, run: Run<'_>, page: Option<&dyn PageDriver>, err: AppError) -> PublishResult {
        error!("{} ❌ 发布失败（{}）: {}", run.ctx, run.state, err);
        let mut url = None;
        if let Some(page) = page {
            self.diagnostics.snapshot(page, "failed").await;
            url = page.current_url().await.ok();
        }

        let mut trail = run.trail;
        trail.push(PublishState::Failed);
        PublishResult {
            success: false,
            message: err.to_string(),
            error: Some((&err).into()),
            need_verify: false,
            url,
            state: PublishState::Failed,
            states: trail,
            details: Some(run.details),
        }
    }
}

// ========== 步骤 ==========

/// 导航到 `url`；页面崩溃或导航超时时重建会话并重试一次
///
/// # 返回
/// 导航成功后的租约（可能是重建后的新租约）
pub async fn goto_with_recovery(
    sessions: &SessionManager,
    lease: SessionLease,
    url: &str,
) -> AppResult<SessionLease> {
    let navigated = lease.page().goto(url, NAVIGATION_TIMEOUT).await;
    match navigated {
        Ok(()) => Ok(lease),
        Err(e) if e.is_recoverable() => {
            warn!("⚠️ {}，重建会话后重试", e);
            let lease = sessions.recover(lease).await?;
            let retried = lease.page().goto(url, NAVIGATION_TIMEOUT).await;
            retried?;
            Ok(lease)
        }
        Err(e) => Err(e.into()),
    }
}

/// 登录检测：任一登录后才有的标记存在即视为已登录
pub async fn is_authenticated(page: &dyn PageDriver, markers: &LoginMarkers) -> bool {
    for selector in markers.selectors {
        // 文件输入框通常是隐藏的，只要存在即可
        if matches!(page.inspect_all(selector).await, Ok(states) if !states.is_empty()) {
            debug!("登录检测命中选择器: {}", selector);
            return true;
        }
    }
    for text in markers.button_texts {
        let target = TextTarget::contains("button", text);
        if matches!(dom::find_by_text(page, &target, false).await, Ok(Some(_))) {
            debug!("登录检测命中按钮: {}", text);
            return true;
        }
    }
    if !markers.page_texts.is_empty() {
        if let Ok(Some(text)) = page.page_text_contains(markers.page_texts).await {
            debug!("登录检测命中文案: {}", text);
            return true;
        }
    }
    false
}

/// 上传媒体
///
/// 优先使用支持多选的文件输入框一次提交；否则逐个提交，单个失败跳过。
/// 没有文件输入框时通过文件选择框上传。
///
/// # 返回
/// 成功提交的文件数量
async fn upload_media(
    page: &dyn PageDriver,
    config: &UploadConfig,
    files: &[PathBuf],
    ctx: &PublishCtx,
) -> AppResult<usize> {
    info!("{} 📁 上传 {} 个文件", ctx, files.len());

    let mut candidates: Vec<(&str, usize, bool)> = Vec::new();
    for selector in config.file_input_selectors {
        if let Ok(states) = page.inspect_all(selector).await {
            candidates.extend(
                states
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (*selector, i, s.multiple)),
            );
        }
    }
    debug!("{} 找到 {} 个文件输入框", ctx, candidates.len());

    let chosen = candidates
        .iter()
        .find(|(_, _, multiple)| *multiple)
        .or_else(|| candidates.first())
        .copied();

    let uploaded = if let Some((selector, index, multiple)) = chosen {
        let input = if index == 0 {
            selector.to_string()
        } else {
            page.mark_nth(selector, index, None)
                .await?
                .ok_or(PublishError::UploadControlNotFound)?
        };

        if multiple || files.len() == 1 {
            if let Err(e) = page.set_input_files(&input, files).await {
                warn!("{} ⚠️ 提交文件失败: {}", ctx, e);
                return Err(PublishError::UploadFailed.into());
            }
            files.len()
        } else {
            let mut count = 0;
            for (i, file) in files.iter().enumerate() {
                match page.set_input_files(&input, std::slice::from_ref(file)).await {
                    Ok(()) => {
                        count += 1;
                        debug!("{} 已提交第 {}/{} 个文件", ctx, i + 1, files.len());
                    }
                    Err(e) => warn!("{} ⚠️ 第 {} 个文件提交失败，跳过: {}", ctx, i + 1, e),
                }
                sleep(config.file_settle).await;
            }
            if count == 0 {
                return Err(PublishError::UploadFailed.into());
            }
            count
        }
    } else if let Some(trigger) = &config.chooser_trigger {
        let button = dom::find_by_text(page, trigger, false)
            .await?
            .ok_or(PublishError::UploadControlNotFound)?;
        if let Err(e) = page.upload_via_chooser(&button.selector, files).await {
            warn!("{} ⚠️ 通过文件选择框上传失败: {}", ctx, e);
            return Err(PublishError::UploadFailed.into());
        }
        files.len()
    } else {
        return Err(PublishError::UploadControlNotFound.into());
    };

    sleep(config.settle).await;

    if let Some(fragment) = config.post_upload_url {
        let reached = dom::poll_until(
            config.post_upload_wait,
            Duration::from_secs(1),
            move || async move {
                Ok(match page.current_url().await {
                    Ok(url) if url.contains(fragment) => Tick::Ready(()),
                    _ => Tick::Continue,
                })
            },
        )
        .await?;
        if reached.is_none() {
            warn!("{} ⚠️ 上传后未跳转到 {}，继续", ctx, fragment);
        }
    }

    info!("{} ✓ 已提交 {} 个文件", ctx, uploaded);
    Ok(uploaded)
}

/// 等待媒体就绪
///
/// 出现失败文案立即失败；超时只记录警告
///
/// # 返回
/// 就绪返回 true，超时返回 false
async fn wait_until_ready(
    page: &dyn PageDriver,
    composer: &ComposerConfig,
    ctx: &PublishCtx,
) -> AppResult<bool> {
    let readiness = &composer.readiness;
    let publish = &composer.publish;
    info!(
        "{} ⏳ 等待媒体处理完成（最长 {} 秒）",
        ctx,
        readiness.max_wait.as_secs()
    );

    let ready = match &readiness.signal {
        ReadinessSignal::FixedDelay => {
            sleep(readiness.max_wait).await;
            if let Ok(Some(text)) = page.page_text_contains(readiness.failure_texts).await {
                return Err(PublishError::UploadRejected { text }.into());
            }
            true
        }
        ReadinessSignal::ProgressCleared { selector } => {
            dom::poll_until_absent(
                page,
                selector,
                readiness.failure_texts,
                readiness.max_wait,
                readiness.interval,
            )
            .await?
        }
        signal => dom::poll_until(readiness.max_wait, readiness.interval, move || async move {
            if let Ok(Some(text)) = page.page_text_contains(readiness.failure_texts).await {
                return Err(AppError::from(PublishError::UploadRejected { text }));
            }
            let done = match signal {
                ReadinessSignal::FieldsReady {
                    complete_texts,
                    uploading_texts,
                    required_selectors,
                } => fields_ready(page, complete_texts, uploading_texts, required_selectors).await,
                ReadinessSignal::PublishEnabled => matches!(
                    find_publish_control(page, publish).await,
                    Ok(Some(Located { ref state, .. })) if state.enabled
                ),
                ReadinessSignal::ProgressCleared { .. } | ReadinessSignal::FixedDelay => true,
            };
            Ok(if done { Tick::Ready(()) } else { Tick::Continue })
        })
        .await?
        .is_some(),
    };

    if ready {
        info!("{} ✓ 媒体已就绪", ctx);
    } else {
        warn!("{} ⚠️ 等待媒体就绪超时，继续后续步骤", ctx);
    }
    Ok(ready)
}

async fn fields_ready(
    page: &dyn PageDriver,
    complete_texts: &[&str],
    uploading_texts: &[&str],
    required_selectors: &[&str],
) -> bool {
    if let Ok(Some(_)) = page.page_text_contains(complete_texts).await {
        return true;
    }
    if let Ok(Some(_)) = page.page_text_contains(uploading_texts).await {
        return false;
    }
    for selector in required_selectors {
        match page.inspect_all(selector).await {
            Ok(states) if !states.is_empty() => {}
            _ => return false,
        }
    }
    true
}

/// 关闭新手引导（尽力而为，任何失败都忽略）
async fn dismiss_onboarding(page: &dyn PageDriver, config: &OnboardingConfig) {
    for _ in 0..ONBOARDING_ROUNDS {
        let mut clicked = false;
        for text in config.button_texts {
            let target = TextTarget::exact(ONBOARDING_SCOPE, text);
            clicked |= dom::click_text_best_effort(page, &target).await;
        }
        if let Some(selector) = dom::find_first_visible(page, config.selectors).await {
            clicked |= page.click(&selector).await.is_ok();
        }
        if !clicked {
            break;
        }
        debug!("已关闭一层引导");
        sleep(ONBOARDING_SETTLE).await;
    }

    if let Some(overlay) = config.overlay_selector {
        let present = matches!(page.inspect_all(overlay).await, Ok(states) if !states.is_empty());
        if present {
            let _ = page.press_key(Key::Escape).await;
            sleep(ONBOARDING_SETTLE).await;
            if let Ok(removed) = page.remove_all(overlay).await {
                if removed > 0 {
                    debug!("已移除 {} 个引导遮罩", removed);
                }
            }
        }
    }
}

/// 填写标题，填写后校验非空，为空时重试一次
async fn fill_title(page: &dyn PageDriver, run: &mut Run<'_>) -> AppResult<()> {
    let composer = run.composer;
    let (Some(field), Some(title)) = (&composer.title, run.post.title.clone()) else {
        return Ok(());
    };
    info!("{} ✏️ 填写标题: {}", run.ctx, title);

    let mut selector = dom::input_text(page, field, &title).await?;
    if field_is_empty(page, &selector).await {
        warn!("{} ⚠️ 标题输入后为空，重试一次", run.ctx);
        selector = dom::input_text(page, field, &title).await?;
        if field_is_empty(page, &selector).await {
            warn!("{} ⚠️ 标题仍为空，继续", run.ctx);
        }
    }
    run.title_selector = Some(selector);
    Ok(())
}

/// 填写正文并追加话题
async fn fill_description(page: &dyn PageDriver, run: &mut Run<'_>) -> AppResult<()> {
    let composer = run.composer;
    let description = run.post.description.clone();
    let tags = run.post.tags.clone();
    if description.is_empty() && tags.is_empty() {
        return Ok(());
    }
    info!("{} ✏️ 填写正文: {}", run.ctx, truncate_text(&description, 30));

    let selector = dom::input_text(page, &composer.description, &description).await?;
    if !tags.is_empty() {
        info!("{} 🏷️ 添加 {} 个话题", run.ctx, tags.len());
        let committed = dom::append_tags(page, &selector, &composer.tags, &tags).await;
        if committed.len() < tags.len() {
            warn!("{} ⚠️ 部分话题未添加成功，已添加: {:?}", run.ctx, committed);
        }
        run.details.tags = committed;
    }
    run.description_selector = Some(selector);
    Ok(())
}

async fn field_is_empty(page: &dyn PageDriver, selector: &str) -> bool {
    !matches!(page.field_text(selector).await, Ok(Some(text)) if !text.trim().is_empty())
}

/// 字段内容是否包含期望文本的前 `prefix_chars` 个字
async fn field_starts_with(
    page: &dyn PageDriver,
    selector: &str,
    expected: &str,
    prefix_chars: usize,
) -> bool {
    let prefix: String = expected.chars().take(prefix_chars).collect();
    match page.field_text(selector).await {
        Ok(Some(text)) => text.contains(&prefix),
        // 查询失败时不触发重填
        Err(_) => true,
        Ok(None) => false,
    }
}

/// 点击发布前必须仍在发布页
async fn ensure_on_composer(page: &dyn PageDriver, config: &PublishConfig) -> AppResult<()> {
    let Some(expected) = config.expected_url else {
        return Ok(());
    };
    let url = page.current_url().await?;
    if url.contains(expected) {
        Ok(())
    } else {
        Err(PublishError::WrongPage { url }.into())
    }
}

/// 查找发布按钮：先按文本精确匹配，再尝试备用选择器
async fn find_publish_control(
    page: &dyn PageDriver,
    config: &PublishConfig,
) -> AppResult<Option<Located>> {
    if let Some(located) = dom::find_by_text(page, &config.button, false).await? {
        return Ok(Some(located));
    }
    for selector in config.fallback_selectors {
        let Ok(states) = page.inspect_all(selector).await else {
            continue;
        };
        let Some(index) = states.iter().position(|s| s.visible) else {
            continue;
        };
        let marked = if index == 0 {
            Some(selector.to_string())
        } else {
            page.mark_nth(selector, index, None).await?
        };
        if let Some(marked) = marked {
            return Ok(Some(Located {
                selector: marked,
                state: states[index].clone(),
            }));
        }
    }
    Ok(None)
}

/// 等待发布结果：成功地址、成功文案、人工验证三者取先出现者
async fn await_confirmation(
    page: &dyn PageDriver,
    platform: &PlatformConfig,
    config: &PublishConfig,
) -> AppResult<Verdict> {
    let verification = &platform.verification;
    let verdict = dom::poll_until(config.result_timeout, config.result_interval, move || async move {
        if let Some(selector) = dom::find_first_visible(page, verification.selectors).await {
            return Ok(Tick::Ready(Verdict::NeedVerify(selector)));
        }
        if !verification.texts.is_empty() {
            if let Ok(Some(text)) = page.page_text_contains(verification.texts).await {
                return Ok(Tick::Ready(Verdict::NeedVerify(text)));
            }
        }
        if let Ok(url) = page.current_url().await {
            if config.success_urls.iter().any(|pattern| url.contains(pattern)) {
                return Ok(Tick::Ready(Verdict::Confirmed(url)));
            }
        }
        if let Ok(Some(text)) = page.page_text_contains(config.success_texts).await {
            return Ok(Tick::Ready(Verdict::Confirmed(text)));
        }
        Ok(Tick::Continue)
    })
    .await?;
    Ok(verdict.unwrap_or(Verdict::Unconfirmed))
}
