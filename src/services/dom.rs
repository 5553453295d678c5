//! DOM 交互原语 - 业务能力层
//!
//! 在 `PageDriver` 之上提供带回退的元素查找、输入、话题追加和轮询等待。
//! 这里的函数都不认识具体平台，平台差异通过参数传入。

use std::future::Future;

use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, PublishError};
use crate::infrastructure::{ElementState, PageDriver};
use crate::platforms::{FieldConfig, InputMode, TagConfig, TextTarget};

/// 点击输入框后等待焦点稳定
const FOCUS_SETTLE: Duration = Duration::from_millis(200);
/// 富文本逐字输入的间隔
const RICH_TEXT_TYPE_DELAY: Duration = Duration::from_millis(30);
/// 移动光标后的等待
const CURSOR_SETTLE: Duration = Duration::from_millis(100);

/// 一次轮询的结果
#[derive(Debug)]
pub enum Tick<T> {
    /// 条件未满足，继续等待
    Continue,
    /// 条件满足，结束轮询
    Ready(T),
}

/// 按文本定位到的元素
#[derive(Debug, Clone)]
pub struct Located {
    /// 可直接用于后续操作的唯一选择器
    pub selector: String,
    pub state: ElementState,
}

/// 有界轮询
///
/// 每隔 `interval` 执行一次 `check`，直到返回 `Tick::Ready` 或超过 `timeout`。
/// 超时返回 `Ok(None)`，由调用方决定是否致命；`check` 返回的错误立即向上传播。
///
/// # 参数
/// - `timeout`: 最长等待时间
/// - `interval`: 两次探测之间的间隔
/// - `check`: 检查函数
pub async fn poll_until<T, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> AppResult<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<Tick<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Tick::Ready(value) = check().await? {
            return Ok(Some(value));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        sleep(interval).await;
    }
}

/// 等待选择器对应的元素消失（不存在或全部不可见）
///
/// 每次探测先检查 `abort_texts`，页面出现其中任一文案立即返回 `UploadRejected`
///
/// # 返回
/// 消失返回 true；超时返回 false（不视为错误）
pub async fn poll_until_absent(
    page: &dyn PageDriver,
    selector: &str,
    abort_texts: &[&str],
    timeout: Duration,
    interval: Duration,
) -> AppResult<bool> {
    let outcome = poll_until(timeout, interval, move || async move {
        if let Ok(Some(text)) = page.page_text_contains(abort_texts).await {
            return Err(AppError::from(PublishError::UploadRejected { text }));
        }
        Ok(match page.inspect_all(selector).await {
            Ok(states) if !states.iter().any(|s| s.visible) => Tick::Ready(()),
            Ok(_) => Tick::Continue,
            Err(e) => {
                debug!("检查 {} 时出错（继续等待）: {}", selector, e);
                Tick::Continue
            }
        })
    })
    .await?;
    Ok(outcome.is_some())
}

/// 按顺序尝试选择器，返回第一个可见元素的选择器
///
/// 单个选择器查询出错视为未命中；全部未命中返回 None
pub async fn find_first_visible(page: &dyn PageDriver, selectors: &[&str]) -> Option<String> {
    for selector in selectors {
        let states = match page.inspect_all(selector).await {
            Ok(states) => states,
            Err(e) => {
                debug!("选择器 {} 查询失败: {}", selector, e);
                continue;
            }
        };
        let Some(index) = states.iter().position(|s| s.visible) else {
            continue;
        };
        if index == 0 {
            return Some(selector.to_string());
        }
        // 第一个匹配不可见时，给可见的那个打标记
        match page.mark_nth(selector, index, None).await {
            Ok(Some(marked)) => return Some(marked),
            Ok(None) => continue,
            Err(e) => debug!("标记元素失败: {}", e),
        }
    }
    None
}

/// 在候选范围内按文本查找可见元素
///
/// 多个元素匹配时优先返回可用的那个；`pick_last` 为 true 时从后往前找
pub async fn find_by_text(
    page: &dyn PageDriver,
    target: &TextTarget,
    pick_last: bool,
) -> AppResult<Option<Located>> {
    let states = page.inspect_all(target.scope).await?;
    let mut matches: Vec<(usize, &ElementState)> = states
        .iter()
        .enumerate()
        .filter(|(_, s)| s.visible && text_matches(&s.text, target))
        .collect();
    if pick_last {
        matches.reverse();
    }

    let chosen = matches
        .iter()
        .find(|(_, s)| s.enabled)
        .or_else(|| matches.first());
    let Some(&(index, state)) = chosen else {
        return Ok(None);
    };

    let selector = if index == 0 {
        Some(target.scope.to_string())
    } else {
        page.mark_nth(target.scope, index, None).await?
    };
    Ok(selector.map(|selector| Located {
        selector,
        state: state.clone(),
    }))
}

fn text_matches(text: &str, target: &TextTarget) -> bool {
    let text = text.trim();
    if target.exact {
        text == target.text
    } else {
        text.contains(target.text)
    }
}

/// 按文本点击元素，找不到或点击失败都只记录日志
///
/// # 返回
/// 是否点击成功
pub async fn click_text_best_effort(page: &dyn PageDriver, target: &TextTarget) -> bool {
    match find_by_text(page, target, false).await {
        Ok(Some(located)) => match page.click(&located.selector).await {
            Ok(()) => true,
            Err(e) => {
                debug!("点击 \"{}\" 失败: {}", target.text, e);
                false
            }
        },
        Ok(None) => false,
        Err(e) => {
            debug!("查找 \"{}\" 失败: {}", target.text, e);
            false
        }
    }
}

/// 向字段输入文本
///
/// 找不到字段时返回 `ElementNotFound`
///
/// # 返回
/// 实际使用的选择器，供后续追加话题、校验使用
pub async fn input_text(page: &dyn PageDriver, field: &FieldConfig, text: &str) -> AppResult<String> {
    let selector = find_first_visible(page, field.selectors)
        .await
        .ok_or_else(|| AppError::element_not_found(field.label))?;

    page.click(&selector).await?;
    sleep(FOCUS_SETTLE).await;

    match field.mode {
        InputMode::Plain => {
            page.clear_field(&selector).await?;
            page.type_text(text, Duration::ZERO).await?;
        }
        InputMode::RichText => {
            page.clear_rich_text(&selector).await?;
            sleep(FOCUS_SETTLE).await;
            page.focus(&selector).await?;
            page.type_text(text, RICH_TEXT_TYPE_DELAY).await?;
        }
    }

    debug!("已填写{}: {}", field.label, selector);
    Ok(selector)
}

/// 在字段末尾逐个追加话题
///
/// 每个话题：光标移到末尾 → 输入 ` #话题` → 等待联想 → 点击联想项或按分隔键 → 等待。
/// 话题之间的等待是平台联想框需要的，省略会导致话题静默丢失。
/// 单个话题失败只记录警告，继续下一个。
///
/// # 返回
/// 成功提交的话题（保持输入顺序）
pub async fn append_tags(
    page: &dyn PageDriver,
    selector: &str,
    config: &TagConfig,
    tags: &[String],
) -> Vec<String> {
    let mut committed = Vec::with_capacity(tags.len());
    for tag in tags {
        match append_tag(page, selector, config, tag).await {
            Ok(()) => committed.push(tag.clone()),
            Err(e) => warn!("⚠️ 添加话题 {} 失败: {}", tag, e),
        }
        sleep(config.delay).await;
    }
    committed
}

async fn append_tag(
    page: &dyn PageDriver,
    selector: &str,
    config: &TagConfig,
    tag: &str,
) -> AppResult<()> {
    page.move_cursor_to_end(selector).await?;
    sleep(CURSOR_SETTLE).await;
    page.focus(selector).await?;

    page.type_text(&format!(" {}", config.format.apply(tag)), Duration::ZERO)
        .await?;
    sleep(config.settle).await;

    if !config.suggestion_selectors.is_empty() {
        if let Some(suggestion) = find_first_visible(page, config.suggestion_selectors).await {
            page.click(&suggestion).await?;
            return Ok(());
        }
    }
    page.press_key(config.separator).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_ready_after_ticks() {
        let mut calls = 0;
        let result = poll_until(Duration::from_secs(10), Duration::from_secs(1), || {
            calls += 1;
            let n = calls;
            async move { Ok(if n >= 3 { Tick::Ready(n) } else { Tick::Continue }) }
        })
        .await
        .unwrap();
        assert_eq!(result, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_times_out_without_error() {
        let start = Instant::now();
        let result: Option<()> = poll_until(Duration::from_secs(5), Duration::from_secs(1), || async {
            Ok(Tick::Continue)
        })
        .await
        .unwrap();
        assert!(result.is_none());
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_propagates_check_error() {
        let result: AppResult<Option<()>> =
            poll_until(Duration::from_secs(5), Duration::from_secs(1), || async {
                Err(AppError::element_not_found("x"))
            })
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_text_matching() {
        let exact = TextTarget::exact("button", "发布");
        assert!(text_matches(" 发布 ", &exact));
        assert!(!text_matches("定时发布", &exact));
        let contains = TextTarget::contains("button", "上传");
        assert!(text_matches("点击上传视频", &contains));
    }
}
