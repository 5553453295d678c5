//! 背景音乐 - 业务能力层
//!
//! 打开音乐面板 → 可选搜索 → 选中一首 → 点击使用 → 校验确认文案

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, BrowserError};
use crate::infrastructure::{Key, PageDriver};
use crate::platforms::MusicConfig;
use crate::services::dom::{self, Tick};

/// 等待确认文案的时间
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);

/// 音乐选择方式
///
/// 指定 `index` 时直接取该位置；否则有 `query` 时取搜索结果第一项；
/// 都没有时从热门列表随机选一首
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicSelection {
    #[serde(default, alias = "name")]
    pub query: Option<String>,
    #[serde(default)]
    pub index: Option<usize>,
}

impl MusicSelection {
    /// 随机热门音乐
    pub fn random() -> Self {
        Self::default()
    }

    pub fn search(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            index: None,
        }
    }

    /// 在 `count` 个候选中决定选哪一个
    fn pick(&self, count: usize) -> usize {
        match (self.index, &self.query) {
            (Some(index), _) => index.min(count.saturating_sub(1)),
            (None, Some(_)) => 0,
            (None, None) => rand::thread_rng().gen_range(0..count),
        }
    }
}

/// 添加背景音乐
///
/// # 返回
/// 选中条目的文本
pub async fn attach_music(
    page: &dyn PageDriver,
    config: &MusicConfig,
    selection: &MusicSelection,
) -> AppResult<String> {
    // 1. 打开音乐面板
    let open = dom::find_by_text(page, &config.open, config.open_pick_last)
        .await?
        .ok_or_else(|| AppError::element_not_found(format!("音乐入口\"{}\"", config.open.text)))?;
    page.click(&open.selector).await?;
    sleep(config.settle).await;

    // 2. 搜索
    if let (Some(query), Some(input)) = (selection.query.as_deref(), config.search_input) {
        match dom::find_first_visible(page, &[input]).await {
            Some(selector) => {
                info!("🔍 搜索音乐: {}", query);
                page.click(&selector).await?;
                page.clear_field(&selector).await?;
                page.type_text(query, Duration::ZERO).await?;
                page.press_key(Key::Enter).await?;
                sleep(config.settle).await;
            }
            None => warn!("⚠️ 未找到音乐搜索框，改为从列表中选择"),
        }
    }

    // 3. 选择条目
    let states = page.inspect_all(config.item_selector).await?;
    let visible: Vec<usize> = states
        .iter()
        .enumerate()
        .filter(|(_, s)| s.visible)
        .map(|(i, _)| i)
        .take(config.max_items)
        .collect();
    if visible.is_empty() {
        return Err(AppError::element_not_found("音乐列表"));
    }
    let index = visible[selection.pick(visible.len())];
    let name = states[index].text.lines().next().unwrap_or_default().to_string();
    debug!("选中第 {} 首音乐: {}", index + 1, name);

    let item = page
        .mark_nth(config.item_selector, index, None)
        .await?
        .ok_or_else(|| AppError::element_not_found("音乐条目"))?;
    page.scroll_into_view(&item).await?;
    page.click(&item).await?;

    // 4. 点击"使用"按钮；没有按钮的平台点击条目即生效
    if let Some(action) = config.item_action {
        match page.mark_nth(config.item_selector, index, Some(action)).await? {
            Some(button) => page.click(&button).await?,
            None => debug!("条目内没有使用按钮，跳过"),
        }
    }
    sleep(config.settle).await;

    // 5. 校验
    let confirmed = dom::poll_until(CONFIRM_TIMEOUT, Duration::from_millis(500), move || async move {
        Ok(match page.page_text_contains(config.confirm_texts).await? {
            Some(text) => Tick::Ready(text),
            None => Tick::Continue,
        })
    })
    .await?;

    match confirmed {
        Some(text) => info!("✓ 已添加音乐 ({})", text),
        None if config.confirm_required => {
            return Err(BrowserError::ElementNotFound {
                target: format!("音乐确认文案 {:?}", config.confirm_texts),
            }
            .into());
        }
        None => warn!("⚠️ 未看到音乐确认文案，按已添加处理"),
    }

    Ok(name)
}
