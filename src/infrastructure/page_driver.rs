//! 页面能力抽象 - 基础设施层
//!
//! 流程层只通过 `PageDriver` 操作页面，不直接接触 CDP。
//! 生产环境由 `CdpPage` 实现，测试中可替换为内存实现。

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::BrowserResult;

/// 元素快照
///
/// 一次查询时元素的可见性、可用性和文本
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ElementState {
    pub visible: bool,
    pub enabled: bool,
    /// 仅对 `<input type="file">` 有意义
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub text: String,
}

/// 键盘按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    Comma,
    Escape,
}

impl Key {
    /// DOM `key` 值
    pub fn key(self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::Space => " ",
            Key::Comma => ",",
            Key::Escape => "Escape",
        }
    }

    /// DOM `code` 值
    pub fn code(self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::Space => "Space",
            Key::Comma => "Comma",
            Key::Escape => "Escape",
        }
    }

    /// Windows 虚拟键码
    pub fn virtual_key_code(self) -> i64 {
        match self {
            Key::Enter => 13,
            Key::Space => 32,
            Key::Comma => 188,
            Key::Escape => 27,
        }
    }

    /// 按键产生的字符
    pub fn text(self) -> Option<&'static str> {
        match self {
            Key::Enter => Some("\r"),
            Key::Space => Some(" "),
            Key::Comma => Some(","),
            Key::Escape => None,
        }
    }
}

/// 页面能力
///
/// 职责：
/// - 以 CSS 选择器为单位暴露语义化的页面操作
/// - 不认识平台 / 发布流程
/// - 所有方法都是单次操作，等待与重试由上层负责
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 导航到指定 URL，超过 `timeout` 返回 `NavigationTimeout`
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()>;

    /// 当前页面 URL
    async fn current_url(&self) -> BrowserResult<String>;

    /// 查询所有匹配元素的状态（按文档顺序）
    async fn inspect_all(&self, selector: &str) -> BrowserResult<Vec<ElementState>>;

    /// 给第 `index` 个匹配元素（或其内部 `inner` 元素）打标记，返回唯一选择器
    async fn mark_nth(
        &self,
        selector: &str,
        index: usize,
        inner: Option<&str>,
    ) -> BrowserResult<Option<String>>;

    async fn click(&self, selector: &str) -> BrowserResult<()>;

    async fn focus(&self, selector: &str) -> BrowserResult<()>;

    async fn scroll_into_view(&self, selector: &str) -> BrowserResult<()>;

    /// 将滚动容器滚到底部
    async fn scroll_to_bottom(&self, selector: &str) -> BrowserResult<()>;

    /// 清空普通输入框的值
    async fn clear_field(&self, selector: &str) -> BrowserResult<()>;

    /// 清空富文本区域的全部子节点，并派发 input 事件
    async fn clear_rich_text(&self, selector: &str) -> BrowserResult<()>;

    /// 将光标移动到元素内容末尾
    async fn move_cursor_to_end(&self, selector: &str) -> BrowserResult<()>;

    /// 向当前焦点逐字输入文本，每个字符之间间隔 `delay`
    async fn type_text(&self, text: &str, delay: Duration) -> BrowserResult<()>;

    async fn press_key(&self, key: Key) -> BrowserResult<()>;

    /// 输入框的 value 或富文本的 innerText；元素不存在返回 None
    async fn field_text(&self, selector: &str) -> BrowserResult<Option<String>>;

    /// 页面可见文本中是否包含任一候选文本，返回第一个命中的候选
    async fn page_text_contains(&self, needles: &[&str]) -> BrowserResult<Option<String>>;

    /// 从 DOM 中移除所有匹配元素，返回移除数量
    async fn remove_all(&self, selector: &str) -> BrowserResult<usize>;

    /// 直接给 `<input type="file">` 设置文件
    async fn set_input_files(&self, selector: &str, files: &[PathBuf]) -> BrowserResult<()>;

    /// 点击触发元素，拦截系统文件选择框后设置文件
    async fn upload_via_chooser(&self, trigger: &str, files: &[PathBuf]) -> BrowserResult<()>;

    /// 执行表达式，返回 JSON 结果
    async fn evaluate(&self, expression: &str) -> BrowserResult<JsonValue>;

    async fn clear_cookies(&self) -> BrowserResult<()>;

    /// 当前视口 PNG 截图
    async fn screenshot(&self) -> BrowserResult<Vec<u8>>;

    /// 按坐标点击
    async fn click_at(&self, x: f64, y: f64) -> BrowserResult<()>;

    /// 页面是否已经失效（失效的页面不能再被复用）
    fn is_closed(&self) -> bool;
}
