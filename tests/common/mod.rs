//! 测试用的内存页面和浏览器启动器
//!
//! `FakePage` 用选择器到元素列表的映射模拟 DOM，记录所有操作，
//! 并在点击 / 上传时执行预设的副作用

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use creator_publish::browser::{
    BrowserContext, BrowserLauncher, LaunchOptions, ProfileStore, SessionManager,
};
use creator_publish::error::{BrowserError, BrowserResult};
use creator_publish::infrastructure::{ElementState, Key, PageDriver};

/// 可见且可用、带文本的元素
pub fn el(text: &str) -> ElementState {
    ElementState {
        visible: true,
        enabled: true,
        multiple: false,
        text: text.to_string(),
    }
}

/// 可见但不可用
pub fn disabled(text: &str) -> ElementState {
    ElementState {
        enabled: false,
        ..el(text)
    }
}

/// 隐藏的元素（例如文件输入框）
pub fn hidden() -> ElementState {
    ElementState {
        visible: false,
        ..el("")
    }
}

/// 点击 / 上传后对页面的修改
#[derive(Debug, Clone)]
pub enum Effect {
    SetUrl(String),
    AddText(String),
    SetElements(String, Vec<ElementState>),
    RemoveElements(String),
    /// 宿主页面清空已填写的字段
    ClearField(String),
}

#[derive(Debug, Default)]
struct Dom {
    url: String,
    elements: HashMap<String, Vec<ElementState>>,
    texts: Vec<String>,
    fields: HashMap<String, String>,
    focused: Option<String>,
    actions: Vec<String>,
    on_click: HashMap<String, Vec<Effect>>,
    on_upload: Vec<Effect>,
    /// 选择器被查询多少次后消失
    vanish_after: HashMap<String, usize>,
    /// 前几次导航直接崩溃
    crash_gotos: usize,
    /// 第几次（从 0 开始）提交文件时失败
    failing_uploads: Vec<usize>,
    upload_calls: usize,
    eval_result: JsonValue,
}

impl Dom {
    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SetUrl(url) => self.url = url,
                Effect::AddText(text) => self.texts.push(text),
                Effect::SetElements(selector, states) => {
                    self.elements.insert(selector, states);
                }
                Effect::RemoveElements(selector) => {
                    self.elements.remove(&selector);
                }
                Effect::ClearField(selector) => {
                    self.fields.insert(selector, String::new());
                }
            }
        }
    }

    /// `selector@index` 形式的标记选择器
    fn lookup(&self, selector: &str) -> Vec<ElementState> {
        if let Some((base, index)) = selector.rsplit_once('@') {
            if let Ok(index) = index.parse::<usize>() {
                return self
                    .elements
                    .get(base)
                    .and_then(|states| states.get(index))
                    .cloned()
                    .into_iter()
                    .collect();
            }
        }
        self.elements.get(selector).cloned().unwrap_or_default()
    }
}

/// 内存页面
#[derive(Debug, Default)]
pub struct FakePage {
    dom: Mutex<Dom>,
    closed: AtomicBool,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(self, selector: &str, states: Vec<ElementState>) -> Self {
        self.dom
            .lock()
            .unwrap()
            .elements
            .insert(selector.to_string(), states);
        self
    }

    pub fn with_text(self, text: &str) -> Self {
        self.dom.lock().unwrap().texts.push(text.to_string());
        self
    }

    pub fn with_url(self, url: &str) -> Self {
        self.dom.lock().unwrap().url = url.to_string();
        self
    }

    pub fn on_click(self, selector: &str, effects: Vec<Effect>) -> Self {
        self.dom
            .lock()
            .unwrap()
            .on_click
            .insert(selector.to_string(), effects);
        self
    }

    pub fn on_upload(self, effects: Vec<Effect>) -> Self {
        self.dom.lock().unwrap().on_upload = effects;
        self
    }

    pub fn vanish_after(self, selector: &str, polls: usize) -> Self {
        self.dom
            .lock()
            .unwrap()
            .vanish_after
            .insert(selector.to_string(), polls);
        self
    }

    pub fn crash_on_first_goto(self) -> Self {
        self.dom.lock().unwrap().crash_gotos = 1;
        self
    }

    pub fn fail_upload_calls(self, calls: &[usize]) -> Self {
        self.dom.lock().unwrap().failing_uploads = calls.to_vec();
        self
    }

    pub fn with_eval_result(self, value: JsonValue) -> Self {
        self.dom.lock().unwrap().eval_result = value;
        self
    }

    /// 全部操作记录
    pub fn actions(&self) -> Vec<String> {
        self.dom.lock().unwrap().actions.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.actions().iter().filter(|a| a.starts_with(prefix)).count()
    }

    pub fn field(&self, selector: &str) -> Option<String> {
        self.dom.lock().unwrap().fields.get(selector).cloned()
    }

    pub fn url(&self) -> String {
        self.dom.lock().unwrap().url.clone()
    }

    fn record(&self, action: String) {
        self.dom.lock().unwrap().actions.push(action);
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> BrowserResult<()> {
        let mut dom = self.dom.lock().unwrap();
        dom.actions.push(format!("goto:{}", url));
        if dom.crash_gotos > 0 {
            dom.crash_gotos -= 1;
            self.closed.store(true, Ordering::SeqCst);
            return Err(BrowserError::PageCrashed {
                reason: "Page crashed!".to_string(),
            });
        }
        dom.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.url())
    }

    async fn inspect_all(&self, selector: &str) -> BrowserResult<Vec<ElementState>> {
        let mut dom = self.dom.lock().unwrap();
        if let Some(remaining) = dom.vanish_after.get_mut(selector) {
            if *remaining == 0 {
                dom.elements.remove(selector);
            } else {
                *remaining -= 1;
            }
        }
        Ok(dom.lookup(selector))
    }

    async fn mark_nth(
        &self,
        selector: &str,
        index: usize,
        _inner: Option<&str>,
    ) -> BrowserResult<Option<String>> {
        let dom = self.dom.lock().unwrap();
        let exists = dom
            .elements
            .get(selector)
            .map(|states| index < states.len())
            .unwrap_or(false);
        Ok(exists.then(|| format!("{}@{}", selector, index)))
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        let mut dom = self.dom.lock().unwrap();
        dom.actions.push(format!("click:{}", selector));
        dom.focused = Some(selector.to_string());
        if let Some(effects) = dom.on_click.get(selector).cloned() {
            dom.apply(effects);
        }
        Ok(())
    }

    async fn focus(&self, selector: &str) -> BrowserResult<()> {
        self.dom.lock().unwrap().focused = Some(selector.to_string());
        Ok(())
    }

    async fn scroll_into_view(&self, _selector: &str) -> BrowserResult<()> {
        Ok(())
    }

    async fn scroll_to_bottom(&self, selector: &str) -> BrowserResult<()> {
        self.record(format!("scroll:{}", selector));
        Ok(())
    }

    async fn clear_field(&self, selector: &str) -> BrowserResult<()> {
        self.dom
            .lock()
            .unwrap()
            .fields
            .insert(selector.to_string(), String::new());
        Ok(())
    }

    async fn clear_rich_text(&self, selector: &str) -> BrowserResult<()> {
        self.clear_field(selector).await
    }

    async fn move_cursor_to_end(&self, selector: &str) -> BrowserResult<()> {
        self.dom.lock().unwrap().focused = Some(selector.to_string());
        Ok(())
    }

    async fn type_text(&self, text: &str, _delay: Duration) -> BrowserResult<()> {
        let mut dom = self.dom.lock().unwrap();
        dom.actions.push(format!("type:{}", text));
        if let Some(focused) = dom.focused.clone() {
            dom.fields.entry(focused).or_default().push_str(text);
        }
        Ok(())
    }

    async fn press_key(&self, key: Key) -> BrowserResult<()> {
        self.record(format!("key:{:?}", key));
        Ok(())
    }

    async fn field_text(&self, selector: &str) -> BrowserResult<Option<String>> {
        let dom = self.dom.lock().unwrap();
        Ok(match dom.fields.get(selector) {
            Some(text) => Some(text.clone()),
            None if !dom.lookup(selector).is_empty() => Some(String::new()),
            None => None,
        })
    }

    async fn page_text_contains(&self, needles: &[&str]) -> BrowserResult<Option<String>> {
        let dom = self.dom.lock().unwrap();
        Ok(needles
            .iter()
            .find(|needle| dom.texts.iter().any(|t| t.contains(**needle)))
            .map(|needle| needle.to_string()))
    }

    async fn remove_all(&self, selector: &str) -> BrowserResult<usize> {
        let removed = self.dom.lock().unwrap().elements.remove(selector);
        Ok(removed.map(|states| states.len()).unwrap_or(0))
    }

    async fn set_input_files(&self, selector: &str, files: &[PathBuf]) -> BrowserResult<()> {
        let mut dom = self.dom.lock().unwrap();
        dom.actions.push(format!("upload:{}:{}", selector, files.len()));
        let call = dom.upload_calls;
        dom.upload_calls += 1;
        if dom.failing_uploads.contains(&call) {
            return Err(BrowserError::Cdp("file input rejected".to_string()));
        }
        let effects = dom.on_upload.clone();
        dom.apply(effects);
        Ok(())
    }

    async fn upload_via_chooser(&self, trigger: &str, files: &[PathBuf]) -> BrowserResult<()> {
        let mut dom = self.dom.lock().unwrap();
        dom.actions.push(format!("chooser:{}:{}", trigger, files.len()));
        let effects = dom.on_upload.clone();
        dom.apply(effects);
        Ok(())
    }

    async fn evaluate(&self, _expression: &str) -> BrowserResult<JsonValue> {
        Ok(self.dom.lock().unwrap().eval_result.clone())
    }

    async fn clear_cookies(&self) -> BrowserResult<()> {
        self.record("clear_cookies".to_string());
        Ok(())
    }

    async fn screenshot(&self) -> BrowserResult<Vec<u8>> {
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }

    async fn click_at(&self, x: f64, y: f64) -> BrowserResult<()> {
        self.record(format!("click_at:{},{}", x, y));
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// ========== 启动器 ==========

type PageFactory = Box<dyn Fn(usize) -> Arc<FakePage> + Send + Sync>;

/// 按启动次数创建页面的启动器
pub struct FakeLauncher {
    factory: PageFactory,
    launches: AtomicUsize,
    /// 前几次启动直接失败
    failures: AtomicUsize,
    pages: Mutex<Vec<Arc<FakePage>>>,
    headless: Mutex<Vec<bool>>,
}

impl FakeLauncher {
    /// `factory` 的参数是第几次成功启动（从 0 开始）
    pub fn new(factory: impl Fn(usize) -> Arc<FakePage> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            factory: Box::new(factory),
            launches: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            pages: Mutex::new(Vec::new()),
            headless: Mutex::new(Vec::new()),
        })
    }

    /// 所有启动都返回同一个页面
    pub fn single(page: Arc<FakePage>) -> Arc<Self> {
        Self::new(move |_| page.clone())
    }

    pub fn fail_next(&self, times: usize) {
        self.failures.store(times, Ordering::SeqCst);
    }

    /// 启动尝试次数（包括失败的）
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn page(&self, index: usize) -> Arc<FakePage> {
        self.pages.lock().unwrap()[index].clone()
    }

    pub fn headless_history(&self) -> Vec<bool> {
        self.headless.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserContext>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(BrowserError::Cdp("launch refused".to_string()));
        }

        let mut pages = self.pages.lock().unwrap();
        let page = (self.factory)(pages.len());
        pages.push(page.clone());
        self.headless.lock().unwrap().push(options.headless);
        Ok(Box::new(FakeContext {
            page,
            alive: true,
        }))
    }
}

pub struct FakeContext {
    page: Arc<FakePage>,
    alive: bool,
}

#[async_trait]
impl BrowserContext for FakeContext {
    fn page(&self) -> Arc<dyn PageDriver> {
        self.page.clone()
    }

    async fn open_page(&mut self) -> BrowserResult<Arc<dyn PageDriver>> {
        Err(BrowserError::Cdp("no new pages in fake context".to_string()))
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.alive = false;
        Ok(())
    }
}

/// 使用临时 profile 目录的会话管理器
pub fn session_manager(launcher: Arc<FakeLauncher>, base: &std::path::Path) -> Arc<SessionManager> {
    Arc::new(SessionManager::new(launcher, ProfileStore::new(base)))
}
