//! CDP 页面实现 - 基础设施层
//!
//! 持有唯一的 chromiumoxide Page，实现 `PageDriver`

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::cdp::browser_protocol::network::ClearBrowserCookiesParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventFileChooserOpened, SetInterceptFileChooserDialogParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::layout::Point;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::{BrowserError, BrowserResult};
use crate::infrastructure::page_driver::{ElementState, Key, PageDriver};

/// 等待系统文件选择框弹出的时间
const FILE_CHOOSER_TIMEOUT: Duration = Duration::from_secs(10);

/// CDP 页面
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力和语义化 DOM 操作
/// - 记录页面是否已经崩溃或关闭
pub struct CdpPage {
    page: Page,
    closed: AtomicBool,
}

impl CdpPage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            closed: AtomicBool::new(false),
        }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 表达式并返回 JSON 结果
    ///
    /// 表达式结果先在页面内 `JSON.stringify`，避免 undefined / null 无法取值
    ///
    /// # 参数
    /// - `js_code`: 要执行的 JavaScript 表达式
    pub async fn eval(&self, js_code: &str) -> BrowserResult<JsonValue> {
        let wrapped = format!("JSON.stringify(({}) ?? null)", js_code);
        let result = self.page.evaluate(wrapped).await;
        let raw: String = self.track(result)?.into_value()?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// 执行 JS 表达式并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: &str) -> BrowserResult<T> {
        let value = self.eval(js_code).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// 转换 CDP 错误；崩溃类错误会把页面标记为失效
    fn track<T>(&self, result: Result<T, CdpError>) -> BrowserResult<T> {
        result.map_err(|e| {
            let err = BrowserError::from(e);
            if matches!(err, BrowserError::PageCrashed { .. }) {
                warn!("⚠️ 页面已失效: {}", err);
                self.closed.store(true, Ordering::SeqCst);
            }
            err
        })
    }

    /// 执行返回布尔值的脚本，false 视为元素不存在
    async fn expect_element(&self, js_code: &str, selector: &str) -> BrowserResult<()> {
        if self.eval_as::<bool>(js_code).await? {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound {
                target: selector.to_string(),
            })
        }
    }

    /// 点击触发元素并等待文件选择框事件（调用前需开启拦截）
    async fn choose_files(&self, trigger: &str, files: &[PathBuf]) -> BrowserResult<()> {
        // 先监听再点击，避免错过事件
        let listener = self.page.event_listener::<EventFileChooserOpened>().await;
        let mut events = self.track(listener)?;
        self.click(trigger).await?;

        let opened = tokio::time::timeout(FILE_CHOOSER_TIMEOUT, events.next()).await;
        let backend_node_id = match opened {
            Ok(Some(event)) => event.backend_node_id.clone(),
            _ => None,
        };
        let Some(backend_node_id) = backend_node_id else {
            return Err(BrowserError::ElementNotFound {
                target: "文件选择框".to_string(),
            });
        };

        let mut params = SetFileInputFilesParams::new(path_strings(files));
        params.backend_node_id = Some(backend_node_id);
        let result = self.page.execute(params).await;
        self.track(result)?;
        Ok(())
    }

    async fn dispatch_key(&self, key: Key, kind: DispatchKeyEventType) -> BrowserResult<()> {
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind.clone())
            .key(key.key())
            .code(key.code())
            .windows_virtual_key_code(key.virtual_key_code())
            .native_virtual_key_code(key.virtual_key_code());
        if kind == DispatchKeyEventType::KeyDown {
            if let Some(text) = key.text() {
                builder = builder.text(text);
            }
        }
        let params = builder.build().map_err(BrowserError::Cdp)?;
        let result = self.page.execute(params).await;
        self.track(result)?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        debug!("导航到: {}", url);
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(result) => self.track(result).map(|_| ()).map_err(|e| match e {
                BrowserError::Cdp(reason) => BrowserError::NavigationFailed {
                    url: url.to_string(),
                    reason,
                },
                other => other,
            }),
            Err(_) => Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
            }),
        }
    }

    async fn current_url(&self) -> BrowserResult<String> {
        let result = self.page.url().await;
        Ok(self.track(result)?.unwrap_or_default())
    }

    async fn inspect_all(&self, selector: &str) -> BrowserResult<Vec<ElementState>> {
        let js = format!(
            r#"(() => {{
                return Array.from(document.querySelectorAll({sel})).map((el) => {{
                    const style = window.getComputedStyle(el);
                    const rect = el.getBoundingClientRect();
                    const visible = style.display !== 'none'
                        && style.visibility !== 'hidden'
                        && style.opacity !== '0'
                        && rect.width > 0 && rect.height > 0;
                    const cls = typeof el.className === 'string' ? el.className : '';
                    const enabled = !el.disabled
                        && el.getAttribute('aria-disabled') !== 'true'
                        && !/(^|[\s_-])disabled/i.test(cls);
                    return {{
                        visible,
                        enabled,
                        multiple: !!el.multiple,
                        text: (el.innerText || el.value || '').trim(),
                    }};
                }});
            }})()"#,
            sel = js_str(selector)
        );
        self.eval_as(&js).await
    }

    async fn mark_nth(
        &self,
        selector: &str,
        index: usize,
        inner: Option<&str>,
    ) -> BrowserResult<Option<String>> {
        let inner = inner.map(js_str).unwrap_or_else(|| "null".to_string());
        let js = format!(
            r#"(() => {{
                let el = document.querySelectorAll({sel})[{index}];
                if (!el) return null;
                const inner = {inner};
                if (inner) {{
                    el = el.querySelector(inner);
                    if (!el) return null;
                }}
                const mark = 'pe-' + Date.now().toString(36) + '-' + Math.random().toString(36).slice(2, 8);
                el.setAttribute('data-pe-mark', mark);
                return '[data-pe-mark="' + mark + '"]';
            }})()"#,
            sel = js_str(selector),
        );
        self.eval_as(&js).await
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        let element = self.page.find_element(selector).await;
        let element = self.track(element).map_err(|_| BrowserError::ElementNotFound {
            target: selector.to_string(),
        })?;
        if let Err(e) = element.click().await {
            // 没有盒模型的元素（如被遮挡的按钮）退回到 DOM click
            debug!("鼠标点击失败，改用 DOM click: {}", e);
            let js = format!(
                "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
                js_str(selector)
            );
            self.expect_element(&js, selector).await?;
        }
        Ok(())
    }

    async fn focus(&self, selector: &str) -> BrowserResult<()> {
        let js = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.focus(); return true; }})()",
            js_str(selector)
        );
        self.expect_element(&js, selector).await
    }

    async fn scroll_into_view(&self, selector: &str) -> BrowserResult<()> {
        let js = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.scrollIntoView({{ block: 'center' }}); return true; }})()",
            js_str(selector)
        );
        self.expect_element(&js, selector).await
    }

    async fn scroll_to_bottom(&self, selector: &str) -> BrowserResult<()> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (el) {{ el.scrollTop = el.scrollHeight; }}
                else {{ window.scrollTo(0, document.body.scrollHeight); }}
                return true;
            }})()"#,
            js_str(selector)
        );
        self.eval(&js).await.map(|_| ())
    }

    async fn clear_field(&self, selector: &str) -> BrowserResult<()> {
        // 通过原型上的 setter 赋值，React 受控组件才能感知
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return false;
                const proto = el.tagName === 'TEXTAREA'
                    ? HTMLTextAreaElement.prototype
                    : HTMLInputElement.prototype;
                const desc = Object.getOwnPropertyDescriptor(proto, 'value');
                if (desc && desc.set) {{ desc.set.call(el, ''); }} else {{ el.value = ''; }}
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
            js_str(selector)
        );
        self.expect_element(&js, selector).await
    }

    async fn clear_rich_text(&self, selector: &str) -> BrowserResult<()> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.focus();
                const range = document.createRange();
                range.selectNodeContents(el);
                const selection = window.getSelection();
                selection.removeAllRanges();
                selection.addRange(range);
                range.deleteContents();
                while (el.firstChild) el.removeChild(el.firstChild);
                el.dispatchEvent(new InputEvent('input', {{ bubbles: true, inputType: 'deleteContentBackward' }}));
                return true;
            }})()"#,
            js_str(selector)
        );
        self.expect_element(&js, selector).await
    }

    async fn move_cursor_to_end(&self, selector: &str) -> BrowserResult<()> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.focus();
                if (typeof el.value === 'string' && el.setSelectionRange) {{
                    el.setSelectionRange(el.value.length, el.value.length);
                    return true;
                }}
                const range = document.createRange();
                range.selectNodeContents(el);
                range.collapse(false);
                const selection = window.getSelection();
                selection.removeAllRanges();
                selection.addRange(range);
                return true;
            }})()"#,
            js_str(selector)
        );
        self.expect_element(&js, selector).await
    }

    async fn type_text(&self, text: &str, delay: Duration) -> BrowserResult<()> {
        if delay.is_zero() {
            let result = self.page.execute(InsertTextParams::new(text)).await;
            self.track(result)?;
            return Ok(());
        }
        for ch in text.chars() {
            let result = self.page.execute(InsertTextParams::new(ch.to_string())).await;
            self.track(result)?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn press_key(&self, key: Key) -> BrowserResult<()> {
        self.dispatch_key(key, DispatchKeyEventType::KeyDown).await?;
        self.dispatch_key(key, DispatchKeyEventType::KeyUp).await
    }

    async fn field_text(&self, selector: &str) -> BrowserResult<Option<String>> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return null;
                return typeof el.value === 'string' ? el.value : (el.innerText || '');
            }})()"#,
            js_str(selector)
        );
        self.eval_as(&js).await
    }

    async fn page_text_contains(&self, needles: &[&str]) -> BrowserResult<Option<String>> {
        let list = serde_json::to_string(needles)?;
        let js = format!(
            r#"(() => {{
                const text = document.body ? document.body.innerText : '';
                return {list}.find((n) => text.includes(n)) ?? null;
            }})()"#
        );
        self.eval_as(&js).await
    }

    async fn remove_all(&self, selector: &str) -> BrowserResult<usize> {
        let js = format!(
            r#"(() => {{
                const nodes = document.querySelectorAll({});
                nodes.forEach((el) => el.remove());
                return nodes.length;
            }})()"#,
            js_str(selector)
        );
        self.eval_as(&js).await
    }

    async fn set_input_files(&self, selector: &str, files: &[PathBuf]) -> BrowserResult<()> {
        let element = self.page.find_element(selector).await;
        let element = self.track(element).map_err(|_| BrowserError::ElementNotFound {
            target: selector.to_string(),
        })?;

        let mut params = SetFileInputFilesParams::new(path_strings(files));
        params.backend_node_id = Some(element.backend_node_id);
        let result = self.page.execute(params).await;
        self.track(result)?;
        Ok(())
    }

    async fn upload_via_chooser(&self, trigger: &str, files: &[PathBuf]) -> BrowserResult<()> {
        let result = self
            .page
            .execute(SetInterceptFileChooserDialogParams::new(true))
            .await;
        self.track(result)?;

        let outcome = self.choose_files(trigger, files).await;

        let _ = self
            .page
            .execute(SetInterceptFileChooserDialogParams::new(false))
            .await;
        outcome
    }

    async fn evaluate(&self, expression: &str) -> BrowserResult<JsonValue> {
        self.eval(expression).await
    }

    async fn clear_cookies(&self) -> BrowserResult<()> {
        let result = self.page.execute(ClearBrowserCookiesParams::default()).await;
        self.track(result)?;
        Ok(())
    }

    async fn screenshot(&self) -> BrowserResult<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let result = self.page.screenshot(params).await;
        self.track(result)
    }

    async fn click_at(&self, x: f64, y: f64) -> BrowserResult<()> {
        let result = self.page.click(Point::new(x, y)).await;
        self.track(result)?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// 把字符串转成 JS 字面量
fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn path_strings(files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect()
}
