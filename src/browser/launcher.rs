use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::{Browser, BrowserConfig};
use futures::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::error::{BrowserError, BrowserResult};
use crate::infrastructure::{CdpPage, PageDriver};

/// 桌面版 Chrome UA，避免被识别为 HeadlessChrome
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 浏览器视口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// 发布流程默认视口
    pub const DEFAULT: Viewport = Viewport {
        width: 1920,
        height: 1080,
    };

    /// 扫码登录窗口
    pub const LOGIN: Viewport = Viewport {
        width: 1470,
        height: 756,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// 启动参数
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub user_data_dir: PathBuf,
    pub headless: bool,
    pub viewport: Viewport,
}

/// 一个已启动的持久化浏览器上下文
#[async_trait]
pub trait BrowserContext: Send + Sync {
    /// 当前活动页面
    fn page(&self) -> Arc<dyn PageDriver>;

    /// 在同一上下文中打开新页面并设为活动页面
    async fn open_page(&mut self) -> BrowserResult<Arc<dyn PageDriver>>;

    /// 浏览器进程 / 连接是否仍然存活
    fn is_alive(&self) -> bool;

    async fn close(&mut self) -> BrowserResult<()>;
}

/// 浏览器启动能力
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserContext>>;
}

/// 基于 chromiumoxide 的启动器
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    chrome_executable: Option<PathBuf>,
}

impl ChromiumLauncher {
    pub fn new(chrome_executable: Option<PathBuf>) -> Self {
        Self { chrome_executable }
    }

    fn build_config(&self, options: &LaunchOptions) -> BrowserResult<BrowserConfig> {
        let Viewport { width, height } = options.viewport;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&options.user_data_dir)
            .window_size(width, height)
            .viewport(CdpViewport {
                width,
                height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            })
            .args(vec![
                "--disable-blink-features=AutomationControlled".to_string(),
                "--no-sandbox".to_string(),
                "--disable-setuid-sandbox".to_string(),
                "--hide-scrollbars".to_string(),
                "--mute-audio".to_string(),
                "--disable-infobars".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--no-first-run".to_string(),
                format!("--user-agent={}", USER_AGENT),
            ]);

        builder = if options.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };

        if let Some(exe) = &self.chrome_executable {
            builder = builder.chrome_executable(exe);
        }

        builder.build().map_err(|e| BrowserError::LaunchFailed {
            profile: options.user_data_dir.display().to_string(),
            reason: format!("配置浏览器失败: {}", e),
        })
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, options: &LaunchOptions) -> BrowserResult<Box<dyn BrowserContext>> {
        info!(
            "🚀 启动浏览器 ({}, {}x{})",
            if options.headless { "无头" } else { "有头" },
            options.viewport.width,
            options.viewport.height
        );
        debug!("数据目录: {}", options.user_data_dir.display());

        let config = self.build_config(options)?;
        let (browser, handler) =
            Browser::launch(config)
                .await
                .map_err(|e| BrowserError::LaunchFailed {
                    profile: options.user_data_dir.display().to_string(),
                    reason: e.to_string(),
                })?;

        // 在后台持续驱动事件流（CDP 请求超时也依赖它），事件流结束才视为浏览器已退出
        let alive = Arc::new(AtomicBool::new(true));
        let alive_flag = alive.clone();
        let handler_task = tokio::spawn(drive_events(handler, alive_flag));

        // 添加短暂延迟以等待浏览器状态同步
        sleep(Duration::from_millis(300)).await;

        let existing = browser.pages().await.unwrap_or_default();
        let page = match existing.into_iter().next() {
            Some(page) => page,
            None => browser.new_page("about:blank").await?,
        };
        info!("✓ 浏览器已就绪");

        Ok(Box::new(ChromiumContext {
            browser,
            handler_task,
            alive,
            page: Arc::new(CdpPage::new(page)),
        }))
    }
}

/// chromiumoxide 浏览器上下文
pub struct ChromiumContext {
    browser: Browser,
    handler_task: JoinHandle<()>,
    alive: Arc<AtomicBool>,
    page: Arc<CdpPage>,
}

#[async_trait]
impl BrowserContext for ChromiumContext {
    fn page(&self) -> Arc<dyn PageDriver> {
        self.page.clone()
    }

    async fn open_page(&mut self) -> BrowserResult<Arc<dyn PageDriver>> {
        let page = self.browser.new_page("about:blank").await?;
        self.page = Arc::new(CdpPage::new(page));
        debug!("已重新创建页面");
        Ok(self.page.clone())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.handler_task.is_finished()
    }

    async fn close(&mut self) -> BrowserResult<()> {
        let closed = self.browser.close().await;
        if let Err(e) = &closed {
            warn!("⚠️ 关闭浏览器失败: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        self.alive.store(false, Ordering::SeqCst);
        closed.map(|_| ()).map_err(BrowserError::from)
    }
}

/// 持续驱动 CDP 事件流；单个事件出错只记日志，事件流结束时标记浏览器已退出
async fn drive_events<S, E>(mut events: S, alive: Arc<AtomicBool>)
where
    S: Stream<Item = Result<(), E>> + Unpin,
    E: std::fmt::Display,
{
    while let Some(event) = events.next().await {
        if let Err(e) = event {
            debug!("浏览器事件处理出错（继续运行）: {}", e);
        }
    }
    alive.store(false, Ordering::SeqCst);
}
