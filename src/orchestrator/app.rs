//! 应用生命周期 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：构建平台配置、会话管理器、违禁词过滤器、调试截图服务
//! 2. **资源管理**：唯一持有 `SessionManager`，退出时关闭全部浏览器
//! 3. **后台任务**：定期清理过期调试截图
//! 4. **服务运行**：启动 HTTP 控制接口，Ctrl-C 时优雅退出

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::browser::{ChromiumLauncher, ProfileStore, SessionManager};
use crate::config::Config;
use crate::orchestrator::PlatformService;
use crate::platforms::Platform;
use crate::server;
use crate::services::{Diagnostics, ForbiddenFilter};
use crate::utils::logging;
use crate::workflow::PublishFlow;

/// 截图清理间隔
const PRUNE_INTERVAL: Duration = Duration::from_secs(10 * 60);
/// 截图保留时长
const SNAPSHOT_RETENTION: Duration = Duration::from_secs(30 * 60);

/// 应用主结构
pub struct App {
    config: Config,
    sessions: Arc<SessionManager>,
    services: Vec<Arc<PlatformService>>,
    diagnostics: Diagnostics,
}

impl App {
    /// 初始化应用（不启动浏览器，会话在第一次使用时创建）
    pub async fn initialize(config: Config) -> Result<Self> {
        let launcher = Arc::new(ChromiumLauncher::new(config.chrome_executable.clone()));
        let sessions = Arc::new(
            SessionManager::new(launcher, ProfileStore::new(&config.profile_base_dir))
                .with_display_fallback(true),
        );

        let filter = Arc::new(ForbiddenFilter::load(&config.forbidden_path));
        info!("✓ 已加载 {} 个违禁词", filter.len());

        let diagnostics = Diagnostics::new(config.debug_screenshots, &config.screenshot_dir);
        if diagnostics.is_enabled() {
            info!("📸 调试截图目录: {}", diagnostics.dir().display());
        }

        let flow = Arc::new(PublishFlow::new(
            sessions.clone(),
            filter,
            diagnostics.clone(),
        ));

        let services = build_services(&config, &sessions, &flow);

        Ok(Self {
            config,
            sessions,
            services,
            diagnostics,
        })
    }

    pub fn services(&self) -> &[Arc<PlatformService>] {
        &self.services
    }

    /// 运行 HTTP 控制接口直到收到 Ctrl-C
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.server_host, self.config.server_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("无法监听地址 {}", addr))?;

        logging::log_startup(&addr, self.config.headless, &self.config.profile);

        let pruner = self.spawn_pruner();
        let router = server::router(&self.services);
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        logging::log_shutdown();
        if let Some(handle) = pruner {
            handle.abort();
        }
        self.sessions.release_all().await;
        info!("✓ 服务已退出");

        served.context("HTTP 服务异常退出")
    }

    /// 启用调试截图时，定期删除过期截图
    fn spawn_pruner(&self) -> Option<JoinHandle<()>> {
        if !self.diagnostics.is_enabled() {
            return None;
        }
        let diagnostics = self.diagnostics.clone();
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRUNE_INTERVAL);
            loop {
                interval.tick().await;
                let removed = diagnostics.prune(SNAPSHOT_RETENTION).await;
                if removed > 0 {
                    info!("🧹 已清理 {} 张过期截图", removed);
                }
            }
        }))
    }
}

/// 为每个平台创建一个服务，平台配置只构建一次
fn build_services(
    config: &Config,
    sessions: &Arc<SessionManager>,
    flow: &Arc<PublishFlow>,
) -> Vec<Arc<PlatformService>> {
    Platform::ALL
        .iter()
        .map(|platform| {
            Arc::new(PlatformService::new(
                Arc::new(platform.config()),
                sessions.clone(),
                flow.clone(),
                config.profile.clone(),
                config.headless,
            ))
        })
        .collect()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("⚠️ 无法监听退出信号: {}", e);
        std::future::pending::<()>().await;
    }
}
