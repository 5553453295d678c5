//! 浏览器会话管理
//!
//! ## 职责
//!
//! - 每个 profile 至多一个存活的会话（显式注册表，而不是隐式缓存）
//! - 无头模式变化时关闭旧会话并重新启动
//! - 启动失败清理锁文件后重试一次
//! - 同一 profile 同时只允许一个流程持有会话（租约），冲突时立即返回 `SessionBusy`
//!
//! 只有本模块可以创建或销毁会话

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::browser::launcher::{BrowserContext, BrowserLauncher, LaunchOptions, Viewport};
use crate::browser::profile::{self, ProfileDir, ProfileStore};
use crate::error::{AppResult, BrowserError};
use crate::infrastructure::PageDriver;

/// 清理锁文件后等待浏览器释放句柄
const LOCK_RELEASE_WAIT: Duration = Duration::from_millis(500);
/// 首次启动失败后的退避时间
const RELAUNCH_BACKOFF: Duration = Duration::from_millis(1000);

/// 注册表中的会话
struct Session {
    profile: ProfileDir,
    headless: bool,
    context: Box<dyn BrowserContext>,
    page: Arc<dyn PageDriver>,
    lease: Arc<Mutex<()>>,
}

/// 注册表槽位
///
/// 启动期间先占位并持有租约，浏览器启动不占用注册表锁
enum Slot {
    Starting { lease: Arc<Mutex<()>> },
    Live(Session),
}

impl Slot {
    fn lease(&self) -> &Arc<Mutex<()>> {
        match self {
            Slot::Starting { lease } => lease,
            Slot::Live(session) => &session.lease,
        }
    }
}

/// 会话租约
///
/// 持有期间同一 profile 上的其他 `acquire` 会失败；drop 即归还
pub struct SessionLease {
    profile: ProfileDir,
    headless: bool,
    viewport: Viewport,
    page: Arc<dyn PageDriver>,
    _guard: OwnedMutexGuard<()>,
}

impl SessionLease {
    pub fn page(&self) -> &dyn PageDriver {
        self.page.as_ref()
    }

    pub fn profile(&self) -> &ProfileDir {
        &self.profile
    }

    pub fn headless(&self) -> bool {
        self.headless
    }
}

/// 浏览器会话管理器
pub struct SessionManager {
    launcher: Arc<dyn BrowserLauncher>,
    profiles: ProfileStore,
    sessions: Mutex<HashMap<String, Slot>>,
    /// 没有图形环境时把有头请求降级为无头
    headless_without_display: bool,
}

impl SessionManager {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, profiles: ProfileStore) -> Self {
        Self {
            launcher,
            profiles,
            sessions: Mutex::new(HashMap::new()),
            headless_without_display: false,
        }
    }

    /// 在 Linux 无 DISPLAY 的环境中强制无头
    pub fn with_display_fallback(mut self, enabled: bool) -> Self {
        self.headless_without_display = enabled;
        self
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// 获取 profile 的会话
    ///
    /// 已有存活且无头模式一致的会话直接复用；否则关闭旧会话并启动新的
    ///
    /// # 参数
    /// - `profile`: profile 名称或绝对路径
    /// - `headless`: 是否无头
    /// - `viewport`: 新启动时使用的视口
    pub async fn acquire(
        &self,
        profile: &str,
        headless: bool,
        viewport: Viewport,
    ) -> AppResult<SessionLease> {
        let profile = self.profiles.resolve(profile)?;
        let key = profile.key();
        let headless = self.effective_headless(headless);

        let busy = || BrowserError::SessionBusy {
            profile: profile.name.clone(),
        };

        let (lease, guard, stale) = {
            let mut sessions = self.sessions.lock().await;

            let held = match sessions.get_mut(&key) {
                Some(Slot::Starting { .. }) => return Err(busy().into()),
                Some(Slot::Live(session)) => {
                    let guard = session
                        .lease
                        .clone()
                        .try_lock_owned()
                        .map_err(|_| busy())?;
                    if revive(session, headless).await {
                        debug!("复用 profile '{}' 的会话", profile.name);
                        return Ok(SessionLease {
                            profile: session.profile.clone(),
                            headless,
                            viewport,
                            page: session.page.clone(),
                            _guard: guard,
                        });
                    }
                    Some((session.lease.clone(), guard))
                }
                None => None,
            };

            let (lease, guard) = match held {
                Some(pair) => pair,
                None => {
                    let lease = Arc::new(Mutex::new(()));
                    let guard = lease.clone().try_lock_owned().map_err(|_| busy())?;
                    (lease, guard)
                }
            };
            let stale = sessions.insert(
                key.clone(),
                Slot::Starting {
                    lease: lease.clone(),
                },
            );
            (lease, guard, stale)
        };

        if let Some(Slot::Live(stale)) = stale {
            close_quietly(stale).await;
        }

        let launched = self.launch_with_retry(&profile, headless, viewport).await;

        let mut sessions = self.sessions.lock().await;
        let still_ours = matches!(
            sessions.get(&key),
            Some(slot @ Slot::Starting { .. }) if Arc::ptr_eq(slot.lease(), &lease)
        );
        let context = match launched {
            Ok(context) if still_ours => context,
            Ok(mut context) => {
                drop(sessions);
                warn!("⚠️ profile '{}' 在启动期间已被释放", profile.name);
                if let Err(e) = context.close().await {
                    debug!("关闭会话时出错（已忽略）: {}", e);
                }
                return Err(BrowserError::LaunchFailed {
                    profile: profile.name.clone(),
                    reason: "启动期间会话已被释放".to_string(),
                }
                .into());
            }
            Err(e) => {
                if still_ours {
                    sessions.remove(&key);
                }
                return Err(e);
            }
        };

        let page = context.page();
        sessions.insert(
            key,
            Slot::Live(Session {
                profile: profile.clone(),
                headless,
                context,
                page: page.clone(),
                lease,
            }),
        );

        Ok(SessionLease {
            profile,
            headless,
            viewport,
            page,
            _guard: guard,
        })
    }

    /// 崩溃恢复：关闭会话后用相同参数重新获取
    pub async fn recover(&self, lease: SessionLease) -> AppResult<SessionLease> {
        let SessionLease {
            profile,
            headless,
            viewport,
            page,
            _guard,
        } = lease;
        warn!("♻️ 重建 profile '{}' 的浏览器会话", profile.name);

        drop(page);
        drop(_guard);
        self.release(&profile.dir.to_string_lossy()).await;
        self.acquire(&profile.dir.to_string_lossy(), headless, viewport)
            .await
    }

    /// 关闭 profile 的会话，不存在或关闭失败都静默忽略
    pub async fn release(&self, profile: &str) {
        let Ok(profile) = self.profiles.resolve(profile) else {
            return;
        };
        let removed = self.sessions.lock().await.remove(&profile.key());
        if let Some(Slot::Live(session)) = removed {
            close_quietly(session).await;
            info!("✓ 已关闭 profile '{}' 的浏览器", profile.name);
        }
    }

    /// 关闭全部会话
    pub async fn release_all(&self) {
        let drained: Vec<Session> = {
            let mut sessions = self.sessions.lock().await;
            sessions
                .drain()
                .filter_map(|(_, slot)| match slot {
                    Slot::Live(session) => Some(session),
                    Slot::Starting { .. } => None,
                })
                .collect()
        };
        let count = drained.len();
        for session in drained {
            close_quietly(session).await;
        }
        if count > 0 {
            info!("✓ 已关闭 {} 个浏览器会话", count);
        }
    }

    /// 当前存活会话的活动页面（不占用租约）
    pub async fn active_page(&self, profile: &str) -> AppResult<Arc<dyn PageDriver>> {
        let resolved = self.profiles.resolve(profile)?;
        let sessions = self.sessions.lock().await;
        match sessions.get(&resolved.key()) {
            Some(Slot::Live(session))
                if session.context.is_alive() && !session.page.is_closed() =>
            {
                Ok(session.page.clone())
            }
            _ => Err(BrowserError::NotInitialized {
                profile: resolved.name,
            }
            .into()),
        }
    }

    /// 当前注册的 profile 名称
    pub async fn active_profiles(&self) -> Vec<String> {
        let sessions = self.sessions.lock().await;
        let mut names: Vec<String> = sessions
            .values()
            .filter_map(|slot| match slot {
                Slot::Live(session) => Some(session.profile.name.clone()),
                Slot::Starting { .. } => None,
            })
            .collect();
        names.sort();
        names
    }

    fn effective_headless(&self, headless: bool) -> bool {
        if !headless
            && self.headless_without_display
            && cfg!(target_os = "linux")
            && std::env::var_os("DISPLAY").is_none()
            && std::env::var_os("WAYLAND_DISPLAY").is_none()
        {
            warn!("⚠️ 当前环境没有图形界面，有头模式已降级为无头");
            return true;
        }
        headless
    }

    /// 启动浏览器；失败后再次清理锁文件，退避后重试一次
    async fn launch_with_retry(
        &self,
        profile: &ProfileDir,
        headless: bool,
        viewport: Viewport,
    ) -> AppResult<Box<dyn BrowserContext>> {
        let options = LaunchOptions {
            user_data_dir: profile.dir.clone(),
            headless,
            viewport,
        };

        if profile::clear_lock_artifacts(&profile.dir) > 0 {
            debug!("已清理 profile '{}' 的锁文件", profile.name);
        }
        sleep(LOCK_RELEASE_WAIT).await;

        match self.launcher.launch(&options).await {
            Ok(context) => Ok(context),
            Err(first) => {
                warn!("⚠️ 浏览器启动失败，清理锁文件后重试: {}", first);
                profile::clear_lock_artifacts(&profile.dir);
                sleep(RELAUNCH_BACKOFF).await;

                self.launcher.launch(&options).await.map_err(|retry| {
                    BrowserError::LaunchFailed {
                        profile: profile.name.clone(),
                        reason: retry.to_string(),
                    }
                    .into()
                })
            }
        }
    }
}

/// 会话能否直接复用；页面已关闭时尝试在同一上下文中重开
async fn revive(session: &mut Session, headless: bool) -> bool {
    if session.headless != headless {
        info!(
            "🔄 profile '{}' 切换为{}模式，关闭旧会话",
            session.profile.name,
            if headless { "无头" } else { "有头" }
        );
        return false;
    }
    if !session.context.is_alive() {
        return false;
    }
    if session.page.is_closed() {
        match session.context.open_page().await {
            Ok(page) => session.page = page,
            Err(e) => warn!("⚠️ 重新创建页面失败，将重启浏览器: {}", e),
        }
    }
    !session.page.is_closed()
}

async fn close_quietly(mut session: Session) {
    if let Err(e) = session.context.close().await {
        debug!("关闭会话时出错（已忽略）: {}", e);
    }
}
