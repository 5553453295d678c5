//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责资源持有和对外操作，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用生命周期
//! - 构建平台配置、会话管理器、违禁词过滤器
//! - 启动 HTTP 控制接口，退出时关闭全部浏览器
//! - 定期清理调试截图
//!
//! ### `platform_service` - 单个平台的服务
//! - 登录 / 登录态检查 / 退出登录
//! - 发布视频、发布图文（委托给 `PublishFlow`）
//! - 主页作品读取、远程查看
//!
//! ## 层次关系
//!
//! ```text
//! app (持有 SessionManager，挂载 server)
//!     ↓
//! platform_service (一个平台一组操作)
//!     ↓
//! workflow::PublishFlow (单次发布的状态机)
//!     ↓
//! services (能力层：dom / music / forbidden / diagnostics)
//!     ↓
//! infrastructure (基础设施：PageDriver)
//! ```

pub mod app;
pub mod platform_service;

pub use app::App;
pub use platform_service::{
    resolve_feed_item, FeedItem, LoginResult, LoginStatus, LogoutResult, PlatformService,
    ProfileFeed,
};
