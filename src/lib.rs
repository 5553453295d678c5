//! # Creator Publish
//!
//! 抖音 / 快手 / 小红书创作者后台的自动发布服务
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `PageDriver` - 页面能力接口，测试中可以替换为内存实现
//! - `CdpPage` - 基于 chromiumoxide 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `dom` - 轮询、按文本查找、输入、话题
//! - `music` - 背景音乐
//! - `ForbiddenFilter` - 违禁词检测
//! - `Diagnostics` - 调试截图
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次发布"的完整状态机
//! - `PublishCtx` - 上下文封装（平台 + 媒体类型 + profile）
//! - `PublishFlow` - 流程编排（校验 → 上传 → 填写 → 检测 → 发布 → 确认）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用生命周期，持有会话管理器
//! - `orchestrator/platform_service` - 单个平台的全部操作
//!
//! 另外：
//! - `browser/` - 浏览器启动、profile 目录、会话注册表
//! - `platforms/` - 三个平台的声明式配置
//! - `server/` - HTTP 控制接口
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod orchestrator;
pub mod platforms;
pub mod server;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{SessionLease, SessionManager, Viewport};
pub use config::Config;
pub use error::{AppError, AppResult, ErrorKind};
pub use infrastructure::PageDriver;
pub use orchestrator::{App, PlatformService};
pub use platforms::{MediaKind, Platform, PlatformConfig};
pub use workflow::{PublishCtx, PublishFlow, PublishRequest, PublishResult, PublishState};
