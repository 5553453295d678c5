//! 日志工具模块
//!
//! 提供日志初始化和输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// `RUST_LOG` 优先，其次使用配置中的 `LOG_LEVEL`
///
/// # 参数
/// - `level`: 默认日志级别（error / warn / info / debug / trace）
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // 重复初始化（例如测试中）直接忽略
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `addr`: 控制服务监听地址
/// - `headless`: 是否无头模式
/// - `profile`: 默认 profile
pub fn log_startup(addr: &str, headless: bool, profile: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 多平台发布服务启动");
    info!("🌐 监听地址: http://{}", addr);
    info!("🖥️ 浏览器模式: {}", if headless { "无头" } else { "有头" });
    info!("👤 默认 profile: {}", profile);
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 记录程序退出信息
pub fn log_shutdown() {
    info!("\n{}", "─".repeat(60));
    info!("👋 收到退出信号，正在关闭所有浏览器会话...");
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
