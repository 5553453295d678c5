use std::sync::Arc;

use creator_publish::browser::{ChromiumLauncher, ProfileStore, SessionManager, Viewport};
use creator_publish::config::Config;
use creator_publish::utils::logging;
use creator_publish::workflow::{is_authenticated, NAVIGATION_TIMEOUT};
use creator_publish::Platform;

#[tokio::test]
#[ignore] // 默认忽略，需要本机安装 Chrome：cargo test -- --ignored
async fn test_launch_real_browser() {
    // 初始化日志
    logging::init("debug");

    let dir = tempfile::TempDir::new().unwrap();
    let config = Config::from_env();
    let sessions = SessionManager::new(
        Arc::new(ChromiumLauncher::new(config.chrome_executable.clone())),
        ProfileStore::new(dir.path()),
    )
    .with_display_fallback(true);

    let lease = sessions
        .acquire("integration", true, Viewport::DEFAULT)
        .await
        .expect("启动浏览器失败");
    lease
        .page()
        .goto("about:blank", NAVIGATION_TIMEOUT)
        .await
        .expect("导航失败");
    assert_eq!(lease.page().current_url().await.unwrap(), "about:blank");

    let png = lease.page().screenshot().await.expect("截图失败");
    assert!(png.starts_with(b"\x89PNG"));

    drop(lease);
    sessions.release_all().await;
}

#[tokio::test]
#[ignore] // 需要已登录的 profile：PROFILE=xxx cargo test -- --ignored
async fn test_douyin_login_status() {
    logging::init("info");

    let config = Config::from_env();
    let sessions = SessionManager::new(
        Arc::new(ChromiumLauncher::new(config.chrome_executable.clone())),
        ProfileStore::new(&config.profile_base_dir),
    );
    let platform = Platform::Douyin.config();

    let lease = sessions
        .acquire(&config.profile, config.headless, Viewport::DEFAULT)
        .await
        .expect("启动浏览器失败");
    lease
        .page()
        .goto(platform.login.check_url, NAVIGATION_TIMEOUT)
        .await
        .expect("打开创作者中心失败");
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;

    let logged_in = is_authenticated(lease.page(), &platform.login.markers).await;
    println!("抖音登录状态: {}", logged_in);

    drop(lease);
    sessions.release_all().await;
}
