mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use common::{disabled, el, hidden, session_manager, Effect, FakeLauncher, FakePage};
use creator_publish::error::ErrorKind;
use creator_publish::platforms::{
    MediaKind, ModerationConfig, Platform, PlatformConfig, ReadinessSignal,
};
use creator_publish::services::{Diagnostics, ForbiddenFilter, MusicSelection};
use creator_publish::workflow::{PublishFlow, PublishRequest, PublishResult, PublishState};

const FILE_INPUT: &str = r#"input[type="file"]"#;
const PROGRESS: &str = ".upload-progress";
const TITLE: &str = r#"input[placeholder*="填写作品标题"]"#;
const EDITOR: &str = r#".zone-container[contenteditable="true"]"#;
const MANAGE_URL: &str = "https://creator.douyin.com/creator-micro/content/manage";

struct Harness {
    dir: TempDir,
    launcher: Arc<FakeLauncher>,
    flow: PublishFlow,
}

impl Harness {
    fn new(launcher: Arc<FakeLauncher>) -> Self {
        Self::with_filter(launcher, ForbiddenFilter::default())
    }

    fn with_filter(launcher: Arc<FakeLauncher>, filter: ForbiddenFilter) -> Self {
        let dir = TempDir::new().unwrap();
        let sessions = session_manager(launcher.clone(), &dir.path().join("profiles"));
        let flow = PublishFlow::new(sessions, Arc::new(filter), Diagnostics::disabled());
        Self {
            dir,
            launcher,
            flow,
        }
    }

    fn media(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"media").unwrap();
        path
    }

    async fn publish(
        &self,
        platform: &PlatformConfig,
        kind: MediaKind,
        request: &PublishRequest,
    ) -> PublishResult {
        self.flow.run(platform, kind, request, "default", true).await
    }
}

/// 抖音视频页，改为进度条就绪信号，去掉跳转等待和机审
fn stub_platform() -> PlatformConfig {
    let mut config = Platform::Douyin.config();
    if let Some(video) = config.video.as_mut() {
        video.readiness.signal = ReadinessSignal::ProgressCleared { selector: PROGRESS };
        video.readiness.max_wait = Duration::from_secs(20);
        video.upload.post_upload_url = None;
        video.publish.expected_url = None;
        video.moderation = None;
    }
    config
}

fn composer_page() -> FakePage {
    FakePage::new()
        .with_element(FILE_INPUT, vec![hidden()])
        .with_element(PROGRESS, vec![el("45%")])
        .with_element(TITLE, vec![el("")])
        .with_element(EDITOR, vec![el("")])
        .with_element("button", vec![el("发布")])
        .on_click("button", vec![Effect::SetUrl(MANAGE_URL.to_string())])
}

fn typed(page: &FakePage) -> Vec<String> {
    page.actions()
        .into_iter()
        .filter_map(|a| a.strip_prefix("type:").map(str::to_string))
        .collect()
}

// ========== 端到端 ==========

#[tokio::test(start_paused = true)]
async fn test_video_publish_confirmed() {
    let launcher = FakeLauncher::new(|_| Arc::new(composer_page().vanish_after(PROGRESS, 2)));
    let harness = Harness::new(launcher.clone());
    let video = harness.media("a.mp4");
    let request = PublishRequest::video("Hello", &video).with_tags(["x", "y"]);

    let result = harness
        .publish(&stub_platform(), MediaKind::Video, &request)
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.state, PublishState::Confirmed);
    assert!(!result.need_verify);
    assert_eq!(result.url.as_deref(), Some(MANAGE_URL));
    assert_eq!(
        result.states,
        vec![
            PublishState::Idle,
            PublishState::PageOpened,
            PublishState::Authenticated,
            PublishState::MediaUploading,
            PublishState::MediaReady,
            PublishState::MetadataFilled,
            PublishState::ModerationChecked,
            PublishState::Published,
            PublishState::Confirmed,
        ]
    );

    let details = result.details.unwrap();
    assert_eq!(details.tags, vec!["x", "y"]);
    assert_eq!(details.uploaded, 1);
    assert!(!details.ready_timed_out);

    let page = launcher.page(0);
    assert_eq!(page.count("upload:"), 1);
    assert_eq!(page.count("click:button"), 1);
    assert_eq!(page.field(TITLE).as_deref(), Some("Hello"));
    assert_eq!(page.field(EDITOR).as_deref(), Some(" #x #y"));
}

#[tokio::test(start_paused = true)]
async fn test_title_over_limit_rejected_before_navigation() {
    let launcher = FakeLauncher::single(Arc::new(composer_page()));
    let harness = Harness::new(launcher.clone());
    let video = harness.media("a.mp4");
    let mut platform = stub_platform();
    if let Some(video) = platform.video.as_mut() {
        video.limits.title_max_chars = Some(20);
    }
    let request = PublishRequest::video("一".repeat(25), &video);

    let result = harness.publish(&platform, MediaKind::Video, &request).await;

    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, ErrorKind::ValidationError);
    assert_eq!(result.states, vec![PublishState::Idle, PublishState::Failed]);
    assert_eq!(launcher.launches(), 0);
}

/// 上传一直没有完成时仍然继续发布：结果可能是误报的成功
#[tokio::test(start_paused = true)]
async fn test_stuck_upload_still_publishes_ambiguous_success() {
    let launcher = FakeLauncher::single(Arc::new(composer_page()));
    let harness = Harness::new(launcher.clone());
    let video = harness.media("a.mp4");
    let request = PublishRequest::video("Hello", &video);

    let result = harness
        .publish(&stub_platform(), MediaKind::Video, &request)
        .await;

    assert!(result.success);
    assert!(result.states.contains(&PublishState::MediaReady));
    assert!(result.details.as_ref().unwrap().ready_timed_out);
    assert_eq!(launcher.page(0).field(TITLE).as_deref(), Some("Hello"));
}

#[tokio::test(start_paused = true)]
async fn test_verification_marker_needs_verify() {
    let page = composer_page().vanish_after(PROGRESS, 0).on_click(
        "button",
        vec![Effect::SetElements(
            "#uc-second-verify".to_string(),
            vec![el("请输入验证码")],
        )],
    );
    let launcher = FakeLauncher::single(Arc::new(page));
    let harness = Harness::new(launcher);
    let video = harness.media("a.mp4");
    let request = PublishRequest::video("Hello", &video);

    let result = harness
        .publish(&stub_platform(), MediaKind::Video, &request)
        .await;

    assert!(!result.success);
    assert!(result.need_verify);
    assert_eq!(result.state, PublishState::Published);
    assert!(result.error.is_none());
}

/// 点击发布后既没有成功信号也没有验证：按已提交处理
#[tokio::test(start_paused = true)]
async fn test_unconfirmed_publish_reported_as_submitted() {
    let page = composer_page()
        .vanish_after(PROGRESS, 0)
        .on_click("button", Vec::new());
    let launcher = FakeLauncher::single(Arc::new(page));
    let harness = Harness::new(launcher);
    let video = harness.media("a.mp4");

    let result = harness
        .publish(
            &stub_platform(),
            MediaKind::Video,
            &PublishRequest::video("Hello", &video),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.state, PublishState::Published);
    assert_eq!(result.message, "已提交发布，未能确认结果");
}

// ========== 前置校验 ==========

#[tokio::test(start_paused = true)]
async fn test_missing_media_never_touches_browser() {
    let launcher = FakeLauncher::single(Arc::new(composer_page()));
    let harness = Harness::new(launcher.clone());
    let request = PublishRequest {
        title: Some("Hello".to_string()),
        ..Default::default()
    };

    let result = harness
        .publish(&stub_platform(), MediaKind::Video, &request)
        .await;

    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, ErrorKind::ValidationError);
    assert!(result.details.is_none());
    assert_eq!(launcher.launches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_nonexistent_media_rejected() {
    let launcher = FakeLauncher::single(Arc::new(composer_page()));
    let harness = Harness::new(launcher.clone());
    let missing = harness.dir.path().join("missing.mp4");

    let result = harness
        .publish(
            &stub_platform(),
            MediaKind::Video,
            &PublishRequest::video("Hello", missing),
        )
        .await;

    assert!(!result.success);
    assert!(result.message.contains("missing.mp4"));
    assert_eq!(launcher.launches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_forbidden_content_rejected() {
    let launcher = FakeLauncher::single(Arc::new(composer_page()));
    let harness = Harness::with_filter(launcher.clone(), ForbiddenFilter::from_words(["赌博"]));
    let video = harness.media("a.mp4");
    let request = PublishRequest::video("周末", &video).with_description("线上赌博网站");

    let result = harness
        .publish(&stub_platform(), MediaKind::Video, &request)
        .await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::ForbiddenContent);
    assert!(error.message.contains("内容包含违禁词: 赌博"));
    assert_eq!(launcher.launches(), 0);
}

// ========== 浏览器异常 ==========

#[tokio::test(start_paused = true)]
async fn test_crash_recovered_exactly_once() {
    let launcher = FakeLauncher::new(|index| {
        let page = composer_page().vanish_after(PROGRESS, 0);
        Arc::new(if index == 0 { page.crash_on_first_goto() } else { page })
    });
    let harness = Harness::new(launcher.clone());
    let video = harness.media("a.mp4");

    let result = harness
        .publish(
            &stub_platform(),
            MediaKind::Video,
            &PublishRequest::video("Hello", &video),
        )
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(launcher.launches(), 2);
    assert_eq!(launcher.page(0).count("goto:"), 1);
    assert_eq!(launcher.page(1).count("goto:"), 1);
    assert_eq!(launcher.page(1).count("upload:"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_crash_is_fatal() {
    let launcher = FakeLauncher::new(|_| Arc::new(composer_page().crash_on_first_goto()));
    let harness = Harness::new(launcher.clone());
    let video = harness.media("a.mp4");

    let result = harness
        .publish(
            &stub_platform(),
            MediaKind::Video,
            &PublishRequest::video("Hello", &video),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, ErrorKind::PageCrashed);
    assert_eq!(result.states, vec![PublishState::Idle, PublishState::Failed]);
    assert_eq!(launcher.launches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_publish_button_not_clicked() {
    let page = composer_page()
        .vanish_after(PROGRESS, 0)
        .with_element("button", vec![disabled("发布")]);
    let launcher = FakeLauncher::single(Arc::new(page));
    let harness = Harness::new(launcher.clone());
    let video = harness.media("a.mp4");

    let result = harness
        .publish(
            &stub_platform(),
            MediaKind::Video,
            &PublishRequest::video("Hello", &video),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, ErrorKind::PublishControlDisabled);
    assert_eq!(result.state, PublishState::Failed);
    assert_eq!(launcher.page(0).count("click:button"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_not_logged_in_stops_after_page_open() {
    let page = FakePage::new().with_text("扫码登录");
    let launcher = FakeLauncher::single(Arc::new(page));
    let harness = Harness::new(launcher.clone());
    let video = harness.media("a.mp4");

    let result = harness
        .publish(
            &stub_platform(),
            MediaKind::Video,
            &PublishRequest::video("Hello", &video),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, ErrorKind::NotAuthenticated);
    assert_eq!(
        result.states,
        vec![PublishState::Idle, PublishState::PageOpened, PublishState::Failed]
    );
    assert_eq!(launcher.page(0).count("upload:"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_upload_failure_text_fails_fast() {
    let page = composer_page().on_upload(vec![Effect::AddText("上传失败，请重试".to_string())]);
    let launcher = FakeLauncher::single(Arc::new(page));
    let harness = Harness::new(launcher.clone());
    let video = harness.media("a.mp4");

    let result = harness
        .publish(
            &stub_platform(),
            MediaKind::Video,
            &PublishRequest::video("Hello", &video),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, ErrorKind::UploadFailed);
    assert!(!result.states.contains(&PublishState::MediaReady));
    assert!(launcher.page(0).field(TITLE).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_missing_publish_button_fails() {
    let page = composer_page()
        .vanish_after(PROGRESS, 0)
        .with_element("button", vec![]);
    let launcher = FakeLauncher::single(Arc::new(page));
    let harness = Harness::new(launcher.clone());
    let video = harness.media("a.mp4");

    let result = harness
        .publish(
            &stub_platform(),
            MediaKind::Video,
            &PublishRequest::video("Hello", &video),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, ErrorKind::PublishControlNotFound);
    let states = &result.states;
    assert_eq!(states[states.len() - 2], PublishState::ModerationChecked);
    assert_eq!(states.last(), Some(&PublishState::Failed));
}

#[tokio::test(start_paused = true)]
async fn test_moderation_timeout_still_publishes() {
    let launcher = FakeLauncher::single(Arc::new(composer_page().vanish_after(PROGRESS, 0)));
    let harness = Harness::new(launcher.clone());
    let video = harness.media("a.mp4");
    let mut platform = stub_platform();
    if let Some(video) = platform.video.as_mut() {
        video.moderation = Some(ModerationConfig {
            done_texts: &["检测完成"],
            timeout: Duration::from_secs(30),
            interval: Duration::from_secs(1),
        });
    }

    let result = harness
        .publish(&platform, MediaKind::Video, &PublishRequest::video("Hello", &video))
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.state, PublishState::Confirmed);
    assert!(result.states.contains(&PublishState::ModerationChecked));
    assert!(result.details.unwrap().moderation_timed_out);
    assert_eq!(launcher.page(0).count("click:button"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cleared_title_refilled_before_publish() {
    // 点击正文编辑器时页面把标题清空
    let page = composer_page()
        .vanish_after(PROGRESS, 0)
        .on_click(EDITOR, vec![Effect::ClearField(TITLE.to_string())]);
    let launcher = FakeLauncher::single(Arc::new(page));
    let harness = Harness::new(launcher.clone());
    let video = harness.media("a.mp4");
    let request = PublishRequest::video("Hello", &video)
        .with_description("周末去露营")
        .with_tags(["x"]);

    let result = harness
        .publish(&stub_platform(), MediaKind::Video, &request)
        .await;

    assert!(result.success, "{}", result.message);
    assert!(result.details.unwrap().refilled);

    let page = launcher.page(0);
    assert_eq!(page.field(TITLE).as_deref(), Some("Hello"));
    assert_eq!(page.field(EDITOR).as_deref(), Some("周末去露营 #x"));
    assert_eq!(typed(&page), vec!["Hello", "周末去露营", " #x", "Hello"]);
}

// ========== 小红书图文 ==========

const XHS_TITLE: &str = "#publish-container > div > div.body > div.content > div.plugin.title-container > div > div > div.input > div.d-input-wrapper.d-inline-block.c-input_inner > div > input";
const XHS_EDITOR: &str = "#publish-container > div > div.body > div.content > div.plugin.editor-container > div > div > div.editor-container > div.editor-content > div > div";
const XHS_SUCCESS: &str = "https://creator.xiaohongshu.com/publish/success?source=official";

/// 上传后标题和正文编辑区出现
fn xiaohongshu_page() -> FakePage {
    FakePage::new()
        .with_element(FILE_INPUT, vec![hidden()])
        .with_element("button", vec![el("发布")])
        .on_upload(vec![
            Effect::SetElements(XHS_TITLE.to_string(), vec![el("")]),
            Effect::SetElements(XHS_EDITOR.to_string(), vec![el("")]),
        ])
        .on_click("button", vec![Effect::SetUrl(XHS_SUCCESS.to_string())])
}

#[tokio::test(start_paused = true)]
async fn test_xiaohongshu_images_skip_failed_file() {
    let page = xiaohongshu_page().fail_upload_calls(&[1]);
    let launcher = FakeLauncher::single(Arc::new(page));
    let harness = Harness::new(launcher.clone());
    let images = vec![
        harness.media("1.jpg"),
        harness.media("2.jpg"),
        harness.media("3.jpg"),
    ];
    let request = PublishRequest::images("露营日记", images)
        .with_description("周末去露营")
        .with_tags(["露营", "周末"]);

    let result = harness
        .publish(&Platform::Xiaohongshu.config(), MediaKind::Images, &request)
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.state, PublishState::Confirmed);
    assert_eq!(result.url.as_deref(), Some(XHS_SUCCESS));
    assert!(result.states.contains(&PublishState::MediaReady));

    let details = result.details.unwrap();
    assert_eq!(details.media_count, 3);
    assert_eq!(details.uploaded, 2);
    assert!(!details.ready_timed_out);

    let page = launcher.page(0);
    assert_eq!(page.count(&format!("upload:{}:1", FILE_INPUT)), 3);
    assert_eq!(page.count("key:Enter"), 2);
    assert_eq!(page.field(XHS_TITLE).as_deref(), Some("露营日记"));
    assert_eq!(page.field(XHS_EDITOR).as_deref(), Some("周末去露营 #露营 #周末"));
}

#[tokio::test(start_paused = true)]
async fn test_xiaohongshu_all_files_failed() {
    let page = xiaohongshu_page().fail_upload_calls(&[0, 1]);
    let launcher = FakeLauncher::single(Arc::new(page));
    let harness = Harness::new(launcher.clone());
    let images = vec![harness.media("1.jpg"), harness.media("2.jpg")];

    let result = harness
        .publish(
            &Platform::Xiaohongshu.config(),
            MediaKind::Images,
            &PublishRequest::images("露营日记", images),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, ErrorKind::UploadFailed);
    assert!(!result.states.contains(&PublishState::MediaUploading));
}

// ========== 快手图文 ==========

const KS_TAB: &str = r#"[role="tab"]"#;
const KS_EDITOR: &str = "#work-description-edit";
const KS_PUBLISH: &str = r#"button, div[role="button"]"#;
const KS_MUSIC_OPEN: &str = "div._button_3a3lq_1._button-default_3a3lq_35";
const KS_MUSIC_ITEMS: &str = "div._drawer-main_19mmt_33 > div";

fn kuaishou_page() -> FakePage {
    FakePage::new()
        .with_element("button", vec![el("上传视频"), el("上传图片")])
        .with_element(KS_TAB, vec![el("上传视频"), el("上传图文")])
        .on_upload(vec![
            Effect::SetElements(KS_EDITOR.to_string(), vec![el("")]),
            Effect::SetElements(KS_PUBLISH.to_string(), vec![el("发布")]),
            Effect::SetElements(KS_MUSIC_OPEN.to_string(), vec![el("添加音乐")]),
            Effect::SetElements(
                KS_MUSIC_ITEMS.to_string(),
                vec![el("晴天\n周杰伦"), el("夜曲\n周杰伦")],
            ),
        ])
        .on_click(
            &format!("{}@1", KS_MUSIC_ITEMS),
            vec![Effect::AddText("更换音乐".to_string())],
        )
        .on_click(
            KS_PUBLISH,
            vec![Effect::SetUrl(
                "https://cp.kuaishou.com/article/manage/video".to_string(),
            )],
        )
}

#[tokio::test(start_paused = true)]
async fn test_kuaishou_images_with_music() {
    let launcher = FakeLauncher::single(Arc::new(kuaishou_page()));
    let harness = Harness::new(launcher.clone());
    let images = vec![harness.media("1.jpg"), harness.media("2.jpg")];
    let request = PublishRequest::images("标题会被忽略", images)
        .with_description("周末去露营")
        .with_tags(["露营", "#日常", "露营"])
        .with_music(MusicSelection {
            query: None,
            index: Some(1),
        });

    let result = harness
        .publish(&Platform::Kuaishou.config(), MediaKind::Images, &request)
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.state, PublishState::Confirmed);
    assert!(result.states.contains(&PublishState::MusicAttached));

    let details = result.details.unwrap();
    assert!(details.title.is_none());
    assert_eq!(details.tags, vec!["露营", "日常"]);
    assert_eq!(details.music.as_deref(), Some("已添加: 夜曲"));
    assert_eq!(details.uploaded, 2);

    let page = launcher.page(0);
    let actions = page.actions();
    assert!(actions.contains(&format!("click:{}@1", KS_TAB)));
    assert!(actions.contains(&"chooser:button@1:2".to_string()));
    assert!(actions.contains(&"scroll:main".to_string()));
    assert_eq!(page.count("key:Space"), 2);
    assert_eq!(
        typed(&page),
        vec!["周末去露营", " #露营", " #日常"]
    );
    assert_eq!(page.field(KS_EDITOR).as_deref(), Some("周末去露营 #露营 #日常"));
}

#[tokio::test(start_paused = true)]
async fn test_music_failure_does_not_abort_publish() {
    // 没有音乐列表
    let page = kuaishou_page().on_upload(vec![
        Effect::SetElements(KS_EDITOR.to_string(), vec![el("")]),
        Effect::SetElements(KS_PUBLISH.to_string(), vec![el("发布")]),
    ]);
    let launcher = FakeLauncher::single(Arc::new(page));
    let harness = Harness::new(launcher);
    let request = PublishRequest::images("", vec![harness.media("1.jpg")])
        .with_description("周末去露营")
        .with_music(MusicSelection::random());

    let result = harness
        .publish(&Platform::Kuaishou.config(), MediaKind::Images, &request)
        .await;

    assert!(result.success, "{}", result.message);
    assert!(!result.states.contains(&PublishState::MusicAttached));
    let music = result.details.unwrap().music.unwrap();
    assert!(music.starts_with("添加失败"));
}

#[tokio::test(start_paused = true)]
async fn test_kuaishou_images_rejected_after_fixed_wait() {
    let page = kuaishou_page().with_text("图片上传失败");
    let launcher = FakeLauncher::single(Arc::new(page));
    let harness = Harness::new(launcher.clone());
    let request = PublishRequest::images("", vec![harness.media("1.jpg")])
        .with_description("周末去露营");
    let started = tokio::time::Instant::now();

    let result = harness
        .publish(&Platform::Kuaishou.config(), MediaKind::Images, &request)
        .await;

    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind, ErrorKind::UploadFailed);
    assert!(result.states.contains(&PublishState::MediaUploading));
    assert!(!result.states.contains(&PublishState::MediaReady));
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(launcher.page(0).count("type:"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_kuaishou_requires_description() {
    let launcher = FakeLauncher::single(Arc::new(kuaishou_page()));
    let harness = Harness::new(launcher.clone());
    let request = PublishRequest::images("只有标题", vec![harness.media("1.jpg")]);

    let result = harness
        .publish(&Platform::Kuaishou.config(), MediaKind::Images, &request)
        .await;

    assert!(!result.success);
    assert!(result.message.contains("作品描述"));
    assert_eq!(launcher.launches(), 0);
}
