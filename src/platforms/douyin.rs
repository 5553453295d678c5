//! 抖音创作者中心

use std::time::Duration;

use super::*;

const UPLOAD_URL: &str = "https://creator.douyin.com/creator-micro/content/upload";
const IMAGE_UPLOAD_URL: &str =
    "https://creator.douyin.com/creator-micro/content/upload?default-tab=3";

const TITLE_SELECTORS: &[&str] = &[
    r#"input[placeholder*="填写作品标题"]"#,
    r#"input[placeholder*="标题"]"#,
    r#"textarea[placeholder*="标题"]"#,
    r#"input[type="text"]"#,
];

/// 简介编辑器，按从具体到宽泛的顺序
pub const DESCRIPTION_SELECTORS: &[&str] = &[
    r#".zone-container[contenteditable="true"]"#,
    r#"div.editor-kit-editor-container[contenteditable="true"]"#,
    r#"div[contenteditable="true"][data-placeholder*="简介"]"#,
    r#"div[contenteditable="true"].editor"#,
    r#"div[contenteditable="true"][data-slate-editor="true"]"#,
    r#"div[contenteditable="true"]"#,
];

const IMAGE_PROGRESS_SELECTOR: &str = "#DCPF > div > div.content-right-ik9gts > div:nth-child(1) > div > div > div > div > div > div.container-info-YDPo3D > div.progress-container-gYPT3G";

const PUBLISH_SUCCESS_TEXTS: &[&str] = &["发布成功", "已发布", "发送成功"];

pub fn config() -> PlatformConfig {
    PlatformConfig {
        platform: Platform::Douyin,
        login: LoginConfig {
            check_url: UPLOAD_URL,
            manual_login_url: UPLOAD_URL,
            markers: LoginMarkers {
                selectors: &[r#"input[type="file"]"#],
                button_texts: &["上传视频", "点击上传"],
                page_texts: &[],
            },
        },
        onboarding: OnboardingConfig {
            button_texts: &["跳过", "知道了", "下一步", "Skip"],
            selectors: &[r#"[class*="skip"]"#, r#"[class*="close"]"#],
            overlay_selector: Some(r#"[class*="joyride"]"#),
        },
        verification: VerificationConfig {
            selectors: &["#uc-second-verify"],
            texts: &["身份验证"],
        },
        purge_credentials: true,
        profile_feed: None,
        video: Some(video_composer()),
        images: Some(images_composer()),
    }
}

fn title_field() -> FieldConfig {
    FieldConfig {
        label: "标题输入框",
        selectors: TITLE_SELECTORS,
        mode: InputMode::Plain,
    }
}

fn description_field() -> FieldConfig {
    FieldConfig {
        label: "简介编辑器",
        selectors: DESCRIPTION_SELECTORS,
        mode: InputMode::RichText,
    }
}

fn video_composer() -> ComposerConfig {
    ComposerConfig {
        url: UPLOAD_URL,
        limits: ContentLimits {
            title_required: true,
            title_max_chars: Some(30),
            max_tags: None,
            content_max_chars: None,
            auto_tags: false,
        },
        pre_upload: &[],
        upload: UploadConfig {
            file_input_selectors: &[r#"input[type="file"]"#],
            chooser_trigger: None,
            file_settle: Duration::from_millis(1500),
            settle: Duration::from_secs(3),
            post_upload_url: Some("/content/post/video"),
            post_upload_wait: Duration::from_secs(30),
        },
        // 视频解析期间发布按钮不可用
        readiness: ReadinessConfig {
            signal: ReadinessSignal::PublishEnabled,
            failure_texts: &["上传失败", "解析失败"],
            max_wait: Duration::from_secs(600),
            interval: Duration::from_secs(2),
        },
        title: Some(title_field()),
        description: description_field(),
        tags: TagConfig {
            format: TagFormat::Hash,
            separator: Key::Space,
            settle: Duration::from_millis(1200),
            delay: Duration::from_millis(800),
            suggestion_selectors: &[],
        },
        music: None,
        moderation: Some(ModerationConfig {
            done_texts: &["作品未见异常", "检测完成"],
            timeout: Duration::from_secs(30),
            interval: Duration::from_secs(1),
        }),
        publish: PublishConfig {
            button: TextTarget::exact("button", "发布"),
            fallback_selectors: &["#popover-tip-container > button", "button.primary-cECiOJ"],
            expected_url: Some("/content/post/video"),
            scroll_container: None,
            success_urls: &["/content/manage"],
            success_texts: PUBLISH_SUCCESS_TEXTS,
            result_timeout: Duration::from_secs(30),
            result_interval: Duration::from_secs(1),
        },
    }
}

fn images_composer() -> ComposerConfig {
    ComposerConfig {
        url: IMAGE_UPLOAD_URL,
        limits: ContentLimits {
            title_required: true,
            title_max_chars: Some(20),
            max_tags: Some(5),
            content_max_chars: Some(1000),
            auto_tags: true,
        },
        pre_upload: &[],
        upload: UploadConfig {
            file_input_selectors: &[r#"input[type="file"]"#],
            chooser_trigger: None,
            file_settle: Duration::from_millis(1500),
            settle: Duration::from_secs(3),
            post_upload_url: None,
            post_upload_wait: Duration::ZERO,
        },
        readiness: ReadinessConfig {
            signal: ReadinessSignal::ProgressCleared {
                selector: IMAGE_PROGRESS_SELECTOR,
            },
            failure_texts: &["上传失败"],
            max_wait: Duration::from_secs(120),
            interval: Duration::from_secs(2),
        },
        title: Some(title_field()),
        description: description_field(),
        tags: TagConfig {
            format: TagFormat::Hash,
            separator: Key::Enter,
            settle: Duration::from_millis(200),
            delay: Duration::from_millis(800),
            suggestion_selectors: &[],
        },
        music: Some(MusicConfig {
            open: TextTarget::exact("div", "选择音乐"),
            open_pick_last: true,
            search_input: Some(r#"input[placeholder*="搜索音乐"]"#),
            item_selector: r#"[class*="music-collection-container"] > div > div"#,
            item_action: Some("button"),
            confirm_texts: &["修改音乐"],
            confirm_required: true,
            max_items: 20,
            settle: Duration::from_secs(3),
        }),
        moderation: Some(ModerationConfig {
            done_texts: &["作品未见异常", "检测完成"],
            timeout: Duration::from_secs(30),
            interval: Duration::from_secs(1),
        }),
        publish: PublishConfig {
            button: TextTarget::exact("button", "发布"),
            fallback_selectors: &["button.primary-cECiOJ"],
            expected_url: None,
            scroll_container: None,
            success_urls: &["/content/manage"],
            success_texts: PUBLISH_SUCCESS_TEXTS,
            result_timeout: Duration::from_secs(30),
            result_interval: Duration::from_secs(1),
        },
    }
}
