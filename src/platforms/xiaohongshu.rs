//! 小红书创作服务平台

use std::time::Duration;

use super::*;

const VIDEO_URL: &str = "https://creator.xiaohongshu.com/publish/publish?from=menu&target=video";
const IMAGE_URL: &str = "https://creator.xiaohongshu.com/publish/publish?from=menu&target=image";

const FILE_INPUTS: &[&str] = &[
    "#web > div > div > div > div.upload-content > div.upload-wrapper > div > input",
    r#"input[type="file"]"#,
];

const TITLE_SELECTORS: &[&str] = &[
    "#publish-container > div > div.body > div.content > div.plugin.title-container > div > div > div.input > div.d-input-wrapper.d-inline-block.c-input_inner > div > input",
    "#web > div > div > div > div > div.body > div.content > div.plugin.title-container > div > div > div.input > div.d-input-wrapper.d-inline-block.c-input_inner > div > input",
    r#"input[placeholder*="标题"]"#,
];

const EDITOR_SELECTORS: &[&str] = &[
    "#publish-container > div > div.body > div.content > div.plugin.editor-container > div > div > div.editor-container > div.editor-content > div > div",
    "#web > div > div > div > div > div.body > div.content > div.plugin.editor-container > div > div > div.editor-container > div.editor-content > div > div",
    r#"div[contenteditable="true"]"#,
];

/// 上传完成后应出现的编辑区
const REQUIRED_FIELDS: &[&str] = &[TITLE_SELECTORS[0], EDITOR_SELECTORS[0]];

const PUBLISH_BUTTONS: &[&str] = &[
    "#publish-container > div.post-page > div.submit > div > button.publishBtn",
    "#web > div > div > div > div > div.submit > div > button.publishBtn",
    "button.publishBtn",
];

pub fn config() -> PlatformConfig {
    PlatformConfig {
        platform: Platform::Xiaohongshu,
        login: LoginConfig {
            check_url: "https://creator.xiaohongshu.com/",
            manual_login_url: "https://creator.xiaohongshu.com/creator/home",
            markers: LoginMarkers {
                selectors: FILE_INPUTS,
                button_texts: &[],
                page_texts: &["发布笔记"],
            },
        },
        onboarding: OnboardingConfig {
            button_texts: &["我知道了", "知道了"],
            selectors: &[],
            overlay_selector: None,
        },
        verification: VerificationConfig {
            selectors: &[],
            texts: &["请完成验证", "安全验证"],
        },
        purge_credentials: false,
        profile_feed: Some(ProfileFeedConfig {
            url_template: "https://www.xiaohongshu.com/user/profile/{user_id}",
            link_selector: "#userPostedFeeds > section > div > a.cover.mask.ld",
            title_selector: "div > a > span",
            origin: "https://www.xiaohongshu.com",
            item_url_base: "https://www.xiaohongshu.com/discovery/item/",
        }),
        video: Some(composer(VIDEO_URL)),
        images: Some(composer(IMAGE_URL)),
    }
}

fn composer(url: &'static str) -> ComposerConfig {
    ComposerConfig {
        url,
        limits: ContentLimits {
            title_required: true,
            title_max_chars: None,
            max_tags: Some(10),
            content_max_chars: None,
            auto_tags: false,
        },
        pre_upload: &[],
        upload: UploadConfig {
            file_input_selectors: FILE_INPUTS,
            chooser_trigger: None,
            file_settle: Duration::from_millis(1500),
            settle: Duration::from_secs(5),
            post_upload_url: None,
            post_upload_wait: Duration::ZERO,
        },
        readiness: ReadinessConfig {
            signal: ReadinessSignal::FieldsReady {
                complete_texts: &["上传成功", "解析完成"],
                uploading_texts: &["上传中", "处理中"],
                required_selectors: REQUIRED_FIELDS,
            },
            failure_texts: &["上传失败", "解析失败"],
            max_wait: Duration::from_secs(300),
            interval: Duration::from_secs(2),
        },
        title: Some(FieldConfig {
            label: "标题输入框",
            selectors: TITLE_SELECTORS,
            mode: InputMode::Plain,
        }),
        description: FieldConfig {
            label: "正文编辑器",
            selectors: EDITOR_SELECTORS,
            mode: InputMode::RichText,
        },
        tags: TagConfig {
            format: TagFormat::Hash,
            separator: Key::Enter,
            settle: Duration::from_millis(500),
            delay: Duration::from_millis(500),
            suggestion_selectors: &[
                r#".tippy-box [role="option"]"#,
                ".tippy-box li",
                ".tippy-box button",
                r#".tippy-box [class*="tag"]"#,
            ],
        },
        music: None,
        moderation: None,
        publish: PublishConfig {
            button: TextTarget::exact("button", "发布"),
            fallback_selectors: PUBLISH_BUTTONS,
            expected_url: None,
            scroll_container: None,
            success_urls: &["/publish/success"],
            success_texts: &["发布成功", "已提交", "发送成功"],
            result_timeout: Duration::from_secs(30),
            result_interval: Duration::from_secs(1),
        },
    }
}
