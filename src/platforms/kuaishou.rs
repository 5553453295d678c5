//! 快手创作者服务平台（不需要标题）

use std::time::Duration;

use super::*;

const PUBLISH_URL: &str = "https://cp.kuaishou.com/article/publish/video";

const DESCRIPTION_SELECTORS: &[&str] = &[
    "#work-description-edit",
    r#"div#work-description-edit[contenteditable="true"]"#,
    r#"div[contenteditable="true"]._description_eho7l_59"#,
    r#"div[contenteditable="true"]"#,
];

/// 切换到图文标签页，放弃残留草稿
const IMAGE_PRE_UPLOAD: &[TextTarget] = &[
    TextTarget::exact(r#"[role="tab"]"#, "上传图文"),
    TextTarget::exact("button", "放弃"),
];

pub fn config() -> PlatformConfig {
    PlatformConfig {
        platform: Platform::Kuaishou,
        login: LoginConfig {
            check_url: PUBLISH_URL,
            manual_login_url: "https://passport.kuaishou.com/pc/account/login/",
            markers: LoginMarkers {
                selectors: &[],
                button_texts: &["上传视频", "上传图片"],
                page_texts: &[],
            },
        },
        onboarding: OnboardingConfig {
            button_texts: &["我知道了", "知道了", "跳过"],
            selectors: &[],
            overlay_selector: None,
        },
        verification: VerificationConfig {
            selectors: &[],
            texts: &["安全验证", "身份验证"],
        },
        purge_credentials: true,
        profile_feed: None,
        video: Some(composer(MediaKind::Video)),
        images: Some(composer(MediaKind::Images)),
    }
}

fn composer(kind: MediaKind) -> ComposerConfig {
    // 图文页没有稳定的进度或按钮状态，上传后固定等待
    let (pre_upload, trigger, signal, max_wait, music): (&'static [TextTarget], _, _, _, _) =
        match kind {
            MediaKind::Video => (
                &[],
                TextTarget::contains("button", "上传视频"),
                ReadinessSignal::PublishEnabled,
                Duration::from_secs(300),
                None,
            ),
            MediaKind::Images => (
                IMAGE_PRE_UPLOAD,
                TextTarget::contains("button", "上传图片"),
                ReadinessSignal::FixedDelay,
                Duration::from_secs(5),
                Some(music()),
            ),
        };

    ComposerConfig {
        url: PUBLISH_URL,
        limits: ContentLimits {
            title_required: false,
            title_max_chars: None,
            max_tags: Some(4),
            content_max_chars: None,
            auto_tags: false,
        },
        pre_upload,
        // 页面上的文件输入框不稳定，统一走文件选择框拦截
        upload: UploadConfig {
            file_input_selectors: &[],
            chooser_trigger: Some(trigger),
            file_settle: Duration::from_millis(1500),
            settle: Duration::from_secs(5),
            post_upload_url: None,
            post_upload_wait: Duration::ZERO,
        },
        readiness: ReadinessConfig {
            signal,
            failure_texts: &["上传失败", "转码失败"],
            max_wait,
            interval: Duration::from_secs(2),
        },
        title: None,
        description: FieldConfig {
            label: "作品描述",
            selectors: DESCRIPTION_SELECTORS,
            mode: InputMode::RichText,
        },
        tags: TagConfig {
            format: TagFormat::Hash,
            separator: Key::Space,
            settle: Duration::from_millis(200),
            delay: Duration::from_millis(800),
            suggestion_selectors: &[],
        },
        music,
        moderation: None,
        publish: PublishConfig {
            button: TextTarget::exact(r#"button, div[role="button"]"#, "发布"),
            fallback_selectors: &[],
            expected_url: None,
            scroll_container: Some("main"),
            success_urls: &["/article/manage"],
            success_texts: &["内容发布成功", "发布成功"],
            result_timeout: Duration::from_secs(30),
            result_interval: Duration::from_secs(1),
        },
    }
}

fn music() -> MusicConfig {
    MusicConfig {
        open: TextTarget::contains("div._button_3a3lq_1._button-default_3a3lq_35", "添加音乐"),
        open_pick_last: false,
        search_input: Some("div._search_19mmt_6 > input"),
        item_selector: "div._drawer-main_19mmt_33 > div",
        item_action: Some("span > div"),
        confirm_texts: &["修改音乐", "更换音乐", "已添加"],
        confirm_required: false,
        max_items: 50,
        settle: Duration::from_secs(2),
    }
}
