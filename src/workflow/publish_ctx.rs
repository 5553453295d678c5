//! 发布上下文
//!
//! 封装"我正在哪个平台、用哪个 profile 发布什么"这一信息，只用于日志

use std::fmt::Display;

use crate::platforms::{MediaKind, Platform};

/// 发布上下文
#[derive(Debug, Clone)]
pub struct PublishCtx {
    pub platform: Platform,
    pub kind: MediaKind,
    /// profile 名称
    pub profile: String,
}

impl PublishCtx {
    pub fn new(platform: Platform, kind: MediaKind, profile: impl Into<String>) -> Self {
        Self {
            platform,
            kind,
            profile: profile.into(),
        }
    }
}

impl Display for PublishCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} {} profile#{}]",
            self.platform.name(),
            self.kind.label(),
            self.profile
        )
    }
}
