//! 发布状态机的状态

use std::fmt::Display;

use serde::Serialize;

/// 单次发布经过的状态
///
/// 正常路径严格按声明顺序前进；`Failed` 可以从任一非终止状态进入
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PublishState {
    Idle,
    PageOpened,
    Authenticated,
    MediaUploading,
    MediaReady,
    MetadataFilled,
    MusicAttached,
    ModerationChecked,
    Published,
    Confirmed,
    Failed,
}

impl PublishState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PublishState::Confirmed | PublishState::Failed)
    }

    /// 是否允许从 `self` 转移到 `next`
    ///
    /// 只能向前推进；`MusicAttached` 是可选状态，可以跳过
    pub fn can_advance_to(self, next: PublishState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == PublishState::Failed {
            return true;
        }
        next > self
            && (next as u8 == self as u8 + 1
                || (self == PublishState::MetadataFilled
                    && next == PublishState::ModerationChecked))
    }
}

impl Display for PublishState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PublishState::Idle => "空闲",
            PublishState::PageOpened => "已打开发布页",
            PublishState::Authenticated => "已登录",
            PublishState::MediaUploading => "上传中",
            PublishState::MediaReady => "媒体已就绪",
            PublishState::MetadataFilled => "已填写内容",
            PublishState::MusicAttached => "已添加音乐",
            PublishState::ModerationChecked => "检测完成",
            PublishState::Published => "已点击发布",
            PublishState::Confirmed => "已确认",
            PublishState::Failed => "失败",
        };
        write!(f, "{}", label)
    }
}
