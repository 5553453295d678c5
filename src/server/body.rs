//! HTTP 请求体
//!
//! 兼容旧客户端的写法：路径字段可以是字符串或数组，`music` 可以是 `true` 或对象

use std::path::PathBuf;

use serde::Deserialize;

use crate::services::MusicSelection;
use crate::workflow::PublishRequest;

/// 单个值或数组
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

/// `music: true` 或 `music: {name?, index?}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MusicField {
    Flag(bool),
    Choice(MusicSelection),
}

impl MusicField {
    fn into_selection(self) -> Option<MusicSelection> {
        match self {
            MusicField::Flag(true) => Some(MusicSelection::random()),
            MusicField::Flag(false) => None,
            MusicField::Choice(selection) => Some(selection),
        }
    }
}

/// 发布请求中各平台共用的字段
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonFields {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<OneOrMany<String>>,
    #[serde(default)]
    pub music: Option<MusicField>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub headless: Option<bool>,
}

impl CommonFields {
    fn into_request(self) -> PublishRequest {
        PublishRequest {
            title: self.title,
            description: self.description.unwrap_or_default(),
            tags: self.tags.map(OneOrMany::into_vec).unwrap_or_default(),
            music: self.music.and_then(MusicField::into_selection),
            profile: self.profile,
            headless: self.headless,
            ..Default::default()
        }
    }
}

/// `POST /<p>/publish`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoBody {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(default, alias = "path")]
    pub video_path: Option<PathBuf>,
}

impl VideoBody {
    pub fn into_request(self) -> PublishRequest {
        PublishRequest {
            video_path: self.video_path.filter(|p| !p.as_os_str().is_empty()),
            ..self.common.into_request()
        }
    }
}

/// `POST /<p>/publish-images`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagesBody {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(default, alias = "paths", alias = "path")]
    pub image_paths: Option<OneOrMany<PathBuf>>,
}

impl ImagesBody {
    pub fn into_request(self) -> PublishRequest {
        let image_paths = self
            .image_paths
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        PublishRequest {
            image_paths,
            ..self.common.into_request()
        }
    }
}

/// 只带 profile 的查询参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileQuery {
    #[serde(default)]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GotoBody {
    pub url: String,
    #[serde(default)]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickBody {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeBody {
    pub text: String,
    #[serde(default)]
    pub profile: Option<String>,
}
