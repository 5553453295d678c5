//! 发布请求与前置校验
//!
//! 校验全部在浏览器交互之前完成：必填字段、长度限制、媒体文件存在性、违禁词

use std::collections::HashSet;
use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppResult, ValidationError};
use crate::platforms::{MediaKind, PlatformConfig, TagFormat};
use crate::services::{ForbiddenFilter, MusicSelection};

/// 标题里提取不到关键词时的默认话题
const DEFAULT_AUTO_TAGS: &[&str] = &["生活", "分享"];
/// 自动话题的最大数量
const MAX_AUTO_TAGS: usize = 3;

/// 发布请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub video_path: Option<PathBuf>,
    #[serde(default)]
    pub image_paths: Vec<PathBuf>,
    #[serde(default)]
    pub music: Option<MusicSelection>,
    /// 不指定时使用服务默认 profile
    #[serde(default)]
    pub profile: Option<String>,
    /// 不指定时使用服务默认模式
    #[serde(default)]
    pub headless: Option<bool>,
}

impl PublishRequest {
    /// 视频发布请求
    pub fn video(title: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            title: Some(title.into()),
            video_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// 图文发布请求
    pub fn images<I, P>(title: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            title: Some(title.into()),
            image_paths: paths.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_music(mut self, music: MusicSelection) -> Self {
        self.music = Some(music);
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// 请求携带的媒体类型
    fn media_kind(&self) -> Result<MediaKind, ValidationError> {
        match (&self.video_path, self.image_paths.is_empty()) {
            (Some(_), false) => Err(ValidationError::ConflictingMedia),
            (Some(_), true) => Ok(MediaKind::Video),
            (None, false) => Ok(MediaKind::Images),
            (None, true) => Err(ValidationError::MissingMedia),
        }
    }
}

/// 校验通过、已规范化的发布内容
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedPost {
    pub kind: MediaKind,
    pub title: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    /// 已确认存在的媒体文件（绝对路径）
    pub media: Vec<PathBuf>,
    #[serde(skip)]
    pub music: Option<MusicSelection>,
}

impl PreparedPost {
    /// 前置校验
    ///
    /// # 参数
    /// - `request`: 原始请求
    /// - `expected`: 调用的发布操作对应的媒体类型
    /// - `platform`: 平台配置
    /// - `filter`: 违禁词过滤器
    pub fn prepare(
        request: &PublishRequest,
        expected: MediaKind,
        platform: &PlatformConfig,
        filter: &ForbiddenFilter,
    ) -> AppResult<Self> {
        let kind = match request.media_kind() {
            Ok(kind) if kind == expected => kind,
            Ok(_) | Err(ValidationError::MissingMedia) => {
                return Err(ValidationError::MissingField {
                    field: match expected {
                        MediaKind::Video => "视频文件路径",
                        MediaKind::Images => "图片路径",
                    },
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        };
        let composer = platform
            .composer(kind)
            .ok_or(ValidationError::UnsupportedMedia {
                platform: platform.name(),
                media: kind.label(),
            })?;
        let limits = &composer.limits;

        // 标题
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        let title = match (title, &composer.title) {
            (None, Some(_)) if limits.title_required => {
                return Err(ValidationError::MissingField { field: "标题" }.into())
            }
            // 平台没有标题输入框时忽略
            (_, None) => None,
            (title, Some(_)) => title,
        };
        if let (Some(title), Some(max)) = (&title, limits.title_max_chars) {
            let len = title.chars().count();
            if len > max {
                return Err(ValidationError::TitleTooLong { len, max }.into());
            }
        }

        let description = request.description.trim().to_string();
        if composer.title.is_none() && description.is_empty() {
            return Err(ValidationError::MissingField { field: "作品描述" }.into());
        }

        // 话题
        let mut tags = normalize_tags(&request.tags);
        if tags.is_empty() && limits.auto_tags {
            tags = auto_tags(title.as_deref().unwrap_or_default());
        }
        if let Some(max) = limits.max_tags {
            if tags.len() > max {
                warn!(
                    "⚠️ {} 最多支持 {} 个话题，忽略: {:?}",
                    platform.name(),
                    max,
                    &tags[max..]
                );
                tags.truncate(max);
            }
        }

        if let Some(max) = limits.content_max_chars {
            let len = content_length(&description, &tags);
            if len > max {
                return Err(ValidationError::ContentTooLong { len, max }.into());
            }
        }

        let media = resolve_media(request, kind)?;

        // 违禁词
        let mut full_text = vec![title.clone().unwrap_or_default(), description.clone()];
        full_text.extend(tags.iter().cloned());
        let hits = filter.scan(&full_text.join(" "));
        if !hits.is_empty() {
            return Err(ValidationError::ForbiddenContent { terms: hits }.into());
        }

        Ok(Self {
            kind,
            title,
            description,
            tags,
            media,
            music: request.music.clone(),
        })
    }
}

/// 去空白、去掉前导 `#`、按首次出现去重
pub fn normalize_tags(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|t| t.trim().trim_start_matches('#').trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// 从标题提取话题：按空白和逗号切分，保留至少两个字的片段，最多三个
pub fn auto_tags(title: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    if let Ok(re) = Regex::new(r"[\s,，、]+") {
        tags = re
            .split(title)
            .filter(|w| w.chars().count() >= 2)
            .take(MAX_AUTO_TAGS)
            .map(str::to_string)
            .collect();
    }
    if tags.is_empty() {
        tags = DEFAULT_AUTO_TAGS.iter().map(|t| t.to_string()).collect();
    }
    tags
}

/// 正文加话题的总长度
fn content_length(description: &str, tags: &[String]) -> usize {
    let tags_text = tags
        .iter()
        .map(|t| TagFormat::Hash.apply(t))
        .collect::<Vec<_>>()
        .join(" ");
    match (description.is_empty(), tags_text.is_empty()) {
        (true, _) => tags_text.chars().count(),
        (false, true) => description.chars().count(),
        (false, false) => description.chars().count() + 1 + tags_text.chars().count(),
    }
}

fn resolve_media(request: &PublishRequest, kind: MediaKind) -> Result<Vec<PathBuf>, ValidationError> {
    let paths: Vec<&PathBuf> = match kind {
        MediaKind::Video => request.video_path.iter().collect(),
        MediaKind::Images => request.image_paths.iter().collect(),
    };
    paths
        .into_iter()
        .map(|path| {
            let not_found = || ValidationError::MediaNotFound {
                path: path.display().to_string(),
            };
            if !path.is_file() {
                return Err(not_found());
            }
            std::fs::canonicalize(path).map_err(|_| not_found())
        })
        .collect()
}
