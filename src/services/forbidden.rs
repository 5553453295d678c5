//! 违禁词检查 - 业务能力层
//!
//! 进程启动时加载一次词库，之后只做纯函数式的匹配

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

/// 违禁词过滤器
#[derive(Debug, Clone, Default)]
pub struct ForbiddenFilter {
    /// (原词, 小写形式)，保持首次出现的顺序
    words: Vec<(String, String)>,
}

impl ForbiddenFilter {
    /// 从词库路径加载
    ///
    /// 路径是文件时直接读取；是目录时递归读取所有 `.txt` 文件。
    /// 路径不存在时返回空过滤器。
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            warn!("⚠️ 违禁词词库不存在: {}，跳过违禁词检查", path.display());
            return Self::default();
        }

        let mut files = Vec::new();
        if path.is_dir() {
            collect_txt_files(path, &mut files);
            files.sort();
        } else {
            files.push(path.to_path_buf());
        }

        let mut lines = Vec::new();
        for file in &files {
            match std::fs::read_to_string(file) {
                Ok(content) => lines.extend(content.lines().map(str::to_string)),
                Err(e) => warn!("⚠️ 读取词库 {} 失败: {}", file.display(), e),
            }
        }

        let filter = Self::from_words(lines);
        info!(
            "✓ 违禁词词库已加载: {} 个文件, {} 个词",
            files.len(),
            filter.len()
        );
        filter
    }

    /// 从词列表构造（去空白、去空行、去重）
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let words = words
            .into_iter()
            .filter_map(|w| {
                let word = w.as_ref().trim();
                if word.is_empty() {
                    return None;
                }
                let lower = word.to_lowercase();
                seen.insert(lower.clone())
                    .then(|| (word.to_string(), lower))
            })
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// 检查文本，返回命中的违禁词（不区分大小写，已去重）
    pub fn scan(&self, text: &str) -> Vec<String> {
        if text.is_empty() || self.words.is_empty() {
            return Vec::new();
        }
        let haystack = text.to_lowercase();
        let hits: Vec<String> = self
            .words
            .iter()
            .filter(|(_, lower)| haystack.contains(lower.as_str()))
            .map(|(word, _)| word.clone())
            .collect();
        if !hits.is_empty() {
            debug!("命中违禁词: {:?}", hits);
        }
        hits
    }
}

fn collect_txt_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        warn!("⚠️ 无法读取目录: {}", dir.display());
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_txt_files(&path, out);
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
        {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_is_case_insensitive_substring() {
        let filter = ForbiddenFilter::from_words(["Spam", "赌博", "  ", "spam"]);
        assert_eq!(filter.len(), 2);
        assert_eq!(filter.scan("buy SPAMMY stuff"), vec!["Spam".to_string()]);
        assert_eq!(filter.scan("网络赌博平台，赌博"), vec!["赌博".to_string()]);
        assert!(filter.scan("正常的内容").is_empty());
        assert!(filter.scan("").is_empty());
    }

    #[test]
    fn test_load_directory_recursively() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("nested")).unwrap();
        std::fs::write(temp.path().join("a.txt"), "违禁一\n\n  违禁二  \n").unwrap();
        std::fs::write(temp.path().join("nested/b.txt"), "违禁三\n违禁一\n").unwrap();
        std::fs::write(temp.path().join("nested/ignored.md"), "不应加载\n").unwrap();

        let filter = ForbiddenFilter::load(temp.path());
        assert_eq!(filter.len(), 3);
        assert_eq!(filter.scan("违禁三和违禁二"), vec!["违禁二", "违禁三"]);
        assert!(filter.scan("不应加载").is_empty());
    }

    #[test]
    fn test_load_directory_matches_upper_case_extension() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("WORDS.TXT"), "违禁四\n").unwrap();
        std::fs::write(temp.path().join("extra.Txt"), "违禁五\n").unwrap();

        let filter = ForbiddenFilter::load(temp.path());
        assert_eq!(filter.len(), 2);
        assert_eq!(filter.scan("违禁四"), vec!["违禁四"]);
    }

    #[test]
    fn test_load_missing_path_is_empty() {
        let filter = ForbiddenFilter::load(Path::new("/definitely/not/here"));
        assert!(filter.is_empty());
        assert!(filter.scan("anything").is_empty());
    }

    #[test]
    fn test_load_single_file_any_extension() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("words.list");
        std::fs::write(&file, "badword\n").unwrap();
        assert_eq!(ForbiddenFilter::load(&file).scan("a BadWord here"), vec!["badword"]);
    }
}
