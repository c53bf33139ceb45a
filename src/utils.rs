use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressIterator, ProgressStyle};
use log::info;
use regex::Regex;
use walkdir::WalkDir;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({per_sec}, {eta}) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-")
}

/// 由逗号分隔的后缀列表构造正则，整段匹配扩展名，默认区分大小写
pub fn suffix_regex(suffix: &str, ignore_case: bool) -> Result<Regex> {
    let alternatives = suffix
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| regex::escape(s.trim_start_matches('.')))
        .collect::<Vec<_>>();
    anyhow::ensure!(!alternatives.is_empty(), "后缀列表为空");
    let flags = if ignore_case { "(?i)" } else { "" };
    let re = format!("{}^({})$", flags, alternatives.join("|"));
    Regex::new(&re).with_context(|| format!("无法构造后缀正则: {}", re))
}

/// 递归扫描目录，返回扩展名匹配的文件，顺序取决于文件系统
pub fn scan_images(path: impl AsRef<Path>, regex_suf: &Regex) -> Vec<PathBuf> {
    let path = path.as_ref();
    info!("开始扫描目录: {}", path.display());
    let pb = ProgressBar::no_length().with_style(pb_style());
    let entries = WalkDir::new(path)
        .into_iter()
        .progress_with(pb)
        .filter_map(|entry| {
            entry.ok().and_then(|entry| {
                let path = entry.path();
                if path.is_file() {
                    if let Some(ext) = path.extension() {
                        if regex_suf.is_match(&ext.to_string_lossy()) {
                            return Some(path.to_path_buf());
                        }
                    }
                }
                None
            })
        })
        .collect::<Vec<_>>();
    info!("扫描完成，共 {} 张图片", entries.len());
    entries
}
