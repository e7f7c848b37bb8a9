//! 清理无用章节（封面、版权页、目录等）

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{info, warn};

use crate::documents::splitter::existing_split_outputs;

/// 按文件名（不区分大小写）识别的无用章节
static JUNK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"cover",
        r"title[_\s-]*page",
        r"copy[_\s-]*right",
        r"credits",
        r"preface",
        r"foreword",
        r"acknowledge?ment",
        r"table[_\s-]*of[_\s-]*contents",
        r"\btoc\b",
        r"who[_\s-]*is[_\s-]*this[_\s-]*book[_\s-]*for",
        r"about[_\s-]*the[_\s-]*author",
        r"about[_\s-]*the[_\s-]*reviewer",
        r"contributors",
        r"join[_\s-]*our[_\s-]*discord",
        r"join[_\s-]*our[_\s-]*community",
        r"other[_\s-]*books[_\s-]*you[_\s-]*may[_\s-]*enjoy",
        r"packt[_\s-]*page",
        r"dedication",
        r"index$",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("invalid junk pattern"))
    .collect()
});

/// 清理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: usize,
    pub kept: usize,
}

pub fn is_junk_chapter(path: &Path) -> bool {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    JUNK_PATTERNS.iter().any(|p| p.is_match(&stem))
}

/// 删除 `books_dir` 下每本书中的无用章节文件
pub fn clean_junk_chapters(books_dir: &Path) -> Result<CleanReport> {
    info!("🧹 清理无用章节: {}", books_dir.display());
    let mut report = CleanReport::default();

    let mut book_dirs: Vec<_> = fs::read_dir(books_dir)
        .with_context(|| format!("无法读取书籍目录: {}", books_dir.display()))?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    book_dirs.sort();

    for book_dir in book_dirs {
        let book_name = book_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        for chapter in existing_split_outputs(&book_dir) {
            if !is_junk_chapter(&chapter) {
                report.kept += 1;
                continue;
            }
            match fs::remove_file(&chapter) {
                Ok(()) => {
                    info!(
                        "  删除 {} / {}",
                        book_name,
                        chapter.file_name().unwrap_or_default().to_string_lossy()
                    );
                    report.removed += 1;
                }
                Err(e) => warn!("⚠️ 无法删除 {}: {}", chapter.display(), e),
            }
        }
    }

    info!(
        "✅ 清理完成: 删除 {} 个，保留 {} 个章节文件",
        report.removed, report.kept
    );
    Ok(report)
}
