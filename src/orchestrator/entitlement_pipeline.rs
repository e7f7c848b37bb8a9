//! 电子书预处理流水线
//!
//! 领取 → 拆分 → 收集章节文件。每个章节文件之后会成为一个笔记本。

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{error, info, warn};

use crate::documents::{clean_junk_chapters, existing_split_outputs, split_document};
use crate::services::{ClaimedTitle, EntitlementClaimer};
use crate::utils::{sanitize_label, title_case};

/// 一个待建笔记本的章节文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSource {
    /// 笔记本标题，形如 "<书名> — <章节名>"
    pub title: String,
    pub path: PathBuf,
}

/// 一本书及其分段文件
pub type BookChapters = (String, Vec<PathBuf>);

/// 流水线选项
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// 不领取，直接使用下载目录中已有的 PDF
    pub skip_claim: bool,
    /// 不拆分，直接使用书籍目录中已有的分段
    pub skip_split: bool,
    /// 跳过领取和拆分，读取书籍目录下每个子目录的分段
    pub from_existing: bool,
    /// 拆分后删除无用章节
    pub clean_junk: bool,
    pub titles: Vec<String>,
    pub invoice: PathBuf,
    pub downloads_dir: PathBuf,
    pub books_dir: PathBuf,
    pub chunk_pages: u32,
}

pub struct EntitlementPipeline<C: EntitlementClaimer> {
    claimer: C,
    options: PipelineOptions,
}

impl<C: EntitlementClaimer> EntitlementPipeline<C> {
    pub fn new(claimer: C, options: PipelineOptions) -> Self {
        Self { claimer, options }
    }

    /// 运行流水线，返回全部章节（按书、按章节顺序）
    ///
    /// 没有任何可用的书时返回空列表。
    pub async fn prepare(&self) -> Result<Vec<ChapterSource>> {
        let opts = &self.options;
        info!("{}", "=".repeat(60));
        info!("📚 电子书预处理");
        info!("{}", "=".repeat(60));

        if opts.from_existing {
            info!("读取已拆分的章节: {}", opts.books_dir.display());
            let books = collect_existing_chapters(&opts.books_dir);
            return Ok(chapter_sources(books));
        }

        let downloaded = if opts.skip_claim {
            let found = collect_downloaded(&opts.titles, &opts.downloads_dir);
            info!("跳过领取，下载目录中已有 {} 本", found.len());
            found
        } else {
            info!("开始领取 {} 本书", opts.titles.len());
            self.claimer
                .claim_all(&opts.titles, &opts.invoice, &opts.downloads_dir)
                .await?
        };

        if downloaded.is_empty() {
            warn!("⚠️ 没有可用的 PDF");
            return Ok(Vec::new());
        }

        let books = if opts.skip_split {
            info!("跳过拆分，使用已有分段");
            downloaded
                .iter()
                .map(|book| {
                    let book_dir = opts.books_dir.join(sanitize_label(&book.title));
                    (book.title.clone(), existing_split_outputs(&book_dir))
                })
                .collect()
        } else {
            let books = split_remaining(&downloaded, &opts.books_dir, opts.chunk_pages).await;
            if opts.clean_junk {
                clean_books(&opts.books_dir).await;
                books
                    .into_iter()
                    .map(|(title, chapters)| {
                        let kept = chapters.into_iter().filter(|p| p.exists()).collect();
                        (title, kept)
                    })
                    .collect()
            } else {
                books
            }
        };

        Ok(chapter_sources(books))
    }
}

/// 在下载目录中按原书名或清洗后的书名查找已下载的 PDF
pub fn collect_downloaded(titles: &[String], downloads_dir: &Path) -> Vec<ClaimedTitle> {
    titles
        .iter()
        .filter_map(|title| {
            [title.clone(), sanitize_label(title)]
                .into_iter()
                .map(|name| downloads_dir.join(format!("{name}.pdf")))
                .find(|candidate| candidate.is_file())
                .map(|path| ClaimedTitle {
                    title: title.clone(),
                    path,
                })
        })
        .collect()
}

/// 读取 `books_dir` 下每个子目录（一本书）中的分段文件
///
/// 没有分段的目录被跳过，结果按书名排序。
pub fn collect_existing_chapters(books_dir: &Path) -> Vec<BookChapters> {
    let Ok(entries) = std::fs::read_dir(books_dir) else {
        error!("❌ 书籍目录不存在: {}", books_dir.display());
        return Vec::new();
    };

    let mut book_dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    book_dirs.sort();

    let mut books = Vec::new();
    for book_dir in book_dirs {
        let name = book_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let chapters = existing_split_outputs(&book_dir);
        if chapters.is_empty() {
            warn!("⚠️ '{}' 中没有分段文件，跳过", name);
            continue;
        }
        info!("  {} ({} 个分段)", name, chapters.len());
        books.push((name, chapters));
    }

    info!(
        "共 {} 本书，{} 个分段",
        books.len(),
        books.iter().map(|(_, c)| c.len()).sum::<usize>()
    );
    books
}

/// 拆分尚未拆分的书
///
/// 目录里已有分段的书直接复用；单本失败只记录日志，该书没有章节。
pub async fn split_remaining(
    downloaded: &[ClaimedTitle],
    books_dir: &Path,
    chunk_pages: u32,
) -> Vec<BookChapters> {
    let mut books = Vec::new();
    let (mut split_count, mut skip_count) = (0, 0);

    for book in downloaded {
        let book_dir = books_dir.join(sanitize_label(&book.title));
        let existing = existing_split_outputs(&book_dir);
        if !existing.is_empty() {
            info!("已拆分过: {} ({} 个分段)", book.title, existing.len());
            skip_count += 1;
            books.push((book.title.clone(), existing));
            continue;
        }

        let source = book.path.clone();
        let label = book.title.clone();
        let target = books_dir.to_path_buf();
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());
        let result = tokio::task::spawn_blocking(move || {
            tracing::dispatcher::with_default(&dispatch, || {
                split_document(&source, &label, &target, chunk_pages)
            })
        })
        .await;

        let chapters = match result {
            Ok(Ok(parts)) => {
                split_count += 1;
                parts.into_iter().map(|part| part.path).collect()
            }
            Ok(Err(e)) => {
                error!("❌ 拆分 '{}' 失败: {:#}", book.title, e);
                Vec::new()
            }
            Err(e) => {
                error!("❌ 拆分 '{}' 的任务异常退出: {}", book.title, e);
                Vec::new()
            }
        };
        books.push((book.title.clone(), chapters));
    }

    info!("拆分完成: 新拆分 {}，跳过 {}", split_count, skip_count);
    books
}

/// 删除无用章节（封面、版权页等）
pub async fn clean_books(books_dir: &Path) {
    let dir = books_dir.to_path_buf();
    let dispatch = tracing::dispatcher::get_default(|d| d.clone());
    let task = tokio::task::spawn_blocking(move || {
        tracing::dispatcher::with_default(&dispatch, || clean_junk_chapters(&dir))
    });
    match task.await {
        Ok(Ok(report)) => info!(
            "🧹 清理完成: 删除 {}，保留 {}",
            report.removed, report.kept
        ),
        Ok(Err(e)) => warn!("⚠️ 清理失败: {:#}", e),
        Err(e) => warn!("⚠️ 清理任务异常退出: {}", e),
    }
}

/// 章节笔记本标题
pub fn chapter_title(book: &str, chapter: &Path) -> String {
    let stem = chapter
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = title_case(&stem.replace('_', " "));
    format!("{book} — {name}")
}

pub fn chapter_sources(books: Vec<BookChapters>) -> Vec<ChapterSource> {
    books
        .into_iter()
        .flat_map(|(book, chapters)| {
            if chapters.is_empty() {
                warn!("⚠️ '{}' 没有章节，跳过", book);
            }
            chapters.into_iter().map(move |path| ChapterSource {
                title: chapter_title(&book, &path),
                path,
            })
        })
        .collect()
}
