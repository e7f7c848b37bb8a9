//! PDF 拆分
//!
//! 优先按书签的顶层条目切分章节，没有可用书签时按固定页数切块。
//!
//! 输出结构：
//! ```text
//! packt-books/
//! └── <书名>/
//!     ├── <书名>.pdf
//!     ├── Chapter_01_<章节名>.pdf
//!     └── ...
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info, warn};

use crate::error::{AppError, FileError};
use crate::utils::sanitize_label;

/// 书签解析时的最大间接层数
const MAX_RESOLVE_DEPTH: usize = 8;

/// 书签给出的章节起点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub title: String,
    /// 从 1 开始的页码
    pub start_page: u32,
}

impl Boundary {
    pub fn new(title: impl Into<String>, start_page: u32) -> Self {
        Self {
            title: title.into(),
            start_page,
        }
    }
}

/// 计划输出的一个分段，页码从 1 开始且包含两端
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSegment {
    pub seq: usize,
    pub first_page: u32,
    pub last_page: u32,
    pub file_name: String,
}

impl SplitSegment {
    pub fn page_count(&self) -> u32 {
        self.last_page - self.first_page + 1
    }
}

/// 已写出的分段文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPart {
    pub seq: usize,
    pub path: PathBuf,
    pub first_page: u32,
    pub last_page: u32,
}

/// 计算分段
///
/// 有书签时：按起始页去重（保留第一个）、排序，相邻两个起点之间为一章，
/// 最后一章延伸到文末，长度为零的区间直接丢弃。
/// 没有书签时：按 `chunk_pages` 顺序切块。
pub fn plan_segments(boundaries: &[Boundary], total_pages: u32, chunk_pages: u32) -> Vec<SplitSegment> {
    let boundaries = dedupe_by_page(boundaries);
    if boundaries.is_empty() {
        return plan_chunks(total_pages, chunk_pages);
    }

    let mut segments = Vec::new();
    for (idx, boundary) in boundaries.iter().enumerate() {
        let start = boundary.start_page;
        let end_exclusive = boundaries
            .get(idx + 1)
            .map(|next| next.start_page)
            .unwrap_or(total_pages + 1)
            .min(total_pages + 1);
        if start == 0 || end_exclusive <= start {
            debug!("跳过空章节: {} (第 {} 页)", boundary.title, start);
            continue;
        }
        segments.push(SplitSegment {
            seq: idx + 1,
            first_page: start,
            last_page: end_exclusive - 1,
            file_name: format!(
                "Chapter_{:02}_{}.pdf",
                idx + 1,
                sanitize_label(&boundary.title)
            ),
        });
    }
    segments
}

fn plan_chunks(total_pages: u32, chunk_pages: u32) -> Vec<SplitSegment> {
    let chunk = chunk_pages.max(1);
    (1..=total_pages)
        .step_by(chunk as usize)
        .enumerate()
        .map(|(idx, start)| {
            let end = (start + chunk - 1).min(total_pages);
            SplitSegment {
                seq: idx + 1,
                first_page: start,
                last_page: end,
                file_name: format!("Part_{:02}_pages_{}-{}.pdf", idx + 1, start, end),
            }
        })
        .collect()
}

fn dedupe_by_page(boundaries: &[Boundary]) -> Vec<Boundary> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Boundary> = boundaries
        .iter()
        .filter(|b| seen.insert(b.start_page))
        .cloned()
        .collect();
    unique.sort_by_key(|b| b.start_page);
    unique
}

/// 拆分一本书到 `books_dir/<清洗后的书名>/`
///
/// 原文件以清洗后的书名复制一份（已存在则跳过）。
/// 书签解析失败时退回固定页数切块。
pub fn split_document(
    source: &Path,
    label: &str,
    books_dir: &Path,
    chunk_pages: u32,
) -> Result<Vec<SplitPart>> {
    if !source.is_file() {
        return Err(FileError::NotFound {
            path: source.display().to_string(),
        }
        .into());
    }

    let safe_label = sanitize_label(label);
    let book_dir = books_dir.join(&safe_label);
    fs::create_dir_all(&book_dir)
        .with_context(|| format!("无法创建书籍目录: {}", book_dir.display()))?;

    let original_copy = book_dir.join(format!("{safe_label}.pdf"));
    if !original_copy.exists() {
        fs::copy(source, &original_copy)
            .with_context(|| format!("无法复制原始 PDF: {}", source.display()))?;
        info!("📄 已复制原始 PDF → {}", original_copy.display());
    }

    let doc = Document::load(source)
        .map_err(AppError::Pdf)
        .with_context(|| format!("无法读取 PDF: {}", source.display()))?;
    let total_pages = doc.get_pages().len() as u32;
    info!("✂️ 正在拆分 '{}' ({} 页)", label, total_pages);

    let boundaries = match outline_boundaries(&doc) {
        Ok(boundaries) => boundaries,
        Err(e) => {
            warn!("⚠️ 书签解析失败，改为按页切块: {:#}", e);
            Vec::new()
        }
    };
    if boundaries.is_empty() {
        info!("未找到书签，按每 {} 页切块", chunk_pages);
    } else {
        info!("使用书签: 找到 {} 个章节", boundaries.len());
    }

    let mut parts = Vec::new();
    for segment in plan_segments(&boundaries, total_pages, chunk_pages) {
        let path = book_dir.join(&segment.file_name);
        write_segment(&doc, segment.first_page, segment.last_page, &path)?;
        info!(
            "  已写出: {} ({} 页)",
            segment.file_name,
            segment.page_count()
        );
        parts.push(SplitPart {
            seq: segment.seq,
            path,
            first_page: segment.first_page,
            last_page: segment.last_page,
        });
    }

    info!("✅ 拆分完成: '{}' 共 {} 个分段", label, parts.len());
    Ok(parts)
}

/// 列出目录中已有的分段文件（`Chapter_*.pdf` 在前，`Part_*.pdf` 在后）
pub fn existing_split_outputs(book_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(book_dir) else {
        return Vec::new();
    };

    let mut chapters = Vec::new();
    let mut parts = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.to_lowercase().ends_with(".pdf") {
            continue;
        }
        if name.starts_with("Chapter_") {
            chapters.push(path);
        } else if name.starts_with("Part_") {
            parts.push(path);
        }
    }
    chapters.sort();
    parts.sort();
    chapters.extend(parts);
    chapters
}

/// 写出 `[first, last]` 页
///
/// 写出前断开书签和链接目标，源文件中损坏的命名目标不会影响写出。
fn write_segment(doc: &Document, first: u32, last: u32, out_path: &Path) -> Result<()> {
    let mut part = doc.clone();
    let outside: Vec<u32> = part
        .get_pages()
        .keys()
        .copied()
        .filter(|page| *page < first || *page > last)
        .collect();
    part.delete_pages(&outside);
    detach_links(&mut part)?;
    part.prune_objects();
    part.save(out_path)
        .with_context(|| format!("无法写出分段: {}", out_path.display()))?;
    Ok(())
}

fn detach_links(doc: &mut Document) -> Result<()> {
    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    if let Ok(catalog) = doc.get_object_mut(root_id).and_then(|o| o.as_dict_mut()) {
        catalog.remove(b"Outlines");
        catalog.remove(b"Dests");
        catalog.remove(b"OpenAction");
        if let Ok(Object::Dictionary(names)) = catalog.get_mut(b"Names") {
            names.remove(b"Dests");
        }
    }

    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    for page_id in page_ids {
        let kept: Vec<Object> = match doc.get_dictionary(page_id).and_then(|page| page.get(b"Annots")) {
            Ok(annots) => match resolve(doc, annots) {
                Some(Object::Array(annots)) => annots
                    .iter()
                    .filter(|annot| !is_link_annotation(doc, annot))
                    .cloned()
                    .collect(),
                _ => Vec::new(),
            },
            Err(_) => continue,
        };

        if let Ok(page) = doc.get_object_mut(page_id).and_then(|o| o.as_dict_mut()) {
            if kept.is_empty() {
                page.remove(b"Annots");
            } else {
                page.set("Annots", kept);
            }
        }
    }
    Ok(())
}

fn is_link_annotation(doc: &Document, annot: &Object) -> bool {
    match resolve(doc, annot) {
        Some(Object::Dictionary(dict)) => {
            matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Link")
        }
        _ => false,
    }
}

/// 读取书签顶层条目，按页码去重
pub fn outline_boundaries(doc: &Document) -> Result<Vec<Boundary>> {
    let page_numbers: HashMap<ObjectId, u32> = doc
        .get_pages()
        .into_iter()
        .map(|(number, id)| (id, number))
        .collect();

    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    let catalog = doc.get_dictionary(root_id)?;
    let outlines = match catalog.get(b"Outlines").ok().and_then(|o| resolve(doc, o)) {
        Some(Object::Dictionary(dict)) => dict,
        _ => return Ok(Vec::new()),
    };

    let mut boundaries = Vec::new();
    let mut visited = HashSet::new();
    let mut next = outlines.get(b"First").and_then(Object::as_reference).ok();

    while let Some(id) = next {
        if !visited.insert(id) {
            warn!("⚠️ 书签链表存在循环，停止解析");
            break;
        }
        let entry = doc.get_dictionary(id)?;
        next = entry.get(b"Next").and_then(Object::as_reference).ok();

        let title = match entry.get(b"Title").ok().and_then(|t| resolve(doc, t)) {
            Some(Object::String(bytes, _)) => decode_text(bytes),
            _ => String::new(),
        };
        let title = title.trim();
        if title.is_empty() {
            continue;
        }

        match entry_page(doc, entry, &page_numbers) {
            Some(page) => boundaries.push(Boundary::new(title, page)),
            None => debug!("书签 '{}' 没有可解析的目标页", title),
        }
    }

    let mut seen = HashSet::new();
    boundaries.retain(|b| seen.insert(b.start_page));
    Ok(boundaries)
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_RESOLVE_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

fn entry_page(
    doc: &Document,
    entry: &lopdf::Dictionary,
    pages: &HashMap<ObjectId, u32>,
) -> Option<u32> {
    if let Ok(dest) = entry.get(b"Dest") {
        return destination_page(doc, dest, pages, 0);
    }
    match entry.get(b"A").ok().and_then(|a| resolve(doc, a)) {
        Some(Object::Dictionary(action)) => {
            let is_goto = matches!(action.get(b"S"), Ok(Object::Name(s)) if s == b"GoTo");
            if !is_goto {
                return None;
            }
            destination_page(doc, action.get(b"D").ok()?, pages, 0)
        }
        _ => None,
    }
}

fn destination_page(
    doc: &Document,
    dest: &Object,
    pages: &HashMap<ObjectId, u32>,
    depth: usize,
) -> Option<u32> {
    if depth > MAX_RESOLVE_DEPTH {
        return None;
    }
    match resolve(doc, dest)? {
        Object::Array(items) => match items.first()? {
            Object::Reference(id) => pages.get(id).copied(),
            Object::Integer(n) => u32::try_from(*n).ok().map(|n| n + 1),
            _ => None,
        },
        Object::Dictionary(dict) => destination_page(doc, dict.get(b"D").ok()?, pages, depth + 1),
        Object::Name(name) | Object::String(name, _) => {
            let target = named_destination(doc, name)?;
            destination_page(doc, target, pages, depth + 1)
        }
        _ => None,
    }
}

fn named_destination<'a>(doc: &'a Document, name: &[u8]) -> Option<&'a Object> {
    let root_id = doc.trailer.get(b"Root").ok()?.as_reference().ok()?;
    let catalog = doc.get_dictionary(root_id).ok()?;

    if let Some(Object::Dictionary(dests)) = catalog.get(b"Dests").ok().and_then(|d| resolve(doc, d)) {
        if let Ok(found) = dests.get(name) {
            return Some(found);
        }
    }

    let names = match catalog.get(b"Names").ok().and_then(|n| resolve(doc, n)) {
        Some(Object::Dictionary(names)) => names,
        _ => return None,
    };
    let tree = names.get(b"Dests").ok()?;
    search_name_tree(doc, tree, name, 0)
}

fn search_name_tree<'a>(doc: &'a Document, node: &'a Object, name: &[u8], depth: usize) -> Option<&'a Object> {
    if depth > MAX_RESOLVE_DEPTH {
        return None;
    }
    let Some(Object::Dictionary(node)) = resolve(doc, node) else {
        return None;
    };

    if let Ok(Object::Array(pairs)) = node.get(b"Names") {
        for pair in pairs.chunks(2) {
            if let [Object::String(key, _), value] = pair {
                if key.as_slice() == name {
                    return Some(value);
                }
            }
        }
    }

    if let Some(Object::Array(kids)) = node.get(b"Kids").ok().and_then(|k| resolve(doc, k)) {
        for kid in kids {
            if let Some(found) = search_name_tree(doc, kid, name, depth + 1) {
                return Some(found);
            }
        }
    }
    None
}

/// 解码 PDF 文本字符串：带 BOM 的 UTF-16BE，否则按单字节编码
fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
