//! 工作项（笔记本）模型

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::{sanitize_filename, sanitize::UNTITLED};

/// 定位一个工作项的方式，只有页面驱动认识它的含义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemLocator {
    /// 直接地址
    Url(String),
    /// 列表中的位置
    ListPosition { selector: String, index: usize },
    /// 按标题文本匹配
    TextMatch(String),
}

/// 一个待处理的工作项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// 显示标题，永不为空
    pub title: String,
    /// 创建日期
    pub created_on: NaiveDate,
    pub locator: ItemLocator,
    /// 由文件创建时的源文件
    pub sources: Vec<PathBuf>,
}

impl WorkItem {
    /// 创建工作项，空标题回退为 `untitled`
    pub fn new(title: impl Into<String>, created_on: NaiveDate, locator: ItemLocator) -> Self {
        let title = title.into();
        let title = if title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            title.trim().to_string()
        };
        Self {
            title,
            created_on,
            locator,
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = sources;
        self
    }

    /// 用于输出目录的安全名称
    pub fn safe_name(&self) -> String {
        sanitize_filename(&self.title)
    }
}

/// 列表页抓取到的原始条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub title: String,
    /// 原始日期文本，如 "Today" / "Jun 28, 2025"
    pub date_label: String,
    pub locator: ItemLocator,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 28).unwrap()
    }

    #[test]
    fn test_empty_title_falls_back() {
        let item = WorkItem::new("   ", date(), ItemLocator::TextMatch(String::new()));
        assert_eq!(item.title, "untitled");
        assert_eq!(item.safe_name(), "untitled");
    }

    #[test]
    fn test_safe_name() {
        let item = WorkItem::new(
            "Report: A",
            date(),
            ItemLocator::Url("https://example.com/notebook/1".to_string()),
        );
        assert_eq!(item.title, "Report: A");
        assert_eq!(item.safe_name(), "Report_A");
    }
}
