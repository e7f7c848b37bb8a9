//! 从首页列表发现笔记本

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::discovery::date_label::{filter_for_date, parse_creation_date};
use crate::models::{ListEntry, WorkItem};
use crate::services::NotebookDriver;

/// 把列表条目转换为工作项
///
/// 标题为空或日期无法解析的条目记录警告后跳过。
pub fn items_from_entries(entries: Vec<ListEntry>, today: NaiveDate) -> Vec<WorkItem> {
    let mut items = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.into_iter().enumerate() {
        let title = entry.title.trim();
        if title.is_empty() {
            warn!("⚠️ 跳过第 {} 个条目: 没有标题", idx + 1);
            continue;
        }
        match parse_creation_date(&entry.date_label, today) {
            Some(date) => items.push(WorkItem::new(title, date, entry.locator)),
            None => warn!(
                "⚠️ 跳过笔记本 '{}': 无法解析日期 {:?}",
                title, entry.date_label
            ),
        }
    }
    items
}

/// 抓取列表并筛选出创建于 `target` 的笔记本
pub async fn discover_live_items<D: NotebookDriver + ?Sized>(
    driver: &D,
    target: NaiveDate,
    today: NaiveDate,
) -> Result<Vec<WorkItem>> {
    let entries = driver.scrape_item_list().await?;
    let items = items_from_entries(entries, today);
    info!("🔍 共发现 {} 个笔记本", items.len());

    let matched = filter_for_date(items, target);
    if matched.is_empty() {
        info!("没有创建于 {} 的笔记本", target);
    } else {
        let titles: Vec<&str> = matched.iter().map(|i| i.title.as_str()).collect();
        info!(
            "📅 找到 {} 个创建于 {} 的笔记本: {}",
            matched.len(),
            target,
            titles.join(", ")
        );
    }
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemLocator;

    fn entry(title: &str, date_label: &str, index: usize) -> ListEntry {
        ListEntry {
            title: title.to_string(),
            date_label: date_label.to_string(),
            locator: ItemLocator::ListPosition {
                selector: "mat-card".to_string(),
                index,
            },
        }
    }

    #[test]
    fn test_items_from_entries_skips_bad_rows() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 28).unwrap();
        let items = items_from_entries(
            vec![
                entry("Rust", "Today", 0),
                entry("  ", "Today", 1),
                entry("Go", "sometime", 2),
                entry("Zig", "Jun 27, 2025", 3),
            ],
            today,
        );

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Rust");
        assert_eq!(items[0].created_on, today);
        assert_eq!(items[1].created_on, NaiveDate::from_ymd_opt(2025, 6, 27).unwrap());
        assert_eq!(
            items[1].locator,
            ItemLocator::ListPosition {
                selector: "mat-card".to_string(),
                index: 3
            }
        );
    }
}
