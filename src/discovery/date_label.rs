//! 列表页日期文本解析

use chrono::{Duration, NaiveDate};
use tracing::warn;

use crate::models::WorkItem;

/// 日期与来源数之间的分隔符（U+00B7）
pub const SUBTITLE_SEPARATOR: char = '\u{00b7}';

const DATE_FORMATS: [&str; 2] = ["%b %d, %Y", "%B %d, %Y"];

/// 解析列表页显示的创建日期
///
/// 支持 "Today" / "Yesterday"（不区分大小写）以及
/// "Jun 28, 2025" / "June 28, 2025"。无法识别时返回 `None`。
pub fn parse_creation_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let stripped = text.trim();
    if stripped.is_empty() {
        return None;
    }

    match stripped.to_lowercase().as_str() {
        "today" => return Some(today),
        "yesterday" => return Some(today - Duration::days(1)),
        _ => {}
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(stripped, format) {
            return Some(date);
        }
    }

    warn!("⚠️ 无法解析创建日期: {:?}", text);
    None
}

/// 从副标题（如 "Feb 26, 2026·1 source"）中取出日期部分
pub fn date_label_from_subtitle(subtitle: &str) -> &str {
    subtitle
        .split(SUBTITLE_SEPARATOR)
        .next()
        .unwrap_or_default()
        .trim()
}

/// 只保留创建日期等于 `target` 的工作项，保持原有顺序
pub fn filter_for_date(items: Vec<WorkItem>, target: NaiveDate) -> Vec<WorkItem> {
    items
        .into_iter()
        .filter(|item| item.created_on == target)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemLocator;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    #[test]
    fn test_relative_words() {
        assert_eq!(parse_creation_date("Today", today()), Some(today()));
        assert_eq!(parse_creation_date("  TODAY ", today()), Some(today()));
        assert_eq!(
            parse_creation_date("yesterday", today()),
            NaiveDate::from_ymd_opt(2025, 6, 30)
        );
    }

    #[test]
    fn test_calendar_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 28);
        assert_eq!(parse_creation_date("Jun 28, 2025", today()), expected);
        assert_eq!(parse_creation_date("June 28, 2025", today()), expected);
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_creation_date("", today()), None);
        assert_eq!(parse_creation_date("   ", today()), None);
        assert_eq!(parse_creation_date("last week", today()), None);
        assert_eq!(parse_creation_date("2025-06-28", today()), None);
        assert_eq!(parse_creation_date("Foo 28, 2025", today()), None);
    }

    #[test]
    fn test_date_label_from_subtitle() {
        assert_eq!(date_label_from_subtitle("Feb 26, 2026·1 source"), "Feb 26, 2026");
        assert_eq!(date_label_from_subtitle(" Today · 3 sources"), "Today");
        assert_eq!(date_label_from_subtitle(""), "");
    }

    #[test]
    fn test_filter_for_date_keeps_order() {
        let other = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let make = |title: &str, date| {
            WorkItem::new(title, date, ItemLocator::TextMatch(title.to_string()))
        };
        let items = vec![
            make("c", today()),
            make("x", other),
            make("a", today()),
            make("b", today()),
        ];

        let filtered = filter_for_date(items, today());
        let titles: Vec<_> = filtered.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
        assert!(filter_for_date(Vec::new(), today()).is_empty());
    }
}
