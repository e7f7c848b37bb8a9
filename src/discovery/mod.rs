//! 工作项发现
//!
//! - 首页列表：抓取条目 → 解析日期 → 按目标日期筛选
//! - 下载目录：按修改时间筛选文档 → 按主题分组

pub mod date_label;
pub mod live_items;
pub mod recent_files;
pub mod topic_grouper;

pub use date_label::{date_label_from_subtitle, filter_for_date, parse_creation_date};
pub use live_items::{discover_live_items, items_from_entries};
pub use recent_files::{find_documents_aged, find_recent_documents};
pub use topic_grouper::{group_by_topic, tokenize, topic_from_stem};
