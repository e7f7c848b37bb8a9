//! 数据模型

pub mod file_group;
pub mod stage;
pub mod summary;
pub mod work_item;

pub use file_group::FileGroup;
pub use stage::{StageKind, StageOutcome, StageResult};
pub use summary::RunSummary;
pub use work_item::{ItemLocator, ListEntry, WorkItem};
