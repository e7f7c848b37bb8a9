//! 文档处理：拆分与清理

pub mod cleaner;
pub mod splitter;

pub use cleaner::{clean_junk_chapters, is_junk_chapter, CleanReport};
pub use splitter::{existing_split_outputs, plan_segments, split_document, Boundary, SplitPart, SplitSegment};
