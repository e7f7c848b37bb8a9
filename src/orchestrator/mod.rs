//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `run_orchestrator` - 单次运行
//! - 管理会话生命周期（启动、认证、关闭）
//! - 汇集三类工作项：首页列表、近期文件分组、电子书章节
//! - 串行驱动 `ItemFlow`，汇总 `RunSummary`
//!
//! ### `entitlement_pipeline` - 电子书预处理
//! - 领取电子书、按书签拆分、清理无用章节
//! - 产出 `ChapterSource` 交给 `run_orchestrator`
//!
//! ## 层次关系
//!
//! ```text
//! entitlement_pipeline (领取 / 拆分)
//!     ↓ Vec<ChapterSource>
//! run_orchestrator (处理 Vec<WorkItem>)
//!     ↓
//! workflow::ItemFlow (处理单个 WorkItem)
//!     ↓
//! services (能力层：NotebookDriver / Transcoder / EntitlementClaimer)
//!     ↓
//! infrastructure (基础设施：JsExecutor)
//! ```

pub mod entitlement_pipeline;
pub mod run_orchestrator;

pub use entitlement_pipeline::{
    chapter_sources, chapter_title, clean_books, collect_downloaded, collect_existing_chapters,
    split_remaining, ChapterSource, EntitlementPipeline, PipelineOptions,
};
pub use run_orchestrator::{RunOrchestrator, RunRequest};
