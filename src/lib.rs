//! # Notebook Autopilot
//!
//! NotebookLM 批处理：为笔记本生成报告和音频概览，导出到文档并转码音频
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 和元素定位原语
//! - `DownloadWatcher` - 浏览器下载目录监视
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `NotebookDriver` - 页面能力接口，`NotebookLmPage` 为其 chromiumoxide 实现
//! - `Transcoder` - 音频转码能力（ffmpeg）
//! - `EntitlementClaimer` - 电子书领取能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个笔记本"的完整处理流程
//! - `ItemCtx` - 上下文封装（序号 + 输出目录）
//! - `ItemFlow` - 流程编排（报告 → 导出 → 音频 → 文稿 → 转码）
//! - `poll_until` - 有界轮询
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/run_orchestrator` - 单次运行，管理会话并串行处理全部笔记本
//! - `orchestrator/entitlement_pipeline` - 电子书领取与拆分
//!
//! 纯逻辑模块：`discovery`（发现与分组）、`documents`（PDF 拆分与清理）、
//! `models`、`utils`
//!
//! ## 模块结构

pub mod app;
pub mod browser;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod documents;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{RunSummary, StageResult, WorkItem};
pub use orchestrator::{RunOrchestrator, RunRequest};
pub use services::{NotebookDriver, SessionLauncher, Transcoder};
pub use workflow::{ItemCtx, ItemFlow};
