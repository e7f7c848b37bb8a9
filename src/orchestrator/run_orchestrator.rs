//! 单次运行编排 - 编排层
//!
//! ## 职责
//!
//! 1. **会话管理**：启动会话，结束时无条件关闭（包括内部 panic）
//! 2. **认证**：失败即记录一条错误并结束本次运行
//! 3. **发现**：首页列表 + 下载目录文件分组 + 预处理得到的章节
//! 4. **逐个处理**：按发现顺序串行调用 `ItemFlow`
//!
//! 本层从不向调用方返回错误，所有结果都在 `RunSummary` 里。

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::discovery::{discover_live_items, find_documents_aged, group_by_topic};
use crate::models::{RunSummary, WorkItem};
use crate::orchestrator::entitlement_pipeline::ChapterSource;
use crate::services::{NotebookDriver, SessionLauncher};
use crate::workflow::{ItemCtx, ItemFlow};

/// 单次运行的输入
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// 只处理创建于该日期的笔记本
    pub target_date: NaiveDate,
    pub today: NaiveDate,
    /// 本次运行的输出目录
    pub output_dir: PathBuf,
    /// 是否抓取首页列表
    pub discover_live: bool,
    /// 扫描近期文件的目录，`None` 表示不扫描
    pub downloads_dir: Option<PathBuf>,
    /// 比这更新的下载文件不参与扫描
    pub downloads_min_age: Duration,
    /// 预处理流水线产出的章节
    pub chapters: Vec<ChapterSource>,
}

impl RunRequest {
    pub fn new(target_date: NaiveDate, today: NaiveDate, output_dir: PathBuf) -> Self {
        Self {
            target_date,
            today,
            output_dir,
            discover_live: true,
            downloads_dir: None,
            downloads_min_age: Duration::ZERO,
            chapters: Vec::new(),
        }
    }

    pub fn with_downloads_dir(mut self, dir: PathBuf) -> Self {
        self.downloads_dir = Some(dir);
        self
    }

    pub fn with_chapters(mut self, chapters: Vec<ChapterSource>) -> Self {
        self.chapters = chapters;
        self
    }

    pub fn without_live_discovery(mut self) -> Self {
        self.discover_live = false;
        self
    }

    /// 电子书流水线的运行方式
    ///
    /// 只处理章节，不抓取首页列表。下载目录只扫描前一个时间窗口
    /// `[window, 2 * window)`，避开刚领取的整本书；`from_existing` 时不扫描。
    pub fn for_pipeline(
        mut self,
        chapters: Vec<ChapterSource>,
        from_existing: bool,
        window: Duration,
    ) -> Self {
        if from_existing {
            self.downloads_dir = None;
        }
        self.downloads_min_age = window;
        self.with_chapters(chapters).without_live_discovery()
    }
}

/// 运行编排器
pub struct RunOrchestrator<L: SessionLauncher> {
    launcher: L,
    flow: ItemFlow,
    config: Config,
}

impl<L: SessionLauncher> RunOrchestrator<L> {
    pub fn new(launcher: L, flow: ItemFlow, config: Config) -> Self {
        Self {
            launcher,
            flow,
            config,
        }
    }

    /// 执行一次完整运行
    pub async fn run(&self, request: &RunRequest) -> RunSummary {
        let mut summary = RunSummary::new();

        let driver = match self.launcher.launch().await {
            Ok(driver) => driver,
            Err(e) => {
                error!("❌ 无法启动浏览器会话: {:#}", e);
                summary.record_error(format!("启动会话失败: {}", e));
                return summary;
            }
        };

        let outcome = AssertUnwindSafe(self.drive(&driver, request, &mut summary))
            .catch_unwind()
            .await;
        if outcome.is_err() {
            error!("❌ 运行过程中发生内部错误，提前结束");
            summary.record_error("运行过程中发生内部错误");
        }

        if let Err(e) = driver.close().await {
            warn!("⚠️ 关闭会话失败: {}", e);
        }
        summary
    }

    async fn drive<D: NotebookDriver + ?Sized>(
        &self,
        driver: &D,
        request: &RunRequest,
        summary: &mut RunSummary,
    ) {
        match driver.authenticate().await {
            Ok(true) => {}
            Ok(false) => {
                error!("❌ 认证失败，结束本次运行");
                summary.record_error("认证失败: 未完成登录");
                return;
            }
            Err(e) => {
                error!("❌ 认证失败: {:#}", e);
                summary.record_error(format!("认证失败: {}", e));
                return;
            }
        }

        let mut items = Vec::new();
        if request.discover_live {
            match discover_live_items(driver, request.target_date, request.today).await {
                Ok(found) => items.extend(found),
                Err(e) => {
                    error!("❌ 抓取笔记本列表失败: {:#}", e);
                    summary.record_error(format!("抓取笔记本列表失败: {}", e));
                }
            }
        }

        if let Some(dir) = &request.downloads_dir {
            items.extend(
                self.items_from_recent_files(
                    driver,
                    dir,
                    request.downloads_min_age,
                    request.today,
                    summary,
                )
                .await,
            );
        }

        if !request.chapters.is_empty() {
            items.extend(
                self.items_from_chapters(driver, &request.chapters, request.today, summary)
                    .await,
            );
        }

        if items.is_empty() {
            info!("📭 没有需要处理的笔记本");
            return;
        }

        let total = items.len();
        info!("{}", "=".repeat(60));
        info!("📋 共 {} 个笔记本待处理", total);
        info!("{}", "=".repeat(60));

        for (i, item) in items.iter().enumerate() {
            let ctx = ItemCtx::new(i + 1, total, request.output_dir.join(item.safe_name()));
            self.flow.process(driver, item, &ctx, summary).await;
        }
    }

    /// 近期下载的文件按主题分组，每组新建一个笔记本
    async fn items_from_recent_files<D: NotebookDriver + ?Sized>(
        &self,
        driver: &D,
        dir: &std::path::Path,
        min_age: Duration,
        today: NaiveDate,
        summary: &mut RunSummary,
    ) -> Vec<WorkItem> {
        let window = self.config.recent_window();
        let files = match find_documents_aged(
            dir,
            min_age,
            min_age + window,
            &self.config.document_extensions,
        )
        .await
        {
            Ok(files) => files,
            Err(e) => {
                error!("❌ 扫描近期文件失败: {:#}", e);
                summary.record_error(format!("扫描近期文件失败: {}", e));
                return Vec::new();
            }
        };
        if files.is_empty() {
            info!("📂 {} 中没有近期文件", dir.display());
            return Vec::new();
        }

        let groups = group_by_topic(&files);
        info!("📂 近期文件 {} 个 → {} 组", files.len(), groups.len());

        let mut items = Vec::new();
        for group in groups {
            info!("  主题 '{}': {} 个文件", group.topic, group.len());
            match driver.create_item(&group.topic, &group.paths, today).await {
                Ok(item) => {
                    summary.items_from_files += 1;
                    items.push(item);
                }
                Err(e) => {
                    error!("❌ 为主题 '{}' 新建笔记本失败: {:#}", group.topic, e);
                    summary.record_error(format!("新建笔记本失败 '{}': {}", group.topic, e));
                }
            }
        }
        items
    }

    async fn items_from_chapters<D: NotebookDriver + ?Sized>(
        &self,
        driver: &D,
        chapters: &[ChapterSource],
        today: NaiveDate,
        summary: &mut RunSummary,
    ) -> Vec<WorkItem> {
        info!("📚 为 {} 个章节新建笔记本", chapters.len());
        let mut items = Vec::new();
        for chapter in chapters {
            let sources = [chapter.path.clone()];
            match driver.create_item(&chapter.title, &sources, today).await {
                Ok(item) => {
                    summary.items_from_files += 1;
                    items.push(item);
                }
                Err(e) => {
                    error!("❌ 为章节 '{}' 新建笔记本失败: {:#}", chapter.title, e);
                    summary.record_error(format!("新建笔记本失败 '{}': {}", chapter.title, e));
                }
            }
        }
        items
    }
}
