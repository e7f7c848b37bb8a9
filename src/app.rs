//! 应用入口：按子命令组装各层并执行

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use crate::cli::{Command, RunArgs};
use crate::config::Config;
use crate::models::RunSummary;
use crate::orchestrator::{
    clean_books, collect_downloaded, split_remaining, ChapterSource, EntitlementPipeline,
    PipelineOptions, RunOrchestrator, RunRequest,
};
use crate::services::{
    ChromeLauncher, FfmpegTranscoder, NotebookDriver, SessionLauncher, StorefrontClaimer,
};
use crate::utils::logging::{init_console, log_startup};
use crate::utils::{create_output_dir, RunLog};
use crate::workflow::{safe_execute, ItemFlow};

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// 执行子命令
    pub async fn execute(mut self, command: Command) -> Result<()> {
        match command {
            Command::Run(args) => {
                args.apply(&mut self.config);
                self.run(&args, None).await
            }
            Command::Diagnose {
                user_data_dir,
                output_dir,
            } => {
                if let Some(dir) = user_data_dir {
                    self.config.user_data_dir = dir;
                }
                if let Some(dir) = output_dir {
                    self.config.output_root = dir;
                }
                self.diagnose().await
            }
            Command::Pipeline {
                run,
                skip_claim,
                skip_split,
                from_existing,
                books_dir,
                invoice,
            } => {
                run.apply(&mut self.config);
                if let Some(dir) = books_dir {
                    self.config.books_dir = dir;
                }
                let options = PipelineOptions {
                    skip_claim,
                    skip_split,
                    from_existing,
                    clean_junk: true,
                    titles: self.config.storefront.titles.clone(),
                    invoice: invoice
                        .or_else(|| self.config.storefront.invoice_path.clone())
                        .unwrap_or_default(),
                    downloads_dir: self.config.downloads_dir.clone(),
                    books_dir: self.config.books_dir.clone(),
                    chunk_pages: self.config.split_chunk_pages,
                };
                self.run(&run, Some(options)).await
            }
            Command::Split {
                books_dir,
                downloads_dir,
                skip_split,
                skip_clean,
            } => {
                if let Some(dir) = books_dir {
                    self.config.books_dir = dir;
                }
                if let Some(dir) = downloads_dir {
                    self.config.downloads_dir = dir;
                }
                self.split(skip_split, skip_clean).await;
                Ok(())
            }
        }
    }

    /// 完整运行：可选的电子书预处理 + 笔记本批处理
    ///
    /// 条目失败不影响退出码，结果只体现在汇总里。
    async fn run(&self, args: &RunArgs, pipeline: Option<PipelineOptions>) -> Result<()> {
        let config = &self.config;
        let output_dir = create_output_dir(&config.output_root)?;
        let run_log = RunLog::init(&output_dir, config.verbose_logging)?;

        let today = Local::now().date_naive();
        let target_date = args.date.unwrap_or(today);
        log_startup(&output_dir, target_date);

        let mut request = RunRequest::new(target_date, today, output_dir)
            .with_downloads_dir(config.downloads_dir.clone());

        if let Some(options) = pipeline {
            let from_existing = options.from_existing;
            let chapters = self.prepare_chapters(options).await;
            if chapters.is_empty() {
                warn!("⚠️ 没有可处理的章节，流程结束");
                print_summary(&RunSummary::new());
                return Ok(());
            }
            request = request.for_pipeline(chapters, from_existing, config.recent_window());
        }

        let transcoder = Arc::new(FfmpegTranscoder::new(
            config.ffmpeg_program.clone(),
            config.transcode_timeout(),
        ));
        let flow = ItemFlow::new(config, transcoder);
        let orchestrator =
            RunOrchestrator::new(ChromeLauncher::new(config.clone()), flow, config.clone());

        let summary = orchestrator.run(&request).await;
        print_summary(&summary);
        info!("📝 日志文件: {}", run_log.path().display());
        Ok(())
    }

    async fn prepare_chapters(&self, options: PipelineOptions) -> Vec<ChapterSource> {
        let claimer = StorefrontClaimer::new(self.config.clone());
        let pipeline = EntitlementPipeline::new(claimer, options);
        safe_execute("电子书预处理", pipeline.prepare())
            .await
            .unwrap_or_default()
    }

    async fn diagnose(&self) -> Result<()> {
        init_console(self.config.verbose_logging);
        let page = ChromeLauncher::new(self.config.clone()).launch().await?;
        let result = page.diagnose().await;
        if let Err(e) = page.close().await {
            warn!("⚠️ 关闭会话失败: {}", e);
        }

        let json = serde_json::to_string_pretty(&result?)?;
        println!("{}", json);

        tokio::fs::create_dir_all(&self.config.output_root).await?;
        let path: PathBuf = self.config.output_root.join("diagnose.json");
        tokio::fs::write(&path, &json)
            .await
            .with_context(|| format!("无法写入 {}", path.display()))?;
        info!("💾 诊断结果已保存: {}", path.display());
        Ok(())
    }

    async fn split(&self, skip_split: bool, skip_clean: bool) {
        init_console(self.config.verbose_logging);
        let config = &self.config;

        if !skip_split {
            let downloaded = collect_downloaded(&config.storefront.titles, &config.downloads_dir);
            info!("下载目录中找到 {} 本书", downloaded.len());
            split_remaining(&downloaded, &config.books_dir, config.split_chunk_pages).await;
        }
        if !skip_clean {
            clean_books(&config.books_dir).await;
        }
    }
}

fn print_summary(summary: &RunSummary) {
    let report = summary.render();
    for line in report.lines() {
        info!("{}", line);
    }
    println!("{}", report);
    if summary.has_errors() {
        warn!("⚠️ 本次运行共有 {} 个错误，完整信息见日志", summary.errors.len());
    }
}
