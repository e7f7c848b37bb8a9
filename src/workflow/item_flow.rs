//! 笔记本处理流程 - 流程层
//!
//! 核心职责：定义"一个笔记本"的完整处理流程
//!
//! 流程顺序：
//! 1. 逐个格式生成报告 → 成功则立即导出
//! 2. 生成音频概览 → 轮询就绪 → 下载
//! 3. 导出音频文稿 → 转码为 mp3
//! 4. 回到首页
//!
//! 每一步独立保护，失败只跳过依赖它的后续动作，流程总会走到最后。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::models::{RunSummary, StageKind, StageResult, WorkItem};
use crate::services::{AudioHandle, AudioSpec, NotebookDriver, Transcoder};
use crate::workflow::item_ctx::ItemCtx;
use crate::workflow::poller::{poll_until, PollOutcome, PollSpec, PollTarget};

/// 单个笔记本的处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStage {
    NotStarted,
    ArtifactsGenerating,
    ArtifactsDone,
    AudioGenerating,
    AudioDone,
    Finished,
}

/// 笔记本处理流程
///
/// - 不持有会话，只借用页面驱动
/// - 只通过 `RunSummary` 汇报结果，从不向调用方返回错误
pub struct ItemFlow {
    report_formats: Vec<String>,
    report_prompt: String,
    audio: AudioSpec,
    audio_poll: PollSpec,
    transcoder: Arc<dyn Transcoder>,
}

impl ItemFlow {
    pub fn new(config: &Config, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            report_formats: config.report_formats.clone(),
            report_prompt: config.report_prompt.clone(),
            audio: AudioSpec {
                style: config.audio_style.clone(),
                length: config.audio_length.clone(),
                focus_prompt: config.audio_focus_prompt.clone(),
            },
            audio_poll: PollSpec::new(
                std::time::Duration::from_secs(config.audio_poll_interval_secs),
                std::time::Duration::from_secs(config.audio_timeout_secs),
            ),
            transcoder,
        }
    }

    pub fn with_audio_poll(mut self, poll: PollSpec) -> Self {
        self.audio_poll = poll;
        self
    }

    /// 处理一个笔记本，结果全部写入 `summary`
    pub async fn process<D: NotebookDriver + ?Sized>(
        &self,
        driver: &D,
        item: &WorkItem,
        ctx: &ItemCtx,
        summary: &mut RunSummary,
    ) {
        let started = Instant::now();
        summary.items_processed += 1;
        info!("{} 📓 开始处理: {}", ctx, item.title);
        self.enter(ctx, ItemStage::NotStarted);

        if let Err(e) = tokio::fs::create_dir_all(&ctx.item_dir).await {
            warn!(
                "{} ⚠️ 无法创建输出目录 {}: {}",
                ctx,
                ctx.item_dir.display(),
                e
            );
        }

        match driver.open_item(item).await {
            Ok(()) => {
                self.enter(ctx, ItemStage::ArtifactsGenerating);
                self.run_reports(driver, item, ctx, summary).await;
                self.enter(ctx, ItemStage::ArtifactsDone);

                self.enter(ctx, ItemStage::AudioGenerating);
                let audio = self.run_audio(driver, item, ctx).await;
                summary.record_stage(&item.title, &audio);
                self.enter(ctx, ItemStage::AudioDone);

                if audio.is_success() {
                    let audio_path = audio.artifact().map(PathBuf::from);
                    self.run_audio_followups(driver, item, ctx, audio_path, summary)
                        .await;
                }
            }
            Err(e) => {
                error!("{} ❌ 无法打开笔记本: {:#}", ctx, e);
                summary.record_error(format!("{} 打开笔记本失败: {}", item.title, e));
            }
        }

        if let Err(e) = driver.navigate_home().await {
            warn!("{} ⚠️ 无法返回首页: {}", ctx, e);
        }

        self.enter(ctx, ItemStage::Finished);
        info!(
            "{} ✅ 处理结束，耗时 {:.1}s",
            ctx,
            started.elapsed().as_secs_f64()
        );
    }

    fn enter(&self, ctx: &ItemCtx, stage: ItemStage) {
        debug!("{} 阶段: {:?}", ctx, stage);
    }

    /// 逐个格式生成报告，生成成功的立即导出
    async fn run_reports<D: NotebookDriver + ?Sized>(
        &self,
        driver: &D,
        item: &WorkItem,
        ctx: &ItemCtx,
        summary: &mut RunSummary,
    ) {
        for format in &self.report_formats {
            info!("{} 📝 生成报告: {}", ctx, format);
            let report = driver
                .request_artifact(item, format, &self.report_prompt)
                .await;
            summary.record_stage(&item.title, &report);

            if let Some(err) = report.error() {
                error!("{} ❌ 报告 {} 生成失败: {}", ctx, format, err);
                continue;
            }
            info!("{} ✓ 报告 {} 已生成", ctx, format);

            let export = driver.export_to_document(item, format).await;
            summary.record_stage(&item.title, &export);
            match export.error() {
                None => info!("{} ✓ 报告 {} 已导出", ctx, format),
                Some(err) => error!("{} ❌ 报告 {} 导出失败: {}", ctx, format, err),
            }
        }
    }

    /// 发起音频生成，轮询就绪后下载到笔记本目录
    async fn run_audio<D: NotebookDriver + ?Sized>(
        &self,
        driver: &D,
        item: &WorkItem,
        ctx: &ItemCtx,
    ) -> StageResult {
        let subject = format!("{} / {}", self.audio.style, self.audio.length);
        info!("{} 🎙️ 生成音频概览 ({})", ctx, subject);

        let handle = match driver.request_audio(item, &self.audio).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("{} ❌ 音频生成请求失败: {:#}", ctx, e);
                return StageResult::failure(StageKind::Audio, subject, e.to_string());
            }
        };

        info!(
            "{} 已发起音频生成，每 {}s 检查一次，最长 {}s",
            ctx,
            self.audio_poll.interval.as_secs(),
            self.audio_poll.timeout.as_secs()
        );

        let target = AudioReady {
            driver,
            handle: &handle,
        };
        let label = format!("{} 音频概览 '{}'", ctx, item.title);
        match poll_until(&target, self.audio_poll, &label).await {
            Ok(PollOutcome::Ready { waited }) => {
                info!("{} ✓ 音频已就绪 (等待 {}s)", ctx, waited.as_secs());
            }
            Ok(PollOutcome::TimedOut) => {
                let msg = format!(
                    "音频概览在 {}s 内未完成",
                    self.audio_poll.timeout.as_secs()
                );
                warn!("{} ⏱️ {}", ctx, msg);
                return StageResult::failure(StageKind::Audio, subject, msg);
            }
            Err(e) => {
                error!("{} ❌ 轮询音频状态失败: {:#}", ctx, e);
                return StageResult::failure(StageKind::Audio, subject, e.to_string());
            }
        }

        match driver.download_audio(&handle, &ctx.item_dir).await {
            Ok(path) => {
                info!("{} 💾 音频已下载: {}", ctx, path.display());
                StageResult::success_with(StageKind::Audio, subject, path)
            }
            Err(e) => {
                error!("{} ❌ 音频下载失败: {:#}", ctx, e);
                StageResult::failure(StageKind::Audio, subject, e.to_string())
            }
        }
    }

    /// 音频成功后：导出文稿，再在文件存在时转码
    async fn run_audio_followups<D: NotebookDriver + ?Sized>(
        &self,
        driver: &D,
        item: &WorkItem,
        ctx: &ItemCtx,
        audio_path: Option<PathBuf>,
        summary: &mut RunSummary,
    ) {
        let transcript = format!("{} — Audio Overview", item.title);
        let export = driver.export_to_document(item, &transcript).await;
        summary.record_stage(&item.title, &export);
        match export.error() {
            None => info!("{} ✓ 音频文稿已导出", ctx),
            Some(err) => error!("{} ❌ 音频文稿导出失败: {}", ctx, err),
        }

        let result = self.transcode(audio_path, ctx).await;
        summary.record_stage(&item.title, &result);
    }

    async fn transcode(&self, audio_path: Option<PathBuf>, ctx: &ItemCtx) -> StageResult {
        let path = match audio_path {
            Some(path) if file_exists(&path).await => path,
            Some(path) => {
                let msg = format!("下载的音频文件不存在: {}", path.display());
                warn!("{} ⚠️ {}", ctx, msg);
                return StageResult::failure(StageKind::Transcode, "mp3", msg);
            }
            None => {
                warn!("{} ⚠️ 没有可转码的音频文件", ctx);
                return StageResult::failure(StageKind::Transcode, "mp3", "没有音频文件");
            }
        };

        let subject = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "mp3".to_string());
        match self.transcoder.transcode(&path, &ctx.item_dir).await {
            Ok(output) => {
                info!("{} ✓ 已转码为 mp3: {}", ctx, output.display());
                StageResult::success_with(StageKind::Transcode, subject, output)
            }
            Err(e) => {
                error!("{} ❌ mp3 转码失败: {}", ctx, e);
                StageResult::failure(StageKind::Transcode, subject, e.to_string())
            }
        }
    }
}

async fn file_exists(path: &std::path::Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// 把页面驱动的音频状态适配为轮询对象
struct AudioReady<'a, D: ?Sized> {
    driver: &'a D,
    handle: &'a AudioHandle,
}

#[async_trait]
impl<'a, D: NotebookDriver + ?Sized> PollTarget for AudioReady<'a, D> {
    async fn ready(&self) -> Result<bool> {
        self.driver.poll_audio_ready(self.handle).await
    }

    async fn in_progress(&self) -> Result<bool> {
        self.driver.audio_in_progress(self.handle).await
    }
}
