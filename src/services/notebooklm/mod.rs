//! NotebookLM 页面驱动
//!
//! `NotebookDriver` 的 chromiumoxide 实现。页面选择器全部放在本模块的子模块里，
//! 流程层只看到能力接口。

mod audio;
mod auth;
mod diagnose;
mod export;
mod listing;
mod notebook;
mod reports;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use chromiumoxide::Browser;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::browser::open_session;
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::models::{ListEntry, StageResult, WorkItem};
use crate::services::driver::{AudioHandle, AudioSpec, NotebookDriver, SessionLauncher};

/// 页面操作之间的稳定等待
pub(crate) const UI_SETTLE: Duration = Duration::from_millis(1_500);

/// NotebookLM 页面驱动
pub struct NotebookLmPage {
    executor: JsExecutor,
    browser: Mutex<Option<Browser>>,
    owned: bool,
    config: Config,
}

impl NotebookLmPage {
    pub fn new(executor: JsExecutor, browser: Browser, owned: bool, config: Config) -> Self {
        Self {
            executor,
            browser: Mutex::new(Some(browser)),
            owned,
            config,
        }
    }

    pub fn executor(&self) -> &JsExecutor {
        &self.executor
    }

    /// 打开第一个笔记本并导出页面控件结构
    pub async fn diagnose(&self) -> Result<JsonValue> {
        diagnose::dump_controls(self).await
    }
}

#[async_trait]
impl NotebookDriver for NotebookLmPage {
    async fn authenticate(&self) -> Result<bool> {
        auth::ensure_authenticated(&self.executor, &self.config).await
    }

    async fn scrape_item_list(&self) -> Result<Vec<ListEntry>> {
        listing::scrape_entries(&self.executor).await
    }

    async fn create_item(
        &self,
        topic: &str,
        sources: &[PathBuf],
        created_on: NaiveDate,
    ) -> Result<WorkItem> {
        notebook::create_from_files(&self.executor, &self.config, topic, sources, created_on).await
    }

    async fn open_item(&self, item: &WorkItem) -> Result<()> {
        notebook::open(&self.executor, item).await
    }

    async fn request_artifact(&self, item: &WorkItem, format: &str, prompt: &str) -> StageResult {
        reports::create_report(&self.executor, &self.config, item, format, prompt).await
    }

    async fn export_to_document(&self, item: &WorkItem, artifact_name: &str) -> StageResult {
        export::export_to_docs(&self.executor, &self.config, item, artifact_name).await
    }

    async fn request_audio(&self, item: &WorkItem, spec: &AudioSpec) -> Result<AudioHandle> {
        audio::start_generation(&self.executor, item, spec).await
    }

    async fn poll_audio_ready(&self, _handle: &AudioHandle) -> Result<bool> {
        audio::download_ready(&self.executor).await
    }

    async fn audio_in_progress(&self, _handle: &AudioHandle) -> Result<bool> {
        audio::generating(&self.executor).await
    }

    async fn download_audio(&self, handle: &AudioHandle, dest_dir: &Path) -> Result<PathBuf> {
        let browser = self.browser.lock().await;
        let browser = browser
            .as_ref()
            .ok_or(crate::error::BrowserError::SessionClosed)?;
        audio::download(&self.executor, browser, handle, dest_dir).await
    }

    async fn navigate_home(&self) -> Result<()> {
        self.executor.goto(&self.config.notebook_url).await?;
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        if !self.owned {
            info!("🔌 断开与外部浏览器的连接");
            return Ok(());
        }
        if let Err(e) = browser.close().await {
            warn!("⚠️ 关闭浏览器失败: {}", e);
        }
        let _ = browser.wait().await;
        info!("🔒 浏览器已关闭");
        Ok(())
    }
}

/// 启动（或连接）Chrome 并返回 NotebookLM 页面驱动
pub struct ChromeLauncher {
    config: Config,
}

impl ChromeLauncher {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    type Driver = NotebookLmPage;

    async fn launch(&self) -> Result<NotebookLmPage> {
        let session = open_session(&self.config).await?;
        Ok(NotebookLmPage::new(
            JsExecutor::new(session.page),
            session.browser,
            session.owned,
            self.config.clone(),
        ))
    }
}
