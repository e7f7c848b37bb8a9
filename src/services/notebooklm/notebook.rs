//! 打开与创建笔记本

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use tracing::{error, info, warn};

use super::listing::CARD_SELECTOR;
use super::UI_SETTLE;
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::models::{ItemLocator, WorkItem};

const BUTTON: &str = "button, [role='button'], [role='menuitem']";
const TITLE_INPUT: &str = "input.title-input";
const FILE_INPUT: &str = "input[type='file']";
const STUDIO_MARKER: &str = "Audio Overview";

/// 上传后确认对话框可能出现的按钮
const CONFIRM_LABELS: [&str; 4] = ["Insert", "Upload", "Add", "Done"];

const CONTROL_TIMEOUT: Duration = Duration::from_secs(15);

/// 按定位方式打开一个笔记本
pub async fn open(executor: &JsExecutor, item: &WorkItem) -> Result<()> {
    info!("📂 打开笔记本: {}", item.title);
    match &item.locator {
        ItemLocator::Url(url) => executor.goto(url).await?,
        ItemLocator::ListPosition { selector, index } => {
            executor
                .wait_for(selector, None, CONTROL_TIMEOUT, "等待笔记本列表")
                .await?;
            if !executor.click_nth(selector, *index).await? {
                return Err(anyhow!("列表中第 {} 个笔记本不存在", index + 1));
            }
        }
        ItemLocator::TextMatch(text) => {
            executor
                .wait_and_click(CARD_SELECTOR, Some(text), CONTROL_TIMEOUT, "查找笔记本卡片")
                .await?;
        }
    }
    tokio::time::sleep(Duration::from_secs(3)).await;
    ensure_studio_panel(executor).await
}

/// Studio 面板在窄窗口下是收起的
async fn ensure_studio_panel(executor: &JsExecutor) -> Result<()> {
    if executor.exists(BUTTON, Some(STUDIO_MARKER)).await? {
        return Ok(());
    }
    if executor.click(BUTTON, Some("Studio")).await? {
        tokio::time::sleep(UI_SETTLE).await;
    }
    executor
        .wait_for(BUTTON, Some(STUDIO_MARKER), CONTROL_TIMEOUT, "等待 Studio 面板")
        .await
}

/// 新建笔记本，改名为主题并上传全部源文件
///
/// 单个文件上传失败只记录日志；新建失败返回错误。
pub async fn create_from_files(
    executor: &JsExecutor,
    config: &Config,
    topic: &str,
    sources: &[PathBuf],
    created_on: NaiveDate,
) -> Result<WorkItem> {
    info!("🆕 新建笔记本: {} ({} 个文件)", topic, sources.len());
    executor.goto(&config.notebook_url).await?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    let home_url = executor.current_url().await?;
    executor
        .wait_and_click(BUTTON, Some("New notebook"), config.page_load_timeout(), "点击新建笔记本")
        .await
        .context("找不到新建笔记本按钮")?;
    tokio::time::sleep(Duration::from_secs(3)).await;

    // 新建后会自动弹出上传对话框
    for source in sources {
        if let Err(e) = upload_source(executor, source).await {
            error!("❌ 上传失败 {}: {:#}", source.display(), e);
        }
    }

    if let Err(e) = rename(executor, topic).await {
        warn!("⚠️ 笔记本改名失败: {:#}", e);
    }

    let url = executor.current_url().await?;
    let locator = if !url.is_empty() && url != home_url {
        ItemLocator::Url(url)
    } else {
        ItemLocator::TextMatch(topic.to_string())
    };
    Ok(WorkItem::new(topic, created_on, locator).with_sources(sources.to_vec()))
}

async fn upload_source(executor: &JsExecutor, source: &Path) -> Result<()> {
    info!("📤 上传: {}", source.display());
    if executor.count(FILE_INPUT).await? == 0 {
        executor
            .wait_and_click(BUTTON, Some("Add source"), CONTROL_TIMEOUT, "点击添加来源")
            .await?;
        tokio::time::sleep(UI_SETTLE).await;
        executor.click(BUTTON, Some("Upload file")).await?;
        tokio::time::sleep(UI_SETTLE).await;
    }

    executor.set_input_file(FILE_INPUT, source).await?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    for label in CONFIRM_LABELS {
        if executor.click("button", Some(label)).await? {
            break;
        }
    }
    tokio::time::sleep(Duration::from_secs(4)).await;
    Ok(())
}

async fn rename(executor: &JsExecutor, topic: &str) -> Result<()> {
    executor
        .wait_for(TITLE_INPUT, None, CONTROL_TIMEOUT, "等待标题输入框")
        .await?;
    if !executor.fill(TITLE_INPUT, topic, false).await? {
        return Err(anyhow!("标题输入框不可用"));
    }
    executor.press_enter(TITLE_INPUT).await?;
    tokio::time::sleep(UI_SETTLE).await;
    Ok(())
}
