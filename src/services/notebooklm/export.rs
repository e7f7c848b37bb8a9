//! 导出到 Google Docs

use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{debug, info};

use super::UI_SETTLE;
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::models::{StageKind, StageResult, WorkItem};

const SHARE_BUTTON: &str = "button[aria-label*='Share' i], button[aria-label*='Export' i], \
                            button[aria-label*='More' i]";
const MENU_ITEM: &str = "[role='menuitem'], button";
const EXPORT_TARGET: &str = "Google Docs";
const CONFIRMATION: &str = "[role='alert'], .cdk-overlay-container [role='status'], snack-bar-container";

const CONTROL_TIMEOUT: Duration = Duration::from_secs(15);

/// 打开产物并导出到文档，等待确认提示出现
pub async fn export_to_docs(
    executor: &JsExecutor,
    config: &Config,
    item: &WorkItem,
    artifact_name: &str,
) -> StageResult {
    let kind = if artifact_name.ends_with("Audio Overview") {
        StageKind::AudioExport
    } else {
        StageKind::ReportExport
    };
    match export(executor, config, artifact_name).await {
        Ok(()) => {
            info!("📤 已导出到 {}: {}", EXPORT_TARGET, artifact_name);
            StageResult::success(kind, artifact_name)
        }
        Err(e) => {
            debug!("导出 '{}' / '{}' 失败: {:#}", item.title, artifact_name, e);
            StageResult::failure(kind, artifact_name, format!("{:#}", e))
        }
    }
}

async fn export(executor: &JsExecutor, config: &Config, artifact_name: &str) -> Result<()> {
    // 先打开对应的产物，找不到时沿用当前打开的产物
    let short_name = artifact_name.split(" — ").next().unwrap_or(artifact_name);
    if executor
        .click("button.artifact-button-content", Some(short_name))
        .await?
    {
        tokio::time::sleep(UI_SETTLE).await;
    }

    executor
        .wait_and_click(SHARE_BUTTON, None, CONTROL_TIMEOUT, "打开导出菜单")
        .await?;
    tokio::time::sleep(UI_SETTLE).await;

    if !executor.click(MENU_ITEM, Some(EXPORT_TARGET)).await? {
        return Err(anyhow!("菜单中没有 {} 选项", EXPORT_TARGET));
    }

    executor
        .wait_for(CONFIRMATION, None, config.export_timeout(), "等待导出确认")
        .await
}
