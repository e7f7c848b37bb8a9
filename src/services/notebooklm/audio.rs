//! 音频概览：发起、状态检查、下载

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use chromiumoxide::Browser;
use tracing::{debug, info};

use super::UI_SETTLE;
use crate::infrastructure::{DownloadWatcher, JsExecutor};
use crate::models::WorkItem;
use crate::services::driver::{AudioHandle, AudioSpec};

const CUSTOMIZE_BUTTON: &str = "button[aria-label=\"Customize Audio Overview\"]";
const OPTION: &str = "button, [role='radio'], mat-button-toggle, mat-chip-option";
const FOCUS_FIELD: &str = "mat-dialog-container textarea, textarea";
const GENERATE_BUTTON: &str = "mat-dialog-container button, button";
const DOWNLOAD_BUTTON: &str = "button[aria-label*=\"Download\" i], a[aria-label*=\"Download\" i]";
const GENERATING_INDICATOR: &str =
    "[aria-label*=\"Generating\" i], .progress-indicator, [class*=\"generating\" i]";

const CONTROL_TIMEOUT: Duration = Duration::from_secs(15);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// 打开自定义对话框，选择风格和长度，填写关注点后生成
pub async fn start_generation(
    executor: &JsExecutor,
    item: &WorkItem,
    spec: &AudioSpec,
) -> Result<AudioHandle> {
    executor
        .wait_and_click(CUSTOMIZE_BUTTON, None, CONTROL_TIMEOUT, "打开音频自定义")
        .await?;
    tokio::time::sleep(UI_SETTLE).await;

    for choice in [&spec.style, &spec.length] {
        if !executor.click(OPTION, Some(choice)).await? {
            debug!("未找到音频选项 '{}'，使用默认值", choice);
        }
    }

    if !spec.focus_prompt.is_empty() {
        executor.fill(FOCUS_FIELD, &spec.focus_prompt, false).await?;
    }

    executor
        .wait_and_click(GENERATE_BUTTON, Some("Generate"), CONTROL_TIMEOUT, "点击生成音频")
        .await?;
    Ok(AudioHandle {
        item_title: item.title.clone(),
    })
}

/// 下载按钮出现即视为就绪
pub async fn download_ready(executor: &JsExecutor) -> Result<bool> {
    executor.exists(DOWNLOAD_BUTTON, None).await
}

pub async fn generating(executor: &JsExecutor) -> Result<bool> {
    Ok(executor.count(GENERATING_INDICATOR).await? > 0)
}

/// 把下载目录指向 `dest_dir`，点击下载并等待新文件落盘
pub async fn download(
    executor: &JsExecutor,
    browser: &Browser,
    handle: &AudioHandle,
    dest_dir: &Path,
) -> Result<PathBuf> {
    let watcher = DownloadWatcher::prepare(browser, dest_dir).await?;
    if !executor.click(DOWNLOAD_BUTTON, None).await? {
        return Err(anyhow!("'{}' 的下载按钮不可用", handle.item_title));
    }
    info!("⬇️ 正在下载音频: {}", handle.item_title);
    watcher.wait(DOWNLOAD_TIMEOUT).await
}
