//! 报告生成

use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{debug, info};

use super::UI_SETTLE;
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::models::{StageKind, StageResult, WorkItem};

const BUTTON: &str = "button, [role='button']";
const REPORTS_CARD_TEXT: &str = "Reports";
const CREATE_MODAL_TEXT: &str = "Create report";
const PROMPT_FIELD: &str = "mat-dialog-container textarea, textarea";
const DIALOG: &str = "mat-dialog-container";
const ARTIFACT_DONE: &str = "button.artifact-button-content";

const CONTROL_TIMEOUT: Duration = Duration::from_secs(15);
/// 格式列表是生成的，出现得比较慢
const FORMAT_LIST_TIMEOUT: Duration = Duration::from_secs(90);
const DIALOG_CLOSE_TIMEOUT: Duration = Duration::from_secs(30);

/// 生成一种格式的报告
pub async fn create_report(
    executor: &JsExecutor,
    config: &Config,
    item: &WorkItem,
    format: &str,
    prompt: &str,
) -> StageResult {
    match generate(executor, config, format, prompt).await {
        Ok(()) => StageResult::success(StageKind::Report, format),
        Err(e) => {
            debug!("报告 '{}' / '{}' 失败: {:#}", item.title, format, e);
            StageResult::failure(StageKind::Report, format, format!("{:#}", e))
        }
    }
}

async fn generate(
    executor: &JsExecutor,
    config: &Config,
    format: &str,
    prompt: &str,
) -> Result<()> {
    executor
        .wait_and_click(BUTTON, Some(REPORTS_CARD_TEXT), CONTROL_TIMEOUT, "打开报告面板")
        .await?;
    executor
        .wait_for(
            "[role='dialog'], mat-dialog-container",
            Some(CREATE_MODAL_TEXT),
            CONTROL_TIMEOUT,
            "等待创建报告对话框",
        )
        .await?;
    executor
        .wait_for(DIALOG, Some(format), FORMAT_LIST_TIMEOUT, "等待报告格式列表")
        .await?;

    if !click_format_editor(executor, format).await? {
        return Err(anyhow!("找不到报告格式: {}", format));
    }
    tokio::time::sleep(UI_SETTLE).await;

    executor
        .wait_for(PROMPT_FIELD, None, CONTROL_TIMEOUT, "等待提示词输入框")
        .await?;
    executor.fill(PROMPT_FIELD, prompt, true).await?;

    let before = executor.count(ARTIFACT_DONE).await?;
    executor
        .wait_and_click(
            &format!("{DIALOG} button"),
            Some("Generate"),
            CONTROL_TIMEOUT,
            "点击生成",
        )
        .await?;
    info!("⏳ 报告 {} 生成中...", format);

    // 对话框偶尔不自动关闭，不影响生成
    let dialog_gone = format!("document.querySelector('{DIALOG}') === null");
    if let Err(e) = executor
        .wait_until(&dialog_gone, DIALOG_CLOSE_TIMEOUT, "等待对话框关闭")
        .await
    {
        debug!("对话框未关闭: {}", e);
    }

    let condition = format!(
        "document.querySelectorAll({}).length > {}",
        serde_json::to_string(ARTIFACT_DONE)?,
        before
    );
    executor
        .wait_until(&condition, config.report_timeout(), &format!("生成报告 {}", format))
        .await
}

/// 点击格式卡片上的编辑按钮
///
/// 优先使用 aria-label，找不到时按卡片文字向上寻找按钮。
async fn click_format_editor(executor: &JsExecutor, format: &str) -> Result<bool> {
    let labelled = edit_button_selector(format);
    if executor.click(&labelled, None).await? {
        return Ok(true);
    }

    let js = format!(
        r#"
        (() => {{
            const name = {name};
            const nodes = [...document.querySelectorAll('mat-dialog-container *')]
                .filter(el => el.children.length === 0 && (el.innerText || '').trim() === name);
            for (const node of nodes) {{
                let parent = node.parentElement;
                for (let depth = 0; parent && depth < 5; depth++) {{
                    const button = parent.querySelector('button');
                    if (button) {{
                        button.click();
                        return true;
                    }}
                    parent = parent.parentElement;
                }}
            }}
            return false;
        }})()
        "#,
        name = serde_json::to_string(format)?
    );
    executor.eval_as(js).await
}

fn edit_button_selector(format: &str) -> String {
    let escaped = format.replace('"', "\\\"");
    format!(r#"button[aria-label="Edit {escaped}"], button[mattooltip="Edit {escaped}"]"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_button_selector() {
        assert_eq!(
            edit_button_selector("Study Guide"),
            r#"button[aria-label="Edit Study Guide"], button[mattooltip="Edit Study Guide"]"#
        );
        assert!(edit_button_selector(r#"A "B""#).contains(r#"Edit A \"B\""#));
    }
}
