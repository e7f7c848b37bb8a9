//! 页面结构诊断
//!
//! 选择器失效时，用它导出笔记本页面上的按钮和图标，便于对照修改。

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde_json::Value as JsonValue;
use tracing::info;

use super::auth::ensure_authenticated;
use super::listing::CARD_SELECTOR;
use super::NotebookLmPage;

const MAX_BUTTONS: usize = 40;
const MAX_ICONS: usize = 30;
const MAX_NAV_ITEMS: usize = 20;

pub async fn dump_controls(page: &NotebookLmPage) -> Result<JsonValue> {
    let executor = page.executor();
    if !ensure_authenticated(executor, &page.config).await? {
        return Err(anyhow!("未登录，无法诊断"));
    }

    executor
        .wait_for(CARD_SELECTOR, None, Duration::from_secs(15), "等待笔记本列表")
        .await?;
    if executor.click_nth(CARD_SELECTOR, 0).await? {
        info!("🔍 已打开第一个笔记本");
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    executor.eval(diagnose_script()).await
}

fn diagnose_script() -> String {
    format!(
        r#"
        (() => {{
            const visible = el => !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
            const buttons = [...document.querySelectorAll('button, [role="button"]')]
                .filter(visible)
                .slice(0, {buttons})
                .map(b => ({{
                    text: (b.innerText || '').trim().slice(0, 80),
                    ariaLabel: b.getAttribute('aria-label'),
                    classes: b.className,
                    id: b.id || null,
                }}));
            const matIcons = [...document.querySelectorAll('mat-icon')]
                .slice(0, {icons})
                .map(i => (i.innerText || '').trim());
            const navItems = [...document.querySelectorAll('nav a, [role="tab"], [role="navigation"] *')]
                .filter(visible)
                .slice(0, {nav})
                .map(n => (n.innerText || n.getAttribute('aria-label') || '').trim());
            return {{ url: window.location.href, buttons, matIcons, navItems }};
        }})()
        "#,
        buttons = MAX_BUTTONS,
        icons = MAX_ICONS,
        nav = MAX_NAV_ITEMS
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_limits() {
        let js = diagnose_script();
        assert!(js.contains(".slice(0, 40)"));
        assert!(js.contains(".slice(0, 30)"));
        assert!(js.contains(".slice(0, 20)"));
    }
}
