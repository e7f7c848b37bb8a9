//! 电子书领取
//!
//! 在商店的解锁页面逐本领取配套电子书：搜索书名 → 选择购买渠道 →
//! 上传发票 → 解锁 → 下载 PDF。

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::Browser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::browser::open_session;
use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::{DownloadWatcher, JsExecutor};
use crate::utils::sanitize_label;

const SIGN_IN_TEXT: &str = "Sign in with Google";
const SEARCH_INPUT: &str = "input#search-product";
const FIRST_RESULT: &str =
    "ul#search-product-results li.search-results-list-item a.search-results-list-item-link";
const CTA: &str = "button.cta-action, a.cta-action";
const CONTINUE_TEXT: &str = "Continue to Step 2";
const UNLOCK_TEXT: &str = "Unlock Benefits";
const FILE_INPUT: &str = "input[type='file']";
const UPLOADED_TEXT: &str = "Invoice uploaded";
const DOWNLOAD_PDF: &str = "button, a";
const DOWNLOAD_PDF_TEXT: &str = "Download PDF";

const STEP_PAUSE: Duration = Duration::from_millis(1_500);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);
/// 在订单页按书名前缀匹配卡片
const TITLE_MATCH_CHARS: usize = 30;

/// 一本领取成功的书
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedTitle {
    pub title: String,
    pub path: PathBuf,
}

/// 电子书领取能力
#[async_trait]
pub trait EntitlementClaimer: Send + Sync {
    /// 领取全部书目，返回成功下载的书
    ///
    /// 单本失败只记录日志；发票文件不存在时直接返回空列表。
    async fn claim_all(
        &self,
        titles: &[String],
        invoice: &Path,
        downloads_dir: &Path,
    ) -> Result<Vec<ClaimedTitle>>;
}

/// 基于浏览器的商店领取实现
pub struct StorefrontClaimer {
    config: Config,
}

impl StorefrontClaimer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    async fn ensure_signed_in(&self, executor: &JsExecutor) -> Result<()> {
        executor.goto(&self.config.storefront.claim_url).await?;
        tokio::time::sleep(Duration::from_secs(2)).await;

        if !executor.click("button, a", Some(SIGN_IN_TEXT)).await? {
            info!("✓ 商店已登录");
            return Ok(());
        }

        warn!("⚠️ 需要登录商店，请在浏览器中完成登录");
        println!("\n👉 登录完成后按回车继续...");
        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;
        tokio::time::sleep(Duration::from_secs(2)).await;
        info!("✓ 商店登录完成");
        Ok(())
    }

    async fn claim_in_session(
        &self,
        executor: &JsExecutor,
        browser: &Browser,
        titles: &[String],
        invoice: &Path,
        downloads_dir: &Path,
    ) -> Result<Vec<ClaimedTitle>> {
        self.ensure_signed_in(executor).await?;

        let total = titles.len();
        let mut claimed = Vec::new();
        let mut failed = Vec::new();
        for (i, title) in titles.iter().enumerate() {
            info!("[书目 {}/{}] 📚 领取: {}", i + 1, total, title);
            match self
                .claim_title(executor, browser, title, invoice, downloads_dir)
                .await
            {
                Ok(path) => {
                    info!("[书目 {}/{}] 💾 已下载: {}", i + 1, total, path.display());
                    claimed.push(ClaimedTitle {
                        title: title.clone(),
                        path,
                    });
                }
                Err(e) if AppError::is_timeout(&e) => {
                    error!("[书目 {}/{}] ⏱️ 领取超时: {:#}", i + 1, total, e);
                    failed.push(title.as_str());
                }
                Err(e) => {
                    error!("[书目 {}/{}] ❌ 领取失败: {:#}", i + 1, total, e);
                    failed.push(title.as_str());
                }
            }
        }

        info!("📚 领取完成: 成功 {}，失败 {}", claimed.len(), failed.len());
        if !failed.is_empty() {
            warn!("失败的书目: {}", failed.join(", "));
        }
        Ok(claimed)
    }

    async fn claim_title(
        &self,
        executor: &JsExecutor,
        browser: &Browser,
        title: &str,
        invoice: &Path,
        downloads_dir: &Path,
    ) -> Result<PathBuf> {
        executor.goto(&self.config.storefront.claim_url).await?;
        tokio::time::sleep(Duration::from_secs(2)).await;

        // 搜索并选择第一个结果
        executor
            .wait_for(SEARCH_INPUT, None, Duration::from_secs(10), "等待搜索框")
            .await?;
        executor.fill(SEARCH_INPUT, title, false).await?;
        executor.press_enter(SEARCH_INPUT).await?;
        tokio::time::sleep(STEP_PAUSE).await;
        executor
            .wait_and_click(FIRST_RESULT, None, Duration::from_secs(8), "选择搜索结果")
            .await?;
        executor
            .wait_until(
                "window.location.pathname.includes('/unlock/')",
                Duration::from_secs(10),
                "进入解锁页面",
            )
            .await?;

        executor
            .wait_and_click(CTA, Some(CONTINUE_TEXT), Duration::from_secs(15), "进入第二步")
            .await?;
        tokio::time::sleep(STEP_PAUSE).await;

        let source = &self.config.storefront.purchase_source;
        executor
            .wait_and_click("label", Some(source), Duration::from_secs(8), "选择购买渠道")
            .await?;
        tokio::time::sleep(Duration::from_millis(500)).await;

        executor.set_input_file(FILE_INPUT, invoice).await?;
        if let Err(e) = executor
            .wait_for("body", Some(UPLOADED_TEXT), Duration::from_secs(15), "等待发票上传")
            .await
        {
            debug!("未看到上传确认: {}", e);
            tokio::time::sleep(Duration::from_secs(4)).await;
        }

        executor
            .wait_and_click(CTA, Some(UNLOCK_TEXT), Duration::from_secs(10), "点击解锁")
            .await?;
        info!("🔓 已解锁: {}", title);

        executor
            .wait_until(
                "window.location.pathname.includes('/my-account/orders')",
                Duration::from_secs(30),
                "等待跳转到订单页",
            )
            .await?;
        tokio::time::sleep(STEP_PAUSE).await;
        let _ = executor.click("button", Some("Allow all")).await;

        let watcher = DownloadWatcher::prepare(browser, downloads_dir).await?;
        if !click_download_for(executor, title).await? {
            return Err(anyhow!("订单页没有下载按钮"));
        }
        let downloaded = watcher.wait(DOWNLOAD_TIMEOUT).await?;

        let dest = downloads_dir.join(format!("{}.pdf", sanitize_label(title)));
        tokio::fs::rename(&downloaded, &dest).await?;
        Ok(dest)
    }
}

/// 点击书名所在卡片里的下载按钮，找不到时点击第一个（最近领取的在最上面）
async fn click_download_for(executor: &JsExecutor, title: &str) -> Result<bool> {
    let prefix: String = title.chars().take(TITLE_MATCH_CHARS).collect();
    let js = format!(
        r#"
        (() => {{
            const prefix = {prefix};
            const label = {label};
            const isDownload = el => (el.innerText || '').toLowerCase().includes(label);
            const buttons = [...document.querySelectorAll({selector})].filter(isDownload);
            if (buttons.length === 0) return false;
            const scoped = buttons.find(button => {{
                let parent = button.parentElement;
                for (let depth = 0; parent && depth < 6; depth++) {{
                    if ((parent.innerText || '').includes(prefix)) return true;
                    parent = parent.parentElement;
                }}
                return false;
            }});
            (scoped || buttons[0]).click();
            return true;
        }})()
        "#,
        prefix = serde_json::to_string(&prefix)?,
        label = serde_json::to_string(&DOWNLOAD_PDF_TEXT.to_lowercase())?,
        selector = serde_json::to_string(DOWNLOAD_PDF)?,
    );
    executor.eval_as(js).await
}

#[async_trait]
impl EntitlementClaimer for StorefrontClaimer {
    async fn claim_all(
        &self,
        titles: &[String],
        invoice: &Path,
        downloads_dir: &Path,
    ) -> Result<Vec<ClaimedTitle>> {
        if !invoice.exists() {
            error!("❌ 发票文件不存在: {}", invoice.display());
            return Ok(Vec::new());
        }
        tokio::fs::create_dir_all(downloads_dir).await?;

        let mut session = open_session(&self.config).await?;
        let executor = JsExecutor::new(session.page.clone());
        let result = self
            .claim_in_session(&executor, &session.browser, titles, invoice, downloads_dir)
            .await;

        if session.owned {
            if let Err(e) = session.browser.close().await {
                warn!("⚠️ 关闭浏览器失败: {}", e);
            }
            let _ = session.browser.wait().await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_invoice_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let claimer = StorefrontClaimer::new(Config::default());
        let claimed = claimer
            .claim_all(
                &["Some Book".to_string()],
                &dir.path().join("missing_invoice.pdf"),
                dir.path(),
            )
            .await
            .unwrap();
        assert!(claimed.is_empty());
    }
}
