//! 登录检查

use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::JsExecutor;

/// 登录成功后应用所在的域名
const APP_HOST: &str = "notebooklm.google.com";

/// 打开首页并确认已登录
///
/// 未登录时提示用户在浏览器中完成登录，按回车后在页面加载超时内等待跳回应用。
pub async fn ensure_authenticated(executor: &JsExecutor, config: &Config) -> Result<bool> {
    info!("🔐 检查登录状态...");
    executor.goto(&config.notebook_url).await?;
    tokio::time::sleep(Duration::from_secs(3)).await;

    if on_app_host(&executor.current_url().await?) {
        info!("✓ 已登录");
        return Ok(true);
    }

    warn!("⚠️ 当前未登录，请在浏览器中完成 Google 登录");
    println!("\n👉 登录完成后按回车继续...");
    let mut line = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());
    stdin.read_line(&mut line).await?;

    let condition = format!(
        "window.location.href.includes({})",
        serde_json::to_string(APP_HOST)?
    );
    match executor
        .wait_until(&condition, config.page_load_timeout(), "等待登录完成")
        .await
    {
        Ok(()) => {
            info!("✓ 登录完成");
            Ok(true)
        }
        Err(e) if AppError::is_timeout(&e) => {
            warn!("⏱️ 在 {}s 内未检测到登录", config.page_load_timeout_secs);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

fn on_app_host(url: &str) -> bool {
    url.contains(APP_HOST)
}
