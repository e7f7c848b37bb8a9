use std::path::Path;

use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{BrowserError, FileError};

/// 一次运行使用的浏览器会话
pub struct BrowserSession {
    pub browser: Browser,
    pub page: Page,
    /// 是否由本程序启动（连接的外部浏览器不由本程序关闭）
    pub owned: bool,
}

/// 按配置获取会话：设置了调试端口则连接已有浏览器，否则自行启动
pub async fn open_session(config: &Config) -> Result<BrowserSession> {
    match config.browser_debug_port {
        Some(port) => {
            let (browser, page) =
                connect_to_browser_and_page(port, Some(&config.notebook_url), Some("NotebookLM"))
                    .await?;
            Ok(BrowserSession {
                browser,
                page,
                owned: false,
            })
        }
        None => {
            let (browser, page) = launch_browser(
                &config.user_data_dir,
                config.headless,
                config.chrome_executable.as_deref(),
            )
            .await?;
            Ok(BrowserSession {
                browser,
                page,
                owned: true,
            })
        }
    }
}

/// 连接到浏览器并获取页面
pub async fn connect_to_browser_and_page(
    port: u16,
    target_url: Option<&str>,
    target_title: Option<&str>,
) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);
    debug!("目标 URL: {:?}, 目标标题: {:?}", target_url, target_title);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        BrowserError::ConnectionFailed { port, source: e }
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    if let Some(title) = target_title {
        debug!("正在查找标题包含 '{}' 的页面", title);
        for p in pages.iter() {
            if let Ok(Some(page_title)) = p.get_title().await {
                debug!("检查页面标题: {}", page_title);
                if page_title.contains(title) {
                    info!("✓ 找到目标页面: {}", page_title);
                    return Ok((browser, p.clone()));
                }
            }
        }
        debug!("未找到匹配的页面，将创建新页面");
    }

    let page = browser
        .new_page(target_url.unwrap_or("about:blank"))
        .await
        .map_err(|e| {
            error!("创建新页面失败: {}", e);
            BrowserError::PageCreationFailed(e)
        })?;

    Ok((browser, page))
}

/// 以持久化用户目录启动浏览器
///
/// 登录状态保存在 `user_data_dir`，下次运行可直接复用。
pub async fn launch_browser(
    user_data_dir: &Path,
    headless: bool,
    chrome_executable: Option<&Path>,
) -> Result<(Browser, Page)> {
    info!("🚀 启动浏览器，用户目录: {}", user_data_dir.display());
    std::fs::create_dir_all(user_data_dir).map_err(|source| FileError::CreateDirFailed {
        path: user_data_dir.display().to_string(),
        source,
    })?;

    let mut builder = BrowserConfig::builder()
        .user_data_dir(user_data_dir)
        .args(vec!["--disable-blink-features=AutomationControlled"]);
    if headless {
        builder = builder.new_headless_mode();
    } else {
        builder = builder.with_head();
    }
    if let Some(executable) = chrome_executable {
        builder = builder.chrome_executable(executable);
    }
    let browser_config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        BrowserError::LaunchFailed(e)
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        BrowserError::LaunchFailed(e.to_string())
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = match browser.pages().await?.into_iter().next() {
        Some(page) => page,
        None => browser
            .new_page("about:blank")
            .await
            .map_err(BrowserError::PageCreationFailed)?,
    };

    info!("✅ 浏览器已就绪");
    Ok((browser, page))
}
