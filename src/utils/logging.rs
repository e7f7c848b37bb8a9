//! 日志工具模块
//!
//! 每次运行持有一个 `RunLog`：控制台输出 INFO，`run.log` 记录 DEBUG。
//! `RunLog` 被 drop 时订阅器随之卸载。

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::info;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

use crate::error::FileError;

/// 日志文件名
pub const LOG_FILENAME: &str = "run.log";

/// 输出目录的时间戳格式
const OUTPUT_DIR_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// 单次运行的日志句柄
pub struct RunLog {
    log_path: PathBuf,
    _guard: DefaultGuard,
}

impl RunLog {
    /// 初始化本次运行的日志
    ///
    /// # 参数
    /// - `output_dir`: 本次运行的输出目录，`run.log` 写在这里
    /// - `verbose`: 控制台是否输出 DEBUG
    pub fn init(output_dir: &Path, verbose: bool) -> Result<Self> {
        let log_path = output_dir.join(LOG_FILENAME);
        let mut file = File::create(&log_path)
            .with_context(|| format!("无法创建日志文件: {}", log_path.display()))?;
        file.write_all(log_header().as_bytes())?;

        let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(if verbose {
                "debug,chromiumoxide=warn"
            } else {
                "info,chromiumoxide=warn"
            })
        });

        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_filter(console_filter);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_filter(EnvFilter::new("debug,chromiumoxide=warn"));

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        let guard = tracing::subscriber::set_default(subscriber);

        Ok(Self {
            log_path,
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

/// 只输出到控制台的日志（用于不产生运行目录的子命令）
pub fn init_console(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info,chromiumoxide=warn" })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 在 `base_dir` 下创建带时间戳的本次运行输出目录
pub fn create_output_dir(base_dir: &Path) -> Result<PathBuf> {
    let timestamp = chrono::Local::now().format(OUTPUT_DIR_FORMAT).to_string();
    let output_dir = base_dir.join(timestamp);
    fs::create_dir_all(&output_dir).map_err(|source| FileError::CreateDirFailed {
        path: output_dir.display().to_string(),
        source,
    })?;
    Ok(output_dir)
}

fn log_header() -> String {
    format!(
        "{}\n笔记本自动化运行日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    )
}

/// 记录程序启动信息
pub fn log_startup(output_dir: &Path, target_date: chrono::NaiveDate) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 笔记本批处理模式");
    info!("📅 目标日期: {}", target_date);
    info!("📁 输出目录: {}", output_dir.display());
    info!("{}", "=".repeat(60));
}
