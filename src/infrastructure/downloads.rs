//! 浏览器下载监视
//!
//! 先把浏览器下载目录指向目标目录并记录已有文件，触发下载后等待新文件落盘。

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::Browser;
use tokio::time::Instant;
use tracing::debug;

use crate::error::FileError;

const CHECK_STEP: Duration = Duration::from_millis(500);

/// 下载未完成时浏览器使用的临时后缀
const PARTIAL_SUFFIXES: [&str; 2] = [".crdownload", ".tmp"];

pub struct DownloadWatcher {
    dir: PathBuf,
    before: HashSet<PathBuf>,
}

impl DownloadWatcher {
    /// 设置浏览器下载目录并记录目录快照
    pub async fn prepare(browser: &Browser, dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dir.display().to_string())
            .build()
            .map_err(|e| anyhow!("构造下载参数失败: {}", e))?;
        browser.execute(params).await?;
        Self::snapshot(dir).await
    }

    /// 只记录目录快照，不改动浏览器设置
    pub async fn snapshot(dir: &Path) -> Result<Self> {
        let mut before = HashSet::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            before.insert(entry.path());
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            before,
        })
    }

    /// 等待一个新的完整文件出现
    pub async fn wait(&self, timeout: Duration) -> Result<PathBuf> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(path) = self.find_new().await? {
                debug!("检测到新下载: {}", path.display());
                return Ok(path);
            }
            if Instant::now() >= deadline {
                return Err(FileError::DownloadTimedOut {
                    dir: self.dir.display().to_string(),
                    timeout_secs: timeout.as_secs(),
                }
                .into());
            }
            tokio::time::sleep(CHECK_STEP).await;
        }
    }

    async fn find_new(&self) -> Result<Option<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if self.before.contains(&path) || is_partial(&path) {
                continue;
            }
            if entry.metadata().await.map(|m| m.len() > 0).unwrap_or(false) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

fn is_partial(path: &Path) -> bool {
    let name = path.to_string_lossy();
    PARTIAL_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_partial() {
        assert!(is_partial(Path::new("/tmp/a.wav.crdownload")));
        assert!(is_partial(Path::new("/tmp/a.tmp")));
        assert!(!is_partial(Path::new("/tmp/a.wav")));
    }

    #[tokio::test]
    async fn test_wait_ignores_existing_and_partial() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.wav"), b"old").unwrap();
        let watcher = DownloadWatcher::snapshot(dir.path()).await.unwrap();

        std::fs::write(dir.path().join("new.wav.crdownload"), b"part").unwrap();
        std::fs::write(dir.path().join("new.wav"), b"data").unwrap();

        let found = watcher.wait(Duration::from_secs(2)).await.unwrap();
        assert_eq!(found, dir.path().join("new.wav"));
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = DownloadWatcher::snapshot(dir.path()).await.unwrap();
        let err = watcher.wait(Duration::from_millis(100)).await.unwrap_err();
        assert!(crate::error::AppError::is_timeout(&err));
    }
}
