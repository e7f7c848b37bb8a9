//! 扫描最近下载的文档

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::Result;
use tracing::{debug, info, warn};

/// 列出 `dir` 中修改时间在 `max_age` 以内、扩展名匹配的文件
///
/// 目录不存在时只记录警告并返回空列表。结果按路径排序。
pub async fn find_recent_documents(
    dir: &Path,
    max_age: Duration,
    extensions: &[String],
) -> Result<Vec<PathBuf>> {
    find_documents_aged(dir, Duration::ZERO, max_age, extensions).await
}

/// 列出修改时间早于 `min_age`、但在 `max_age` 以内的文件
///
/// `min_age` 为零时等同于 [`find_recent_documents`]。
pub async fn find_documents_aged(
    dir: &Path,
    min_age: Duration,
    max_age: Duration,
    extensions: &[String],
) -> Result<Vec<PathBuf>> {
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        warn!("⚠️ 下载目录不存在: {}", dir.display());
        return Ok(Vec::new());
    }

    let now = SystemTime::now();
    let oldest = now.checked_sub(max_age).unwrap_or(SystemTime::UNIX_EPOCH);
    let newest = now.checked_sub(min_age).unwrap_or(SystemTime::UNIX_EPOCH);

    let mut results = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !has_extension(&path, extensions) {
            continue;
        }
        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(e) => {
                warn!("⚠️ 无法读取文件信息 {}: {}", path.display(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        match metadata.modified() {
            Ok(modified) if modified >= oldest && (min_age.is_zero() || modified < newest) => {
                debug!("最近文件: {}", path.display());
                results.push(path);
            }
            Ok(_) => {}
            Err(e) => warn!("⚠️ 无法读取修改时间 {}: {}", path.display(), e),
        }
    }

    results.sort();
    info!(
        "📁 在 {} 中找到 {} 个最近的文档",
        dir.display(),
        results.len()
    );
    Ok(results)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    fn pdf_only() -> Vec<String> {
        vec!["pdf".to_string()]
    }

    #[tokio::test]
    async fn test_missing_dir_is_empty() {
        let found = find_recent_documents(
            Path::new("/definitely/not/a/dir"),
            Duration::from_secs(3600),
            &pdf_only(),
        )
        .await
        .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_filters_by_extension_and_age() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.pdf"), b"%PDF").unwrap();
        fs::write(dir.path().join("a.PDF"), b"%PDF").unwrap();
        fs::write(dir.path().join("notes.txt"), b"text").unwrap();
        fs::create_dir(dir.path().join("folder.pdf")).unwrap();

        let old = dir.path().join("old.pdf");
        fs::write(&old, b"%PDF").unwrap();
        let two_days_ago = SystemTime::now() - Duration::from_secs(48 * 3600);
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(two_days_ago)
            .unwrap();

        let found = find_recent_documents(dir.path(), Duration::from_secs(24 * 3600), &pdf_only())
            .await
            .unwrap();
        assert_eq!(
            found,
            vec![dir.path().join("a.PDF"), dir.path().join("b.pdf")]
        );
    }

    fn touch(path: &Path, age: Duration) {
        fs::write(path, b"%PDF").unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now() - age)
            .unwrap();
    }

    #[tokio::test]
    async fn test_aged_window_skips_fresh_and_stale() {
        let dir = tempfile::tempdir().unwrap();
        let hour = Duration::from_secs(3600);
        touch(&dir.path().join("fresh.pdf"), Duration::ZERO);
        touch(&dir.path().join("yesterday.pdf"), hour * 30);
        touch(&dir.path().join("stale.pdf"), hour * 72);

        let found = find_documents_aged(dir.path(), hour * 24, hour * 48, &pdf_only())
            .await
            .unwrap();
        assert_eq!(found, vec![dir.path().join("yesterday.pdf")]);
    }

    #[test]
    fn test_has_extension() {
        let exts = vec![".pdf".to_string(), "epub".to_string()];
        assert!(has_extension(Path::new("x.pdf"), &exts));
        assert!(has_extension(Path::new("x.EPUB"), &exts));
        assert!(!has_extension(Path::new("x"), &exts));
    }
}
