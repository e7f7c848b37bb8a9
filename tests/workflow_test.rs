use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use notebook_autopilot::config::Config;
use notebook_autopilot::models::{ItemLocator, ListEntry, RunSummary, StageKind, StageResult, WorkItem};
use notebook_autopilot::orchestrator::{ChapterSource, RunOrchestrator, RunRequest};
use notebook_autopilot::services::{
    AudioHandle, AudioSpec, NotebookDriver, SessionLauncher, TranscodeError, Transcoder,
};
use notebook_autopilot::workflow::{ItemFlow, PollSpec};

/// 模拟页面的行为设定
#[derive(Clone, Default)]
struct Script {
    entries: Vec<ListEntry>,
    auth_ok: bool,
    /// (笔记本标题, 报告格式) 生成失败
    failing_report: Option<(String, String)>,
    /// 新建失败的主题
    failing_topic: Option<String>,
    audio_never_ready: bool,
    launch_fails: bool,
}

/// 记录调用情况
#[derive(Default)]
struct Calls {
    scraped: usize,
    created: Vec<String>,
    opened: Vec<String>,
    reports: Vec<(String, String)>,
    exports: Vec<String>,
    home: usize,
    closed: usize,
}

#[derive(Clone)]
struct MockDriver {
    script: Script,
    calls: Arc<Mutex<Calls>>,
}

#[async_trait]
impl NotebookDriver for MockDriver {
    async fn authenticate(&self) -> Result<bool> {
        Ok(self.script.auth_ok)
    }

    async fn scrape_item_list(&self) -> Result<Vec<ListEntry>> {
        self.calls.lock().unwrap().scraped += 1;
        Ok(self.script.entries.clone())
    }

    async fn create_item(
        &self,
        topic: &str,
        sources: &[PathBuf],
        created_on: NaiveDate,
    ) -> Result<WorkItem> {
        if self.script.failing_topic.as_deref() == Some(topic) {
            return Err(anyhow!("上传对话框没有出现"));
        }
        self.calls.lock().unwrap().created.push(topic.to_string());
        Ok(WorkItem::new(topic, created_on, ItemLocator::TextMatch(topic.to_string()))
            .with_sources(sources.to_vec()))
    }

    async fn open_item(&self, item: &WorkItem) -> Result<()> {
        self.calls.lock().unwrap().opened.push(item.title.clone());
        Ok(())
    }

    async fn request_artifact(&self, item: &WorkItem, format: &str, _prompt: &str) -> StageResult {
        self.calls
            .lock()
            .unwrap()
            .reports
            .push((item.title.clone(), format.to_string()));
        match &self.script.failing_report {
            Some((title, failing)) if *title == item.title && failing == format => {
                StageResult::failure(StageKind::Report, format, "生成按钮不可用")
            }
            _ => StageResult::success(StageKind::Report, format),
        }
    }

    async fn export_to_document(&self, item: &WorkItem, artifact_name: &str) -> StageResult {
        self.calls
            .lock()
            .unwrap()
            .exports
            .push(format!("{} / {}", item.title, artifact_name));
        let kind = if artifact_name.ends_with("Audio Overview") {
            StageKind::AudioExport
        } else {
            StageKind::ReportExport
        };
        StageResult::success(kind, artifact_name)
    }

    async fn request_audio(&self, item: &WorkItem, _spec: &AudioSpec) -> Result<AudioHandle> {
        Ok(AudioHandle {
            item_title: item.title.clone(),
        })
    }

    async fn poll_audio_ready(&self, _handle: &AudioHandle) -> Result<bool> {
        Ok(!self.script.audio_never_ready)
    }

    async fn audio_in_progress(&self, _handle: &AudioHandle) -> Result<bool> {
        Ok(true)
    }

    async fn download_audio(&self, _handle: &AudioHandle, dest_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dest_dir)?;
        let path = dest_dir.join("Audio Overview.wav");
        std::fs::write(&path, b"RIFF")?;
        Ok(path)
    }

    async fn navigate_home(&self) -> Result<()> {
        self.calls.lock().unwrap().home += 1;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.calls.lock().unwrap().closed += 1;
        Ok(())
    }
}

struct MockLauncher {
    driver: MockDriver,
}

#[async_trait]
impl SessionLauncher for MockLauncher {
    type Driver = MockDriver;

    async fn launch(&self) -> Result<MockDriver> {
        if self.driver.script.launch_fails {
            return Err(anyhow!("Chrome 无法启动"));
        }
        Ok(self.driver.clone())
    }
}

struct CopyTranscoder;

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, TranscodeError> {
        let output = output_dir.join("Audio Overview.mp3");
        std::fs::copy(input, &output)?;
        Ok(output)
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 28).unwrap()
}

fn entries(titles: &[&str]) -> Vec<ListEntry> {
    titles
        .iter()
        .enumerate()
        .map(|(index, title)| ListEntry {
            title: title.to_string(),
            date_label: "Today".to_string(),
            locator: ItemLocator::ListPosition {
                selector: "mat-card".to_string(),
                index,
            },
        })
        .collect()
}

struct Harness {
    orchestrator: RunOrchestrator<MockLauncher>,
    calls: Arc<Mutex<Calls>>,
    output: tempfile::TempDir,
}

impl Harness {
    fn new(script: Script) -> Self {
        Self::with_flow(script, |flow| flow)
    }

    fn with_flow(script: Script, adjust: impl FnOnce(ItemFlow) -> ItemFlow) -> Self {
        let config = Config::default();
        let calls = Arc::new(Mutex::new(Calls::default()));
        let driver = MockDriver {
            script,
            calls: calls.clone(),
        };
        let flow = adjust(ItemFlow::new(&config, Arc::new(CopyTranscoder)));
        Self {
            orchestrator: RunOrchestrator::new(MockLauncher { driver }, flow, config),
            calls,
            output: tempfile::tempdir().unwrap(),
        }
    }

    fn request(&self) -> RunRequest {
        RunRequest::new(today(), today(), self.output.path().to_path_buf())
    }

    async fn run(&self, request: RunRequest) -> RunSummary {
        self.orchestrator.run(&request).await
    }
}

#[tokio::test]
async fn test_all_stages_succeed() {
    let harness = Harness::new(Script {
        entries: entries(&["Rust Ownership", "Async Rust", "Tokio Internals"]),
        auth_ok: true,
        ..Default::default()
    });
    let summary = harness.run(harness.request()).await;

    assert_eq!(summary.items_processed, 3);
    assert_eq!(summary.reports_generated, 6);
    assert_eq!(summary.reports_failed, 0);
    assert_eq!(summary.exports_completed, 9);
    assert_eq!(summary.exports_failed, 0);
    assert_eq!(summary.audio_generated, 3);
    assert_eq!(summary.audio_failed, 0);
    assert_eq!(summary.audio_converted, 3);
    assert_eq!(summary.conversion_failed, 0);
    assert!(summary.errors.is_empty(), "{:?}", summary.errors);

    let calls = harness.calls.lock().unwrap();
    assert_eq!(calls.opened, vec!["Rust Ownership", "Async Rust", "Tokio Internals"]);
    assert_eq!(calls.home, 3);
    assert_eq!(calls.closed, 1);

    let item_dir = harness.output.path().join("Async_Rust");
    assert!(item_dir.join("Audio Overview.mp3").is_file());
}

#[tokio::test]
async fn test_report_failure_is_contained() {
    let harness = Harness::new(Script {
        entries: entries(&["First", "Second", "Third"]),
        auth_ok: true,
        failing_report: Some(("Second".to_string(), "Briefing Doc".to_string())),
        ..Default::default()
    });
    let summary = harness.run(harness.request()).await;

    assert_eq!(summary.items_processed, 3);
    assert_eq!(summary.reports_failed, 1);
    assert_eq!(summary.reports_generated, 5);
    assert_eq!(summary.exports_completed, 8);
    assert_eq!(summary.audio_generated, 3);
    assert_eq!(summary.audio_converted, 3);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("Second"));
    assert!(summary.errors[0].contains("Briefing Doc"));

    // 第二个笔记本的另一种报告仍然生成
    let calls = harness.calls.lock().unwrap();
    assert!(calls
        .reports
        .contains(&("Second".to_string(), "Study Guide".to_string())));
    assert!(!calls.exports.contains(&"Second / Briefing Doc".to_string()));
}

#[tokio::test]
async fn test_auth_failure_stops_before_discovery() {
    let harness = Harness::new(Script {
        entries: entries(&["First"]),
        auth_ok: false,
        ..Default::default()
    });
    let summary = harness.run(harness.request()).await;

    assert_eq!(summary.items_processed, 0);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("认证"));

    let calls = harness.calls.lock().unwrap();
    assert_eq!(calls.scraped, 0);
    assert_eq!(calls.closed, 1);
}

#[tokio::test]
async fn test_launch_failure_is_single_error() {
    let harness = Harness::new(Script {
        launch_fails: true,
        ..Default::default()
    });
    let summary = harness.run(harness.request()).await;

    assert_eq!(summary.items_processed, 0);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(harness.calls.lock().unwrap().closed, 0);
}

#[tokio::test]
async fn test_empty_run_is_informational() {
    let harness = Harness::new(Script {
        entries: Vec::new(),
        auth_ok: true,
        ..Default::default()
    });
    let summary = harness.run(harness.request()).await;

    assert_eq!(summary, RunSummary::new());
    assert_eq!(harness.calls.lock().unwrap().closed, 1);
}

#[tokio::test]
async fn test_only_target_date_is_processed() {
    let mut list = entries(&["Today One"]);
    list.push(ListEntry {
        title: "Old One".to_string(),
        date_label: "Jun 1, 2025".to_string(),
        locator: ItemLocator::TextMatch("Old One".to_string()),
    });
    list.push(ListEntry {
        title: "Broken Date".to_string(),
        date_label: "sometime".to_string(),
        locator: ItemLocator::TextMatch("Broken Date".to_string()),
    });
    let harness = Harness::new(Script {
        entries: list,
        auth_ok: true,
        ..Default::default()
    });
    let summary = harness.run(harness.request()).await;

    assert_eq!(summary.items_processed, 1);
    assert_eq!(harness.calls.lock().unwrap().opened, vec!["Today One"]);
}

#[tokio::test]
async fn test_recent_files_grouped_and_failing_group_skipped() {
    let downloads = tempfile::tempdir().unwrap();
    for name in ["kubernetes_networking.pdf", "kubernetes-storage.pdf", "pasta.pdf", "notes.txt"] {
        std::fs::write(downloads.path().join(name), b"%PDF-1.5").unwrap();
    }

    let harness = Harness::new(Script {
        auth_ok: true,
        failing_topic: Some("Pasta".to_string()),
        ..Default::default()
    });
    let request = harness
        .request()
        .with_downloads_dir(downloads.path().to_path_buf());
    let summary = harness.run(request).await;

    assert_eq!(summary.items_from_files, 1);
    assert_eq!(summary.items_processed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("Pasta"));

    let calls = harness.calls.lock().unwrap();
    assert_eq!(calls.created, vec!["Kubernetes"]);
    assert_eq!(calls.opened, vec!["Kubernetes"]);
}

#[tokio::test]
async fn test_chapters_become_items() {
    let harness = Harness::new(Script {
        entries: entries(&["Live Item"]),
        auth_ok: true,
        ..Default::default()
    });
    let chapters = vec![
        ChapterSource {
            title: "Rust Book — Chapter 01 Intro".to_string(),
            path: PathBuf::from("/books/Rust Book/Chapter_01_Intro.pdf"),
        },
        ChapterSource {
            title: "Rust Book — Chapter 02 Ownership".to_string(),
            path: PathBuf::from("/books/Rust Book/Chapter_02_Ownership.pdf"),
        },
    ];
    let request = harness
        .request()
        .with_chapters(chapters)
        .without_live_discovery();
    let summary = harness.run(request).await;

    assert_eq!(summary.items_processed, 2);
    assert_eq!(summary.items_from_files, 2);
    let calls = harness.calls.lock().unwrap();
    assert_eq!(calls.scraped, 0);
    assert_eq!(
        calls.created,
        vec!["Rust Book — Chapter 01 Intro", "Rust Book — Chapter 02 Ownership"]
    );
}

fn rust_book_chapter() -> Vec<ChapterSource> {
    vec![ChapterSource {
        title: "Rust Book — Chapter 01 Intro".to_string(),
        path: PathBuf::from("/books/Rust Book/Chapter_01_Intro.pdf"),
    }]
}

fn write_aged(path: &Path, age: Duration) {
    std::fs::write(path, b"%PDF-1.5").unwrap();
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(std::time::SystemTime::now() - age)
        .unwrap();
}

#[tokio::test]
async fn test_pipeline_skips_freshly_claimed_books() {
    let downloads = tempfile::tempdir().unwrap();
    let hour = Duration::from_secs(3600);
    write_aged(&downloads.path().join("Rust Book.pdf"), Duration::ZERO);
    write_aged(&downloads.path().join("kubernetes_notes.pdf"), hour * 30);

    let harness = Harness::new(Script {
        auth_ok: true,
        ..Default::default()
    });
    let request = harness
        .request()
        .with_downloads_dir(downloads.path().to_path_buf())
        .for_pipeline(rust_book_chapter(), false, hour * 24);
    let summary = harness.run(request).await;

    assert_eq!(summary.items_processed, 2);
    let calls = harness.calls.lock().unwrap();
    assert_eq!(calls.scraped, 0);
    assert_eq!(
        calls.created,
        vec!["Kubernetes Notes", "Rust Book — Chapter 01 Intro"]
    );
}

#[tokio::test]
async fn test_pipeline_from_existing_ignores_downloads() {
    let downloads = tempfile::tempdir().unwrap();
    let hour = Duration::from_secs(3600);
    write_aged(&downloads.path().join("Rust Book.pdf"), Duration::ZERO);
    write_aged(&downloads.path().join("kubernetes_notes.pdf"), hour * 30);

    let harness = Harness::new(Script {
        auth_ok: true,
        ..Default::default()
    });
    let request = harness
        .request()
        .with_downloads_dir(downloads.path().to_path_buf())
        .for_pipeline(rust_book_chapter(), true, hour * 24);
    let summary = harness.run(request).await;

    assert_eq!(summary.items_processed, 1);
    assert_eq!(
        harness.calls.lock().unwrap().created,
        vec!["Rust Book — Chapter 01 Intro"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_audio_timeout_is_stage_failure() {
    let harness = Harness::with_flow(
        Script {
            entries: entries(&["Slow Audio"]),
            auth_ok: true,
            audio_never_ready: true,
            ..Default::default()
        },
        |flow| flow.with_audio_poll(PollSpec::new(Duration::from_secs(15), Duration::from_secs(60))),
    );
    let summary = harness.run(harness.request()).await;

    assert_eq!(summary.items_processed, 1);
    assert_eq!(summary.reports_generated, 2);
    assert_eq!(summary.audio_failed, 1);
    assert_eq!(summary.audio_generated, 0);
    assert_eq!(summary.audio_converted, 0);
    // 音频失败后不导出文稿
    assert_eq!(summary.exports_completed, 2);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("60s"));
    assert_eq!(harness.calls.lock().unwrap().home, 1);
}
