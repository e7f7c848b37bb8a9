//! 单个阶段的执行结果

use std::fmt;
use std::path::{Path, PathBuf};

/// 阶段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// 生成报告
    Report,
    /// 导出报告到文档
    ReportExport,
    /// 生成音频概览
    Audio,
    /// 导出音频文稿
    AudioExport,
    /// 音频转码
    Transcode,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Report => "生成报告",
            StageKind::ReportExport => "导出报告",
            StageKind::Audio => "生成音频",
            StageKind::AudioExport => "导出音频文稿",
            StageKind::Transcode => "音频转码",
        };
        f.write_str(name)
    }
}

/// 成功时可能带产物路径，失败时一定带原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Succeeded { artifact: Option<PathBuf> },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub stage: StageKind,
    /// 阶段对象，如报告格式名
    pub subject: String,
    pub outcome: StageOutcome,
}

impl StageResult {
    pub fn success(stage: StageKind, subject: impl Into<String>) -> Self {
        Self {
            stage,
            subject: subject.into(),
            outcome: StageOutcome::Succeeded { artifact: None },
        }
    }

    pub fn success_with(stage: StageKind, subject: impl Into<String>, artifact: PathBuf) -> Self {
        Self {
            stage,
            subject: subject.into(),
            outcome: StageOutcome::Succeeded {
                artifact: Some(artifact),
            },
        }
    }

    pub fn failure(stage: StageKind, subject: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            stage,
            subject: subject.into(),
            outcome: StageOutcome::Failed {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, StageOutcome::Succeeded { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            StageOutcome::Failed { error } => Some(error),
            StageOutcome::Succeeded { .. } => None,
        }
    }

    pub fn artifact(&self) -> Option<&Path> {
        match &self.outcome {
            StageOutcome::Succeeded { artifact } => artifact.as_deref(),
            StageOutcome::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_only_on_failure() {
        let ok = StageResult::success(StageKind::Report, "Study Guide");
        assert!(ok.is_success());
        assert!(ok.error().is_none());

        let failed = StageResult::failure(StageKind::Report, "Study Guide", "按钮不存在");
        assert!(!failed.is_success());
        assert_eq!(failed.error(), Some("按钮不存在"));
        assert!(failed.artifact().is_none());
    }

    #[test]
    fn test_artifact_path() {
        let result =
            StageResult::success_with(StageKind::Audio, "音频", PathBuf::from("out/a.wav"));
        assert_eq!(result.artifact(), Some(Path::new("out/a.wav")));
        assert_eq!(StageKind::Audio.to_string(), "生成音频");
    }
}
