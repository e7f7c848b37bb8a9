//! 运行汇总

use crate::models::stage::{StageKind, StageResult};
use crate::utils::truncate_text;

/// 错误列表中单条原因的最大长度
const MAX_CAUSE_CHARS: usize = 200;

/// 一次运行的统计
///
/// 计数只增不减；每一次失败都至少对应 `errors` 中的一条记录。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub items_processed: usize,
    pub items_from_files: usize,
    pub reports_generated: usize,
    pub reports_failed: usize,
    pub exports_completed: usize,
    pub exports_failed: usize,
    pub audio_generated: usize,
    pub audio_failed: usize,
    pub audio_converted: usize,
    pub conversion_failed: usize,
    pub errors: Vec<String>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条错误
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// 按阶段结果更新对应计数，失败时记录 "标题 阶段 (对象): 原因"
    pub fn record_stage(&mut self, item_title: &str, result: &StageResult) {
        let ok = result.is_success();
        let (succeeded, failed) = match result.stage {
            StageKind::Report => (&mut self.reports_generated, &mut self.reports_failed),
            StageKind::ReportExport | StageKind::AudioExport => {
                (&mut self.exports_completed, &mut self.exports_failed)
            }
            StageKind::Audio => (&mut self.audio_generated, &mut self.audio_failed),
            StageKind::Transcode => (&mut self.audio_converted, &mut self.conversion_failed),
        };
        if ok {
            *succeeded += 1;
        } else {
            *failed += 1;
        }

        if let Some(error) = result.error() {
            let cause = error.lines().next().unwrap_or_default();
            self.errors.push(format!(
                "{} {} ({}): {}",
                item_title,
                result.stage,
                result.subject,
                truncate_text(cause, MAX_CAUSE_CHARS)
            ));
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 生成可读的汇总文本
    pub fn render(&self) -> String {
        let mut lines = vec![
            "=".repeat(60),
            "📊 运行汇总".to_string(),
            "=".repeat(60),
            format!("处理笔记本: {}", self.items_processed),
            format!("  其中来自文件: {}", self.items_from_files),
            format!(
                "报告: 生成 {} / 失败 {}",
                self.reports_generated, self.reports_failed
            ),
            format!(
                "导出: 完成 {} / 失败 {}",
                self.exports_completed, self.exports_failed
            ),
            format!(
                "音频: 生成 {} / 失败 {}",
                self.audio_generated, self.audio_failed
            ),
            format!(
                "转码: 完成 {} / 失败 {}",
                self.audio_converted, self.conversion_failed
            ),
        ];

        if self.errors.is_empty() {
            lines.push("错误: 0".to_string());
        } else {
            lines.push(format!("错误: {}", self.errors.len()));
            for (i, error) in self.errors.iter().enumerate() {
                lines.push(format!("  {}. {}", i + 1, error));
            }
        }
        lines.push("=".repeat(60));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_stage_counters() {
        let mut summary = RunSummary::new();
        summary.record_stage("Rust", &StageResult::success(StageKind::Report, "Study Guide"));
        summary.record_stage(
            "Rust",
            &StageResult::failure(StageKind::Report, "Briefing Doc", "超时"),
        );
        summary.record_stage("Rust", &StageResult::success(StageKind::AudioExport, "音频"));
        summary.record_stage(
            "Rust",
            &StageResult::failure(StageKind::Transcode, "a.wav", "ffmpeg 不可用"),
        );

        assert_eq!(summary.reports_generated, 1);
        assert_eq!(summary.reports_failed, 1);
        assert_eq!(summary.exports_completed, 1);
        assert_eq!(summary.conversion_failed, 1);
        assert_eq!(summary.errors.len(), 2);
        assert_eq!(summary.errors[0], "Rust 生成报告 (Briefing Doc): 超时");
    }

    #[test]
    fn test_render_without_errors() {
        let summary = RunSummary {
            items_processed: 2,
            reports_generated: 4,
            ..Default::default()
        };
        let text = summary.render();
        assert!(text.contains("处理笔记本: 2"));
        assert!(text.contains("报告: 生成 4 / 失败 0"));
        assert!(text.contains("错误: 0"));
    }

    #[test]
    fn test_render_lists_errors() {
        let mut summary = RunSummary::new();
        summary.record_error("认证失败");
        summary.record_error("Rust 生成音频 (音频): 超时");
        let text = summary.render();
        assert!(text.contains("错误: 2"));
        assert!(text.contains("  1. 认证失败"));
        assert!(text.contains("  2. Rust 生成音频 (音频): 超时"));
    }
}
