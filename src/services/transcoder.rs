//! 音频转码

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// 可识别的下载音频格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Webm,
    Ogg,
    Mp3,
    M4a,
}

impl AudioFormat {
    /// 按扩展名识别（不区分大小写）
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "wav" => Some(Self::Wav),
            "webm" => Some(Self::Webm),
            "ogg" => Some(Self::Ogg),
            "mp3" => Some(Self::Mp3),
            "m4a" => Some(Self::M4a),
            _ => None,
        }
    }
}

/// 转码错误
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("转码工具不可用: {program}")]
    Unavailable { program: String },
    #[error("不支持的音频格式: {path}")]
    UnsupportedFormat { path: String },
    #[error("转码超时 ({timeout_secs}s): {path}")]
    TimedOut { path: String, timeout_secs: u64 },
    #[error("转码失败 (退出码 {code:?}): {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("转码 IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// 转码为 mp3，返回输出路径
    async fn transcode(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, TranscodeError>;
}

/// 调用 ffmpeg 转码
pub struct FfmpegTranscoder {
    program: String,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// 输出文件：`<output_dir>/<输入文件名主干>.mp3`
    pub fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        output_dir.join(format!("{stem}.mp3"))
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, TranscodeError> {
        if AudioFormat::from_path(input).is_none() {
            return Err(TranscodeError::UnsupportedFormat {
                path: input.display().to_string(),
            });
        }

        let output = Self::output_path(input, output_dir);
        debug!(
            "执行: {} -i {} -y -codec:a libmp3lame -qscale:a 2 {}",
            self.program,
            input.display(),
            output.display()
        );

        let child = Command::new(&self.program)
            .arg("-i")
            .arg(input)
            .arg("-y")
            .args(["-codec:a", "libmp3lame", "-qscale:a", "2"])
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => TranscodeError::Unavailable {
                    program: self.program.clone(),
                },
                _ => TranscodeError::Io(e),
            })?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| TranscodeError::TimedOut {
                path: input.display().to_string(),
                timeout_secs: self.timeout.as_secs(),
            })??;

        if !result.status.success() {
            return Err(TranscodeError::Failed {
                code: result.status.code(),
                stderr: stderr_tail(&result.stderr),
            });
        }

        info!(
            "🎵 转码完成: {} -> {}",
            input.file_name().unwrap_or_default().to_string_lossy(),
            output.file_name().unwrap_or_default().to_string_lossy()
        );
        Ok(output)
    }
}

/// 取 stderr 的最后一个非空行
fn stderr_tail(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or_default()
        .to_string()
}
