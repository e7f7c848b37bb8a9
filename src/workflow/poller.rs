//! 有界轮询
//!
//! 外部系统没有完成通知，只能按固定间隔检查，直到就绪或超时。

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info};

/// 最短检查间隔
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// 轮询参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSpec {
    /// 间隔不足 [`MIN_POLL_INTERVAL`] 时按最短间隔处理
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            timeout,
        }
    }
}

/// 被轮询的对象
#[async_trait]
pub trait PollTarget: Send + Sync {
    /// 是否已就绪
    async fn ready(&self) -> Result<bool>;

    /// 是否仍在进行中，只影响日志
    async fn in_progress(&self) -> Result<bool> {
        Ok(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// 就绪，附带已等待时长
    Ready { waited: Duration },
    TimedOut,
}

/// 轮询直到就绪或超时
///
/// 等待时长按实际经过的时间计算；`ready` 返回错误时立即向上传播。
pub async fn poll_until<T: PollTarget + ?Sized>(
    target: &T,
    spec: PollSpec,
    label: &str,
) -> Result<PollOutcome> {
    let started = Instant::now();
    let mut elapsed = Duration::ZERO;

    while elapsed < spec.timeout {
        if target.ready().await? {
            return Ok(PollOutcome::Ready { waited: elapsed });
        }

        let status = match target.in_progress().await {
            Ok(true) => "生成中...",
            Ok(false) => "等待中...",
            Err(e) => {
                debug!("{} 无法读取进度: {}", label, e);
                "等待中..."
            }
        };
        info!(
            "⏳ {}: {}s / {}s - {}",
            label,
            elapsed.as_secs(),
            spec.timeout.as_secs(),
            status
        );

        tokio::time::sleep(spec.interval).await;
        elapsed = started.elapsed();
    }

    Ok(PollOutcome::TimedOut)
}
