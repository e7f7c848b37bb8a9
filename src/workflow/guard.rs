//! 单步保护执行

use std::future::Future;

use tracing::{error, info};

use crate::error::AppError;

/// 执行一个可能失败的步骤，把结果转换为 `Option`
///
/// 成功记 INFO，超时记 "超时"，其余失败记录完整错误链。
pub async fn safe_execute<T, F>(description: &str, fut: F) -> Option<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match fut.await {
        Ok(value) => {
            info!("✓ 成功: {}", description);
            Some(value)
        }
        Err(e) if AppError::is_timeout(&e) => {
            error!("⏱️ 超时: {} - {}", description, e);
            None
        }
        Err(e) => {
            error!("❌ 失败: {} - {:#}", description, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_safe_execute() {
        assert_eq!(safe_execute("成功步骤", async { Ok(7) }).await, Some(7));

        let failed: Option<u32> =
            safe_execute("失败步骤", async { Err(anyhow::anyhow!("按钮不存在")) }).await;
        assert!(failed.is_none());

        let timed_out: Option<u32> = safe_execute("超时步骤", async {
            Err(AppError::timeout("等待", 1).into())
        })
        .await;
        assert!(timed_out.is_none());
    }
}
