use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// PDF 解析 / 写出错误
    #[error("PDF错误: {0}")]
    Pdf(#[from] lopdf::Error),
    /// 等待页面状态超时
    #[error("等待超时 ({timeout_secs}s): {action}")]
    Timeout { action: String, timeout_secs: u64 },
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接已运行的浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {0}")]
    LaunchFailed(String),
    /// 创建页面失败
    #[error("创建页面失败: {0}")]
    PageCreationFailed(#[source] chromiumoxide::error::CdpError),
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// 会话已关闭
    #[error("浏览器会话已关闭")]
    SessionClosed,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 目录创建失败
    #[error("创建目录失败 ({path}): {source}")]
    CreateDirFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 等待下载完成超时
    #[error("下载未在 {timeout_secs}s 内完成: {dir}")]
    DownloadTimedOut { dir: String, timeout_secs: u64 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("无法读取配置文件 {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 {path}: {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建等待超时错误
    pub fn timeout(action: impl Into<String>, timeout_secs: u64) -> Self {
        AppError::Timeout {
            action: action.into(),
            timeout_secs,
        }
    }

    /// 判断一个 anyhow 错误链里是否包含超时
    pub fn is_timeout(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<AppError>(),
                Some(AppError::Timeout { .. })
            ) || matches!(
                cause.downcast_ref::<FileError>(),
                Some(FileError::DownloadTimedOut { .. })
            ) || cause.is::<tokio::time::error::Elapsed>()
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_is_timeout_detects_wrapped_timeout() {
        let err: anyhow::Result<()> =
            Err(AppError::timeout("等待下载按钮", 30).into());
        let err = err.context("生成音频").unwrap_err();
        assert!(AppError::is_timeout(&err));
    }

    #[test]
    fn test_is_timeout_ignores_other_errors() {
        let err = anyhow::anyhow!("按钮不存在");
        assert!(!AppError::is_timeout(&err));

        let err: anyhow::Error = AppError::Other("其他".to_string()).into();
        assert!(!AppError::is_timeout(&err));
    }

    #[test]
    fn test_timeout_display() {
        let err = AppError::timeout("导出确认", 60);
        assert_eq!(err.to_string(), "等待超时 (60s): 导出确认");
    }
}
