//! 程序配置
//!
//! 加载顺序：`Default` → TOML 配置文件（可选） → `AUTOPILOT_*` 环境变量

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// 报告描述末尾追加的提示词
pub const DEFAULT_REPORT_PROMPT: &str = " cover the primary secondary and tertiary concepts, walk through how they \
connect and what they mean in a larger context. opt for a casual tone and \
simpler language avoid academic jargon but not at the cost of diluting \
definitions or shallow explanations of difficult concepts.";

/// 音频概览的关注点提示词
pub const DEFAULT_AUDIO_FOCUS_PROMPT: &str = "cover the primary secondary and tertiary concepts, walk through how they \
connect and what they mean in a larger context. opt for a casual tone and \
simpler language avoid academic jargon but not at the cost of diluting \
definitions or shallow explanations of difficult concepts.";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 笔记本应用首页
    pub notebook_url: String,
    /// 浏览器用户数据目录（持久化登录状态）
    pub user_data_dir: PathBuf,
    /// 连接已运行浏览器的调试端口，未设置时自行启动浏览器
    pub browser_debug_port: Option<u16>,
    /// 是否无头模式
    pub headless: bool,
    /// 浏览器可执行文件路径
    pub chrome_executable: Option<PathBuf>,
    /// 每次运行的输出根目录
    pub output_root: PathBuf,
    /// 扫描最近下载文档的目录
    pub downloads_dir: PathBuf,
    /// 最近下载文件的时间窗口（小时）
    pub recent_window_hours: u64,
    /// 识别为文档的扩展名
    pub document_extensions: Vec<String>,
    /// 要生成的报告格式
    pub report_formats: Vec<String>,
    pub report_prompt: String,
    pub audio_style: String,
    pub audio_length: String,
    pub audio_focus_prompt: String,
    pub page_load_timeout_secs: u64,
    pub report_timeout_secs: u64,
    pub export_timeout_secs: u64,
    pub audio_timeout_secs: u64,
    pub audio_poll_interval_secs: u64,
    pub transcode_timeout_secs: u64,
    /// ffmpeg 可执行文件
    pub ffmpeg_program: String,
    /// 无书签时按固定页数切分
    pub split_chunk_pages: u32,
    /// 拆分后书籍的存放目录
    pub books_dir: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    pub storefront: StorefrontConfig,
}

/// 电子书领取配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    pub claim_url: String,
    /// 购买凭证 PDF
    pub invoice_path: Option<PathBuf>,
    /// 购买渠道选项文本
    pub purchase_source: String,
    /// 待领取的书名列表
    pub titles: Vec<String>,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            claim_url: "https://www.packtpub.com/en-us/unlock".to_string(),
            invoice_path: None,
            purchase_source: "Humble Bundle".to_string(),
            titles: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            notebook_url: "https://notebooklm.google.com/".to_string(),
            user_data_dir: home.join(".notebooklm-automation").join("chrome-profile"),
            browser_debug_port: None,
            headless: false,
            chrome_executable: None,
            output_root: PathBuf::from("output"),
            downloads_dir: dirs::download_dir().unwrap_or_else(|| home.join("Downloads")),
            recent_window_hours: 24,
            document_extensions: vec!["pdf".to_string()],
            report_formats: vec!["Briefing Doc".to_string(), "Study Guide".to_string()],
            report_prompt: DEFAULT_REPORT_PROMPT.to_string(),
            audio_style: "Deep Dive".to_string(),
            audio_length: "Long".to_string(),
            audio_focus_prompt: DEFAULT_AUDIO_FOCUS_PROMPT.to_string(),
            page_load_timeout_secs: 600,
            report_timeout_secs: 300,
            export_timeout_secs: 60,
            audio_timeout_secs: 1800,
            audio_poll_interval_secs: 15,
            transcode_timeout_secs: 120,
            ffmpeg_program: "ffmpeg".to_string(),
            split_chunk_pages: 50,
            books_dir: PathBuf::from("packt-books"),
            verbose_logging: false,
            storefront: StorefrontConfig::default(),
        }
    }
}

impl Config {
    /// 读取配置：可选的 TOML 文件，再叠加环境变量
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        base.apply_env()
    }

    /// 从 TOML 文件读取，缺失字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::ParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 用环境变量覆盖配置
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env_string("AUTOPILOT_NOTEBOOK_URL") {
            self.notebook_url = v;
        }
        if let Some(v) = env_string("AUTOPILOT_USER_DATA_DIR") {
            self.user_data_dir = PathBuf::from(v);
        }
        if let Some(v) = env_parse::<u16>("AUTOPILOT_BROWSER_DEBUG_PORT", "u16")? {
            self.browser_debug_port = Some(v);
        }
        if let Some(v) = env_parse::<bool>("AUTOPILOT_HEADLESS", "bool")? {
            self.headless = v;
        }
        if let Some(v) = env_string("AUTOPILOT_OUTPUT_ROOT") {
            self.output_root = PathBuf::from(v);
        }
        if let Some(v) = env_string("AUTOPILOT_DOWNLOADS_DIR") {
            self.downloads_dir = PathBuf::from(v);
        }
        if let Some(v) = env_parse::<u64>("AUTOPILOT_RECENT_WINDOW_HOURS", "u64")? {
            self.recent_window_hours = v;
        }
        if let Some(v) = env_parse::<u64>("AUTOPILOT_AUDIO_TIMEOUT_SECS", "u64")? {
            self.audio_timeout_secs = v;
        }
        if let Some(v) = env_parse::<u64>("AUTOPILOT_AUDIO_POLL_INTERVAL_SECS", "u64")? {
            self.audio_poll_interval_secs = v;
        }
        if let Some(v) = env_parse::<u64>("AUTOPILOT_REPORT_TIMEOUT_SECS", "u64")? {
            self.report_timeout_secs = v;
        }
        if let Some(v) = env_string("AUTOPILOT_FFMPEG") {
            self.ffmpeg_program = v;
        }
        if let Some(v) = env_parse::<bool>("AUTOPILOT_VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = v;
        }
        Ok(self)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_secs)
    }

    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout_secs)
    }

    pub fn recent_window(&self) -> Duration {
        Duration::from_secs(self.recent_window_hours * 3600)
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match env_string(var_name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
    }
}
