//! 页面驱动接口
//!
//! 流程层只依赖这里的能力描述，所有页面选择器都留在具体实现里。

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{ListEntry, StageResult, WorkItem};

/// 音频概览的生成参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSpec {
    /// 叙述风格，如 "Deep Dive"
    pub style: String,
    /// 长度，如 "Long"
    pub length: String,
    /// 关注点提示词
    pub focus_prompt: String,
}

/// 已发起的音频生成任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioHandle {
    pub item_title: String,
}

/// 笔记本应用的操作能力
///
/// 会话在一次运行中只被一个逻辑流程独占使用。
#[async_trait]
pub trait NotebookDriver: Send + Sync {
    /// 确认已登录，返回 `false` 表示登录未完成
    async fn authenticate(&self) -> Result<bool>;

    /// 抓取首页列表中的全部条目
    async fn scrape_item_list(&self) -> Result<Vec<ListEntry>>;

    /// 新建笔记本并逐个上传源文件，单个文件上传失败只记录并跳过
    async fn create_item(
        &self,
        topic: &str,
        sources: &[PathBuf],
        created_on: NaiveDate,
    ) -> Result<WorkItem>;

    /// 进入某个笔记本
    async fn open_item(&self, item: &WorkItem) -> Result<()>;

    /// 生成一份报告
    async fn request_artifact(&self, item: &WorkItem, format: &str, prompt: &str) -> StageResult;

    /// 导出已生成的产物到在线文档
    async fn export_to_document(&self, item: &WorkItem, artifact_name: &str) -> StageResult;

    /// 发起音频概览生成
    async fn request_audio(&self, item: &WorkItem, spec: &AudioSpec) -> Result<AudioHandle>;

    /// 音频是否可以下载
    async fn poll_audio_ready(&self, handle: &AudioHandle) -> Result<bool>;

    /// 页面是否显示正在生成（只用于日志）
    async fn audio_in_progress(&self, handle: &AudioHandle) -> Result<bool>;

    /// 下载音频到 `dest_dir`，返回文件路径
    async fn download_audio(&self, handle: &AudioHandle, dest_dir: &Path) -> Result<PathBuf>;

    /// 回到首页
    async fn navigate_home(&self) -> Result<()>;

    /// 释放会话
    async fn close(&self) -> Result<()>;
}

/// 会话的获取方式
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Driver: NotebookDriver;

    async fn launch(&self) -> Result<Self::Driver>;
}
