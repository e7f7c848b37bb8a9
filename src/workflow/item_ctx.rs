//! 单个笔记本的处理上下文

use std::fmt;
use std::path::PathBuf;

/// 处理上下文
///
/// 封装序号和输出目录，日志统一以 `[笔记本 i/n]` 开头。
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 从 1 开始的序号
    pub index: usize,
    pub total: usize,
    /// 该笔记本的输出目录
    pub item_dir: PathBuf,
}

impl ItemCtx {
    pub fn new(index: usize, total: usize, item_dir: PathBuf) -> Self {
        Self {
            index,
            total,
            item_dir,
        }
    }
}

impl fmt::Display for ItemCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[笔记本 {}/{}]", self.index, self.total)
    }
}
