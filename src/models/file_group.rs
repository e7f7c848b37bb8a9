use std::path::PathBuf;

/// 按主题聚合的一组源文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroup {
    /// 推断出的主题名
    pub topic: String,
    /// 组内文件（保持输入顺序）
    pub paths: Vec<PathBuf>,
}

impl FileGroup {
    pub fn new(topic: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        Self {
            topic: topic.into(),
            paths,
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
