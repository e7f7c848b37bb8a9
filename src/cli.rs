//! 命令行参数定义

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::config::Config;

/// NotebookLM 批处理：报告、音频概览、导出
#[derive(Parser, Debug)]
#[command(name = "notebook-autopilot", version, about, long_about = None)]
pub struct Cli {
    /// 配置文件路径（TOML）
    #[arg(short, long, global = true, env = "AUTOPILOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// 控制台输出调试日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 处理指定日期创建的笔记本和近期下载的文件（默认）
    Run(RunArgs),

    /// 打开第一个笔记本，导出页面控件结构
    Diagnose {
        /// 浏览器用户数据目录
        #[arg(long)]
        user_data_dir: Option<PathBuf>,

        /// 输出目录
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// 领取并拆分电子书，每个章节建一个笔记本处理
    Pipeline {
        #[command(flatten)]
        run: RunArgs,

        /// 跳过领取，使用下载目录中已有的 PDF
        #[arg(long)]
        skip_claim: bool,

        /// 跳过拆分，使用已有的章节文件
        #[arg(long)]
        skip_split: bool,

        /// 跳过领取和拆分，直接读取书籍目录中的章节
        #[arg(long)]
        from_existing: bool,

        /// 书籍目录
        #[arg(long)]
        books_dir: Option<PathBuf>,

        /// 购买凭证 PDF
        #[arg(long)]
        invoice: Option<PathBuf>,
    },

    /// 拆分已下载但未拆分的电子书，并清理无用章节
    Split {
        /// 书籍目录
        #[arg(long)]
        books_dir: Option<PathBuf>,

        /// 下载目录
        #[arg(long)]
        downloads_dir: Option<PathBuf>,

        /// 只清理，不拆分
        #[arg(long)]
        skip_split: bool,

        /// 只拆分，不清理
        #[arg(long)]
        skip_clean: bool,
    },
}

/// `run` 与 `pipeline` 共用的参数
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// 目标日期（YYYY-MM-DD），默认今天
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// 浏览器用户数据目录
    #[arg(long)]
    pub user_data_dir: Option<PathBuf>,

    /// 输出根目录
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// 扫描近期文件的目录
    #[arg(long)]
    pub downloads_dir: Option<PathBuf>,
}

impl RunArgs {
    /// 命令行参数覆盖配置
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.user_data_dir {
            config.user_data_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_root = dir.clone();
        }
        if let Some(dir) = &self.downloads_dir {
            config.downloads_dir = dir.clone();
        }
    }
}

impl Cli {
    /// 未指定子命令时执行 `run`
    pub fn into_command(self) -> Command {
        self.command
            .unwrap_or_else(|| Command::Run(RunArgs::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli::parse_from(["notebook-autopilot"]);
        assert!(matches!(cli.into_command(), Command::Run(_)));
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::parse_from([
            "notebook-autopilot",
            "-v",
            "run",
            "--date",
            "2025-06-28",
            "--downloads-dir",
            "/tmp/dl",
        ]);
        assert!(cli.verbose);
        let Command::Run(args) = cli.into_command() else {
            panic!("expected run");
        };
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2025, 6, 28));

        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.downloads_dir, PathBuf::from("/tmp/dl"));
    }

    #[test]
    fn test_pipeline_flags() {
        let cli = Cli::parse_from([
            "notebook-autopilot",
            "pipeline",
            "--skip-claim",
            "--books-dir",
            "books",
        ]);
        match cli.into_command() {
            Command::Pipeline {
                skip_claim,
                skip_split,
                books_dir,
                ..
            } => {
                assert!(skip_claim);
                assert!(!skip_split);
                assert_eq!(books_dir, Some(PathBuf::from("books")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        assert!(Cli::try_parse_from(["notebook-autopilot", "run", "--date", "28/06/2025"]).is_err());
    }
}
