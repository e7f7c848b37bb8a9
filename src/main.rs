use anyhow::Result;
use clap::Parser;

use notebook_autopilot::cli::Cli;
use notebook_autopilot::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.verbose {
        config.verbose_logging = true;
    }

    App::new(config).execute(cli.into_command()).await
}
