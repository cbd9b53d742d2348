//! Hive 命令行入口
//!
//! 用法：hive "<task>" [config-file]

use std::path::PathBuf;

use anyhow::Context;
use hive::config::{load_config, ConfigOverrides};
use hive::OrchestratorBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hive::observability::init();

    let mut args = std::env::args().skip(1);
    let task = args
        .next()
        .context("usage: hive \"<task>\" [config-file]")?;
    let config_path = args.next().map(PathBuf::from);

    let config = load_config(config_path, &ConfigOverrides::default())
        .context("Failed to resolve configuration")?;
    let orchestrator = OrchestratorBuilder::new(config)
        .build()
        .context("Failed to build orchestrator")?;
    let outcome = orchestrator.run(&task).await.context("Run failed")?;

    println!("{}", outcome.answer);
    if !outcome.files.is_empty() {
        eprintln!("\nworkspace files:");
        for f in &outcome.files {
            eprintln!("  {} ({} bytes)", f.path, f.content.len());
        }
    }
    Ok(())
}
