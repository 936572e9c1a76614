use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    razshelf::logging::init().context("init logging")?;

    let cli = razshelf::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        razshelf::cli::Command::Generate(args) => {
            razshelf::generate::run(args).context("generate")?;
        }
        razshelf::cli::Command::Upload(args) => {
            razshelf::ingest::upload(args).await.context("upload")?;
        }
        razshelf::cli::Command::Check(args) => {
            razshelf::ingest::check(args).await.context("check")?;
        }
        razshelf::cli::Command::Content(args) => {
            razshelf::content::run(args).await.context("content")?;
        }
    }

    Ok(())
}
