/// Install the global tracing subscriber. `RAZSHELF_LOG` picks the
/// filter, falling back to `RUST_LOG`, then to `info`. Diagnostics go
/// to stderr so `check` listings on stdout stay machine-readable.
pub fn init() -> anyhow::Result<()> {
    let directives = std::env::var("RAZSHELF_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_owned());
    let filter = tracing_subscriber::EnvFilter::try_new(&directives)
        .map_err(|err| anyhow::anyhow!("invalid log filter {directives:?}: {err}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
