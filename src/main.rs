use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use runnel::app::GatewayContext;
use runnel::cli::Cli;
use runnel::config::{Config, GatewayOptions, LogTarget};
use runnel::daemon::Daemon;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let options = cli.options();

    init_tracing(&options)?;

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_options(&options);

    let ctx = GatewayContext::new(config)?;
    Daemon::new(Arc::new(ctx)).run().await?;

    Ok(())
}

fn init_tracing(options: &GatewayOptions) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.log_level()));

    let (writer, ansi) = match options.log_target() {
        LogTarget::Stdout => (BoxMakeWriter::new(std::io::stdout), true),
        LogTarget::File(path) => {
            let appender = daily_appender(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            (BoxMakeWriter::new(appender), false)
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(ansi))
        .with(filter)
        .init();

    Ok(())
}

/// Rolls `path` over once a day as `{file_name}.{date}` in the same directory.
fn daily_appender(path: &Path) -> anyhow::Result<RollingFileAppender> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("Log path {} has no file name", path.display()))?;

    Ok(RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)?)
}
