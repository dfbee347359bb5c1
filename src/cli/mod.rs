use std::path::PathBuf;

use clap::Parser;

use crate::config::GatewayOptions;

#[derive(Parser, Debug)]
#[command(name = "runnel")]
#[command(about = "Presents a status timeline as an IRC channel", long_about = None)]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Port number to listen on [default: 16672]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host name or IP address to listen on [default: localhost]
    #[arg(short = 'h', long)]
    pub host: Option<String>,

    /// Log file, rotated daily (ignored with --debug or --foreground)
    #[arg(short, long)]
    pub log: Option<PathBuf>,

    /// Enable debug logging to stdout
    #[arg(long)]
    pub debug: bool,

    /// Run in foreground, logging to stdout
    #[arg(short, long)]
    pub foreground: bool,

    /// Option string used instead of the client's real name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Configuration file [default: ~/.config/runnel/config.toml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print help
    #[arg(long, action = clap::ArgAction::Help)]
    pub help: Option<bool>,
}

impl Cli {
    pub fn options(&self) -> GatewayOptions {
        GatewayOptions {
            port: self.port,
            host: self.host.clone(),
            log: self.log.clone(),
            debug: self.debug,
            foreground: self.foreground,
            name: self.name.clone(),
        }
    }
}
