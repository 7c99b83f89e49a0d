use clap::{Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "yt2m4a")]
#[command(author, version, about = "Turn a YouTube link into a streamed M4A download", long_about = None)]
pub struct Cli {
    /// Log level: off, error, warn, info, debug, trace
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server (default)
    Serve {
        /// Bind host, overrides WEB_HOST
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overrides WEB_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print metadata for a video as JSON
    Info {
        /// YouTube URL
        url: String,
    },

    /// Check that yt-dlp can be executed and print its version
    Check,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The `--log-level` value as a filter.
    pub fn level_filter(&self) -> anyhow::Result<LevelFilter> {
        parse_level(&self.log_level)
    }
}

fn parse_level(raw: &str) -> anyhow::Result<LevelFilter> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "off" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        other => Err(anyhow::anyhow!("Unknown log level: {}", other)),
    }
}
