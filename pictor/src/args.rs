use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Pictor image generation service
#[derive(Debug, Parser)]
#[command(name = "pictor", about = "Image generation endpoint backed by Vertex AI and Cloud Storage")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "pictor.toml", env = "PICTOR_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "PICTOR_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log filter directives, e.g. `info` or `pictor_imagegen=debug,info`
    #[arg(long, default_value = "info", env = "PICTOR_LOG")]
    pub log_filter: String,
}
