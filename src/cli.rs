//! Command-line interface definitions and argument parsing

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Customer segmentation web service backed by a pre-trained K-Means pipeline
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding encoder.json, scaler.json, kmeans_model.json and
    /// the optional pca.json
    #[arg(short, long, env = "SEGMENT_MODEL_DIR", default_value = "model")]
    pub model_dir: PathBuf,

    /// Address to listen on
    #[arg(long, env = "SEGMENT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "SEGMENT_PORT", default_value = "5000")]
    pub port: u16,

    /// Team members shown on the index page, comma-separated
    #[arg(
        long,
        env = "SEGMENT_TEAM",
        value_delimiter = ',',
        default_values = ["Prasanna", "Kusuma", "Gowtham", "Lavanya", "Tushar"]
    )]
    pub team: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Socket address built from `--host` and `--port`
    pub fn bind_addr(&self) -> crate::Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid host address: {}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Log filter from `RUST_LOG`-style directives, falling back to info
    /// (debug with `--verbose`) when none are given or they do not parse
    pub fn log_filter(&self, directives: Option<&str>) -> EnvFilter {
        let default_level = if self.verbose { "debug" } else { "info" };
        directives
            .filter(|d| !d.trim().is_empty())
            .and_then(|d| EnvFilter::try_new(d).ok())
            .unwrap_or_else(|| EnvFilter::new(default_level))
    }

    /// Team names with surrounding whitespace and blanks removed
    pub fn team_members(&self) -> Vec<String> {
        self.team
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["segment-advisor"]).unwrap();

        assert_eq!(args.model_dir, PathBuf::from("model"));
        assert_eq!(args.port, 5000);
        assert_eq!(args.team_members().len(), 5);
        assert_eq!(
            args.bind_addr().unwrap(),
            "0.0.0.0:5000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_bind_addr() {
        let mut args = Args::try_parse_from([
            "segment-advisor",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--team",
            "Ann, ,Bo",
        ])
        .unwrap();

        assert_eq!(
            args.bind_addr().unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(args.team_members(), vec!["Ann".to_string(), "Bo".to_string()]);

        args.host = "localhost:80".to_string();
        assert!(args.bind_addr().is_err());
    }

    #[test]
    fn test_log_filter() {
        let mut args = Args::try_parse_from(["segment-advisor"]).unwrap();

        assert_eq!(args.log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            args.log_filter(Some("warn")).max_level_hint(),
            Some(LevelFilter::WARN)
        );
        assert_eq!(args.log_filter(Some("")).max_level_hint(), Some(LevelFilter::INFO));

        args.verbose = true;
        assert_eq!(args.log_filter(None).max_level_hint(), Some(LevelFilter::DEBUG));
        // Explicit directives win over --verbose
        assert_eq!(
            args.log_filter(Some("error")).max_level_hint(),
            Some(LevelFilter::ERROR)
        );
    }
}
