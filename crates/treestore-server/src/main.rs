//! treestore CLI
//!
//! Loads the catalog from the seed file and the remote dataset, then serves
//! it over HTTP until the process is stopped.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use treestore_core::TreeStore;
use treestore_server::{http, ingest, Config, ServiceResult};

#[derive(Debug, Parser)]
#[command(name = "treestore", version, about = "Catalog of remarkable trees over HTTP")]
struct Cli {
    /// Listen address
    #[arg(long)]
    bind: Option<String>,

    /// Request worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Seed file (JSON array of trees)
    #[arg(long, conflicts_with = "no_seed")]
    seed: Option<PathBuf>,

    /// Skip the seed file
    #[arg(long)]
    no_seed: bool,

    /// Do not fetch the remote dataset
    #[arg(long)]
    offline: bool,

    /// Remote records endpoint
    #[arg(long, conflicts_with = "offline")]
    endpoint: Option<String>,

    /// Records per remote page
    #[arg(long, conflicts_with = "offline")]
    page_size: Option<usize>,

    /// Corpus size when the server does not report one
    #[arg(long, conflicts_with = "offline")]
    corpus_size: Option<usize>,

    /// Timeout of one remote page request, in seconds
    #[arg(long, conflicts_with = "offline")]
    timeout_secs: Option<u64>,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = if self.offline { Config::offline() } else { Config::paris() };

        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.no_seed {
            config.seed_path = None;
        } else if let Some(seed) = self.seed {
            config.seed_path = Some(seed);
        }
        if let Some(remote) = config.remote.as_mut() {
            if let Some(endpoint) = self.endpoint {
                remote.endpoint = endpoint;
            }
            if let Some(page_size) = self.page_size {
                remote.page_size = page_size;
            }
            if let Some(corpus_size) = self.corpus_size {
                remote.corpus_size = corpus_size;
            }
            if let Some(secs) = self.timeout_secs {
                remote.timeout = Duration::from_secs(secs);
            }
        }
        config
    }
}

fn run(config: Config) -> ServiceResult<()> {
    config.validate()?;

    let store = Arc::new(TreeStore::new());
    let report = ingest::bootstrap(&store, &config);
    if report.seeded == 0 && report.fetched == 0 {
        info!("starting with an empty catalog");
    }

    let server = http::bind(&config.bind_addr)?;
    info!(addr = %config.bind_addr, "listening");
    http::serve(Arc::new(server), store, config.workers)
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = Cli::parse().into_config();
    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "treestore stopped");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("treestore").chain(args.iter().copied()))
    }

    #[test]
    fn test_remote_flags_conflict_with_offline() {
        for flag in ["--endpoint", "--page-size", "--corpus-size", "--timeout-secs"] {
            let value = if flag == "--endpoint" { "http://localhost/records" } else { "5" };
            let err = parse(&["--offline", flag, value]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict, "{}", flag);
        }
    }

    #[test]
    fn test_remote_overrides() {
        let config = parse(&["--page-size", "50", "--corpus-size", "120", "--timeout-secs", "3"])
            .unwrap()
            .into_config();
        let remote = config.remote.unwrap();
        assert_eq!(remote.page_size, 50);
        assert_eq!(remote.corpus_size, 120);
        assert_eq!(remote.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_offline_no_seed() {
        let config = parse(&["--offline", "--no-seed"]).unwrap().into_config();
        assert!(config.remote.is_none());
        assert!(config.seed_path.is_none());
    }
}
