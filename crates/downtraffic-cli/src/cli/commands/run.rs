//! `downtraffic run` – start the workers and wait for a stop condition.

use anyhow::{Context, Result};
use downtraffic_core::config::{self, DtConfig};
use downtraffic_core::engine::{
    resolve_stop_condition, Engine, EngineConfig, EngineError, ParityRequest, Resolution,
    StopRequest,
};
use downtraffic_core::ifstats::StatsReader;
use downtraffic_core::sources::SourceList;
use downtraffic_core::units::{parse_duration, parse_size};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::{render, signals, RunArgs};

/// Flags merged over the config file, with quantities parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunSettings {
    pub workers: usize,
    pub deadline: Duration,
    pub url_file: Option<PathBuf>,
    pub stop: StopRequest,
}

pub(crate) fn resolve_settings(args: &RunArgs, cfg: &DtConfig) -> Result<RunSettings, EngineError> {
    let workers = args.workers.unwrap_or(cfg.workers);
    if workers == 0 {
        return Err(EngineError::NoWorkers);
    }
    let deadline = parse_duration(&args.duration)?;
    let byte_cap = parse_size(&args.limit)?;
    let offset = parse_size(&args.offset)?;
    let parity = args.balance.then(|| ParityRequest {
        interface: args
            .interface
            .clone()
            .or_else(|| cfg.default_interface.clone()),
        offset,
    });
    Ok(RunSettings {
        workers,
        deadline,
        url_file: args.url_file.clone().or_else(|| cfg.url_file.clone()),
        stop: StopRequest { byte_cap, parity },
    })
}

pub async fn run_engine(args: RunArgs) -> Result<()> {
    let cfg = config::load_or_init().context("loading config")?;
    tracing::debug!("loaded config: {:?}", cfg);
    let settings = resolve_settings(&args, &cfg)?;

    let sources = SourceList::load(settings.url_file.as_deref());
    let stats = StatsReader::for_host();

    let stop = match resolve_stop_condition(&settings.stop, &stats)? {
        Resolution::Run(stop) => stop,
        Resolution::AlreadyBalanced {
            interface,
            sample,
            offset,
        } => {
            println!("{}", render::no_download_needed(&interface, &sample, offset));
            return Ok(());
        }
    };

    let mut engine_cfg = EngineConfig::from_config(&cfg, stop, Arc::new(sources))
        .with_deadline(settings.deadline);
    engine_cfg.workers = settings.workers;
    engine_cfg.show_progress = !args.quiet;

    let engine = Engine::new(engine_cfg, Arc::new(stats))?;
    if !args.quiet {
        println!("{}", render::banner(engine.config()));
    }

    let listener = signals::spawn_interrupt_listener(engine.cancel_signal());
    let summary = tokio::task::spawn_blocking(move || engine.run())
        .await
        .context("engine task join")??;
    listener.abort();

    println!("{}", render::summary(&summary));
    Ok(())
}
