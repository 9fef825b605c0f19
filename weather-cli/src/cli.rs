use anyhow::Context;
use clap::{Parser, Subcommand};
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};
use tracing::{error, info, warn};
use weather_core::{Pipeline, PipelineConfig, RunSummary};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather-etl",
    version,
    about = "Fetch current weather for configured cities into CSV and PostgreSQL"
)]
pub struct Cli {
    /// Config file (TOML). Defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline once. This is the default.
    Run {
        /// Directory for the CSV artifacts; overrides config and WEATHER_DATA_DIR.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Run the pipeline on a fixed interval until interrupted.
    Schedule {
        #[arg(long, default_value_t = 10)]
        every_minutes: u64,

        /// Extra attempts for a run whose sinks failed.
        #[arg(long, default_value_t = 1)]
        retries: u32,

        #[arg(long, default_value_t = 120)]
        retry_delay_secs: u64,
    },

    /// Write the default configuration to the config file.
    InitConfig {
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },

    /// List configured cities in fetch order.
    Cities,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        match self.command.unwrap_or(Command::Run { data_dir: None }) {
            Command::Run { data_dir } => {
                let config = run_config(self.config, data_dir)?;
                let pipeline = Pipeline::from_config(config)?;
                let summary = pipeline.run().await;
                println!("{summary}");

                Ok(exit_code(&summary))
            }
            Command::Schedule {
                every_minutes,
                retries,
                retry_delay_secs,
            } => {
                let config = PipelineConfig::load(self.config)?;
                let pipeline = Pipeline::from_config(config)?;
                let trigger = Trigger {
                    every: interval_from_minutes(every_minutes),
                    retries,
                    retry_delay: Duration::from_secs(retry_delay_secs),
                };

                tokio::select! {
                    _ = trigger.drive(&pipeline) => {}
                    res = tokio::signal::ctrl_c() => {
                        res.context("Failed to listen for Ctrl-C")?;
                        info!("interrupted, stopping schedule");
                    }
                }

                Ok(ExitCode::SUCCESS)
            }
            Command::InitConfig { force } => {
                let path = match self.config {
                    Some(path) => path,
                    None => PipelineConfig::config_file_path()?,
                };
                init_config(&path, force)?;
                println!("Wrote default configuration to {}", path.display());

                Ok(ExitCode::SUCCESS)
            }
            Command::Cities => {
                let config = PipelineConfig::load(self.config)?;
                for line in city_lines(&config) {
                    println!("{line}");
                }

                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// Config for a single run; `--data-dir` beats both the file and the environment.
fn run_config(path: Option<PathBuf>, data_dir: Option<PathBuf>) -> anyhow::Result<PipelineConfig> {
    let mut config = PipelineConfig::load(path)?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    Ok(config)
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}\nHint: pass --force to overwrite it.",
            path.display()
        );
    }

    PipelineConfig::default().save(path)
}

fn city_lines(config: &PipelineConfig) -> Vec<String> {
    config
        .cities
        .iter()
        .map(|city| format!("{}\t{}\t{}", city.name, city.latitude, city.longitude))
        .collect()
}

fn interval_from_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.max(1).saturating_mul(60))
}

fn exit_code(summary: &RunSummary) -> ExitCode {
    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Fires the pipeline on a fixed cadence and retries failed runs.
///
/// Lives outside the core: the pipeline itself knows nothing about schedules.
#[derive(Debug, Clone)]
struct Trigger {
    every: Duration,
    retries: u32,
    retry_delay: Duration,
}

impl Trigger {
    async fn drive(&self, pipeline: &Pipeline) {
        let mut ticker = tokio::time::interval(self.every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let summary = self.run_with_retries(pipeline).await;
            let next = chrono::Utc::now()
                + chrono::Duration::from_std(self.every).unwrap_or(chrono::Duration::zero());
            info!(
                %summary,
                next_run = %next.format("%Y-%m-%dT%H:%M:%SZ"),
                "scheduled run complete"
            );
        }
    }

    async fn run_with_retries(&self, pipeline: &Pipeline) -> RunSummary {
        let mut summary = pipeline.run().await;
        let mut attempt = 0;

        while !summary.is_success() && attempt < self.retries {
            attempt += 1;
            warn!(attempt, delay_secs = self.retry_delay.as_secs(), "run failed, retrying");
            tokio::time::sleep(self.retry_delay).await;
            summary = pipeline.run().await;
        }

        if !summary.is_success() {
            error!(%summary, "run failed after retries");
        }
        summary
    }
}
