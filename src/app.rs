use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::application::{CycleOptions, FolderPolicy, RunSummary};
use crate::domain::error::Result;
use crate::domain::status_map::StatusPreset;
use crate::infrastructure::bootstrap::build_publisher;
use crate::infrastructure::config::ConfigService;
use crate::infrastructure::storage::load_records;
use crate::interfaces::cli::{Cli, Commands};

const EXIT_OK: u8 = 0;
const EXIT_GROUP_FAILURES: u8 = 1;
const EXIT_ABORTED: u8 = 2;

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "Failed to start async runtime");
            return ExitCode::from(EXIT_ABORTED);
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            error!(error = %err, "Run aborted");
            ExitCode::from(EXIT_ABORTED)
        }
    }
}

/// `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: u8) {
    let default_level = if verbose > 0 { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn dispatch(cli: Cli) -> Result<u8> {
    let config_service = ConfigService::new(cli.config);

    match cli.command {
        Commands::CheckConfig => {
            let config = config_service.load()?;
            build_publisher(&config, FolderPolicy::AncestorSuite, StatusPreset::Jest)?;
            info!(
                config_file = %config_service.path().display(),
                catalog = %config.zephyr.domain,
                tracker = %config.jira.domain,
                "Configuration is valid"
            );
            Ok(EXIT_OK)
        }
        Commands::Publish {
            input,
            policy,
            feature_suffix,
            status_preset,
            cycle_prefix,
            cycle_folder,
        } => {
            let config = config_service.load()?;
            let records = load_records(&input)?;
            info!(input = %input.display(), records = records.len(), "Test records loaded");

            let publisher = build_publisher(
                &config,
                policy.into_policy(&feature_suffix),
                status_preset.into(),
            )?;
            let summary = publisher
                .execute(
                    records,
                    &CycleOptions {
                        name_prefix: cycle_prefix,
                        folder_id: cycle_folder,
                    },
                )
                .await?;
            Ok(exit_status(&summary))
        }
    }
}

fn exit_status(summary: &RunSummary) -> u8 {
    if summary.has_failures() {
        for failure in &summary.failures {
            warn!(group = %failure.group, stage = %failure.stage, "Group not published");
        }
        EXIT_GROUP_FAILURES
    } else {
        EXIT_OK
    }
}
