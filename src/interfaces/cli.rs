use crate::application::FolderPolicy;
use crate::domain::status_map::StatusPreset;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scale-publisher")]
#[command(about = "Publish normalized test results into the test-management catalog")]
pub struct Cli {
    /// TOML settings file; environment variables override its values.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a test cycle and publish every ticket group into it.
    Publish {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = PolicyCli::AncestorSuite)]
        policy: PolicyCli,
        #[arg(long, default_value = "Frontend Unit Tests")]
        feature_suffix: String,
        #[arg(long, value_enum, default_value_t = StatusPresetCli::Jest)]
        status_preset: StatusPresetCli,
        #[arg(long)]
        cycle_prefix: Option<String>,
        #[arg(long)]
        cycle_folder: Option<u64>,
    },
    /// Load and validate settings without contacting any service.
    CheckConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolicyCli {
    AncestorSuite,
    Feature,
    FeaturePath,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatusPresetCli {
    Jest,
    Serenity,
}

impl PolicyCli {
    pub fn into_policy(self, feature_suffix: &str) -> FolderPolicy {
        match self {
            PolicyCli::AncestorSuite => FolderPolicy::AncestorSuite,
            PolicyCli::Feature => FolderPolicy::Feature {
                suffix: feature_suffix.trim().to_string(),
            },
            PolicyCli::FeaturePath => FolderPolicy::FeaturePath,
        }
    }
}

impl From<StatusPresetCli> for StatusPreset {
    fn from(value: StatusPresetCli) -> Self {
        match value {
            StatusPresetCli::Jest => StatusPreset::Jest,
            StatusPresetCli::Serenity => StatusPreset::Serenity,
        }
    }
}
