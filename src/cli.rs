///
/// This module implements the CLI interface for linked-reports: command parsing,
/// argument and environment exposure, and the async `run` entrypoint.
///
/// All business logic (catalogs, row filtering, archive transcoding, the sync
/// planner) lives in the [`linked-reports-core`] crate. This module only wires
/// configuration, S3 clients and the tracing observer into it.
///
/// ## How To Use
/// - For command-line users: `linked-reports sync --help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// ## Settings
/// Every [`SyncArgs`] value can be given as a kebab-case flag, its snake_case
/// alias, or an upper-cased environment variable. Non-secret values may also
/// come from a YAML file passed with `--config`; flags win over the file.
///
/// [`linked-reports-core`]: ../../linked-reports-core/
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use linked_reports_core::observer::TracingObserver;
use linked_reports_core::synchronise::synchronise;
use std::path::PathBuf;

use crate::load_config::{load_config, resolve_config};
use crate::storage::S3ReportStore;

/// CLI for linked-reports: publish filtered copies of cost and usage reports.
#[derive(Parser)]
#[clap(
    name = "linked-reports",
    version,
    about = "Mirror cost and usage reports into another bucket, keeping only selected usage accounts"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process every source report that is missing or stale in the target location
    Sync {
        /// Path to a YAML file with non-secret location settings
        #[clap(long)]
        config: Option<PathBuf>,

        #[clap(flatten)]
        args: SyncArgs,
    },
}

/// Location settings and credentials for both buckets.
#[derive(Debug, Clone, Default, Args)]
pub struct SyncArgs {
    /// Bucket holding the unfiltered reports
    #[clap(long, alias = "source_bucket_name", env = "SOURCE_BUCKET_NAME")]
    pub source_bucket_name: Option<String>,

    /// Path prefix of the unfiltered report inside the source bucket
    #[clap(long, alias = "source_report_path_prefix", env = "SOURCE_REPORT_PATH_PREFIX")]
    pub source_report_path_prefix: Option<String>,

    /// Name of the unfiltered report
    #[clap(long, alias = "source_report_name", env = "SOURCE_REPORT_NAME")]
    pub source_report_name: Option<String>,

    #[clap(long, alias = "source_access_key_id", env = "SOURCE_ACCESS_KEY_ID")]
    pub source_access_key_id: Option<String>,

    #[clap(
        long,
        alias = "source_secret_access_key",
        env = "SOURCE_SECRET_ACCESS_KEY",
        hide_env_values = true
    )]
    pub source_secret_access_key: Option<String>,

    /// Region of the source bucket; the AWS default chain decides when unset
    #[clap(long, alias = "source_region", env = "SOURCE_REGION")]
    pub source_region: Option<String>,

    /// Custom endpoint for S3-compatible source stores
    #[clap(long, alias = "source_endpoint_url", env = "SOURCE_ENDPOINT_URL")]
    pub source_endpoint_url: Option<String>,

    /// Bucket receiving the filtered reports
    #[clap(long, alias = "target_bucket_name", env = "TARGET_BUCKET_NAME")]
    pub target_bucket_name: Option<String>,

    /// Path prefix of the filtered report inside the target bucket
    #[clap(long, alias = "target_report_path_prefix", env = "TARGET_REPORT_PATH_PREFIX")]
    pub target_report_path_prefix: Option<String>,

    /// Name of the filtered report; replaces the source report name in paths and file names
    #[clap(long, alias = "target_report_name", env = "TARGET_REPORT_NAME")]
    pub target_report_name: Option<String>,

    #[clap(long, alias = "target_access_key_id", env = "TARGET_ACCESS_KEY_ID")]
    pub target_access_key_id: Option<String>,

    #[clap(
        long,
        alias = "target_secret_access_key",
        env = "TARGET_SECRET_ACCESS_KEY",
        hide_env_values = true
    )]
    pub target_secret_access_key: Option<String>,

    /// Region of the target bucket; the AWS default chain decides when unset
    #[clap(long, alias = "target_region", env = "TARGET_REGION")]
    pub target_region: Option<String>,

    /// Custom endpoint for S3-compatible target stores
    #[clap(long, alias = "target_endpoint_url", env = "TARGET_ENDPOINT_URL")]
    pub target_endpoint_url: Option<String>,

    /// Comma-separated usage account IDs whose line items are kept
    #[clap(long, alias = "usage_account_ids", env = "USAGE_ACCOUNT_IDS")]
    pub usage_account_ids: Option<String>,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config, args } => {
            let file_config = config.map(load_config).transpose()?;
            let resolved = resolve_config(file_config, &args)?;
            resolved.sync.trace_loaded();
            tracing::info!(command = "sync", "Starting synchronisation process");

            let source_store = S3ReportStore::connect(resolved.source).await;
            let target_store = S3ReportStore::connect(resolved.target).await;

            let result =
                synchronise(&resolved.sync, &source_store, &target_store, &TracingObserver).await;
            match result {
                Ok(report) => {
                    tracing::info!(
                        command = "sync",
                        processed = report.processed.len(),
                        skipped = report.skipped.len(),
                        "Synchronisation complete"
                    );
                    match serde_json::to_string(&report) {
                        Ok(json) => tracing::debug!(command = "sync", report = %json, "Synchronisation report"),
                        Err(e) => tracing::warn!(error = %e, "Could not serialise synchronisation report"),
                    }
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    Err(anyhow::Error::new(e).context("Synchronisation failed"))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_aliases_are_accepted() {
        let cli = Cli::try_parse_from([
            "linked-reports",
            "sync",
            "--source_bucket_name",
            "billing-master",
            "--target-bucket-name",
            "billing-linked",
            "--usage_account_ids",
            "111,333",
        ])
        .expect("Arguments should parse");

        let Commands::Sync { config, args } = cli.command;
        assert!(config.is_none());
        assert_eq!(args.source_bucket_name.as_deref(), Some("billing-master"));
        assert_eq!(args.target_bucket_name.as_deref(), Some("billing-linked"));
        assert_eq!(args.usage_account_ids.as_deref(), Some("111,333"));
    }

    #[test]
    fn config_path_is_parsed() {
        let cli = Cli::try_parse_from(["linked-reports", "sync", "--config", "reports.yaml"])
            .expect("Arguments should parse");

        let Commands::Sync { config, .. } = cli.command;
        assert_eq!(config, Some(PathBuf::from("reports.yaml")));
    }
}
