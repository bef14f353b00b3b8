/// `load_config` module: loads the optional static YAML config and merges it with
/// flags and environment values into the settings used by a sync run.
///
/// This module is the only place where user-supplied YAML is parsed and where
/// loosely-typed CLI values become the strongly-typed core [`SyncConfig`] and
/// the per-bucket [`S3Settings`].
///
/// # Responsibilities
/// - Parse the YAML file into [`FileConfig`]. The file never holds credentials.
/// - Overlay explicit [`SyncArgs`] values on top of the file values.
/// - Fail with a message naming the flag and environment variable of every
///   missing setting, and reject empty report names or allow-lists.
///
/// # Errors
/// All errors use `anyhow::Error` and surface at the CLI boundary.
use anyhow::{anyhow, bail, Context, Result};
use linked_reports_core::config::{ReportLocation, SyncConfig, UsageAccountSet};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::cli::SyncArgs;
use crate::storage::S3Settings;

/// Non-secret settings read from the YAML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub source: LocationSection,
    #[serde(default)]
    pub target: LocationSection,
    pub usage_account_ids: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationSection {
    pub bucket_name: Option<String>,
    pub report_path_prefix: Option<String>,
    pub report_name: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

/// Everything a sync run needs, fully validated.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub sync: SyncConfig,
    pub source: S3Settings,
    pub target: S3Settings,
}

/// Loads a static YAML config file (no secrets).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    match serde_yaml::from_str::<FileConfig>(&config_content) {
        Ok(config) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(config)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

/// Merges `args` over `file` and validates the result.
pub fn resolve_config(file: Option<FileConfig>, args: &SyncArgs) -> Result<ResolvedConfig> {
    let file = file.unwrap_or_default();
    let args = args.clone();

    let source_report_name = required(
        args.source_report_name.or(file.source.report_name),
        "source_report_name",
    )?;
    let target_report_name = required(
        args.target_report_name.or(file.target.report_name),
        "target_report_name",
    )?;
    for (setting, name) in [
        ("source_report_name", &source_report_name),
        ("target_report_name", &target_report_name),
    ] {
        if name.is_empty() {
            bail!("setting `{setting}` must not be empty");
        }
    }

    let source = ReportLocation::new(
        required(
            args.source_report_path_prefix.or(file.source.report_path_prefix),
            "source_report_path_prefix",
        )?,
        source_report_name,
    );
    let target = ReportLocation::new(
        required(
            args.target_report_path_prefix.or(file.target.report_path_prefix),
            "target_report_path_prefix",
        )?,
        target_report_name,
    );

    let usage_account_ids = UsageAccountSet::parse(&required(
        args.usage_account_ids.or(file.usage_account_ids),
        "usage_account_ids",
    )?);
    if usage_account_ids.is_empty() {
        bail!("setting `usage_account_ids` must name at least one account");
    }

    let source_settings = S3Settings {
        bucket_name: required(
            args.source_bucket_name.or(file.source.bucket_name),
            "source_bucket_name",
        )?,
        access_key_id: required(args.source_access_key_id, "source_access_key_id")?,
        secret_access_key: required(args.source_secret_access_key, "source_secret_access_key")?,
        region: args.source_region.or(file.source.region),
        endpoint_url: args.source_endpoint_url.or(file.source.endpoint_url),
    };
    let target_settings = S3Settings {
        bucket_name: required(
            args.target_bucket_name.or(file.target.bucket_name),
            "target_bucket_name",
        )?,
        access_key_id: required(args.target_access_key_id, "target_access_key_id")?,
        secret_access_key: required(args.target_secret_access_key, "target_secret_access_key")?,
        region: args.target_region.or(file.target.region),
        endpoint_url: args.target_endpoint_url.or(file.target.endpoint_url),
    };

    info!(
        source_bucket = %source_settings.bucket_name,
        target_bucket = %target_settings.bucket_name,
        "Resolved sync configuration"
    );
    Ok(ResolvedConfig {
        sync: SyncConfig {
            source,
            target,
            usage_account_ids,
        },
        source: source_settings,
        target: target_settings,
    })
}

fn required(value: Option<String>, setting: &str) -> Result<String> {
    value.with_context(|| {
        format!(
            "missing required setting `{setting}` (flag --{}, env {})",
            setting.replace('_', "-"),
            setting.to_uppercase()
        )
    })
}
