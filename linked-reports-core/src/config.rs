use std::collections::HashSet;
use std::convert::Infallible;
use std::str::FromStr;

use tracing::{debug, info};

/// Where one side of the mirror keeps its reports inside a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLocation {
    pub path_prefix: String,
    pub report_name: String,
}

impl ReportLocation {
    pub fn new(path_prefix: impl Into<String>, report_name: impl Into<String>) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            report_name: report_name.into(),
        }
    }

    /// Object key prefix under which this report's files live: `{path_prefix}/{report_name}/`.
    pub fn prefix(&self) -> String {
        format!("{}/{}/", self.path_prefix, self.report_name)
    }
}

/// The source and target report names, used to rename paths and archive members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportNames {
    pub source: String,
    pub target: String,
}

impl ReportNames {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Replaces the first occurrence of the source report name with the target one.
    ///
    /// Only the first occurrence is rewritten, so a path segment that happens to
    /// repeat the report name further along is left untouched.
    pub fn rename(&self, name: &str) -> String {
        name.replacen(&self.source, &self.target, 1)
    }
}

/// The usage account identifiers whose line items are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageAccountSet(HashSet<String>);

impl UsageAccountSet {
    /// Splits `input` on commas, trims every token and drops empty ones.
    pub fn parse(input: &str) -> Self {
        input
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.0.contains(account_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for UsageAccountSet {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl<S: Into<String>> FromIterator<S> for UsageAccountSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Everything the planner needs for one pass, independent of how storage is reached.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub source: ReportLocation,
    pub target: ReportLocation,
    pub usage_account_ids: UsageAccountSet,
}

impl SyncConfig {
    pub fn report_names(&self) -> ReportNames {
        ReportNames::new(&self.source.report_name, &self.target.report_name)
    }

    pub fn trace_loaded(&self) {
        info!(
            source_prefix = %self.source.prefix(),
            target_prefix = %self.target.prefix(),
            usage_accounts = self.usage_account_ids.len(),
            "Loaded SyncConfig"
        );
        debug!(config = ?self, "SyncConfig loaded (full debug)");
    }
}
