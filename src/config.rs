use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ExportError, ExportResult};
use crate::export::DocumentUriPolicy;
use crate::rules::RuleQueries;
use crate::vocab::{DEFAULT_CORPUS_BASE, DEFAULT_RELATION_BASE};

const DEFAULT_TIME_ZONE: &str = "-05:00";

/// Where the mapping rules live, which also picks the export mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleLocation {
    /// Rules from a Turtle file; each document goes to its own output file.
    MappingFile(PathBuf),
    /// Rules and output share one persistent store.
    Store(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub mapping_file: Option<PathBuf>,
    pub store_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub queries: RuleQueries,
    pub input_set: Option<String>,
    pub custom_uri: bool,
    pub corpus_name: String,
    pub pipeline_name: String,
    pub time_zone: String,
    pub corpus_base: String,
    pub relation_base: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            mapping_file: None,
            store_dir: None,
            output_dir: PathBuf::from("/tmp"),
            queries: RuleQueries::default(),
            input_set: None,
            custom_uri: false,
            corpus_name: "corpus".to_string(),
            pipeline_name: "lodx".to_string(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            corpus_base: DEFAULT_CORPUS_BASE.to_string(),
            relation_base: DEFAULT_RELATION_BASE.to_string(),
        }
    }
}

impl ExporterConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration {:?}", path))?;
        serde_json::from_str(&data).with_context(|| format!("invalid configuration JSON in {:?}", path))
    }

    pub fn with_mapping_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.mapping_file = Some(path.into());
        self
    }

    pub fn with_store_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(path.into());
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_input_set(mut self, name: impl Into<String>) -> Self {
        self.input_set = Some(name.into());
        self
    }

    pub fn with_custom_uri(mut self, custom: bool) -> Self {
        self.custom_uri = custom;
        self
    }

    pub fn with_corpus_name(mut self, name: impl Into<String>) -> Self {
        self.corpus_name = name.into();
        self
    }

    pub fn with_pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = name.into();
        self
    }

    pub fn with_time_zone(mut self, offset: impl Into<String>) -> Self {
        self.time_zone = offset.into();
        self
    }

    /// Exactly one of mapping file and store directory must be set; blank
    /// paths count as unset.
    pub fn rule_location(&self) -> ExportResult<RuleLocation> {
        let set = |p: &Option<PathBuf>| p.clone().filter(|p| !p.as_os_str().is_empty());
        match (set(&self.mapping_file), set(&self.store_dir)) {
            (Some(file), None) => Ok(RuleLocation::MappingFile(file)),
            (None, Some(dir)) => Ok(RuleLocation::Store(dir)),
            (Some(_), Some(_)) => Err(ExportError::BothRuleSources),
            (None, None) => Err(ExportError::NoRuleSource),
        }
    }

    pub fn uri_policy(&self) -> DocumentUriPolicy {
        if self.custom_uri {
            DocumentUriPolicy::Custom
        } else {
            DocumentUriPolicy::DerivedFromSource
        }
    }

    pub fn utc_offset(&self) -> ExportResult<FixedOffset> {
        parse_offset(&self.time_zone).ok_or_else(|| ExportError::InvalidTimeZone(self.time_zone.clone()))
    }
}

fn parse_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = if let Some(rest) = value.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = value.strip_prefix('-') {
        (-1, rest)
    } else {
        return None;
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
