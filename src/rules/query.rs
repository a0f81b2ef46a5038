use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ExportResult;
use crate::vocab::MAP;

/// Which node of a rule row a column is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnTarget {
    Rule,
    Nested,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub column: String,
    pub predicate: String,
    #[serde(default = "default_target")]
    pub on: ColumnTarget,
    /// Optional columns may be absent; a row missing a required one is not
    /// a row at all.
    #[serde(default)]
    pub optional: bool,
}

fn default_target() -> ColumnTarget {
    ColumnTarget::Rule
}

impl ColumnBinding {
    pub fn rule(column: &str, predicate: &str) -> Self {
        Self {
            column: column.to_string(),
            predicate: predicate.to_string(),
            on: ColumnTarget::Rule,
            optional: false,
        }
    }

    pub fn nested(column: &str, predicate: &str) -> Self {
        Self {
            column: column.to_string(),
            predicate: predicate.to_string(),
            on: ColumnTarget::Nested,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Declarative selection of rule rows from a rule graph.
///
/// Every node linked to `mapping_class` (through any predicate) is a rule.
/// When `nested` is set, each object of that predicate on the rule yields
/// its own row, otherwise the rule yields one row. The `rule` column always
/// holds the rule IRI; bound columns take the first value found. A node
/// lacking a required column yields no row, a missing optional column is
/// left out of the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleQuery {
    pub mapping_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<String>,
    pub columns: Vec<ColumnBinding>,
}

impl RuleQuery {
    pub fn default_subjects() -> Self {
        Self {
            mapping_class: MAP::MAPPING.to_string(),
            nested: None,
            columns: vec![
                ColumnBinding::rule("type", MAP::TYPE),
                ColumnBinding::rule("baseURI", MAP::BASE_URI),
                ColumnBinding::rule("GATEtype", MAP::GATE_TYPE),
            ],
        }
    }

    pub fn default_properties() -> Self {
        Self {
            mapping_class: MAP::MAPPING.to_string(),
            nested: Some(MAP::HAS_MAPPING.to_string()),
            columns: vec![
                ColumnBinding::rule("GATEtype", MAP::GATE_TYPE),
                ColumnBinding::nested("type", MAP::TYPE),
                ColumnBinding::nested("GATEfeature", MAP::GATE_FEATURE).optional(),
                ColumnBinding::nested("GATEattribute", MAP::GATE_ATTRIBUTE).optional(),
            ],
        }
    }

    pub fn default_relations() -> Self {
        Self {
            mapping_class: MAP::MAPPING.to_string(),
            nested: None,
            columns: vec![
                ColumnBinding::rule("type", MAP::TYPE),
                ColumnBinding::rule("domain", MAP::DOMAIN),
                ColumnBinding::rule("range", MAP::RANGE),
                ColumnBinding::rule("GATEattribute", MAP::GATE_ATTRIBUTE).optional(),
            ],
        }
    }
}

/// The three queries that materialise a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleQueries {
    #[serde(default = "RuleQuery::default_subjects")]
    pub subjects: RuleQuery,
    #[serde(default = "RuleQuery::default_properties")]
    pub properties: RuleQuery,
    #[serde(default = "RuleQuery::default_relations")]
    pub relations: RuleQuery,
}

impl Default for RuleQueries {
    fn default() -> Self {
        Self {
            subjects: RuleQuery::default_subjects(),
            properties: RuleQuery::default_properties(),
            relations: RuleQuery::default_relations(),
        }
    }
}

/// One result row: column name to IRI or literal text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleRow {
    columns: BTreeMap<String, String>,
}

impl RuleRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: &str) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.columns.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

pub trait RuleSource {
    fn select(&self, query: &RuleQuery) -> ExportResult<Vec<RuleRow>>;
}
