use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::query::{RuleQueries, RuleRow, RuleSource};
use crate::domain::{
    Mapping, PropertyMapping, RelationBehavior, RelationMapping, SubjectMapping,
};
use crate::error::{ExportError, ExportResult};

/// Compiled, read-only rule indexes shared by every export session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleIndex {
    subjects: Vec<SubjectMapping>,
    #[serde(skip)]
    subject_positions: HashMap<String, usize>,
    properties: HashMap<String, Vec<PropertyMapping>>,
    relations: HashMap<String, Vec<RelationMapping>>,
}

impl RuleIndex {
    /// Runs the three rule queries against `source` and compiles the rows.
    pub fn load(source: &impl RuleSource, queries: &RuleQueries) -> ExportResult<Self> {
        let subjects = source.select(&queries.subjects)?;
        let properties = source.select(&queries.properties)?;
        let relations = source.select(&queries.relations)?;
        Self::from_rows(&subjects, &properties, &relations)
    }

    /// Incomplete rows are logged and skipped; a malformed property rule
    /// fails the whole compilation.
    pub fn from_rows(
        subject_rows: &[RuleRow],
        property_rows: &[RuleRow],
        relation_rows: &[RuleRow],
    ) -> ExportResult<Self> {
        let mut index = RuleIndex::default();
        for row in subject_rows {
            if let Some(mapping) = subject_from_row(row) {
                index.insert_subject(mapping);
            }
        }
        for row in property_rows {
            if let Some(mapping) = property_from_row(row)? {
                index
                    .properties
                    .entry(mapping.rule().to_string())
                    .or_default()
                    .push(mapping);
            }
        }
        for row in relation_rows {
            if let Some(mapping) = relation_from_row(row) {
                index
                    .relations
                    .entry(mapping.domain_rule.clone())
                    .or_default()
                    .push(mapping);
            }
        }
        debug!(
            subjects = index.subjects.len(),
            properties = index.properties.values().map(Vec::len).sum::<usize>(),
            relations = index.relations.values().map(Vec::len).sum::<usize>(),
            "compiled mapping rules"
        );
        Ok(index)
    }

    fn insert_subject(&mut self, mapping: SubjectMapping) {
        if self.subject_positions.contains_key(mapping.rule()) {
            warn!(rule = %mapping.rule(), "duplicate subject rule, keeping the first one");
            return;
        }
        self.subject_positions
            .insert(mapping.rule().to_string(), self.subjects.len());
        self.subjects.push(mapping);
    }

    /// Subject rules in load order.
    pub fn subjects(&self) -> &[SubjectMapping] {
        &self.subjects
    }

    pub fn subject(&self, rule: &str) -> Option<&SubjectMapping> {
        self.subject_positions.get(rule).map(|&i| &self.subjects[i])
    }

    pub fn require_subject(&self, rule: &str) -> ExportResult<&SubjectMapping> {
        self.subject(rule)
            .ok_or_else(|| ExportError::UnknownRule(rule.to_string()))
    }

    /// First subject rule exporting the given annotation type.
    pub fn subject_for_type(&self, source_type: &str) -> Option<&SubjectMapping> {
        self.subjects.iter().find(|m| m.source_type == source_type)
    }

    pub fn properties(&self, rule: &str) -> &[PropertyMapping] {
        self.properties.get(rule).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn relations(&self, domain_rule: &str) -> &[RelationMapping] {
        self.relations.get(domain_rule).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty() && self.properties.is_empty() && self.relations.is_empty()
    }

    /// Every rule, subjects first.
    pub fn mappings(&self) -> Vec<Mapping> {
        let mut all: Vec<Mapping> = self.subjects.iter().cloned().map(Mapping::Subject).collect();
        let mut properties: Vec<&PropertyMapping> = self.properties.values().flatten().collect();
        properties.sort_by(|a, b| a.rule().cmp(b.rule()));
        all.extend(properties.into_iter().cloned().map(Mapping::Property));
        let mut relations: Vec<&RelationMapping> = self.relations.values().flatten().collect();
        relations.sort_by(|a, b| a.rule().cmp(b.rule()));
        all.extend(relations.into_iter().cloned().map(Mapping::Relation));
        all
    }
}

fn subject_from_row(row: &RuleRow) -> Option<SubjectMapping> {
    match (
        row.get("rule"),
        row.get("type"),
        row.get("baseURI"),
        row.get("GATEtype"),
    ) {
        (Some(rule), Some(rdf_type), Some(base_uri), Some(source_type)) => {
            Some(SubjectMapping::new(rule, rdf_type, source_type, base_uri))
        }
        _ => {
            warn!(row = ?row, "incomplete subject rule, skipping");
            None
        }
    }
}

fn property_from_row(row: &RuleRow) -> ExportResult<Option<PropertyMapping>> {
    let (Some(rule), Some(predicate)) = (row.get("rule"), row.get("type")) else {
        warn!(row = ?row, "property rule without rule or type, skipping");
        return Ok(None);
    };
    let mapping = PropertyMapping::new(
        rule,
        predicate,
        row.get("GATEtype").map(str::to_string),
        row.get("GATEfeature").map(str::to_string),
        row.get("GATEattribute").map(str::to_string),
    )?;
    Ok(Some(mapping))
}

fn relation_from_row(row: &RuleRow) -> Option<RelationMapping> {
    match (
        row.get("rule"),
        row.get("type"),
        row.get("domain"),
        row.get("range"),
    ) {
        (Some(rule), Some(predicate), Some(domain), Some(range)) => Some(RelationMapping::new(
            rule,
            predicate,
            domain,
            range,
            RelationBehavior::from_tag(row.get("GATEattribute")),
        )),
        _ => {
            warn!(row = ?row, "relation rule without type, domain or range, skipping");
            None
        }
    }
}
