use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use super::uri::DocumentIdentity;
use crate::domain::{AnnotationSet, Document};
use crate::rules::RuleIndex;

/// Scope of one document's export. The id namespaces every generated
/// subject IRI and names the buffered output file.
#[derive(Debug, Clone)]
pub struct ExportSession {
    pub id: Uuid,
    pub identity: DocumentIdentity,
    pub started_at: DateTime<FixedOffset>,
    pub pipeline: String,
}

impl ExportSession {
    pub fn start(id: Uuid, identity: DocumentIdentity, offset: FixedOffset, pipeline: &str) -> Self {
        Self {
            id,
            identity,
            started_at: Utc::now().with_timezone(&offset),
            pipeline: pipeline.to_string(),
        }
    }

    pub fn document_iri(&self) -> &str {
        &self.identity.document
    }

    pub fn corpus_iri(&self) -> &str {
        &self.identity.corpus
    }

    pub fn output_file_name(&self) -> String {
        format!("{}.nq", self.id)
    }
}

/// Everything a resolver reads while exporting one document.
pub struct ExportContext<'a> {
    pub rules: &'a RuleIndex,
    pub session: &'a ExportSession,
    pub document: &'a Document,
    pub input: &'a AnnotationSet,
    pub relation_base: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionCounts {
    pub subjects: usize,
    pub properties: usize,
    pub relations: usize,
    pub explicit_relations: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub document_name: String,
    pub session_id: Uuid,
    pub document_iri: String,
    pub corpus_iri: String,
    pub counts: ResolutionCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}
