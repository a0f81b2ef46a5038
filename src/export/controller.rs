use chrono::FixedOffset;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::relations::resolve_explicit_relations;
use super::session::{DocumentOutcome, ExportContext, ExportSession, ResolutionCounts};
use super::subjects::resolve_subjects;
use super::uri::{resolve_identity, DocumentUriPolicy};
use crate::config::{ExporterConfig, RuleLocation};
use crate::domain::Document;
use crate::error::ExportResult;
use crate::rules::RuleIndex;
use crate::store::{QuadStore, TransactionMode, TripleSink};

/// Per-document settings shared by every session of one exporter.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub uri_policy: DocumentUriPolicy,
    pub corpus_name: String,
    pub corpus_base: String,
    pub relation_base: String,
    pub input_set: Option<String>,
    pub pipeline: String,
    pub offset: FixedOffset,
}

impl SessionOptions {
    pub fn from_config(config: &ExporterConfig) -> ExportResult<Self> {
        Ok(Self {
            uri_policy: config.uri_policy(),
            corpus_name: config.corpus_name.clone(),
            corpus_base: config.corpus_base.clone(),
            relation_base: config.relation_base.clone(),
            input_set: config.input_set.clone(),
            pipeline: config.pipeline_name.clone(),
            offset: config.utc_offset()?,
        })
    }
}

/// Exports one document into `sink` inside a single write transaction.
///
/// On success the transaction is committed; on any error it is aborted so
/// none of the document's triples reach the sink. Either way no transaction
/// is left open.
pub fn run_session<S: TripleSink>(
    sink: &mut S,
    rules: &RuleIndex,
    document: &Document,
    options: &SessionOptions,
) -> ExportResult<(ExportSession, ResolutionCounts)> {
    sink.begin_transaction(TransactionMode::Write)?;
    match write_document(sink, rules, document, options) {
        Ok(exported) => {
            if let Err(err) = sink.end_transaction() {
                sink.abort_transaction();
                error!(document = %document.name, error = %err, "commit failed");
                return Err(err);
            }
            Ok(exported)
        }
        Err(err) => {
            sink.abort_transaction();
            error!(document = %document.name, error = %err, "export failed, discarding document");
            Err(err)
        }
    }
}

fn write_document<S: TripleSink>(
    sink: &mut S,
    rules: &RuleIndex,
    document: &Document,
    options: &SessionOptions,
) -> ExportResult<(ExportSession, ResolutionCounts)> {
    let identity = resolve_identity(options.uri_policy, document, &options.corpus_name, &options.corpus_base)?;
    let session = ExportSession::start(Uuid::new_v4(), identity, options.offset, &options.pipeline);
    sink.put_document_corpus_link(session.document_iri(), session.corpus_iri())?;

    let ctx = ExportContext {
        rules,
        session: &session,
        document,
        input: document.annotation_set(options.input_set.as_deref()),
        relation_base: &options.relation_base,
    };
    let mut counts = ResolutionCounts::default();
    resolve_subjects(&ctx, sink, &mut counts)?;
    resolve_explicit_relations(&ctx, sink, &mut counts)?;
    Ok((session, counts))
}

enum Backend {
    /// A fresh in-memory graph per document, written out as `<session>.nq`.
    Buffered { output_dir: PathBuf },
    /// One store shared by every document; commits are serialised.
    Persistent(Arc<Mutex<QuadStore>>),
}

/// Long-lived exporter: compiled rules plus the chosen output backend.
/// Safe to share between threads.
pub struct Exporter {
    rules: Arc<RuleIndex>,
    options: SessionOptions,
    backend: Backend,
}

impl Exporter {
    /// Validates the configuration and compiles the mapping rules. Any error
    /// here is a configuration error and no document should be processed.
    pub fn from_config(config: &ExporterConfig) -> ExportResult<Self> {
        let options = SessionOptions::from_config(config)?;
        let (rules, backend) = match config.rule_location()? {
            RuleLocation::MappingFile(path) => {
                let mapping = QuadStore::from_turtle(&path)?;
                let rules = RuleIndex::load(&mapping, &config.queries)?;
                let backend = Backend::Buffered {
                    output_dir: config.output_dir.clone(),
                };
                (rules, backend)
            }
            RuleLocation::Store(dir) => {
                let store = QuadStore::open(&dir)?;
                let rules = RuleIndex::load(&store, &config.queries)?;
                (rules, Backend::Persistent(Arc::new(Mutex::new(store))))
            }
        };
        if rules.subjects().is_empty() {
            info!("no subject rules found, documents will only be linked to the corpus");
        }
        let exporter = Self {
            rules: Arc::new(rules),
            options,
            backend,
        };
        debug!(backend = %exporter.describe(), "exporter ready");
        Ok(exporter)
    }

    pub fn rules(&self) -> &RuleIndex {
        &self.rules
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn export_document(&self, document: &Document) -> ExportResult<DocumentOutcome> {
        let (session, counts, output) = match &self.backend {
            Backend::Buffered { output_dir } => {
                let mut store = QuadStore::in_memory();
                let (session, counts) = run_session(&mut store, &self.rules, document, &self.options)?;
                let path = output_dir.join(session.output_file_name());
                store.begin_transaction(TransactionMode::Read)?;
                let exported = store.export_graph(&path);
                store.end_transaction()?;
                exported?;
                (session, counts, Some(path))
            }
            Backend::Persistent(store) => {
                let mut store = store.lock();
                let (session, counts) = run_session(&mut *store, &self.rules, document, &self.options)?;
                (session, counts, None)
            }
        };
        info!(
            document = %document.name,
            session = %session.id,
            subjects = counts.subjects,
            relations = counts.relations + counts.explicit_relations,
            skipped = counts.skipped,
            "document exported"
        );
        Ok(DocumentOutcome {
            document_name: document.name.clone(),
            session_id: session.id,
            document_iri: session.document_iri().to_string(),
            corpus_iri: session.corpus_iri().to_string(),
            counts,
            output,
        })
    }

    pub fn describe(&self) -> String {
        match &self.backend {
            Backend::Buffered { output_dir } => {
                format!("buffered, one file per document in {}", output_dir.display())
            }
            Backend::Persistent(store) => format!("persistent, {}", store.lock().describe()),
        }
    }
}
