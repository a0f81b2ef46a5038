use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use crate::domain::{FeatureMap, PropertyMap};
use crate::error::{ExportError, ExportResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    Read,
    Write,
}

/// Transactional target for the triples of an export session.
///
/// All `put_*` calls must happen inside a write transaction, which
/// `end_transaction` commits and `abort_transaction` discards.
pub trait TripleSink {
    fn begin_transaction(&mut self, mode: TransactionMode) -> ExportResult<()>;

    fn end_transaction(&mut self) -> ExportResult<()>;

    fn abort_transaction(&mut self);

    fn in_transaction(&self) -> bool;

    fn put_document_corpus_link(&mut self, document: &str, corpus: &str) -> ExportResult<()>;

    fn put_subject(
        &mut self,
        document: &str,
        subject: &str,
        rdf_type: &str,
        properties: &PropertyMap,
    ) -> ExportResult<()>;

    fn put_relation(
        &mut self,
        document: &str,
        predicate: &str,
        subject: &str,
        object: &str,
    ) -> ExportResult<()>;

    fn put_explicit_relation(
        &mut self,
        document: &str,
        relation: &str,
        features: &FeatureMap,
        domain: &str,
        range: &str,
    ) -> ExportResult<()>;

    /// Serialises the committed graph to `destination`.
    fn export_graph(&mut self, destination: &Path) -> ExportResult<()>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Begin(TransactionMode),
    End,
    Abort,
    DocumentCorpus {
        document: String,
        corpus: String,
    },
    Subject {
        subject: String,
        rdf_type: String,
        properties: PropertyMap,
    },
    Relation {
        predicate: String,
        subject: String,
        object: String,
    },
    ExplicitRelation {
        relation: String,
        domain: String,
        range: String,
    },
    Export(String),
}

/// Sink that only records calls. Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
    open: Option<TransactionMode>,
    fail_relations: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `put_relation` fail, to exercise failure paths.
    pub fn failing_relations() -> Self {
        Self {
            fail_relations: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn subjects(&self) -> Vec<SinkEvent> {
        self.filtered(|e| matches!(e, SinkEvent::Subject { .. }))
    }

    pub fn relations(&self) -> Vec<SinkEvent> {
        self.filtered(|e| matches!(e, SinkEvent::Relation { .. }))
    }

    pub fn explicit_relations(&self) -> Vec<SinkEvent> {
        self.filtered(|e| matches!(e, SinkEvent::ExplicitRelation { .. }))
    }

    fn filtered(&self, keep: impl Fn(&SinkEvent) -> bool) -> Vec<SinkEvent> {
        self.events.lock().iter().filter(|e| keep(e)).cloned().collect()
    }

    fn record(&mut self, event: SinkEvent) -> ExportResult<()> {
        if self.open != Some(TransactionMode::Write) {
            return Err(ExportError::Transaction("write outside a write transaction"));
        }
        self.events.lock().push(event);
        Ok(())
    }
}

impl TripleSink for RecordingSink {
    fn begin_transaction(&mut self, mode: TransactionMode) -> ExportResult<()> {
        if self.open.is_some() {
            return Err(ExportError::Transaction("a transaction is already open"));
        }
        self.open = Some(mode);
        self.events.lock().push(SinkEvent::Begin(mode));
        Ok(())
    }

    fn end_transaction(&mut self) -> ExportResult<()> {
        if self.open.take().is_none() {
            return Err(ExportError::Transaction("no open transaction"));
        }
        self.events.lock().push(SinkEvent::End);
        Ok(())
    }

    fn abort_transaction(&mut self) {
        if self.open.take().is_some() {
            self.events.lock().push(SinkEvent::Abort);
        }
    }

    fn in_transaction(&self) -> bool {
        self.open.is_some()
    }

    fn put_document_corpus_link(&mut self, document: &str, corpus: &str) -> ExportResult<()> {
        self.record(SinkEvent::DocumentCorpus {
            document: document.to_string(),
            corpus: corpus.to_string(),
        })
    }

    fn put_subject(
        &mut self,
        _document: &str,
        subject: &str,
        rdf_type: &str,
        properties: &PropertyMap,
    ) -> ExportResult<()> {
        self.record(SinkEvent::Subject {
            subject: subject.to_string(),
            rdf_type: rdf_type.to_string(),
            properties: properties.clone(),
        })
    }

    fn put_relation(
        &mut self,
        _document: &str,
        predicate: &str,
        subject: &str,
        object: &str,
    ) -> ExportResult<()> {
        if self.fail_relations {
            return Err(ExportError::Store("relation write refused".to_string()));
        }
        self.record(SinkEvent::Relation {
            predicate: predicate.to_string(),
            subject: subject.to_string(),
            object: object.to_string(),
        })
    }

    fn put_explicit_relation(
        &mut self,
        _document: &str,
        relation: &str,
        _features: &FeatureMap,
        domain: &str,
        range: &str,
    ) -> ExportResult<()> {
        self.record(SinkEvent::ExplicitRelation {
            relation: relation.to_string(),
            domain: domain.to_string(),
            range: range.to_string(),
        })
    }

    fn export_graph(&mut self, destination: &Path) -> ExportResult<()> {
        self.events
            .lock()
            .push(SinkEvent::Export(destination.display().to_string()));
        Ok(())
    }

    fn describe(&self) -> String {
        format!("RecordingSink({} events)", self.events.lock().len())
    }
}
