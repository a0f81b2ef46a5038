use chrono::SecondsFormat;
use indexmap::IndexSet;
use oxrdf::vocab::{rdf, xsd};
use oxrdf::{GraphName, Literal, NamedNode, NamedOrBlankNode, Quad, Term};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::persistence::{QuadLoader, QuadWriter};
use super::sink::{TransactionMode, TripleSink};
use crate::domain::{FeatureMap, PropertyMap, PropertyValue};
use crate::error::{ExportError, ExportResult};
use crate::rules::{ColumnTarget, RuleQuery, RuleRow, RuleSource};
use crate::vocab::PUBO;

pub const STORE_FILE: &str = "store.nq";

/// Insertion-ordered quad graph with transactional writes. Either purely
/// in memory or backed by an N-Quads file that every commit appends to.
pub struct QuadStore {
    quads: IndexSet<Quad>,
    pending: Vec<Quad>,
    transaction: Option<TransactionMode>,
    location: Option<PathBuf>,
}

impl QuadStore {
    pub fn in_memory() -> Self {
        Self {
            quads: IndexSet::new(),
            pending: Vec::new(),
            transaction: None,
            location: None,
        }
    }

    /// Opens (or creates) a persistent store in `dir`.
    pub fn open(dir: impl AsRef<Path>) -> ExportResult<Self> {
        let location = dir.as_ref().join(STORE_FILE);
        let mut store = Self::in_memory();
        store.quads.extend(QuadLoader::load_nquads(&location)?);
        debug!(store = %location.display(), quads = store.len(), "opened quad store");
        store.location = Some(location);
        Ok(store)
    }

    /// In-memory store holding the triples of a Turtle mapping file.
    pub fn from_turtle(path: impl AsRef<Path>) -> ExportResult<Self> {
        let mut store = Self::in_memory();
        store.quads.extend(QuadLoader::load_turtle(path.as_ref())?);
        info!(mapping = %path.as_ref().display(), triples = store.len(), "loaded mapping rules");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Committed quads in insertion order.
    pub fn quads(&self) -> impl ExactSizeIterator<Item = &Quad> + '_ {
        self.quads.iter()
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn objects<'a>(
        &'a self,
        subject: &'a NamedOrBlankNode,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.quads
            .iter()
            .filter(move |q| &q.subject == subject && q.predicate.as_str() == predicate)
            .map(|q| &q.object)
    }

    fn first_value(&self, subject: &NamedOrBlankNode, predicate: &str) -> Option<String> {
        self.objects(subject, predicate).find_map(|term| match term {
            Term::NamedNode(node) => Some(node.as_str().to_string()),
            Term::Literal(literal) => Some(literal.value().to_string()),
            _ => None,
        })
    }

    /// Named nodes linked to `class` through any predicate.
    fn rules_of_class(&self, class: &str) -> Vec<NamedNode> {
        let mut rules = Vec::new();
        let mut seen = HashSet::new();
        for quad in &self.quads {
            let is_rule = matches!(&quad.object, Term::NamedNode(o) if o.as_str() == class);
            if let (true, NamedOrBlankNode::NamedNode(rule)) = (is_rule, &quad.subject) {
                if seen.insert(rule.clone()) {
                    rules.push(rule.clone());
                }
            }
        }
        rules
    }

    fn write(&mut self, quad: Quad) -> ExportResult<()> {
        if self.transaction != Some(TransactionMode::Write) {
            return Err(ExportError::Transaction("write outside a write transaction"));
        }
        self.pending.push(quad);
        Ok(())
    }

    fn annotate(&mut self, document: &str, node: &str) -> ExportResult<()> {
        self.write(quad(iri(document)?, iri(PUBO::HAS_ANNOTATION)?, iri(node)?))
    }

    /// Commits pending writes. The file is appended first and memory only
    /// updated once that succeeded, so a failed commit leaves no trace.
    fn commit(&mut self) -> ExportResult<usize> {
        let pending = std::mem::take(&mut self.pending);
        let added: IndexSet<Quad> = pending
            .into_iter()
            .filter(|quad| !self.quads.contains(quad))
            .collect();
        if let Some(location) = &self.location {
            QuadWriter::append(location, &added)?;
        }
        let count = added.len();
        self.quads.extend(added);
        Ok(count)
    }
}

impl RuleSource for QuadStore {
    /// Rows missing a required column are dropped; optional columns are
    /// left out of the row when absent.
    fn select(&self, query: &RuleQuery) -> ExportResult<Vec<RuleRow>> {
        let mut rows = Vec::new();
        for rule in self.rules_of_class(&query.mapping_class) {
            let rule_node = NamedOrBlankNode::NamedNode(rule.clone());
            let nested: Vec<NamedOrBlankNode> = match &query.nested {
                Some(predicate) => self
                    .objects(&rule_node, predicate)
                    .filter_map(|term| match term {
                        Term::NamedNode(n) => Some(NamedOrBlankNode::NamedNode(n.clone())),
                        Term::BlankNode(b) => Some(NamedOrBlankNode::BlankNode(b.clone())),
                        _ => None,
                    })
                    .collect(),
                None => vec![rule_node.clone()],
            };
            'nodes: for node in &nested {
                let mut row = RuleRow::new();
                row.set("rule", rule.as_str());
                for binding in &query.columns {
                    let target = match binding.on {
                        ColumnTarget::Rule => &rule_node,
                        ColumnTarget::Nested => node,
                    };
                    match self.first_value(target, &binding.predicate) {
                        Some(value) => row.set(&binding.column, value),
                        None if binding.optional => {}
                        None => continue 'nodes,
                    }
                }
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

impl TripleSink for QuadStore {
    fn begin_transaction(&mut self, mode: TransactionMode) -> ExportResult<()> {
        if self.transaction.is_some() {
            return Err(ExportError::Transaction("a transaction is already open"));
        }
        self.transaction = Some(mode);
        Ok(())
    }

    fn end_transaction(&mut self) -> ExportResult<()> {
        match self.transaction.take() {
            None => Err(ExportError::Transaction("no open transaction")),
            Some(TransactionMode::Read) => Ok(()),
            Some(TransactionMode::Write) => {
                let added = self.commit()?;
                debug!(added, total = self.quads.len(), "committed write transaction");
                Ok(())
            }
        }
    }

    fn abort_transaction(&mut self) {
        if self.transaction.take().is_some() {
            debug!(discarded = self.pending.len(), "aborted transaction");
            self.pending.clear();
        }
    }

    fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    fn put_document_corpus_link(&mut self, document: &str, corpus: &str) -> ExportResult<()> {
        self.write(quad(iri(corpus)?, iri(PUBO::HAS_DOCUMENT)?, iri(document)?))?;
        info!(corpus, document, "exported corpus document");
        Ok(())
    }

    fn put_subject(
        &mut self,
        document: &str,
        subject: &str,
        rdf_type: &str,
        properties: &PropertyMap,
    ) -> ExportResult<()> {
        let node = iri(subject)?;
        for (_, property) in properties.iter() {
            self.write(quad(
                node.clone(),
                iri(&property.predicate)?,
                object_term(&property.value)?,
            ))?;
        }
        self.write(quad(node, rdf::TYPE.into_owned(), iri(rdf_type)?))?;
        self.annotate(document, subject)
    }

    fn put_relation(
        &mut self,
        _document: &str,
        predicate: &str,
        subject: &str,
        object: &str,
    ) -> ExportResult<()> {
        self.write(quad(iri(subject)?, iri(predicate)?, iri(object)?))
    }

    fn put_explicit_relation(
        &mut self,
        document: &str,
        relation: &str,
        features: &FeatureMap,
        domain: &str,
        range: &str,
    ) -> ExportResult<()> {
        let node = iri(relation)?;
        if let Some(Value::String(kind)) = features.get("type") {
            self.write(quad(node.clone(), rdf::TYPE.into_owned(), iri(kind)?))?;
        }
        self.write(quad(node.clone(), rdf::SUBJECT.into_owned(), iri(domain)?))?;
        self.write(quad(node, rdf::OBJECT.into_owned(), iri(range)?))?;
        self.annotate(document, relation)
    }

    fn export_graph(&mut self, destination: &Path) -> ExportResult<()> {
        if self.transaction != Some(TransactionMode::Read) {
            return Err(ExportError::Transaction("export requires a read transaction"));
        }
        QuadWriter::replace(destination, &self.quads)?;
        info!(file = %destination.display(), quads = self.quads.len(), "exported graph");
        Ok(())
    }

    fn describe(&self) -> String {
        let backend = match &self.location {
            Some(location) => format!("file {}", location.display()),
            None => "in-memory".to_string(),
        };
        format!(
            "QuadStore({backend}, {} quads, {} pending, transaction {:?})",
            self.quads.len(),
            self.pending.len(),
            self.transaction
        )
    }
}

/// Generated IRIs carry the rule IRI as their fragment, so a second '#' is
/// allowed; anything an N-Quads IRI cannot hold is rejected.
fn iri(value: &str) -> ExportResult<NamedNode> {
    let forbidden = |c: char| c <= ' ' || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\');
    if value.is_empty() || value.chars().any(forbidden) {
        return Err(ExportError::InvalidIri(value.to_string()));
    }
    Ok(NamedNode::new_unchecked(value))
}

fn quad(subject: NamedNode, predicate: NamedNode, object: impl Into<Term>) -> Quad {
    Quad::new(subject, predicate, object, GraphName::DefaultGraph)
}

fn object_term(value: &PropertyValue) -> ExportResult<Term> {
    Ok(match value {
        PropertyValue::Iri(value) => iri(value)?.into(),
        PropertyValue::Text(text) => Literal::new_simple_literal(text).into(),
        PropertyValue::Integer(i) => Literal::new_typed_literal(i.to_string(), xsd::INTEGER).into(),
        PropertyValue::Double(d) => Literal::new_typed_literal(d.to_string(), xsd::DOUBLE).into(),
        PropertyValue::Boolean(b) => Literal::new_typed_literal(b.to_string(), xsd::BOOLEAN).into(),
        PropertyValue::Timestamp(at) => Literal::new_typed_literal(
            at.to_rfc3339_opts(SecondsFormat::Millis, false),
            xsd::DATE_TIME,
        )
        .into(),
    })
}
