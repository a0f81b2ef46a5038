use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::domain::Document;
use crate::error::{ExportError, ExportResult};
use crate::utils::strip_text_extension;

/// IRI of one annotation (or relation) under one rule within a session:
/// `base + session + "/" + type + "/" + id + "#" + rule`, with the type
/// percent-encoded.
pub fn annotation_iri(base_uri: &str, session: &Uuid, kind: &str, local_id: u64, rule: &str) -> String {
    format!("{base_uri}{session}/{}/{local_id}#{rule}", urlencoding::encode(kind))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentUriPolicy {
    /// Container of the document's source URL.
    #[default]
    DerivedFromSource,
    /// Corpus IRI joined with the document name.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIdentity {
    pub document: String,
    pub corpus: String,
}

pub fn resolve_identity(
    policy: DocumentUriPolicy,
    document: &Document,
    corpus_name: &str,
    corpus_base: &str,
) -> ExportResult<DocumentIdentity> {
    match policy {
        DocumentUriPolicy::DerivedFromSource => {
            let source = document
                .source_url
                .as_deref()
                .ok_or_else(|| ExportError::MissingSourceUrl(document.name.clone()))?;
            Ok(DocumentIdentity {
                document: container_uri(&http_scheme(source))?,
                corpus: format!("{corpus_base}{}", urlencoding::encode(corpus_name)),
            })
        }
        DocumentUriPolicy::Custom => {
            let corpus = percent_decode(corpus_name);
            let name = strip_text_extension(&document.name);
            Ok(DocumentIdentity {
                document: percent_decode(&format!("{corpus}#{name}")),
                corpus,
            })
        }
    }
}

/// Rewrites a leading `file:/` to `http://`.
pub fn http_scheme(source: &str) -> String {
    match source.strip_prefix("file:/") {
        Some(rest) => format!("http://{rest}"),
        None => source.to_string(),
    }
}

/// Everything before the last path segment of an http(s) URL.
pub fn container_uri(url: &str) -> ExportResult<String> {
    static CONTAINER: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(https?://.*/.*)/.*").expect("static container pattern"));
    CONTAINER
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ExportError::UnresolvedDocumentUri(url.to_string()))
}

fn percent_decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotation_iris_are_deterministic_per_session() {
        let session = Uuid::new_v4();
        let first = annotation_iri("http://ex.org/", &session, "Person", 7, "http://ex.org/map#Person");
        let second = annotation_iri("http://ex.org/", &session, "Person", 7, "http://ex.org/map#Person");
        assert_eq!(first, second);
        assert_eq!(
            first,
            format!("http://ex.org/{session}/Person/7#http://ex.org/map#Person")
        );
        let other_rule = annotation_iri("http://ex.org/", &session, "Person", 7, "http://ex.org/map#Author");
        assert_ne!(first, other_rule);
        assert_ne!(first, annotation_iri("http://ex.org/", &Uuid::new_v4(), "Person", 7, "http://ex.org/map#Person"));
    }

    #[test]
    fn annotation_type_segment_is_percent_encoded() {
        let session = Uuid::new_v4();
        assert_eq!(
            annotation_iri("http://ex.org/", &session, "Named Entity", 3, "http://ex.org/map#NE"),
            format!("http://ex.org/{session}/Named%20Entity/3#http://ex.org/map#NE")
        );
    }

    #[test]
    fn derived_document_uri_is_the_container() {
        let doc = Document::new("paper.xml", "").with_source_url("file:/home/corpus/papers/paper.xml");
        let identity =
            resolve_identity(DocumentUriPolicy::DerivedFromSource, &doc, "My Corpus", "http://ex.org/Corpus/")
                .unwrap();
        assert_eq!(identity.document, "http://home/corpus/papers");
        assert_eq!(identity.corpus, "http://ex.org/Corpus/My%20Corpus");
    }

    #[test]
    fn derived_document_uri_fails_without_a_container() {
        assert!(matches!(
            container_uri("http://host"),
            Err(ExportError::UnresolvedDocumentUri(_))
        ));
        let doc = Document::new("a.txt", "");
        assert!(matches!(
            resolve_identity(DocumentUriPolicy::DerivedFromSource, &doc, "c", "http://ex.org/"),
            Err(ExportError::MissingSourceUrl(_))
        ));
    }

    #[test]
    fn custom_document_uri_joins_corpus_and_name() {
        let doc = Document::new("caf%C3%A9.txt", "");
        let identity =
            resolve_identity(DocumentUriPolicy::Custom, &doc, "http%3A%2F%2Fex.org%2Fcorpus", "unused").unwrap();
        assert_eq!(identity.corpus, "http://ex.org/corpus");
        assert_eq!(identity.document, "http://ex.org/corpus#café");
    }
}
