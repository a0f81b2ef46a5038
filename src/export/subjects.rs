use tracing::debug;

use super::properties::resolve_properties;
use super::relations::resolve_rule_relations;
use super::session::{ExportContext, ResolutionCounts};
use super::uri::annotation_iri;
use crate::error::ExportResult;
use crate::store::TripleSink;

/// Exports every input annotation matched by a subject rule, in rule order
/// and then in document order, together with its properties and the rule
/// relations it is the domain of.
pub fn resolve_subjects<S: TripleSink>(
    ctx: &ExportContext<'_>,
    sink: &mut S,
    counts: &mut ResolutionCounts,
) -> ExportResult<()> {
    for mapping in ctx.rules.subjects() {
        let annotations = ctx.input.of_type(&mapping.source_type);
        debug!(rule = %mapping.rule(), matched = annotations.len(), "resolving subject rule");
        for annotation in annotations {
            let properties = resolve_properties(ctx, annotation, ctx.rules.properties(mapping.rule()));
            let subject = annotation_iri(
                &mapping.base_uri,
                &ctx.session.id,
                &annotation.kind,
                annotation.id,
                mapping.rule(),
            );
            sink.put_subject(ctx.session.document_iri(), &subject, mapping.rdf_type(), &properties)?;
            counts.subjects += 1;
            counts.properties += properties.len();
            counts.relations += resolve_rule_relations(ctx, sink, annotation, mapping)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Annotation, Document, PropertyValue};
    use crate::export::session::ExportSession;
    use crate::export::uri::DocumentIdentity;
    use crate::rules::{RuleIndex, RuleRow};
    use crate::store::{RecordingSink, SinkEvent, TransactionMode};
    use chrono::FixedOffset;
    use serde_json::json;
    use uuid::Uuid;

    fn person_rules() -> RuleIndex {
        RuleIndex::from_rows(
            &[RuleRow::new()
                .with("rule", "map:Person")
                .with("type", "http://xmlns.com/foaf/0.1/Person")
                .with("baseURI", "http://ex.org/")
                .with("GATEtype", "Person")],
            &[
                RuleRow::new()
                    .with("rule", "map:Person")
                    .with("type", "http://xmlns.com/foaf/0.1/gender")
                    .with("GATEfeature", "gender"),
                RuleRow::new()
                    .with("rule", "map:Person")
                    .with("type", "http://purl.org/dc/terms/start")
                    .with("GATEattribute", "startOffset"),
            ],
            &[],
        )
        .unwrap()
    }

    #[test]
    fn each_matching_annotation_becomes_a_typed_subject() {
        let rules = person_rules();
        let session = ExportSession::start(
            Uuid::new_v4(),
            DocumentIdentity {
                document: "http://ex.org/docs".into(),
                corpus: "http://ex.org/Corpus/c".into(),
            },
            FixedOffset::east_opt(0).unwrap(),
            "test",
        );
        let mut document = Document::new("d.txt", "Jean Dupont and Marie");
        let set = document.set_mut("");
        set.annotations.push(Annotation::new(7, "Person", 16, 21));
        set.annotations.push(Annotation::new(3, "Person", 0, 11).with_feature("gender", json!("male")));
        set.annotations.push(Annotation::new(4, "Token", 0, 4));
        let ctx = ExportContext {
            rules: &rules,
            session: &session,
            document: &document,
            input: document.annotation_set(None),
            relation_base: "http://ex.org/",
        };
        let mut sink = RecordingSink::new();
        sink.begin_transaction(TransactionMode::Write).unwrap();
        let mut counts = ResolutionCounts::default();
        resolve_subjects(&ctx, &mut sink, &mut counts).unwrap();

        assert_eq!(counts.subjects, 2);
        assert_eq!(counts.properties, 3);
        let subjects = sink.subjects();
        match &subjects[0] {
            SinkEvent::Subject { subject, rdf_type, properties } => {
                assert_eq!(subject, &format!("http://ex.org/{}/Person/3#map:Person", session.id));
                assert_eq!(rdf_type, "http://xmlns.com/foaf/0.1/Person");
                assert_eq!(properties.get("gender").unwrap().value, PropertyValue::Text("male".into()));
                assert_eq!(properties.get("startOffset").unwrap().value, PropertyValue::Integer(0));
            }
            other => panic!("unexpected event {other:?}"),
        }
        match &subjects[1] {
            SinkEvent::Subject { subject, properties, .. } => {
                assert!(subject.ends_with("/Person/7#map:Person"));
                assert_eq!(properties.len(), 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
