use serde_json::Value;
use tracing::warn;

use super::session::{ExportContext, ResolutionCounts};
use super::uri::annotation_iri;
use crate::domain::{Annotation, RelationBehavior, RelationMapping, SubjectMapping};
use crate::error::{ExportError, ExportResult};
use crate::store::TripleSink;

/// Emits the rule-driven relations whose domain is `subject_mapping`,
/// returning how many triples were written.
pub fn resolve_rule_relations<S: TripleSink>(
    ctx: &ExportContext<'_>,
    sink: &mut S,
    annotation: &Annotation,
    subject_mapping: &SubjectMapping,
) -> ExportResult<usize> {
    let mut written = 0;
    for mapping in ctx.rules.relations(subject_mapping.rule()) {
        written += resolve_mapping(ctx, sink, annotation, mapping)?;
    }
    Ok(written)
}

fn resolve_mapping<S: TripleSink>(
    ctx: &ExportContext<'_>,
    sink: &mut S,
    annotation: &Annotation,
    mapping: &RelationMapping,
) -> ExportResult<usize> {
    let domain = ctx.rules.require_subject(&mapping.domain_rule)?;
    let range = ctx.rules.require_subject(&mapping.range_rule)?;
    let subject = subject_iri(ctx, domain, annotation);
    let document = ctx.session.document_iri();

    match &mapping.behavior {
        RelationBehavior::Plain => {
            let object = subject_iri(ctx, range, annotation);
            sink.put_relation(document, mapping.predicate(), &subject, &object)?;
            Ok(1)
        }
        RelationBehavior::Containment => {
            let mut written = 0;
            for contained in ctx.input.contained(annotation.start, annotation.end, &range.source_type) {
                if contained.id == annotation.id {
                    continue;
                }
                let object = subject_iri(ctx, range, contained);
                sink.put_relation(document, mapping.predicate(), &subject, &object)?;
                written += 1;
            }
            Ok(written)
        }
        RelationBehavior::FeatureReference { feature } => {
            let target = annotation
                .feature(feature)
                .and_then(Value::as_u64)
                .and_then(|id| ctx.document.annotation(id))
                .ok_or_else(|| ExportError::UnresolvedReference {
                    annotation: annotation.id,
                    feature: feature.clone(),
                })?;
            let object = subject_iri(ctx, range, target);
            sink.put_relation(document, mapping.predicate(), &subject, &object)?;
            Ok(1)
        }
    }
}

fn subject_iri(ctx: &ExportContext<'_>, mapping: &SubjectMapping, annotation: &Annotation) -> String {
    annotation_iri(
        &mapping.base_uri,
        &ctx.session.id,
        &annotation.kind,
        annotation.id,
        mapping.rule(),
    )
}

/// Emits the document's explicit binary relations. Relations that are not
/// binary, or whose members have no subject rule, are skipped.
pub fn resolve_explicit_relations<S: TripleSink>(
    ctx: &ExportContext<'_>,
    sink: &mut S,
    counts: &mut ResolutionCounts,
) -> ExportResult<()> {
    for relation in &ctx.input.relations {
        let &[domain_id, range_id] = relation.members.as_slice() else {
            warn!(
                relation = relation.id,
                members = relation.members.len(),
                "relation does not have two members, skipping"
            );
            counts.skipped += 1;
            continue;
        };
        let Some((domain, range)) = member_iri(ctx, domain_id).zip(member_iri(ctx, range_id)) else {
            warn!(relation = relation.id, "relation member has no subject rule, skipping");
            counts.skipped += 1;
            continue;
        };
        let relation_iri = annotation_iri(
            ctx.relation_base,
            &ctx.session.id,
            &relation.kind,
            relation.id,
            &urlencoding::encode(&relation.kind),
        );
        sink.put_explicit_relation(
            ctx.session.document_iri(),
            &relation_iri,
            &relation.features,
            &domain,
            &range,
        )?;
        counts.explicit_relations += 1;
    }
    Ok(())
}

fn member_iri(ctx: &ExportContext<'_>, id: u64) -> Option<String> {
    let annotation = ctx.document.annotation(id)?;
    let mapping = ctx.rules.subject_for_type(&annotation.kind)?;
    Some(subject_iri(ctx, mapping, annotation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Document, ExplicitRelation};
    use crate::export::session::ExportSession;
    use crate::export::uri::DocumentIdentity;
    use crate::rules::{RuleIndex, RuleRow};
    use crate::store::{RecordingSink, SinkEvent, TransactionMode};
    use chrono::FixedOffset;
    use serde_json::json;
    use uuid::Uuid;

    fn subject_row(rule: &str, source_type: &str) -> RuleRow {
        RuleRow::new()
            .with("rule", rule)
            .with("type", &format!("http://ex.org/{source_type}"))
            .with("baseURI", "http://ex.org/")
            .with("GATEtype", source_type)
    }

    fn relation_row(rule: &str, domain: &str, range: &str, tag: Option<&str>) -> RuleRow {
        let row = RuleRow::new()
            .with("rule", rule)
            .with("type", "http://purl.org/dc/terms/chunk")
            .with("domain", domain)
            .with("range", range);
        match tag {
            Some(tag) => row.with("GATEattribute", tag),
            None => row,
        }
    }

    fn rules(relations: Vec<RuleRow>) -> RuleIndex {
        RuleIndex::from_rows(
            &[
                subject_row("map:Sentence", "Sentence"),
                subject_row("map:Person", "Person"),
                subject_row("map:Organization", "Organization"),
            ],
            &[],
            &relations,
        )
        .unwrap()
    }

    fn session() -> ExportSession {
        ExportSession::start(
            Uuid::new_v4(),
            DocumentIdentity {
                document: "http://ex.org/docs".into(),
                corpus: "http://ex.org/Corpus/c".into(),
            },
            FixedOffset::east_opt(0).unwrap(),
            "test",
        )
    }

    fn open_sink() -> RecordingSink {
        let mut sink = RecordingSink::new();
        sink.begin_transaction(TransactionMode::Write).unwrap();
        sink
    }

    #[test]
    fn containment_emits_one_relation_per_contained_annotation() {
        let rules = rules(vec![relation_row("map:chunk", "map:Sentence", "map:Person", Some("contains"))]);
        let session = session();
        let mut document = Document::new("d.txt", "x".repeat(80));
        let set = document.set_mut("");
        set.annotations.push(Annotation::new(1, "Sentence", 0, 50));
        set.annotations.push(Annotation::new(2, "Person", 5, 10));
        set.annotations.push(Annotation::new(3, "Person", 60, 70));
        let ctx = ExportContext {
            rules: &rules,
            session: &session,
            document: &document,
            input: document.annotation_set(None),
            relation_base: "http://ex.org/",
        };
        let mut sink = open_sink();
        let sentence = document.annotation(1).unwrap();
        let mapping = rules.subject("map:Sentence").unwrap();
        let written = resolve_rule_relations(&ctx, &mut sink, sentence, mapping).unwrap();

        assert_eq!(written, 1);
        let relations = sink.relations();
        assert_eq!(relations.len(), 1);
        match &relations[0] {
            SinkEvent::Relation { subject, object, .. } => {
                assert_eq!(subject, &format!("http://ex.org/{}/Sentence/1#map:Sentence", session.id));
                assert_eq!(object, &format!("http://ex.org/{}/Person/2#map:Person", session.id));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn feature_reference_resolves_the_target_annotation() {
        let rules = rules(vec![relation_row("map:employedBy", "map:Person", "map:Organization", Some("employedBy"))]);
        let session = session();
        let mut document = Document::new("d.txt", "x".repeat(40));
        let set = document.set_mut("");
        set.annotations.push(Annotation::new(1, "Person", 0, 4).with_feature("employedBy", json!(2)));
        set.annotations.push(Annotation::new(2, "Organization", 20, 30));
        set.annotations.push(Annotation::new(3, "Person", 10, 14).with_feature("employedBy", json!(99)));
        let ctx = ExportContext {
            rules: &rules,
            session: &session,
            document: &document,
            input: document.annotation_set(None),
            relation_base: "http://ex.org/",
        };
        let mapping = rules.subject("map:Person").unwrap();
        let mut sink = open_sink();

        let found = document.annotation(1).unwrap();
        assert_eq!(resolve_rule_relations(&ctx, &mut sink, found, mapping).unwrap(), 1);

        let dangling = document.annotation(3).unwrap();
        let err = resolve_rule_relations(&ctx, &mut sink, dangling, mapping).unwrap_err();
        assert!(matches!(err, ExportError::UnresolvedReference { annotation: 3, .. }));
        assert_eq!(sink.relations().len(), 1);
    }

    #[test]
    fn plain_relation_links_the_annotation_to_itself_under_both_rules() {
        let rules = rules(vec![relation_row("map:self", "map:Person", "map:Organization", None)]);
        let session = session();
        let mut document = Document::new("d.txt", "Alice");
        document.set_mut("").annotations.push(Annotation::new(4, "Person", 0, 5));
        let ctx = ExportContext {
            rules: &rules,
            session: &session,
            document: &document,
            input: document.annotation_set(None),
            relation_base: "http://ex.org/",
        };
        let mut sink = open_sink();
        let person = document.annotation(4).unwrap();
        resolve_rule_relations(&ctx, &mut sink, person, rules.subject("map:Person").unwrap()).unwrap();
        match &sink.relations()[0] {
            SinkEvent::Relation { subject, object, .. } => {
                assert!(subject.ends_with("/Person/4#map:Person"));
                assert!(object.ends_with("/Person/4#map:Organization"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn unknown_range_rule_fails_the_relation() {
        let rules = rules(vec![relation_row("map:r", "map:Person", "map:Nowhere", None)]);
        let session = session();
        let mut document = Document::new("d.txt", "Alice");
        document.set_mut("").annotations.push(Annotation::new(1, "Person", 0, 5));
        let ctx = ExportContext {
            rules: &rules,
            session: &session,
            document: &document,
            input: document.annotation_set(None),
            relation_base: "http://ex.org/",
        };
        let mut sink = open_sink();
        let err = resolve_rule_relations(
            &ctx,
            &mut sink,
            document.annotation(1).unwrap(),
            rules.subject("map:Person").unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::UnknownRule(rule) if rule == "map:Nowhere"));
    }

    #[test]
    fn explicit_relations_must_be_binary() {
        let rules = rules(Vec::new());
        let session = session();
        let mut document = Document::new("d.txt", "x".repeat(40));
        let set = document.set_mut("");
        set.annotations.push(Annotation::new(1, "Person", 0, 4));
        set.annotations.push(Annotation::new(2, "Organization", 10, 20));
        for (id, members) in [(10, vec![1, 2]), (11, vec![1]), (12, vec![1, 2, 1]), (13, vec![2, 1])] {
            set.relations.push(ExplicitRelation {
                id,
                kind: "worksFor".into(),
                members,
                features: [("type".to_string(), json!("http://ex.org/Employment"))].into(),
            });
        }
        let ctx = ExportContext {
            rules: &rules,
            session: &session,
            document: &document,
            input: document.annotation_set(None),
            relation_base: "http://ex.org/",
        };
        let mut sink = open_sink();
        let mut counts = ResolutionCounts::default();
        resolve_explicit_relations(&ctx, &mut sink, &mut counts).unwrap();

        assert_eq!(counts.explicit_relations, 2);
        assert_eq!(counts.skipped, 2);
        match &sink.explicit_relations()[0] {
            SinkEvent::ExplicitRelation { relation, domain, range } => {
                assert_eq!(relation, &format!("http://ex.org/{}/worksFor/10#worksFor", session.id));
                assert!(domain.ends_with("/Person/1#map:Person"));
                assert!(range.ends_with("/Organization/2#map:Organization"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn explicit_relation_iri_encodes_the_relation_type() {
        let rules = rules(Vec::new());
        let session = session();
        let mut document = Document::new("d.txt", "x".repeat(40));
        let set = document.set_mut("");
        set.annotations.push(Annotation::new(1, "Person", 0, 4));
        set.annotations.push(Annotation::new(2, "Organization", 10, 20));
        set.relations.push(ExplicitRelation {
            id: 5,
            kind: "works for".into(),
            members: vec![1, 2],
            features: Default::default(),
        });
        let ctx = ExportContext {
            rules: &rules,
            session: &session,
            document: &document,
            input: document.annotation_set(None),
            relation_base: "http://ex.org/",
        };
        let mut sink = open_sink();
        resolve_explicit_relations(&ctx, &mut sink, &mut ResolutionCounts::default()).unwrap();
        match &sink.explicit_relations()[0] {
            SinkEvent::ExplicitRelation { relation, .. } => {
                assert_eq!(relation, &format!("http://ex.org/{}/works%20for/5#works%20for", session.id));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
