use tracing::warn;

use super::session::ExportContext;
use crate::domain::{
    Annotation, DerivedAttribute, PropertyMap, PropertyMapping, PropertySource, PropertyValue,
};
use crate::utils::collapse_newlines;

/// Builds the export map of one annotation, in mapping order.
///
/// Absent features are ignored and null features are skipped with a
/// warning; neither fails the document. Unknown attribute names never get
/// here, rule compilation rejects them.
pub fn resolve_properties(
    ctx: &ExportContext<'_>,
    annotation: &Annotation,
    mappings: &[PropertyMapping],
) -> PropertyMap {
    let mut exported = PropertyMap::new();
    for mapping in mappings {
        match &mapping.source {
            PropertySource::Feature(feature) => {
                let Some(raw) = annotation.feature(feature) else {
                    continue;
                };
                match PropertyValue::from_feature(raw) {
                    Some(value) => exported.insert(feature.as_str(), mapping.predicate(), value),
                    None => warn!(
                        feature = %feature,
                        annotation = annotation.id,
                        document = %ctx.session.document_iri(),
                        "feature has a null value, skipping it"
                    ),
                }
            }
            PropertySource::Attribute(attribute) => {
                let value = derived_value(ctx, annotation, *attribute);
                exported.insert(attribute.name(), mapping.predicate(), value);
            }
        }
    }
    exported
}

fn derived_value(ctx: &ExportContext<'_>, annotation: &Annotation, attribute: DerivedAttribute) -> PropertyValue {
    match attribute {
        DerivedAttribute::Content => {
            PropertyValue::Text(collapse_newlines(&ctx.document.covered_text(annotation)))
        }
        DerivedAttribute::StartOffset => PropertyValue::Integer(annotation.start as i64),
        DerivedAttribute::EndOffset => PropertyValue::Integer(annotation.end as i64),
        DerivedAttribute::DocUrl => PropertyValue::Iri(
            ctx.document
                .source_url
                .clone()
                .unwrap_or_else(|| ctx.session.document_iri().to_string()),
        ),
        DerivedAttribute::AnnotatedAt => PropertyValue::Timestamp(ctx.session.started_at),
        DerivedAttribute::AnnotatedBy => PropertyValue::Text(ctx.session.pipeline.clone()),
    }
}
