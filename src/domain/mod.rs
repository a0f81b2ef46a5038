mod document;
mod rule;
mod value;

pub use document::{Annotation, AnnotationId, AnnotationSet, Document, ExplicitRelation};
pub use rule::{
    DerivedAttribute, Mapping, PropertyMapping, PropertySource, RelationBehavior,
    RelationMapping, RuleHeader, SubjectMapping,
};
pub use value::{ExportedProperty, FeatureMap, PropertyMap, PropertyValue};
