use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{ExportError, ExportResult};

/// Fields shared by every mapping rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHeader {
    /// Rule identifier (an IRI), the key into every rule index.
    pub rule: String,
    /// RDF type or predicate IRI the rule produces.
    pub target_type: String,
}

impl RuleHeader {
    pub fn new(rule: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            target_type: target_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectMapping {
    #[serde(flatten)]
    pub header: RuleHeader,
    pub source_type: String,
    pub base_uri: String,
}

impl SubjectMapping {
    pub fn new(
        rule: impl Into<String>,
        target_type: impl Into<String>,
        source_type: impl Into<String>,
        base_uri: impl Into<String>,
    ) -> Self {
        Self {
            header: RuleHeader::new(rule, target_type),
            source_type: source_type.into(),
            base_uri: base_uri.into(),
        }
    }

    pub fn rule(&self) -> &str {
        &self.header.rule
    }

    pub fn rdf_type(&self) -> &str {
        &self.header.target_type
    }
}

/// Engine-computed values a property rule may export instead of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DerivedAttribute {
    Content,
    StartOffset,
    EndOffset,
    DocUrl,
    AnnotatedAt,
    AnnotatedBy,
}

impl DerivedAttribute {
    pub fn name(self) -> &'static str {
        match self {
            DerivedAttribute::Content => "content",
            DerivedAttribute::StartOffset => "startOffset",
            DerivedAttribute::EndOffset => "endOffset",
            DerivedAttribute::DocUrl => "docURL",
            DerivedAttribute::AnnotatedAt => "annotatedAt",
            DerivedAttribute::AnnotatedBy => "annotatedBy",
        }
    }
}

impl fmt::Display for DerivedAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DerivedAttribute {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let attribute = match s.trim() {
            "content" => DerivedAttribute::Content,
            "startOffset" => DerivedAttribute::StartOffset,
            "endOffset" => DerivedAttribute::EndOffset,
            "docURL" => DerivedAttribute::DocUrl,
            "annotatedAt" => DerivedAttribute::AnnotatedAt,
            "annotatedBy" => DerivedAttribute::AnnotatedBy,
            other => return Err(ExportError::UnsupportedAttribute(other.to_string())),
        };
        Ok(attribute)
    }
}

/// Where a property value comes from. Exactly one source per mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertySource {
    Feature(String),
    Attribute(DerivedAttribute),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyMapping {
    #[serde(flatten)]
    pub header: RuleHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    pub source: PropertySource,
}

impl PropertyMapping {
    /// Builds a property rule from its raw columns. Exactly one of
    /// `feature` and `attribute` must be present, and an attribute must
    /// name one of the derived values.
    pub fn new(
        rule: impl Into<String>,
        target_type: impl Into<String>,
        source_type: Option<String>,
        feature: Option<String>,
        attribute: Option<String>,
    ) -> ExportResult<Self> {
        let rule = rule.into();
        let source = match (feature, attribute) {
            (Some(_), Some(_)) => {
                return Err(ExportError::InvalidPropertyMapping {
                    rule,
                    reason: "both feature and attribute have values",
                })
            }
            (None, None) => {
                return Err(ExportError::InvalidPropertyMapping {
                    rule,
                    reason: "both feature and attribute are absent",
                })
            }
            (Some(feature), None) => PropertySource::Feature(feature),
            (None, Some(attribute)) => PropertySource::Attribute(attribute.parse()?),
        };
        Ok(Self {
            header: RuleHeader::new(rule, target_type),
            source_type,
            source,
        })
    }

    pub fn rule(&self) -> &str {
        &self.header.rule
    }

    pub fn predicate(&self) -> &str {
        &self.header.target_type
    }

    /// Key under which the value lands in the export map.
    pub fn key(&self) -> &str {
        match &self.source {
            PropertySource::Feature(name) => name,
            PropertySource::Attribute(attribute) => attribute.name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationBehavior {
    /// Domain and range both name the current annotation.
    Plain,
    /// Range annotations are those inside the current annotation's span.
    Containment,
    /// The named feature holds the id of the range annotation.
    FeatureReference { feature: String },
}

impl RelationBehavior {
    pub const CONTAINS_TAG: &'static str = "contains";

    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(str::trim) {
            None | Some("") => RelationBehavior::Plain,
            Some(Self::CONTAINS_TAG) => RelationBehavior::Containment,
            Some(feature) => RelationBehavior::FeatureReference {
                feature: feature.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationMapping {
    #[serde(flatten)]
    pub header: RuleHeader,
    pub domain_rule: String,
    pub range_rule: String,
    pub behavior: RelationBehavior,
}

impl RelationMapping {
    pub fn new(
        rule: impl Into<String>,
        predicate: impl Into<String>,
        domain_rule: impl Into<String>,
        range_rule: impl Into<String>,
        behavior: RelationBehavior,
    ) -> Self {
        Self {
            header: RuleHeader::new(rule, predicate),
            domain_rule: domain_rule.into(),
            range_rule: range_rule.into(),
            behavior,
        }
    }

    pub fn rule(&self) -> &str {
        &self.header.rule
    }

    pub fn predicate(&self) -> &str {
        &self.header.target_type
    }
}

/// Any compiled rule, for listings and diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mapping", rename_all = "snake_case")]
pub enum Mapping {
    Subject(SubjectMapping),
    Property(PropertyMapping),
    Relation(RelationMapping),
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mapping::Subject(m) => write!(
                f,
                "subject {} ({} -> {}, base {})",
                m.rule(),
                m.source_type,
                m.rdf_type(),
                m.base_uri
            ),
            Mapping::Property(m) => {
                write!(f, "property {} ({} -> {})", m.rule(), m.key(), m.predicate())
            }
            Mapping::Relation(m) => write!(
                f,
                "relation {} ({} -[{}]-> {}, {:?})",
                m.rule(),
                m.domain_rule,
                m.predicate(),
                m.range_rule,
                m.behavior
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_mapping_requires_exactly_one_source() {
        let both = PropertyMapping::new(
            "map:r",
            "foaf:gender",
            None,
            Some("gender".into()),
            Some("content".into()),
        );
        assert!(matches!(
            both,
            Err(ExportError::InvalidPropertyMapping { .. })
        ));

        let neither = PropertyMapping::new("map:r", "foaf:gender", None, None, None);
        assert!(matches!(
            neither,
            Err(ExportError::InvalidPropertyMapping { .. })
        ));

        let feature =
            PropertyMapping::new("map:r", "foaf:gender", None, Some("gender".into()), None)
                .unwrap();
        assert_eq!(feature.key(), "gender");
    }

    #[test]
    fn unknown_attribute_is_a_configuration_error() {
        let err = PropertyMapping::new("map:r", "p", None, None, Some("colour".into()))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn attribute_names_parse() {
        for name in ["content", "startOffset", "endOffset", "docURL", "annotatedAt", "annotatedBy"] {
            let attribute: DerivedAttribute = name.parse().unwrap();
            assert_eq!(attribute.name(), name);
        }
    }

    #[test]
    fn behavior_tags() {
        assert_eq!(RelationBehavior::from_tag(None), RelationBehavior::Plain);
        assert_eq!(
            RelationBehavior::from_tag(Some("contains")),
            RelationBehavior::Containment
        );
        assert_eq!(
            RelationBehavior::from_tag(Some("employedBy")),
            RelationBehavior::FeatureReference {
                feature: "employedBy".into()
            }
        );
    }
}
