use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::value::FeatureMap;

/// Host-assigned identifier, unique within one document.
pub type AnnotationId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    #[serde(rename = "type")]
    pub kind: String,
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "FeatureMap::is_empty")]
    pub features: FeatureMap,
}

impl Annotation {
    pub fn new(id: AnnotationId, kind: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            id,
            kind: kind.into(),
            start,
            end,
            features: FeatureMap::new(),
        }
    }

    pub fn with_feature(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    pub fn feature(&self, name: &str) -> Option<&serde_json::Value> {
        self.features.get(name)
    }

    pub fn within(&self, start: usize, end: usize) -> bool {
        self.start >= start && self.end <= end
    }
}

/// Typed n-ary link between annotations, independent of their spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplicitRelation {
    pub id: AnnotationId,
    #[serde(rename = "type")]
    pub kind: String,
    pub members: Vec<AnnotationId>,
    #[serde(default, skip_serializing_if = "FeatureMap::is_empty")]
    pub features: FeatureMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub relations: Vec<ExplicitRelation>,
}

impl AnnotationSet {
    /// Annotations of one type, in document order.
    pub fn of_type<'a>(&'a self, kind: &'a str) -> Vec<&'a Annotation> {
        let mut found: Vec<&Annotation> =
            self.annotations.iter().filter(|a| a.kind == kind).collect();
        found.sort_by_key(|a| (a.start, a.id));
        found
    }

    /// Annotations of one type lying inside `[start, end]`, in document order.
    pub fn contained<'a>(&'a self, start: usize, end: usize, kind: &'a str) -> Vec<&'a Annotation> {
        self.of_type(kind)
            .into_iter()
            .filter(|a| a.within(start, end))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub content: String,
    /// Annotation sets by name; the empty name is the default set.
    #[serde(default)]
    pub annotation_sets: BTreeMap<String, AnnotationSet>,
}

impl Document {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn set_mut(&mut self, name: &str) -> &mut AnnotationSet {
        self.annotation_sets.entry(name.to_string()).or_default()
    }

    /// Named set, or the default set for `None`/blank names. Missing sets
    /// read as empty.
    pub fn annotation_set(&self, name: Option<&str>) -> &AnnotationSet {
        static EMPTY: AnnotationSet = AnnotationSet {
            annotations: Vec::new(),
            relations: Vec::new(),
        };
        let key = name.map(str::trim).unwrap_or("");
        self.annotation_sets.get(key).unwrap_or(&EMPTY)
    }

    /// Looks an annotation up by id across all sets.
    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotation_sets
            .values()
            .flat_map(|set| set.annotations.iter())
            .find(|a| a.id == id)
    }

    /// Text covered by an annotation, offsets counted in characters.
    pub fn covered_text(&self, annotation: &Annotation) -> String {
        self.content
            .chars()
            .skip(annotation.start)
            .take(annotation.end.saturating_sub(annotation.start))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Document {
        let mut doc = Document::new("doc.txt", "Jean travaille à Montréal.");
        let set = doc.set_mut("");
        set.annotations.push(Annotation::new(2, "Location", 17, 25));
        set.annotations.push(Annotation::new(1, "Person", 0, 4).with_feature("gender", json!("male")));
        set.annotations.push(Annotation::new(3, "Sentence", 0, 26));
        doc
    }

    #[test]
    fn lookup_and_containment() {
        let doc = sample();
        let set = doc.annotation_set(None);
        assert_eq!(set.of_type("Person").len(), 1);
        assert_eq!(set.contained(0, 26, "Location")[0].id, 2);
        assert!(set.contained(0, 10, "Location").is_empty());
        assert_eq!(doc.annotation(2).map(|a| a.kind.as_str()), Some("Location"));
        assert!(doc.annotation_set(Some("missing")).annotations.is_empty());
    }

    #[test]
    fn covered_text_uses_character_offsets() {
        let doc = sample();
        let location = doc.annotation(2).unwrap();
        assert_eq!(doc.covered_text(location), "Montréal");
    }

    #[test]
    fn parses_host_json() {
        let doc: Document = serde_json::from_value(json!({
            "name": "a.txt",
            "source_url": "file:/corpus/a.txt",
            "content": "Alice",
            "annotation_sets": {
                "": {
                    "annotations": [{"id": 1, "type": "Person", "start": 0, "end": 5}],
                    "relations": [{"id": 9, "type": "knows", "members": [1, 1]}]
                }
            }
        }))
        .unwrap();
        assert_eq!(doc.annotation_set(Some("")).relations[0].members, vec![1, 1]);
    }
}
