//! IRIs of the mapping-rule vocabulary and of the output vocabulary.

/// Mapping-rule vocabulary read by the default rule queries.
pub struct MAP;

impl MAP {
    pub const NS: &'static str = "http://lod.semanticsoftware.info/mapping/mapping#";

    pub const MAPPING: &'static str = "http://lod.semanticsoftware.info/mapping/mapping#Mapping";
    pub const TYPE: &'static str = "http://lod.semanticsoftware.info/mapping/mapping#type";
    pub const BASE_URI: &'static str = "http://lod.semanticsoftware.info/mapping/mapping#baseURI";
    pub const GATE_TYPE: &'static str = "http://lod.semanticsoftware.info/mapping/mapping#GATEtype";
    pub const HAS_MAPPING: &'static str =
        "http://lod.semanticsoftware.info/mapping/mapping#hasMapping";
    pub const GATE_FEATURE: &'static str =
        "http://lod.semanticsoftware.info/mapping/mapping#GATEfeature";
    pub const GATE_ATTRIBUTE: &'static str =
        "http://lod.semanticsoftware.info/mapping/mapping#GATEattribute";
    pub const DOMAIN: &'static str = "http://lod.semanticsoftware.info/mapping/mapping#domain";
    pub const RANGE: &'static str = "http://lod.semanticsoftware.info/mapping/mapping#range";
}

/// Publication vocabulary linking corpora, documents and annotations.
pub struct PUBO;

impl PUBO {
    pub const HAS_DOCUMENT: &'static str = "http://lod.semanticsoftware.info/pubo/pubo#hasDocument";
    pub const HAS_ANNOTATION: &'static str =
        "http://lod.semanticsoftware.info/pubo/pubo#hasAnnotation";
}

pub const DEFAULT_CORPUS_BASE: &str = "http://semanticsoftware.info/lodexporter/Corpus/";
pub const DEFAULT_RELATION_BASE: &str = "http://semanticsoftware.info/lodexporter/";
