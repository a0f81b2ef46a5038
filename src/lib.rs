pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod rules;
pub mod store;
pub mod utils;
pub mod vocab;

pub use config::{ExporterConfig, RuleLocation};
pub use domain::{Annotation, AnnotationSet, Document, ExplicitRelation};
pub use error::{ExportError, ExportResult};
pub use export::{DocumentOutcome, Exporter};
pub use rules::{RuleIndex, RuleQueries};
pub use store::{QuadStore, TripleSink};
