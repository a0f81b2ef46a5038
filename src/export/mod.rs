mod controller;
mod properties;
mod relations;
mod session;
mod subjects;
mod uri;

pub use controller::{run_session, Exporter, SessionOptions};
pub use properties::resolve_properties;
pub use relations::{resolve_explicit_relations, resolve_rule_relations};
pub use session::{DocumentOutcome, ExportContext, ExportSession, ResolutionCounts};
pub use subjects::resolve_subjects;
pub use uri::{annotation_iri, container_uri, http_scheme, resolve_identity, DocumentIdentity, DocumentUriPolicy};
