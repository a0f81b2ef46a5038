mod graph;
mod persistence;
mod sink;

pub use graph::{QuadStore, STORE_FILE};
pub use persistence::{QuadLoader, QuadWriter};
pub use sink::{RecordingSink, SinkEvent, TransactionMode, TripleSink};
