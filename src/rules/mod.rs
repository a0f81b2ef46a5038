mod compiler;
mod query;

pub use compiler::RuleIndex;
pub use query::{ColumnBinding, ColumnTarget, RuleQueries, RuleQuery, RuleRow, RuleSource};
