// Filter evaluation for the in-memory collection.

mod eval;
mod parse;
mod types;

pub use eval::eval_filter;
pub use parse::parse_filter;
pub use types::{CmpOp, Filter};
