//! File operations and the commit path to the remote repository.

mod commit;
pub mod operations;
pub mod parser;

pub use commit::{CommitBuilder, DEFAULT_BRANCH, DEFAULT_BRANCH_WAIT};
pub use operations::{FileChange, FileOperation, OperationKind, RawFileOperation};
pub use parser::{parse_operations, parse_operations_json};
