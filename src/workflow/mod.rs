//! The query-repair workflow.
//!
//! One [`WorkItem`] per incoming question, threaded through a fixed graph of
//! steps: generate SQL, execute it, then either explain it or ask the model
//! for a repaired query and try again, within an explicit retry budget.

mod engine;
mod item;
mod splitter;

pub use engine::{Workflow, WorkflowOptions};
pub use item::{WorkItem, WorkflowFailure};
pub use splitter::split_statements;
