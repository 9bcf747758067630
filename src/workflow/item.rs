//! The per-question record threaded through the workflow.

use thiserror::Error;

/// A failure produced by a workflow step.
///
/// These are routed by the dispatcher (to the repair step or to a terminal
/// state), never raised to the caller; the terminal WorkItem carries the
/// final one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowFailure {
    /// The model returned no usable text for a generation or repair request.
    #[error("the model returned no usable text")]
    EmptyGeneration,

    /// The database rejected a statement.
    #[error("statement failed: {statement}: {message}")]
    ExecutionFailure {
        /// The statement that failed.
        statement: String,
        /// The underlying error message.
        message: String,
    },

    /// A repair attempt itself failed, or the retry budget was exceeded.
    #[error("giving up after {attempts} repair attempt(s): {last}")]
    RepairExhausted {
        /// Repair attempts consumed before giving up.
        attempts: u32,
        /// Rendered form of the last underlying failure.
        last: String,
    },
}

/// The value threaded through the workflow for one question.
///
/// Immutable: each step returns a new item produced by one of the `with_*`
/// merge methods. After any execution attempt exactly one of `result` and
/// `error` is set; `with_result` and `with_error` clear the other side to
/// keep that invariant out of the steps' hands.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// The original natural-language request.
    pub question: String,
    /// Textual schema description, fetched once and reused for every prompt.
    pub schema: String,
    /// Current candidate query text.
    pub sql: Option<String>,
    /// Cumulative textual execution output.
    pub result: Option<String>,
    /// Natural-language description of the final query.
    pub explanation: Option<String>,
    /// Terminal failure, when the workflow gave up.
    pub error: Option<WorkflowFailure>,
}

impl WorkItem {
    /// Creates a fresh item for an incoming question.
    pub fn new(question: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            schema: schema.into(),
            sql: None,
            result: None,
            explanation: None,
            error: None,
        }
    }

    /// Returns a copy with a new candidate query.
    pub fn with_sql(self, sql: impl Into<String>) -> Self {
        Self {
            sql: Some(sql.into()),
            ..self
        }
    }

    /// Returns a copy with execution output set and any error cleared.
    pub fn with_result(self, result: impl Into<String>) -> Self {
        Self {
            result: Some(result.into()),
            error: None,
            ..self
        }
    }

    /// Returns a copy with an explanation set.
    pub fn with_explanation(self, explanation: impl Into<String>) -> Self {
        Self {
            explanation: Some(explanation.into()),
            ..self
        }
    }

    /// Returns a copy marked failed, clearing any result.
    pub fn with_error(self, error: WorkflowFailure) -> Self {
        Self {
            error: Some(error),
            result: None,
            ..self
        }
    }

    /// Returns true if the item ended in a terminal failure.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
