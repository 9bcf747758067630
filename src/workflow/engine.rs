//! The query-repair state machine.
//!
//! A fixed graph of steps over an immutable [`WorkItem`]:
//!
//! ```text
//! generate -> execute -> explain            (success)
//!                |  ^
//!                v  |
//!               repair                      (bounded by max_repairs)
//! ```
//!
//! Each step function takes the current item and returns a [`StepOutcome`];
//! the dispatcher routes on that outcome instead of inspecting ambient state.
//! Workflow failures terminate in the returned item's `error` field;
//! infrastructure faults (LLM transport, client construction) propagate as
//! crate errors.

use tracing::{debug, warn};

use crate::db::DatabaseClient;
use crate::error::{Result, SqlwrightError};
use crate::llm::{parse_llm_response, prompt, LlmClient};
use crate::safety::classify_statement;
use crate::workflow::item::{WorkItem, WorkflowFailure};
use crate::workflow::splitter::split_statements;

/// Tuning knobs for a workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Maximum repair attempts per question before giving up.
    pub max_repairs: u32,
    /// Whether model-authored write statements may execute.
    pub allow_writes: bool,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            max_repairs: 1,
            allow_writes: false,
        }
    }
}

/// The named steps of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Generate,
    Execute,
    Repair,
    Explain,
}

/// Semantic outcome of one step.
enum StepOutcome {
    /// The step succeeded; continue with the merged item.
    Advanced(WorkItem),
    /// The step failed in a way the dispatcher routes on.
    Failed(WorkflowFailure),
}

/// Runs questions through the generate/execute/repair/explain graph.
///
/// Holds no per-question state; independent questions can run concurrently
/// on separate `run` calls as long as the clients tolerate it.
pub struct Workflow<'a> {
    llm: &'a dyn LlmClient,
    db: &'a dyn DatabaseClient,
    options: WorkflowOptions,
}

impl<'a> Workflow<'a> {
    /// Creates a workflow over the given clients.
    pub fn new(llm: &'a dyn LlmClient, db: &'a dyn DatabaseClient) -> Self {
        Self {
            llm,
            db,
            options: WorkflowOptions::default(),
        }
    }

    /// Replaces the default options.
    pub fn with_options(mut self, options: WorkflowOptions) -> Self {
        self.options = options;
        self
    }

    /// Processes one question against the given schema description.
    ///
    /// The schema text is fetched by the caller once per question and passed
    /// through unchanged to every prompt of the run. On return the item
    /// carries either (`sql`, `result`, `explanation`) or (`sql`, `error`).
    pub async fn run(&self, question: &str, schema: &str) -> Result<WorkItem> {
        let mut item = WorkItem::new(question, schema);
        let mut step = Step::Generate;
        let mut repairs_used: u32 = 0;
        let mut pending_failure: Option<WorkflowFailure> = None;

        loop {
            debug!(?step, repairs_used, "workflow step");
            match step {
                Step::Generate => match self.generate(&item).await? {
                    StepOutcome::Advanced(next) => {
                        item = next;
                        step = Step::Execute;
                    }
                    StepOutcome::Failed(failure) => {
                        warn!(%failure, "generation failed");
                        return Ok(item.with_error(failure));
                    }
                },

                Step::Execute => match self.execute(&item).await? {
                    StepOutcome::Advanced(next) => {
                        item = next;
                        step = Step::Explain;
                    }
                    StepOutcome::Failed(failure) => {
                        if repairs_used >= self.options.max_repairs {
                            warn!(%failure, repairs_used, "repair budget exhausted");
                            return Ok(item.with_error(WorkflowFailure::RepairExhausted {
                                attempts: repairs_used,
                                last: failure.to_string(),
                            }));
                        }
                        pending_failure = Some(failure);
                        step = Step::Repair;
                    }
                },

                Step::Repair => {
                    let failure = pending_failure.take().ok_or_else(|| {
                        SqlwrightError::internal("repair step entered without a failure")
                    })?;
                    repairs_used += 1;
                    match self.repair(&item, &failure).await? {
                        StepOutcome::Advanced(next) => {
                            item = next;
                            step = Step::Execute;
                        }
                        StepOutcome::Failed(repair_failure) => {
                            warn!(%repair_failure, "repair itself failed");
                            return Ok(item.with_error(WorkflowFailure::RepairExhausted {
                                attempts: repairs_used,
                                last: repair_failure.to_string(),
                            }));
                        }
                    }
                }

                Step::Explain => return self.explain(item).await,
            }
        }
    }

    /// Asks the model for a candidate query.
    async fn generate(&self, item: &WorkItem) -> Result<StepOutcome> {
        let messages = prompt::generation_messages(&item.schema, &item.question);
        let response = self.llm.complete(&messages).await?;

        Ok(match extract_sql(&response) {
            Some(sql) => {
                debug!(%sql, "generated candidate query");
                StepOutcome::Advanced(item.clone().with_sql(sql))
            }
            None => StepOutcome::Failed(WorkflowFailure::EmptyGeneration),
        })
    }

    /// Runs the candidate query, statement by statement.
    ///
    /// Output accumulates across statements; the first failure wins and the
    /// remaining statements do not run.
    async fn execute(&self, item: &WorkItem) -> Result<StepOutcome> {
        let sql = item
            .sql
            .as_deref()
            .ok_or_else(|| SqlwrightError::internal("execute step entered without sql"))?;

        let statements = split_statements(sql);
        if statements.is_empty() {
            return Ok(StepOutcome::Failed(WorkflowFailure::ExecutionFailure {
                statement: sql.to_string(),
                message: "no executable statements".to_string(),
            }));
        }

        let mut outputs = Vec::with_capacity(statements.len());
        for statement in statements {
            if !self.options.allow_writes {
                let level = classify_statement(&statement);
                if level.is_write() {
                    return Ok(StepOutcome::Failed(WorkflowFailure::ExecutionFailure {
                        statement,
                        message: format!(
                            "refused to run {} statement; writes are disabled",
                            level
                        ),
                    }));
                }
            }

            match self.db.execute_statement(&statement).await {
                Ok(result) => outputs.push(result.render_text()),
                Err(e) => {
                    return Ok(StepOutcome::Failed(WorkflowFailure::ExecutionFailure {
                        statement,
                        message: e.to_string(),
                    }))
                }
            }
        }

        Ok(StepOutcome::Advanced(
            item.clone().with_result(outputs.join("\n")),
        ))
    }

    /// Asks the model for a corrected query given the failure.
    async fn repair(&self, item: &WorkItem, failure: &WorkflowFailure) -> Result<StepOutcome> {
        let sql = item
            .sql
            .as_deref()
            .ok_or_else(|| SqlwrightError::internal("repair step entered without sql"))?;

        let messages =
            prompt::repair_messages(&item.schema, &item.question, sql, &failure.to_string());
        let response = self.llm.complete(&messages).await?;

        Ok(match extract_sql(&response) {
            Some(sql) => {
                debug!(%sql, "repaired candidate query");
                StepOutcome::Advanced(item.clone().with_sql(sql))
            }
            None => StepOutcome::Failed(WorkflowFailure::EmptyGeneration),
        })
    }

    /// Asks the model to explain the final query; terminal success.
    async fn explain(&self, item: WorkItem) -> Result<WorkItem> {
        let sql = item
            .sql
            .as_deref()
            .ok_or_else(|| SqlwrightError::internal("explain step entered without sql"))?;

        let messages = prompt::explanation_messages(sql);
        let response = self.llm.complete(&messages).await?;
        let explanation = response.trim();

        if explanation.is_empty() {
            // Tolerated: the run still succeeded, the summary is just missing
            warn!("model returned an empty explanation");
            return Ok(item);
        }

        Ok(item.with_explanation(explanation))
    }
}

/// Pulls the query text out of a model response.
///
/// A fenced block wins; otherwise the raw text is taken verbatim, matching
/// the lenient treatment of models that skip the requested formatting.
/// Returns `None` when nothing usable remains.
fn extract_sql(response: &str) -> Option<String> {
    let parsed = parse_llm_response(response);
    let sql = match parsed.sql {
        Some(sql) => sql,
        None => parsed.text,
    };
    let sql = sql.trim();
    if sql.is_empty() {
        None
    } else {
        Some(sql.to_string())
    }
}
