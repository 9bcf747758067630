//! Prompt construction for the workflow's three LLM calls.
//!
//! Each builder returns the full message list for one request. The schema
//! description is injected verbatim; it is fetched once per question and the
//! same text backs the generation and repair prompts of that run.

use crate::llm::types::Message;

/// System prompt template for SQL generation.
const GENERATE_PROMPT_TEMPLATE: &str = r#"You are a SQL query generator for a PostgreSQL database. Given a natural language question, generate a SQL query that answers it.

DATABASE SCHEMA:
{schema}

INSTRUCTIONS:
- Generate only valid PostgreSQL SQL
- Use appropriate JOINs based on foreign keys
- Never generate DROP DATABASE or similar destructive operations
- If the question cannot be answered with the schema, say why instead

OUTPUT FORMAT:
Return the SQL query wrapped in ```sql code blocks."#;

/// System prompt template for query repair after a failed execution.
const REPAIR_PROMPT_TEMPLATE: &str = r#"You are a SQL query fixer for a PostgreSQL database. A previously generated query failed. Analyze the error and generate a corrected SQL query.

DATABASE SCHEMA:
{schema}

OUTPUT FORMAT:
Return only the corrected SQL query wrapped in ```sql code blocks."#;

/// System prompt for query explanation.
const EXPLAIN_PROMPT: &str =
    "You are a SQL tutor. Explain the given SQL query in simple terms, in a short paragraph.";

/// Builds the messages for the generation step.
pub fn generation_messages(schema: &str, question: &str) -> Vec<Message> {
    vec![
        Message::system(GENERATE_PROMPT_TEMPLATE.replace("{schema}", schema)),
        Message::user(question),
    ]
}

/// Builds the messages for the repair step.
///
/// Carries the original question, the failed query, and the error text so the
/// model can diagnose rather than regenerate blind.
pub fn repair_messages(schema: &str, question: &str, sql: &str, error: &str) -> Vec<Message> {
    let request = format!(
        "The previous query failed with error: {error}\n\n\
         Original question: {question}\n\n\
         Failed query:\n```sql\n{sql}\n```\n\n\
         Corrected SQL query:"
    );
    vec![
        Message::system(REPAIR_PROMPT_TEMPLATE.replace("{schema}", schema)),
        Message::user(request),
    ]
}

/// Builds the messages for the explanation step.
pub fn explanation_messages(sql: &str) -> Vec<Message> {
    vec![
        Message::system(EXPLAIN_PROMPT),
        Message::user(format!("Explain this query:\n```sql\n{sql}\n```")),
    ]
}
