//! End-to-end workflow tests.
//!
//! Run the full generate/execute/repair/explain pipeline against the mock
//! LLM and mock database, the same wiring `--llm mock --mock-db` uses.

use pretty_assertions::assert_eq;

use sqlwright::db::{DatabaseClient, MockDatabaseClient};
use sqlwright::llm::MockLlmClient;
use sqlwright::workflow::{split_statements, Workflow, WorkflowFailure, WorkflowOptions};

/// Fetches the mock schema description the way the binary does per question.
async fn schema_text(db: &MockDatabaseClient) -> String {
    db.introspect_schema().await.unwrap().format_for_llm()
}

#[tokio::test]
async fn first_try_success_populates_result_and_explanation() {
    let llm = MockLlmClient::new();
    let db = MockDatabaseClient::new();
    let schema = schema_text(&db).await;
    let workflow = Workflow::new(&llm, &db);

    let item = workflow.run("Show me all users", &schema).await.unwrap();

    assert_eq!(item.error, None);
    assert_eq!(item.sql, Some("SELECT * FROM users;".to_string()));
    assert!(item.result.is_some());
    assert!(item.explanation.is_some());
    // generate + explain, no repair
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn repaired_run_ends_with_repaired_sql_and_no_error() {
    let llm = MockLlmClient::new().with_script([
        "```sql\nSELECT * FROM usr;\n```",
        "```sql\nSELECT * FROM users;\n```",
    ]);
    let db =
        MockDatabaseClient::new().fail_matching("FROM usr", "relation \"usr\" does not exist");
    let schema = schema_text(&db).await;
    let workflow = Workflow::new(&llm, &db);

    let item = workflow.run("Show me all users", &schema).await.unwrap();

    assert_eq!(item.error, None);
    assert_eq!(item.sql, Some("SELECT * FROM users;".to_string()));
    assert!(item.result.is_some());
    assert!(item.explanation.is_some());
    // Both the broken and the repaired statement reached the database
    assert_eq!(
        db.executed_statements(),
        vec!["SELECT * FROM usr", "SELECT * FROM users"]
    );
}

#[tokio::test]
async fn persistent_failure_terminates_with_error_set() {
    let llm = MockLlmClient::new().with_script([
        "```sql\nSELECT * FROM nope;\n```",
        "```sql\nSELECT * FROM nope;\n```",
    ]);
    let db = MockDatabaseClient::new().fail_matching("nope", "relation does not exist");
    let schema = schema_text(&db).await;
    let workflow = Workflow::new(&llm, &db);

    let item = workflow.run("Show me nope", &schema).await.unwrap();

    assert!(item.is_failed());
    assert_eq!(item.result, None);
    match item.error {
        Some(WorkflowFailure::RepairExhausted { attempts, ref last }) => {
            assert_eq!(attempts, 1);
            assert!(last.contains("relation does not exist"));
        }
        ref other => panic!("expected RepairExhausted, got {:?}", other),
    }
    // Bounded: generate + one repair, then the workflow gave up
    assert_eq!(llm.call_count(), 2);
    assert_eq!(db.executed_statements().len(), 2);
}

#[tokio::test]
async fn repair_budget_is_configurable() {
    let llm = MockLlmClient::new().with_script([
        "```sql\nSELECT * FROM nope;\n```",
        "```sql\nSELECT * FROM nope;\n```",
        "```sql\nSELECT * FROM nope;\n```",
        "```sql\nSELECT * FROM nope;\n```",
    ]);
    let db = MockDatabaseClient::new().fail_matching("nope", "relation does not exist");
    let schema = schema_text(&db).await;
    let workflow = Workflow::new(&llm, &db).with_options(WorkflowOptions {
        max_repairs: 3,
        ..Default::default()
    });

    let item = workflow.run("Show me nope", &schema).await.unwrap();

    match item.error {
        Some(WorkflowFailure::RepairExhausted { attempts, .. }) => assert_eq!(attempts, 3),
        ref other => panic!("expected RepairExhausted, got {:?}", other),
    }
    // generate + 3 repairs
    assert_eq!(llm.call_count(), 4);
}

#[tokio::test]
async fn statement_splitting_runs_each_statement_in_order() {
    let llm = MockLlmClient::new().with_script(["```sql\nSELECT 1; SELECT 2;\n```"]);
    let db = MockDatabaseClient::new();
    let schema = schema_text(&db).await;
    let workflow = Workflow::new(&llm, &db);

    let item = workflow.run("two numbers", &schema).await.unwrap();

    assert_eq!(item.error, None);
    assert_eq!(db.executed_statements(), vec!["SELECT 1", "SELECT 2"]);
}

#[tokio::test]
async fn single_statement_without_semicolon_runs_once() {
    let llm = MockLlmClient::new().with_script(["```sql\nSELECT 1\n```"]);
    let db = MockDatabaseClient::new();
    let schema = schema_text(&db).await;
    let workflow = Workflow::new(&llm, &db);

    let item = workflow.run("one number", &schema).await.unwrap();

    assert_eq!(item.error, None);
    assert_eq!(db.executed_statements(), vec!["SELECT 1"]);
}

#[tokio::test]
async fn identical_questions_yield_identical_outcomes() {
    let mut runs = Vec::new();
    for _ in 0..2 {
        let llm = MockLlmClient::new();
        let db = MockDatabaseClient::new();
        let schema = schema_text(&db).await;
        let workflow = Workflow::new(&llm, &db);
        runs.push(workflow.run("Count all orders", &schema).await.unwrap());
    }

    assert_eq!(runs[0].sql, runs[1].sql);
    assert_eq!(runs[0].result, runs[1].result);
    assert_eq!(runs[0].explanation, runs[1].explanation);
}

#[tokio::test]
async fn empty_generation_reports_failure_without_touching_database() {
    let llm = MockLlmClient::new().with_script([""]);
    let db = MockDatabaseClient::new();
    let schema = schema_text(&db).await;
    let workflow = Workflow::new(&llm, &db);

    let item = workflow.run("anything at all", &schema).await.unwrap();

    assert_eq!(item.error, Some(WorkflowFailure::EmptyGeneration));
    assert_eq!(item.sql, None);
    assert_eq!(item.result, None);
    assert!(db.executed_statements().is_empty());
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn failure_message_names_the_failing_statement() {
    let llm = MockLlmClient::new().with_script([
        "```sql\nSELECT 1; SELECT broken; SELECT 3;\n```",
        "",
    ]);
    let db = MockDatabaseClient::new().fail_matching("broken", "column \"broken\" does not exist");
    let schema = schema_text(&db).await;
    let workflow = Workflow::new(&llm, &db);

    let item = workflow.run("mixed statements", &schema).await.unwrap();

    // First statement ran, second failed, third never executed
    assert_eq!(
        db.executed_statements(),
        vec!["SELECT 1", "SELECT broken"]
    );
    match item.error {
        Some(WorkflowFailure::RepairExhausted { ref last, .. }) => {
            assert!(last.contains("no usable text"));
        }
        ref other => panic!("expected RepairExhausted, got {:?}", other),
    }
}

#[test]
fn split_statements_matches_documented_edge_cases() {
    assert_eq!(
        split_statements("SELECT 1; SELECT 2;"),
        vec!["SELECT 1", "SELECT 2"]
    );
    assert_eq!(split_statements("SELECT 1"), vec!["SELECT 1"]);
    assert!(split_statements(" ; ; ").is_empty());
}
