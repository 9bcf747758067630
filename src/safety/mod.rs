//! SQL write policy.
//!
//! The workflow executes model-authored SQL verbatim, so every statement is
//! classified before it runs. Read-only statements always pass; data
//! modification and schema changes are refused unless writes are allowed.

use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::fmt;

/// Safety level classification for a SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SafetyLevel {
    /// Read-only statements (SELECT, EXPLAIN, SHOW).
    Safe,
    /// Data modification statements (INSERT, UPDATE, MERGE).
    Mutating,
    /// Data loss or schema changes (DELETE, DROP, TRUNCATE, ALTER, CREATE, grants).
    Destructive,
}

impl SafetyLevel {
    /// Returns true if the write policy blocks this level by default.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Mutating | Self::Destructive)
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "read-only"),
            Self::Mutating => write!(f, "mutating"),
            Self::Destructive => write!(f, "destructive"),
        }
    }
}

/// Classifies a single SQL statement.
///
/// Statements that fail to parse are treated as destructive; the model
/// produced something we cannot vouch for, so the conservative answer is to
/// block it under the default policy.
pub fn classify_statement(sql: &str) -> SafetyLevel {
    let dialect = PostgreSqlDialect {};
    let statements = match Parser::parse_sql(&dialect, sql) {
        Ok(statements) if !statements.is_empty() => statements,
        _ => return SafetyLevel::Destructive,
    };

    statements
        .iter()
        .map(classify_parsed)
        .max()
        .unwrap_or(SafetyLevel::Destructive)
}

fn classify_parsed(statement: &Statement) -> SafetyLevel {
    match statement {
        // Queries may contain data-modifying CTEs, so recurse
        Statement::Query(query) => classify_query(query),
        Statement::Explain {
            analyze, statement, ..
        } => {
            if *analyze {
                // EXPLAIN ANALYZE executes the statement
                classify_parsed(statement)
            } else {
                SafetyLevel::Safe
            }
        }
        Statement::ShowVariable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. } => SafetyLevel::Safe,

        Statement::Insert(_) | Statement::Update { .. } | Statement::Merge { .. } => {
            SafetyLevel::Mutating
        }

        Statement::Delete(_)
        | Statement::Drop { .. }
        | Statement::Truncate { .. }
        | Statement::AlterTable { .. }
        | Statement::AlterIndex { .. }
        | Statement::AlterView { .. }
        | Statement::AlterRole { .. }
        | Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateFunction { .. }
        | Statement::CreateRole { .. }
        | Statement::Grant { .. }
        | Statement::Revoke { .. } => SafetyLevel::Destructive,

        // Conservative default for anything unrecognized
        _ => SafetyLevel::Destructive,
    }
}

/// Classifies a Query by recursively inspecting CTEs and the body.
fn classify_query(query: &Query) -> SafetyLevel {
    let mut level = SafetyLevel::Safe;

    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            level = level.max(classify_query(&cte.query));
        }
    }

    level.max(classify_set_expr(&query.body))
}

fn classify_set_expr(body: &SetExpr) -> SafetyLevel {
    match body {
        SetExpr::Select(_) | SetExpr::Values(_) | SetExpr::Table(_) => SafetyLevel::Safe,
        SetExpr::Query(query) => classify_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            classify_set_expr(left).max(classify_set_expr(right))
        }
        // Mutations in CTE bodies arrive wrapped as statements
        SetExpr::Insert(statement) | SetExpr::Update(statement) => classify_parsed(statement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_is_safe() {
        assert_eq!(classify_statement("SELECT * FROM users"), SafetyLevel::Safe);
        assert_eq!(
            classify_statement("SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id"),
            SafetyLevel::Safe
        );
    }

    #[test]
    fn test_explain_is_safe() {
        assert_eq!(
            classify_statement("EXPLAIN SELECT * FROM users"),
            SafetyLevel::Safe
        );
    }

    #[test]
    fn test_explain_analyze_inherits_inner_level() {
        assert_eq!(
            classify_statement("EXPLAIN ANALYZE DELETE FROM users"),
            SafetyLevel::Destructive
        );
    }

    #[test]
    fn test_insert_and_update_are_mutating() {
        assert_eq!(
            classify_statement("INSERT INTO users (name) VALUES ('x')"),
            SafetyLevel::Mutating
        );
        assert_eq!(
            classify_statement("UPDATE users SET name = 'x' WHERE id = 1"),
            SafetyLevel::Mutating
        );
    }

    #[test]
    fn test_destructive_statements() {
        assert_eq!(
            classify_statement("DELETE FROM users"),
            SafetyLevel::Destructive
        );
        assert_eq!(classify_statement("DROP TABLE users"), SafetyLevel::Destructive);
        assert_eq!(
            classify_statement("TRUNCATE TABLE users"),
            SafetyLevel::Destructive
        );
        assert_eq!(
            classify_statement("ALTER TABLE users ADD COLUMN age integer"),
            SafetyLevel::Destructive
        );
    }

    #[test]
    fn test_cte_select_is_safe() {
        assert_eq!(
            classify_statement("WITH t AS (SELECT id FROM users) SELECT * FROM t"),
            SafetyLevel::Safe
        );
    }

    #[test]
    fn test_unparseable_is_destructive() {
        assert_eq!(
            classify_statement("SELEKT * FORM users"),
            SafetyLevel::Destructive
        );
        assert_eq!(classify_statement(""), SafetyLevel::Destructive);
    }

    #[test]
    fn test_level_ordering() {
        assert!(SafetyLevel::Safe < SafetyLevel::Mutating);
        assert!(SafetyLevel::Mutating < SafetyLevel::Destructive);
        assert!(!SafetyLevel::Safe.is_write());
        assert!(SafetyLevel::Mutating.is_write());
        assert!(SafetyLevel::Destructive.is_write());
    }
}
