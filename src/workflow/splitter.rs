//! Statement splitting for candidate SQL.

/// Splits candidate SQL into statements on `;`, discarding blank fragments.
///
/// Deliberately naive: a semicolon inside a string literal mis-splits. Model
/// output for the supported prompts is single statements or simple scripts,
/// and the failure mode is an execution error that flows into the normal
/// repair path rather than anything silent.
pub fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(String::from)
        .collect()
}
