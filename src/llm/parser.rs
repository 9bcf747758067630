//! Response parsing for LLM outputs.
//!
//! Extracts SQL from responses that may wrap the query in markdown code
//! fences. A ```sql block wins over a bare ``` block; the first matching
//! block is used when several are present.

/// Result of parsing an LLM response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Any explanatory text outside the code block.
    pub text: String,
    /// Extracted SQL query, if a code block was found.
    pub sql: Option<String>,
}

impl ParsedResponse {
    /// Creates a parsed response with only text (no SQL).
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: None,
        }
    }

    /// Creates a parsed response with SQL and surrounding text.
    pub fn with_sql(text: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: Some(sql.into()),
        }
    }
}

/// A fenced code block found in a response, with the text around it.
struct FencedBlock {
    body: String,
    remainder: String,
}

/// Parses an LLM response, extracting SQL from the first code block.
///
/// If no code block is present the whole response is returned as text with
/// `sql` unset; the caller decides whether bare text counts as a query.
pub fn parse_llm_response(response: &str) -> ParsedResponse {
    if let Some(block) = find_block(response, Some("sql")) {
        return ParsedResponse::with_sql(block.remainder.trim(), block.body.trim());
    }
    if let Some(block) = find_block(response, None) {
        return ParsedResponse::with_sql(block.remainder.trim(), block.body.trim());
    }
    ParsedResponse::text_only(response.trim())
}

/// Finds the first fenced block with the given language tag.
///
/// `None` matches only fences with no tag at all, so a ```python block is
/// never mistaken for SQL.
fn find_block(response: &str, lang: Option<&str>) -> Option<FencedBlock> {
    let mut body = Vec::new();
    let mut remainder = Vec::new();
    let mut in_block = false;
    let mut found = false;

    for line in response.lines() {
        let trimmed = line.trim();
        if !found && !in_block {
            if let Some(tag) = trimmed.strip_prefix("```") {
                let matches = match lang {
                    Some(lang) => tag.trim().eq_ignore_ascii_case(lang),
                    None => tag.trim().is_empty(),
                };
                if matches {
                    in_block = true;
                    continue;
                }
            }
            remainder.push(line);
        } else if in_block {
            if trimmed.starts_with("```") {
                in_block = false;
                found = true;
                continue;
            }
            body.push(line);
        } else {
            remainder.push(line);
        }
    }

    // An unterminated fence is not a block
    if !found {
        return None;
    }

    Some(FencedBlock {
        body: body.join("\n"),
        remainder: remainder.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sql_code_block() {
        let response = r#"Here's the query:

```sql
SELECT * FROM users;
```

This will return all users."#;

        let parsed = parse_llm_response(response);

        assert_eq!(parsed.sql, Some("SELECT * FROM users;".to_string()));
        assert!(parsed.text.contains("Here's the query:"));
        assert!(parsed.text.contains("This will return all users."));
    }

    #[test]
    fn test_extract_generic_code_block() {
        let response = "```\nSELECT COUNT(*) FROM orders;\n```";

        let parsed = parse_llm_response(response);

        assert_eq!(parsed.sql, Some("SELECT COUNT(*) FROM orders;".to_string()));
    }

    #[test]
    fn test_no_code_block() {
        let response = "I don't understand that question. Could you please clarify?";

        let parsed = parse_llm_response(response);

        assert_eq!(parsed.sql, None);
        assert_eq!(parsed.text, response);
    }

    #[test]
    fn test_multiple_code_blocks_uses_first() {
        let response = r#"First query:

```sql
SELECT * FROM users;
```

Alternative:

```sql
SELECT id, name FROM users;
```"#;

        let parsed = parse_llm_response(response);

        assert_eq!(parsed.sql, Some("SELECT * FROM users;".to_string()));
    }

    #[test]
    fn test_sql_block_preferred_over_generic() {
        let response = "```\nThis is not SQL\n```\n\n```sql\nSELECT * FROM users;\n```";

        let parsed = parse_llm_response(response);

        assert_eq!(parsed.sql, Some("SELECT * FROM users;".to_string()));
    }

    #[test]
    fn test_multiline_sql() {
        let response = r#"```sql
SELECT
    u.id,
    COUNT(o.id) AS order_count
FROM users u
LEFT JOIN orders o ON o.user_id = u.id
GROUP BY u.id;
```"#;

        let parsed = parse_llm_response(response);

        let sql = parsed.sql.unwrap();
        assert!(sql.contains("LEFT JOIN"));
        assert!(sql.contains("GROUP BY"));
    }

    #[test]
    fn test_empty_response() {
        let parsed = parse_llm_response("");
        assert_eq!(parsed.sql, None);
        assert_eq!(parsed.text, "");
    }

    #[test]
    fn test_code_block_with_other_language() {
        let response = "```python\nprint(\"hello\")\n```";

        let parsed = parse_llm_response(response);

        assert_eq!(parsed.sql, None);
    }

    #[test]
    fn test_unterminated_fence_is_text() {
        let response = "```sql\nSELECT 1;";

        let parsed = parse_llm_response(response);

        assert_eq!(parsed.sql, None);
    }

    #[test]
    fn test_parsed_response_constructors() {
        let text_only = ParsedResponse::text_only("Hello");
        assert_eq!(text_only.text, "Hello");
        assert_eq!(text_only.sql, None);

        let with_sql = ParsedResponse::with_sql("Explanation", "SELECT 1");
        assert_eq!(with_sql.sql, Some("SELECT 1".to_string()));
    }
}
