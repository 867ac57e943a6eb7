//! Query tools: lexical SQL validation and read-only execution through a
//! [`QueryEngine`].
//!
//! Statements are checked before anything reaches the engine. SQL must be a
//! single `SELECT` (optionally behind `WITH`) and no other statement keyword
//! may appear outside literals; DAX must start with `EVALUATE` or `DEFINE`.

use std::sync::Arc;

use async_trait::async_trait;
use orc_application::{QueryEngine, QueryError, QueryLanguage};
use orc_domain::tool::names::{EXECUTE_DAX_QUERY, EXECUTE_SQL_QUERY, VALIDATE_SQL_QUERY};
use orc_domain::{
    ToolCall, ToolContext, ToolDefinition, ToolError, ToolHandler, ToolParameter, ToolSafety,
};
use serde_json::json;
use tracing::{debug, info};

pub const SELECT_ONLY: &str = "Only SELECT statements are allowed.";
pub const DAX_ONLY: &str = "Only EVALUATE or DEFINE queries are allowed.";

/// Keywords that begin a statement (or redirect a `SELECT` into a write).
const STATEMENT_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "INSERT", "UPDATE", "DELETE", "MERGE", "CREATE", "ALTER", "DROP",
    "TRUNCATE", "EXEC", "EXECUTE", "DECLARE", "SET", "GRANT", "REVOKE", "DENY", "INTO",
    "SHUTDOWN", "KILL", "BACKUP", "RESTORE", "DBCC", "USE", "BULK", "RECONFIGURE", "WAITFOR",
    "CHECKPOINT", "OPENROWSET", "OPENDATASOURCE", "OPENQUERY", "UPSERT", "BEGIN", "COMMIT",
    "ROLLBACK", "PRINT", "RAISERROR", "THROW", "GOTO", "ENABLE", "DISABLE", "REVERT",
    "SETUSER", "CALL", "LOAD", "VACUUM", "PRAGMA", "ATTACH", "DETACH", "LOCK", "UNLOCK",
    "UPDATETEXT", "WRITETEXT", "RECEIVE", "SEND",
];

/// The only statement keywords a read-only query may contain.
const READ_ONLY_KEYWORDS: [&str; 2] = ["SELECT", "WITH"];

/// `//` opens a line comment in DAX only; in SQL it is two operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Sql,
    Dax,
}

// ==================== Lexer ====================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Identifier,
    Literal,
    Open,
    Close,
    Semicolon,
    Other,
}

/// Split a statement into tokens, skipping comments and whitespace.
fn tokenize(text: &str, dialect: Dialect) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '-' if next == Some('-') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if dialect == Dialect::Dax && next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                let mut j = i + 2;
                loop {
                    match (chars.get(j), chars.get(j + 1)) {
                        (Some('*'), Some('/')) => break,
                        (Some(_), _) => j += 1,
                        (None, _) => return Err("Unterminated comment.".to_string()),
                    }
                }
                i = j + 2;
            }
            '\'' | '"' | '[' => {
                let close = if c == '[' { ']' } else { c };
                let mut j = i + 1;
                loop {
                    match chars.get(j) {
                        // Doubled delimiter is an escaped one
                        Some(&d) if d == close && chars.get(j + 1) == Some(&close) => j += 2,
                        Some(&d) if d == close => break,
                        Some(_) => j += 1,
                        None => return Err("Unterminated quoted text.".to_string()),
                    }
                }
                tokens.push(if c == '\'' {
                    Token::Literal
                } else {
                    Token::Identifier
                });
                i = j + 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            ';' => {
                tokens.push(Token::Semicolon);
                i += 1;
            }
            c if c.is_alphanumeric() || c == '_' || c == '@' || c == '#' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '@' | '#' | '$'))
                {
                    i += 1;
                }
                tokens.push(Token::Word(chars[start..i].iter().collect()));
            }
            _ => {
                tokens.push(Token::Other);
                i += 1;
            }
        }
    }
    Ok(tokens)
}

fn keyword(token: &Token) -> Option<String> {
    match token {
        Token::Word(w) => Some(w.to_ascii_uppercase()),
        _ => None,
    }
}

/// Syntax check: balanced parentheses, closed quotes and comments, and a
/// recognizable leading statement keyword.
pub fn validate_sql(sql: &str) -> Result<(), String> {
    let tokens = tokenize(sql, Dialect::Sql)?;
    let Some(first) = tokens.first() else {
        return Err("Query is empty.".to_string());
    };

    let mut depth: i32 = 0;
    for token in &tokens {
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                depth -= 1;
                if depth < 0 {
                    return Err("Unbalanced parentheses.".to_string());
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("Unbalanced parentheses.".to_string());
    }

    match keyword(first) {
        Some(k) if STATEMENT_KEYWORDS.contains(&k.as_str()) => Ok(()),
        _ => Err("Query could not be parsed.".to_string()),
    }
}

/// A single `SELECT`/`WITH` statement that cannot change data. Any other
/// statement keyword outside literals and quoted identifiers rejects it,
/// since a batch may run several statements without semicolons.
pub fn is_read_only_select(sql: &str) -> bool {
    let Ok(mut tokens) = tokenize(sql, Dialect::Sql) else {
        return false;
    };
    while tokens.last() == Some(&Token::Semicolon) {
        tokens.pop();
    }
    if tokens.contains(&Token::Semicolon) {
        return false;
    }
    let starts_read_only = matches!(
        tokens.first().and_then(keyword).as_deref(),
        Some("SELECT") | Some("WITH")
    );
    starts_read_only
        && tokens.iter().filter_map(keyword).all(|k| {
            READ_ONLY_KEYWORDS.contains(&k.as_str()) || !STATEMENT_KEYWORDS.contains(&k.as_str())
        })
}

/// DAX queries start with `EVALUATE` or `DEFINE`.
pub fn is_dax_query(dax: &str) -> bool {
    matches!(
        tokenize(dax, Dialect::Dax).ok().and_then(|t| t.first().and_then(keyword)).as_deref(),
        Some("EVALUATE") | Some("DEFINE")
    )
}

fn query_failed(datasource: &str, error: QueryError) -> ToolError {
    match error {
        QueryError::UnknownDatasource(_) => ToolError::new(
            ToolError::NOT_FOUND,
            format!("Datasource '{}' not found.", datasource),
        ),
        other => ToolError::execution_failed(other.to_string()),
    }
}

fn statement_parameters(language: &str) -> [ToolParameter; 2] {
    [
        ToolParameter::new("datasource", "Datasource name", true),
        ToolParameter::new("query", format!("{} query", language), true),
    ]
}

// ==================== validate_sql_query ====================

pub struct ValidateSqlTool;

#[async_trait]
impl ToolHandler for ValidateSqlTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            VALIDATE_SQL_QUERY,
            "Checks the syntax of an SQL query. Returns {\"is_valid\": bool, \"error\": string}.",
            ToolSafety::ReadOnly,
        )
        .with_parameter(ToolParameter::new("query", "SQL query", true))
    }

    async fn invoke(&self, call: &ToolCall, _context: &ToolContext) -> Result<String, ToolError> {
        let query = call.require_string("query").map_err(ToolError::invalid_argument)?;
        let verdict = match validate_sql(query) {
            Ok(()) => json!({ "is_valid": true }),
            Err(error) => json!({ "is_valid": false, "error": error }),
        };
        Ok(verdict.to_string())
    }
}

// ==================== execute_sql_query / execute_dax_query ====================

/// Runs a checked statement through the engine; rows come back as
/// `{"results": [{column: value}, ..]}`.
pub struct ExecuteQueryTool {
    engine: Arc<dyn QueryEngine>,
    language: QueryLanguage,
}

impl ExecuteQueryTool {
    pub fn sql(engine: Arc<dyn QueryEngine>) -> Self {
        Self {
            engine,
            language: QueryLanguage::Sql,
        }
    }

    pub fn dax(engine: Arc<dyn QueryEngine>) -> Self {
        Self {
            engine,
            language: QueryLanguage::Dax,
        }
    }

    fn check(&self, statement: &str) -> Result<(), ToolError> {
        let allowed = match self.language {
            QueryLanguage::Sql => is_read_only_select(statement),
            QueryLanguage::Dax => is_dax_query(statement),
        };
        if allowed {
            return Ok(());
        }
        let message = match self.language {
            QueryLanguage::Sql => SELECT_ONLY,
            QueryLanguage::Dax => DAX_ONLY,
        };
        Err(ToolError::permission_denied(message))
    }
}

#[async_trait]
impl ToolHandler for ExecuteQueryTool {
    fn definition(&self) -> ToolDefinition {
        let (name, description, language) = match self.language {
            QueryLanguage::Sql => (
                EXECUTE_SQL_QUERY,
                "Executes a read-only SQL SELECT query against a datasource and returns the rows.",
                "SQL",
            ),
            QueryLanguage::Dax => (
                EXECUTE_DAX_QUERY,
                "Executes a DAX query against a semantic model and returns the rows.",
                "DAX",
            ),
        };
        let [datasource, query] = statement_parameters(language);
        ToolDefinition::new(name, description, ToolSafety::QueryExecution)
            .with_parameter(datasource)
            .with_parameter(query)
    }

    async fn invoke(&self, call: &ToolCall, _context: &ToolContext) -> Result<String, ToolError> {
        let datasource = call.require_string("datasource").map_err(ToolError::invalid_argument)?;
        let query = call.require_string("query").map_err(ToolError::invalid_argument)?;
        if let Err(e) = self.check(query) {
            info!(datasource, language = self.language.as_str(), "Statement rejected");
            return Err(e);
        }

        let rows = self
            .engine
            .execute(datasource, self.language, query)
            .await
            .map_err(|e| query_failed(datasource, e))?;
        debug!(datasource, rows = rows.len(), "Query executed");
        Ok(json!({ "results": rows.rows }).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orc_application::QueryRows;
    use serde_json::Value;
    use std::sync::Mutex;

    #[test]
    fn test_read_only_detection() {
        assert!(is_read_only_select("SELECT * FROM orders"));
        assert!(is_read_only_select("  select name from t where note = 'drop table x';"));
        assert!(is_read_only_select(
            "-- top customers\nWITH c AS (SELECT id FROM customers) SELECT * FROM c"
        ));
        assert!(!is_read_only_select("DELETE FROM orders"));
        assert!(!is_read_only_select("SELECT 1; DROP TABLE orders"));
        assert!(!is_read_only_select("WITH c AS (SELECT 1 AS id) DELETE FROM orders"));
        assert!(!is_read_only_select("SELECT * INTO backup FROM orders"));
        assert!(!is_read_only_select("/* SELECT */ UPDATE orders SET total = 0"));
        assert!(!is_read_only_select("SELECT 'unterminated"));
        assert!(is_read_only_select("SELECT [Delete], \"Set\" FROM t WHERE a = 'kill'"));
        assert!(is_read_only_select("SELECT total / 2 FROM orders /* halved */"));

        // `//` is division in SQL, so the rest of the line is still checked
        assert!(!is_read_only_select("SELECT 4 //**/ 2; DROP TABLE orders"));
        assert!(!is_read_only_select("SELECT 4 //**/ 2\nDROP TABLE orders"));
        assert!(!is_read_only_select("SELECT 1 // DELETE FROM orders"));

        // batches run further statements without a semicolon
        assert!(!is_read_only_select("SELECT 1 SHUTDOWN"));
        assert!(!is_read_only_select("SELECT 1 KILL 52"));
        assert!(!is_read_only_select("SELECT 1 BACKUP DATABASE db TO DISK = 'x'"));
        assert!(!is_read_only_select("SELECT 1 RESTORE DATABASE db FROM DISK = 'x'"));
        assert!(!is_read_only_select("SELECT 1 DBCC CHECKDB"));
        assert!(!is_read_only_select("SELECT 1 DENY SELECT ON orders TO public"));
        assert!(!is_read_only_select("SELECT 1 EXEC('DROP TABLE orders')"));
    }

    #[test]
    fn test_validate_sql() {
        assert!(validate_sql("SELECT a FROM [my table] WHERE b = 'it''s'").is_ok());
        assert_eq!(validate_sql("   ").unwrap_err(), "Query is empty.");
        assert_eq!(validate_sql("SELECT (a FROM t").unwrap_err(), "Unbalanced parentheses.");
        assert_eq!(validate_sql("hello world").unwrap_err(), "Query could not be parsed.");
        assert_eq!(validate_sql("SELECT 'x").unwrap_err(), "Unterminated quoted text.");
    }

    #[test]
    fn test_dax_detection() {
        assert!(is_dax_query("EVALUATE TOPN(5, Sales)"));
        assert!(is_dax_query("// totals\nDEFINE MEASURE Sales[Total] = 1 EVALUATE Sales"));
        assert!(!is_dax_query("SELECT 1"));
    }

    struct RecordingEngine {
        statements: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl QueryEngine for RecordingEngine {
        async fn execute(
            &self,
            datasource: &str,
            _language: QueryLanguage,
            statement: &str,
        ) -> Result<QueryRows, QueryError> {
            if datasource == "missing" {
                return Err(QueryError::UnknownDatasource(datasource.to_string()));
            }
            self.statements.lock().unwrap().push(statement.to_string());
            let mut row = serde_json::Map::new();
            row.insert("total".to_string(), json!(42));
            Ok(QueryRows::new(vec![row]))
        }
    }

    fn engine() -> Arc<RecordingEngine> {
        Arc::new(RecordingEngine {
            statements: Mutex::new(Vec::new()),
        })
    }

    fn sql_call(datasource: &str, query: &str) -> ToolCall {
        ToolCall::new("c1", EXECUTE_SQL_QUERY)
            .with_arg("datasource", datasource)
            .with_arg("query", query)
    }

    #[tokio::test]
    async fn test_execute_sql_returns_rows() {
        let engine = engine();
        let tool = ExecuteQueryTool::sql(engine.clone());
        let out = tool
            .invoke(&sql_call("sales", "SELECT SUM(total) AS total FROM orders"), &ToolContext::default())
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["results"][0]["total"], 42);
        assert_eq!(engine.statements.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_statement_never_reaches_engine() {
        let engine = engine();
        let tool = ExecuteQueryTool::sql(engine.clone());
        let err = tool
            .invoke(&sql_call("sales", "DROP TABLE orders"), &ToolContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ToolError::PERMISSION_DENIED);
        assert_eq!(err.message, SELECT_ONLY);
        assert!(engine.statements.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_datasource_is_not_found() {
        let tool = ExecuteQueryTool::sql(engine());
        let err = tool
            .invoke(&sql_call("missing", "SELECT 1"), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_dax_requires_evaluate() {
        let tool = ExecuteQueryTool::dax(engine());
        let call = ToolCall::new("c1", EXECUTE_DAX_QUERY)
            .with_arg("datasource", "finance")
            .with_arg("query", "SELECT 1");
        let err = tool.invoke(&call, &ToolContext::default()).await.unwrap_err();
        assert_eq!(err.message, DAX_ONLY);
        assert_eq!(tool.definition().name, EXECUTE_DAX_QUERY);
    }

    #[tokio::test]
    async fn test_validate_tool_reports_errors_as_data() {
        let call = ToolCall::new("c1", VALIDATE_SQL_QUERY).with_arg("query", "SELECT (1");
        let out = ValidateSqlTool.invoke(&call, &ToolContext::default()).await.unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["is_valid"], false);
        assert_eq!(value["error"], "Unbalanced parentheses.");
    }
}
