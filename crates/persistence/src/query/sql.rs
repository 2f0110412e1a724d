//! SQL fragments with numbered bound parameters.

/// A fragment of SQL with bound parameters.
///
/// Placeholders are numbered `?1..?N` in the order parameters were added, so
/// a fragment built with [`SqlFragment::add_param`] can be executed as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    /// The SQL text.
    pub sql: String,
    /// Bound parameter values.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Text parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
    /// Null parameter.
    Null,
}

impl SqlParam {
    /// Creates a string parameter.
    pub fn string(s: impl Into<String>) -> Self {
        SqlParam::String(s.into())
    }

    /// Creates an integer parameter.
    pub fn integer(i: i64) -> Self {
        SqlParam::Integer(i)
    }
}

impl From<Option<String>> for SqlParam {
    fn from(value: Option<String>) -> Self {
        value.map(SqlParam::String).unwrap_or(SqlParam::Null)
    }
}

impl SqlFragment {
    /// Creates a new SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Adds a parameter and returns its placeholder.
    pub fn add_param(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("?{}", self.params.len())
    }

    /// Appends raw SQL text.
    pub fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Returns true if this fragment has no SQL.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

#[cfg(feature = "sqlite")]
impl rusqlite::ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value, ValueRef};

        Ok(match self {
            SqlParam::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlParam::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlParam::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_param_numbers_placeholders() {
        let mut fragment = SqlFragment::new("SELECT 1 WHERE a = ");
        let first = fragment.add_param(SqlParam::string("x"));
        fragment.push_sql(&first);
        fragment.push_sql(" AND b = ");
        let second = fragment.add_param(SqlParam::integer(2));
        fragment.push_sql(&second);

        assert_eq!(fragment.sql, "SELECT 1 WHERE a = ?1 AND b = ?2");
        assert_eq!(fragment.params.len(), 2);
    }

    #[test]
    fn test_optional_string_param() {
        assert_eq!(SqlParam::from(None::<String>), SqlParam::Null);
        assert_eq!(
            SqlParam::from(Some("v".to_string())),
            SqlParam::String("v".to_string())
        );
    }
}
