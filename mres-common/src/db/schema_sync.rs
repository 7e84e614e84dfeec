//! Declarative schema synchronization
//!
//! Table layouts are defined once in code (see `table_schemas`). On open:
//! 1. **CREATE TABLE IF NOT EXISTS** built from the column list
//! 2. **Auto-sync** adds columns that older stores lack via ALTER TABLE
//!
//! Type or constraint drift is reported but never rewritten; SQLite cannot
//! change either without recreating the table.

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER")
    pub sql_type: String,
    pub primary_key: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Column clause as used inside CREATE TABLE
    fn create_clause(&self) -> String {
        let mut clause = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            clause.push_str(" PRIMARY KEY");
        }
        clause
    }
}

/// Column as reported by PRAGMA table_info
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub name: String,
    pub type_name: String,
}

/// Difference between the declared and the stored schema
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    /// Column missing from database (fixable)
    MissingColumn { column: ColumnDefinition },
    /// Column type mismatch (reported only)
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },
}

/// Declared layout of one table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Column definitions in creation order
    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Schema maintenance entry points
pub struct SchemaSync;

impl SchemaSync {
    /// Create the table if missing, then add any columns it lacks
    pub async fn ensure_table<T: TableSchema>(pool: &SqlitePool) -> Result<()> {
        let table = T::table_name();
        let columns = T::expected_columns();

        let clauses: Vec<String> = columns.iter().map(|c| c.create_clause()).collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            table,
            clauses.join(",\n    ")
        );
        sqlx::query(&sql).execute(pool).await?;

        Self::sync_table::<T>(pool).await
    }

    /// Add missing columns; warn about type drift
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<()> {
        let table = T::table_name();
        let actual = introspect_table(pool, table).await?;
        let drift = compare(&T::expected_columns(), &actual);

        if drift.is_empty() {
            debug!("Schema up to date for '{}'", table);
            return Ok(());
        }

        for change in drift {
            match change {
                SchemaDrift::MissingColumn { column } => add_column(pool, table, &column).await?,
                SchemaDrift::TypeMismatch {
                    column,
                    expected,
                    actual,
                } => {
                    warn!(
                        "Type mismatch in {}.{}: expected '{}', found '{}'. Leaving as is.",
                        table, column, expected, actual
                    );
                }
            }
        }

        Ok(())
    }
}

/// Read actual columns from a table (empty if the table does not exist)
pub async fn introspect_table(pool: &SqlitePool, table: &str) -> Result<Vec<ActualColumn>> {
    let query = format!("PRAGMA table_info({})", table);
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    Ok(rows
        .iter()
        .map(|row| ActualColumn {
            name: row.get("name"),
            type_name: row.get("type"),
        })
        .collect())
}

/// Compare declared columns against the stored ones
pub fn compare(expected: &[ColumnDefinition], actual: &[ActualColumn]) -> Vec<SchemaDrift> {
    let mut drift = Vec::new();

    for column in expected {
        match actual.iter().find(|a| a.name.eq_ignore_ascii_case(&column.name)) {
            Some(found) if !types_compatible(&column.sql_type, &found.type_name) => {
                drift.push(SchemaDrift::TypeMismatch {
                    column: column.name.clone(),
                    expected: column.sql_type.clone(),
                    actual: found.type_name.clone(),
                });
            }
            Some(_) => {}
            None => drift.push(SchemaDrift::MissingColumn {
                column: column.clone(),
            }),
        }
    }

    drift
}

/// SQLite type affinity comparison
fn types_compatible(expected: &str, actual: &str) -> bool {
    let exp = expected.to_uppercase();
    let act = actual.to_uppercase();

    if exp == act || act.is_empty() {
        return true;
    }

    let int = |t: &str| t.contains("INT");
    let text = |t: &str| t.contains("TEXT") || t.contains("CHAR") || t.contains("CLOB");
    let real = |t: &str| t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB");

    (int(&exp) && int(&act)) || (text(&exp) && text(&act)) || (real(&exp) && real(&act))
}

async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
    // ADD COLUMN cannot carry PRIMARY KEY
    let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column.name, column.sql_type);

    info!("Adding column {}.{} ({})", table, column.name, column.sql_type);

    match sqlx::query(&sql).execute(pool).await {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
            debug!("Column {}.{} already present", table, column.name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actual(name: &str, type_name: &str) -> ActualColumn {
        ActualColumn {
            name: name.to_string(),
            type_name: type_name.to_string(),
        }
    }

    #[test]
    fn test_missing_column_detected() {
        let expected = vec![
            ColumnDefinition::new("file_path", "TEXT").primary_key(),
            ColumnDefinition::new("embedding_version", "TEXT"),
        ];
        let drift = compare(&expected, &[actual("file_path", "TEXT")]);
        assert_eq!(drift.len(), 1);
        assert!(matches!(
            &drift[0],
            SchemaDrift::MissingColumn { column } if column.name == "embedding_version"
        ));
    }

    #[test]
    fn test_affinity_is_compatible() {
        let expected = vec![ColumnDefinition::new("year", "INTEGER")];
        assert!(compare(&expected, &[actual("year", "INT")]).is_empty());
    }

    #[test]
    fn test_type_mismatch_reported() {
        let expected = vec![ColumnDefinition::new("year", "INTEGER")];
        let drift = compare(&expected, &[actual("year", "TEXT")]);
        assert!(matches!(drift[0], SchemaDrift::TypeMismatch { .. }));
    }

    #[test]
    fn test_create_clause() {
        let key = ColumnDefinition::new("track_mbid", "TEXT").primary_key();
        assert_eq!(key.create_clause(), "track_mbid TEXT PRIMARY KEY");
        assert_eq!(ColumnDefinition::new("year", "INTEGER").create_clause(), "year INTEGER");
    }
}
