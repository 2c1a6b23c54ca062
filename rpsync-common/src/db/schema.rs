//! Declarative table definitions
//!
//! A [`TableDefinition`] is a plain value describing one table: its columns
//! and indexes. The storage layer receives it at construction and uses it to
//! create the table and its indexes when they are absent.
//!
//! # Usage
//!
//! ```rust,ignore
//! let table = TableDefinition::new("notes")
//!     .column(ColumnDefinition::new("id", "INTEGER").primary_key().autoincrement())
//!     .column(ColumnDefinition::new("body", "TEXT").not_null())
//!     .index(IndexDefinition::new("idx_notes_body", &["body"]));
//!
//! ensure_table(&mut conn, &table).await?;
//! ```

use crate::Result;
use sqlx::SqliteConnection;
use tracing::{debug, info};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "TIMESTAMP")
    pub sql_type: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// AUTOINCREMENT (only meaningful on an INTEGER PRIMARY KEY)
    pub autoincrement: bool,
}

impl ColumnDefinition {
    /// Create new column definition
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            autoincrement: false,
        }
    }

    /// Mark column as PRIMARY KEY
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark column as AUTOINCREMENT
    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    /// Mark column as NOT NULL
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.autoincrement {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        sql
    }
}

/// Secondary index on a table
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    /// Mark index as UNIQUE
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Expected schema of one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Append a column (order matters for table creation)
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(ColumnDefinition::to_sql).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            columns.join(",\n    ")
        )
    }

    /// `CREATE [UNIQUE] INDEX IF NOT EXISTS` statements
    pub fn create_index_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|index| {
                format!(
                    "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
                    if index.unique { "UNIQUE " } else { "" },
                    index.name,
                    self.name,
                    index.columns.join(", ")
                )
            })
            .collect()
    }
}

/// Read the live schema
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Count tables with this name (0 or 1)
    pub async fn table_count(conn: &mut SqliteConnection, table_name: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table_name)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// True if the table as stored carries a UNIQUE index or constraint
    ///
    /// Reads `pragma_index_list`, so an index left behind by an earlier
    /// definition still counts.
    pub async fn has_unique_index(
        conn: &mut SqliteConnection,
        table_name: &str,
    ) -> sqlx::Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_index_list(?) WHERE \"unique\" = 1 AND origin != 'pk'",
        )
        .bind(table_name)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count > 0)
    }
}

/// Create the table and its indexes if absent
///
/// Idempotent. An existing table is left as it is.
pub async fn ensure_table(conn: &mut SqliteConnection, table: &TableDefinition) -> Result<()> {
    let created = SchemaIntrospector::table_count(conn, &table.name).await? == 0;

    sqlx::query(&table.create_table_sql())
        .execute(&mut *conn)
        .await?;

    for statement in table.create_index_sql() {
        sqlx::query(&statement).execute(&mut *conn).await?;
    }

    if created {
        info!(table = %table.name, "Created table");
    } else {
        debug!(table = %table.name, "Table already present");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Connection;

    fn notes_table() -> TableDefinition {
        TableDefinition::new("notes")
            .column(ColumnDefinition::new("id", "INTEGER").primary_key().autoincrement())
            .column(ColumnDefinition::new("body", "TEXT").not_null())
            .index(IndexDefinition::new("idx_notes_body", &["body"]))
    }

    async fn memory_conn() -> SqliteConnection {
        SqliteConnection::connect("sqlite::memory:").await.unwrap()
    }

    #[test]
    fn test_create_table_sql() {
        let sql = notes_table().create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS notes"));
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("body TEXT NOT NULL"));
    }

    #[test]
    fn test_create_index_sql() {
        let table = notes_table().index(IndexDefinition::new("idx_notes_dedup", &["id", "body"]).unique());
        let statements = table.create_index_sql();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0],
            "CREATE INDEX IF NOT EXISTS idx_notes_body ON notes (body)"
        );
        assert_eq!(
            statements[1],
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_notes_dedup ON notes (id, body)"
        );
    }

    #[tokio::test]
    async fn test_ensure_table_twice_is_idempotent() {
        let mut conn = memory_conn().await;
        let table = notes_table();

        ensure_table(&mut conn, &table).await.unwrap();
        ensure_table(&mut conn, &table).await.unwrap();

        assert_eq!(SchemaIntrospector::table_count(&mut conn, "notes").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_existing_table_is_not_altered() {
        let mut conn = memory_conn().await;
        sqlx::query("CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT NOT NULL, extra TEXT)")
            .execute(&mut conn)
            .await
            .unwrap();

        ensure_table(&mut conn, &notes_table()).await.unwrap();

        let columns: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info('notes')")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(columns, 3);
    }

    #[tokio::test]
    async fn test_has_unique_index_reads_live_table() {
        let mut conn = memory_conn().await;
        ensure_table(&mut conn, &notes_table()).await.unwrap();
        assert!(!SchemaIntrospector::has_unique_index(&mut conn, "notes").await.unwrap());

        let with_unique =
            notes_table().index(IndexDefinition::new("idx_notes_dedup", &["body"]).unique());
        ensure_table(&mut conn, &with_unique).await.unwrap();
        assert!(SchemaIntrospector::has_unique_index(&mut conn, "notes").await.unwrap());

        // The plain definition no longer mentions the index; the table still has it
        ensure_table(&mut conn, &notes_table()).await.unwrap();
        assert!(SchemaIntrospector::has_unique_index(&mut conn, "notes").await.unwrap());
    }
}
