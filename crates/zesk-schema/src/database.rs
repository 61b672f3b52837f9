//! Live database access and table synchronization.
//!
//! The differ never talks to a database directly; a [`Database`]
//! implementation hands it live [`Table`] snapshots and executes the
//! resulting statements. [`ScriptDatabase`] serves snapshots parsed from
//! `CREATE TABLE` scripts and records what it is asked to execute.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::change::Change;
use crate::diff::{self, DiffOptions};
use crate::dialect::SchemaDialect;
use crate::error::{Result, SchemaError};
use crate::index::{IndexStructure, IndexType};
use crate::parser::parse_tables;
use crate::table::Table;

/// Name and native type of a live column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Native type as reported by the database.
    pub sql_type: String,
}

/// Outcome of an executed statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// Rows affected, zero for DDL.
    pub affected_rows: u64,
}

/// A live database the differ can introspect and modify.
pub trait Database: Send + Sync {
    /// SQL dialect of the database.
    fn dialect(&self) -> &dyn SchemaDialect;

    /// Introspects a live table.
    ///
    /// Fails with [`SchemaError::TableNotFound`] when the table is missing.
    fn live_table(&self, name: &str) -> Result<Table>;

    /// Executes a statement.
    fn query(&self, sql: &str) -> Result<QueryResult>;

    /// Called after the statements for `changes` were executed on `table`.
    fn changes_applied(&self, _table: &str, _changes: &[Change]) -> Result<()> {
        Ok(())
    }

    /// Lists the columns of a live table.
    fn table_columns(&self, name: &str) -> Result<Vec<ColumnInfo>> {
        Ok(self
            .live_table(name)?
            .columns()
            .map(|column| ColumnInfo {
                name: column.name.clone(),
                sql_type: column.sql_type().to_string(),
            })
            .collect())
    }

    /// Quotes a possibly qualified table name.
    fn quote_table(&self, name: &str) -> String {
        self.dialect().quote_table(name)
    }

    /// Quotes a possibly qualified column name.
    fn quote_column(&self, name: &str) -> String {
        self.dialect().quote_column(name)
    }

    /// Quotes a text literal.
    fn quote_text(&self, text: &str) -> String {
        self.dialect().quote_text(text)
    }

    /// Structure used for indexes that do not name one.
    fn default_index_structure(&self, kind: IndexType) -> IndexStructure {
        self.dialect().default_index_structure(kind)
    }
}

/// A [`Database`] backed by schema scripts.
pub struct ScriptDatabase {
    dialect: Box<dyn SchemaDialect>,
    tables: RwLock<IndexMap<String, Table>>,
    executed: Mutex<Vec<String>>,
}

impl std::fmt::Debug for ScriptDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptDatabase")
            .field("dialect", &self.dialect.name())
            .finish_non_exhaustive()
    }
}

impl ScriptDatabase {
    /// Creates a database with no tables.
    #[must_use]
    pub fn new(dialect: Box<dyn SchemaDialect>) -> Self {
        Self {
            dialect,
            tables: RwLock::new(IndexMap::new()),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Creates a database holding every table defined in `sql`.
    pub fn from_script(sql: &str, dialect: Box<dyn SchemaDialect>) -> Result<Self> {
        let database = Self::new(dialect);
        database.load_script(sql)?;
        Ok(database)
    }

    /// Adds or replaces the tables defined in `sql`.
    pub fn load_script(&self, sql: &str) -> Result<usize> {
        let tables = parse_tables(sql)?;
        let count = tables.len();
        let mut map = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        for table in tables {
            debug!(table = %table.name, columns = table.column_count(), "Loaded live table");
            map.insert(table.name.to_lowercase(), table);
        }
        Ok(count)
    }

    /// Adds or replaces the tables defined in a script file.
    pub fn load_file(&self, path: &Path) -> Result<usize> {
        let sql = std::fs::read_to_string(path)?;
        self.load_script(&sql)
    }

    /// Statements passed to [`Database::query`], in execution order.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Database for ScriptDatabase {
    fn dialect(&self) -> &dyn SchemaDialect {
        self.dialect.as_ref()
    }

    fn live_table(&self, name: &str) -> Result<Table> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| SchemaError::TableNotFound(name.to_string()))
    }

    fn query(&self, sql: &str) -> Result<QueryResult> {
        debug!(sql, "Executing statement");
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_string());
        Ok(QueryResult::default())
    }

    fn changes_applied(&self, table: &str, changes: &[Change]) -> Result<()> {
        let key = table.to_lowercase();
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = tables
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Table::new(table).finalized());
        for change in changes {
            snapshot.apply_change(change, self.dialect.as_ref())?;
        }
        debug!(table, changes = changes.len(), "Replayed changes on live table");
        tables.insert(key, snapshot);
        Ok(())
    }
}

/// Brings live tables in line with declared ones.
///
/// Live snapshots are cached per table until the table is changed or a
/// lookup fails.
pub struct Synchronizer<'db> {
    database: &'db dyn Database,
    options: DiffOptions,
    cache: Mutex<HashMap<String, Table>>,
}

impl<'db> Synchronizer<'db> {
    /// Creates a synchronizer with default diff options.
    #[must_use]
    pub fn new(database: &'db dyn Database) -> Self {
        Self::with_options(database, DiffOptions::default())
    }

    /// Creates a synchronizer with explicit diff options.
    #[must_use]
    pub fn with_options(database: &'db dyn Database, options: DiffOptions) -> Self {
        Self {
            database,
            options,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the live table, or `None` when it does not exist.
    pub fn live_table(&self, name: &str) -> Result<Option<Table>> {
        let key = name.to_lowercase();
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = cache.get(&key) {
            return Ok(Some(table.clone()));
        }
        match self.database.live_table(name) {
            Ok(table) => {
                cache.insert(key, table.clone());
                Ok(Some(table))
            }
            Err(err) if err.is_table_not_found() => {
                cache.remove(&key);
                Ok(None)
            }
            Err(err) => {
                warn!(table = name, error = %err, "Failed to introspect table");
                cache.remove(&key);
                Err(err)
            }
        }
    }

    /// Statements needed to bring the live table in line with `declared`.
    ///
    /// A missing table is created.
    pub fn update(&self, declared: &Table) -> Result<Vec<String>> {
        let live = self.live_or_empty(declared)?;
        diff::update(declared, &live, self.database.dialect(), self.options)
    }

    /// Computes and executes the statements for `declared`.
    pub fn apply(&self, declared: &Table) -> Result<Vec<String>> {
        let live = self.live_or_empty(declared)?;
        let dialect = self.database.dialect();
        let diff = diff::diff_tables(declared, &live, dialect, self.options)?;
        let statements = diff.to_sql(dialect)?;
        if statements.is_empty() {
            return Ok(statements);
        }
        self.invalidate(&declared.name);
        for sql in &statements {
            self.database.query(sql)?;
        }
        self.database.changes_applied(&declared.name, &diff.changes)?;
        info!(table = %declared.name, statements = statements.len(), "Synchronized table");
        Ok(statements)
    }

    fn live_or_empty(&self, declared: &Table) -> Result<Table> {
        Ok(self
            .live_table(&declared.name)?
            .unwrap_or_else(|| Table::new(declared.name.clone()).finalized()))
    }

    /// Drops the cached snapshot of a table.
    pub fn invalidate(&self, name: &str) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name.to_lowercase());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::dialect::MySqlDialect;

    const LIVE: &str = "CREATE TABLE `people` (\n\
        `id` int(11) unsigned NOT NULL AUTO_INCREMENT,\n\
        `name` varchar(64) NOT NULL,\n\
        PRIMARY KEY (`id`)\n\
        ) ENGINE=InnoDB;";

    fn database() -> ScriptDatabase {
        ScriptDatabase::from_script(LIVE, Box::new(MySqlDialect::new())).unwrap()
    }

    fn people() -> Table {
        Table::new("people")
            .with_column(Column::new("id", "int(11)").unsigned().increment().primary_key())
            .unwrap()
            .with_column(Column::new("name", "varchar(64)").not_null())
            .unwrap()
            .with_attribute("engine", "InnoDB")
            .finalized()
    }

    #[test]
    fn test_table_columns() {
        let db = database();
        let columns = db.table_columns("People").unwrap();
        assert_eq!(
            columns,
            vec![
                ColumnInfo {
                    name: String::from("id"),
                    sql_type: String::from("int(11)"),
                },
                ColumnInfo {
                    name: String::from("name"),
                    sql_type: String::from("varchar(64)"),
                },
            ]
        );
        assert!(db.table_columns("ghosts").unwrap_err().is_table_not_found());
    }

    #[test]
    fn test_synchronized_table_needs_nothing() {
        let db = database();
        let sync = Synchronizer::new(&db);
        assert!(sync.update(&people()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_table_is_created() {
        let db = database();
        let sync = Synchronizer::new(&db);
        let declared = Table::new("pets")
            .with_column(Column::new("id", "int").not_null())
            .unwrap()
            .finalized();
        let statements = sync.apply(&declared).unwrap();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].starts_with("CREATE TABLE `pets`"));
        assert_eq!(db.executed(), statements);
    }

    #[test]
    fn test_apply_executes_changes() {
        let db = database();
        let sync = Synchronizer::new(&db);
        let declared = people()
            .with_column(Column::new("email", "varchar(128)"))
            .unwrap();
        let statements = sync.apply(&declared).unwrap();
        assert_eq!(
            statements,
            vec!["ALTER TABLE `people` ADD COLUMN `email` varchar(128) NULL AFTER `name`"]
        );
        assert_eq!(db.executed(), statements);
    }

    #[test]
    fn test_applied_changes_update_live_table() {
        let db = database();
        let sync = Synchronizer::new(&db);
        let declared = people()
            .with_column(Column::new("email", "varchar(128)").unique(""))
            .unwrap();
        assert_eq!(sync.apply(&declared).unwrap().len(), 2);
        let live = db.live_table("people").unwrap();
        assert!(live.has_column("email"));
        assert!(live.index("email_Unique").is_ok());
        assert!(sync.apply(&declared).unwrap().is_empty());
        assert_eq!(db.executed().len(), 2);
    }
}
