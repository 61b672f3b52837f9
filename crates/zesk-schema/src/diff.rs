//! Schema differ.
//!
//! Compares a declared [`Table`] against the live one and produces the
//! ordered [`Change`]s that bring the live table in line. Changes are
//! grouped as attribute changes, column adds and changes (declaration
//! order), column drops, index drops, then index adds. Applying the result
//! and diffing again yields no changes.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::change::{
    AddColumnOp, AddIndexOp, AlterAttributesOp, Change, ChangeColumnOp, CreateTableOp,
    DropColumnOp, DropIndexOp,
};
use crate::column::Column;
use crate::dialect::SchemaDialect;
use crate::error::{Result, SchemaError};
use crate::table::Table;
use crate::types::TypeMap;

/// Options controlling the differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Allow nullability changes on columns covered by a live index.
    pub follow_keys: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self { follow_keys: true }
    }
}

/// Something the differ noticed but did not turn into DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffWarning {
    /// A nullability-only change was skipped because `follow_keys` is off.
    NullabilityChangeSkipped {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// A live index covering the column.
        index: String,
    },
    /// An index covers the same columns in a different order and is rebuilt.
    IndexReordered {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
    },
}

/// Result of diffing one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDiff {
    /// Table name.
    pub table: String,
    /// Changes in application order.
    pub changes: Vec<Change>,
    /// Informational warnings.
    pub warnings: Vec<DiffWarning>,
}

impl TableDiff {
    /// Returns `true` when no changes are needed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Renders every change through the dialect.
    ///
    /// Fails as a whole: no statements are returned if any change fails.
    pub fn to_sql(&self, dialect: &dyn SchemaDialect) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        for change in &self.changes {
            statements.extend(dialect.generate_sql(change)?);
        }
        Ok(statements)
    }
}

/// Computes the DDL statements bringing `live` in line with `declared`.
pub fn update(
    declared: &Table,
    live: &Table,
    dialect: &dyn SchemaDialect,
    options: DiffOptions,
) -> Result<Vec<String>> {
    let diff = diff_tables(declared, live, dialect, options)?;
    let statements = diff.to_sql(dialect)?;
    debug!(
        table = %declared.name,
        changes = diff.changes.len(),
        statements = statements.len(),
        "Computed schema diff"
    );
    Ok(statements)
}

/// Computes the changes bringing `live` in line with `declared`.
///
/// A live table without columns yields a single create change.
pub fn diff_tables(
    declared: &Table,
    live: &Table,
    dialect: &dyn SchemaDialect,
    options: DiffOptions,
) -> Result<TableDiff> {
    if !declared.name.eq_ignore_ascii_case(&live.name) {
        return Err(SchemaError::TableMismatch {
            declared: declared.name.clone(),
            live: live.name.clone(),
        });
    }
    for table in [declared, live] {
        if !table.is_finalized() {
            return Err(SchemaError::Semantics(format!(
                "Indexes of table '{}' were not finalized",
                table.name
            )));
        }
    }
    let mut diff = TableDiff {
        table: declared.name.clone(),
        changes: Vec::new(),
        warnings: Vec::new(),
    };
    if live.column_count() == 0 {
        debug!(table = %declared.name, "Live table is empty, creating");
        diff.changes.push(Change::CreateTable(CreateTableOp {
            table: declared.clone(),
        }));
        return Ok(diff);
    }
    if declared.is_similar(live, dialect) {
        return Ok(diff);
    }

    // ---- Table attributes -----------------------------------------
    if let Some(op) = diff_attributes(declared, live, dialect) {
        diff.changes.push(Change::AlterAttributes(op));
    }

    // ---- Column adds and changes ----------------------------------
    let columns = diff_columns(declared, live, dialect, options, &mut diff.warnings);
    diff.changes.extend(columns.changes);

    // ---- Column drops ---------------------------------------------
    let dropped: Vec<&str> = live
        .columns()
        .filter(|c| !columns.consumed.contains(c.name.as_str()))
        .map(|c| c.name.as_str())
        .collect();
    diff.changes.extend(dropped.iter().map(|name| {
        Change::DropColumn(DropColumnOp {
            table: declared.name.clone(),
            column: (*name).to_string(),
        })
    }));

    // ---- Index drops, then adds -----------------------------------
    let (drops, adds) = diff_indexes(
        declared,
        live,
        dialect,
        &dropped,
        columns.inline_primary,
        &mut diff.warnings,
    );
    diff.changes.extend(drops);
    diff.changes.extend(adds);
    Ok(diff)
}

/// Declared attributes whose effective value differs from the live one.
fn diff_attributes(
    declared: &Table,
    live: &Table,
    dialect: &dyn SchemaDialect,
) -> Option<AlterAttributesOp> {
    if declared.attributes_similar(live, dialect) {
        return None;
    }
    let theirs = live.effective_attributes(dialect);
    let attributes: BTreeMap<String, String> = declared
        .effective_attributes(dialect)
        .into_iter()
        .filter(|(key, value)| !theirs.get(key).is_some_and(|t| t.eq_ignore_ascii_case(value)))
        .collect();
    (!attributes.is_empty()).then(|| AlterAttributesOp {
        table: declared.name.clone(),
        attributes,
    })
}

struct ColumnChanges<'a> {
    changes: Vec<Change>,
    /// Live columns matched by name or previous name.
    consumed: HashSet<&'a str>,
    /// A column definition declares the primary key inline.
    inline_primary: bool,
}

fn diff_columns<'a>(
    declared: &Table,
    live: &'a Table,
    dialect: &dyn SchemaDialect,
    options: DiffOptions,
    warnings: &mut Vec<DiffWarning>,
) -> ColumnChanges<'a> {
    let types = dialect.types();
    let live_has_primary = live.primary_index().is_some();
    let single_primary = declared
        .primary_index()
        .is_some_and(|index| index.columns.len() == 1);
    let mut result = ColumnChanges {
        changes: Vec::new(),
        consumed: HashSet::new(),
        inline_primary: false,
    };
    let mut previous: Option<&str> = None;
    for column in declared.columns() {
        let inline_primary =
            column.increment && column.primary_key && !live_has_primary && single_primary;
        if let Ok(existing) = live.column(&column.name) {
            result.consumed.insert(existing.name.as_str());
            let differences = column.differences(existing, types);
            if differences.is_empty() {
                previous = Some(column.name.as_str());
                continue;
            }
            debug!(
                table = %declared.name,
                column = %column.name,
                fields = ?differences.keys().collect::<Vec<_>>(),
                "Column differs"
            );
            if !options.follow_keys {
                if let Some(warning) = gated_change(live, existing, column, types) {
                    warn!(table = %declared.name, column = %column.name, "Skipping nullability change on indexed column");
                    warnings.push(warning);
                    previous = Some(column.name.as_str());
                    continue;
                }
            }
            result.changes.push(Change::ChangeColumn(ChangeColumnOp {
                table: declared.name.clone(),
                from: existing.clone(),
                to: column.clone(),
                inline_primary,
            }));
        } else if let Some(renamed) = renamed_from(declared, live, column) {
            debug!(table = %declared.name, from = %renamed.name, to = %column.name, "Column renamed");
            result.consumed.insert(renamed.name.as_str());
            result.changes.push(Change::ChangeColumn(ChangeColumnOp {
                table: declared.name.clone(),
                from: renamed.clone(),
                to: column.clone(),
                inline_primary,
            }));
        } else {
            result.changes.push(Change::AddColumn(AddColumnOp {
                table: declared.name.clone(),
                column: column.clone(),
                after: previous.map(String::from),
                inline_primary,
            }));
        }
        result.inline_primary |= inline_primary;
        previous = Some(column.name.as_str());
    }
    result
}

/// The live column a declared column was renamed from, if any.
///
/// A previous name still declared as its own column is not a rename.
fn renamed_from<'a>(declared: &Table, live: &'a Table, column: &Column) -> Option<&'a Column> {
    let previous = column.previous_name.as_deref()?;
    if declared.has_column(previous) {
        return None;
    }
    live.column(previous).ok()
}

/// A nullability-only change on a column covered by a live index.
///
/// Implicit defaults follow nullability, so the column is compared with its
/// required flag taken from the live column.
fn gated_change(
    live: &Table,
    existing: &Column,
    column: &Column,
    types: &TypeMap,
) -> Option<DiffWarning> {
    let relaxed = Column {
        required: Some(existing.is_required()),
        ..column.clone()
    };
    if !relaxed.is_similar(existing, types) {
        return None;
    }
    live.indexes()
        .find(|index| index.has_column(&column.name))
        .map(|index| DiffWarning::NullabilityChangeSkipped {
            table: live.name.clone(),
            column: column.name.clone(),
            index: index.name.clone(),
        })
}

fn diff_indexes(
    declared: &Table,
    live: &Table,
    dialect: &dyn SchemaDialect,
    dropped_columns: &[&str],
    inline_primary: bool,
    warnings: &mut Vec<DiffWarning>,
) -> (Vec<Change>, Vec<Change>) {
    let mut drops = Vec::new();
    let mut adds = Vec::new();
    for existing in live.indexes() {
        match declared.index(&existing.name) {
            Ok(wanted) if wanted.is_similar(existing, dialect) => {}
            Ok(wanted) => {
                if wanted.same_columns(existing) && wanted.kind == existing.kind {
                    warnings.push(DiffWarning::IndexReordered {
                        table: declared.name.clone(),
                        index: existing.name.clone(),
                    });
                }
                drops.push(Change::DropIndex(DropIndexOp {
                    index: existing.clone(),
                }));
                adds.push(Change::AddIndex(AddIndexOp {
                    index: wanted.clone(),
                }));
            }
            Err(_) if dialect.drops_index_with_columns(existing, dropped_columns) => {
                debug!(table = %live.name, index = %existing.name, "Index removed with its columns");
            }
            Err(_) => drops.push(Change::DropIndex(DropIndexOp {
                index: existing.clone(),
            })),
        }
    }
    for wanted in declared.indexes() {
        if live.index(&wanted.name).is_ok() || (wanted.is_primary() && inline_primary) {
            continue;
        }
        adds.push(Change::AddIndex(AddIndexOp {
            index: wanted.clone(),
        }));
    }
    (drops, adds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::MySqlDialect;
    use crate::index::{Index, IndexType};

    fn table(columns: Vec<Column>) -> Table {
        let mut table = Table::new("t");
        for column in columns {
            table.add_column(column).unwrap();
        }
        table.finalized()
    }

    fn sql(declared: &Table, live: &Table) -> Vec<String> {
        update(declared, live, &MySqlDialect::new(), DiffOptions::default()).unwrap()
    }

    #[test]
    fn test_identical_tables_produce_nothing() {
        let t = table(vec![
            Column::new("id", "int(11)").increment().primary_key(),
            Column::new("name", "varchar(32)"),
        ]);
        assert!(sql(&t, &t.clone()).is_empty());
    }

    #[test]
    fn test_empty_live_table_creates() {
        let mut declared = table(vec![Column::new("id", "int").not_null()]);
        declared.add_on_create("INSERT INTO `t` VALUES (1)");
        let live = Table::new("t").finalized();
        let statements = sql(&declared, &live);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE `t`"));
        assert_eq!(statements[1], "INSERT INTO `t` VALUES (1)");
    }

    #[test]
    fn test_table_name_mismatch() {
        let declared = table(vec![Column::new("id", "int")]);
        let live = Table::new("other").finalized();
        let err = update(&declared, &live, &MySqlDialect::new(), DiffOptions::default())
            .unwrap_err();
        assert!(matches!(err, SchemaError::TableMismatch { .. }));
    }

    #[test]
    fn test_unfinalized_table_rejected() {
        let declared = Table::new("t")
            .with_column(Column::new("id", "int"))
            .unwrap();
        let live = table(vec![Column::new("id", "int")]);
        let err = update(&declared, &live, &MySqlDialect::new(), DiffOptions::default())
            .unwrap_err();
        assert!(matches!(err, SchemaError::Semantics(_)));
    }

    #[test]
    fn test_add_column_anchored_after_previous() {
        let declared = table(vec![
            Column::new("id", "int").not_null(),
            Column::new("email", "varchar(64)"),
            Column::new("name", "varchar(32)"),
        ]);
        let live = table(vec![
            Column::new("id", "int").not_null(),
            Column::new("name", "varchar(32)"),
        ]);
        assert_eq!(
            sql(&declared, &live),
            vec!["ALTER TABLE `t` ADD COLUMN `email` varchar(64) NULL AFTER `id`"]
        );
    }

    #[test]
    fn test_rename_uses_change_column() {
        let declared = table(vec![
            Column::new("id", "int").not_null(),
            Column::new("email", "varchar(64)").previous_name("mail"),
        ]);
        let live = table(vec![
            Column::new("id", "int").not_null(),
            Column::new("mail", "varchar(64)"),
        ]);
        assert_eq!(
            sql(&declared, &live),
            vec!["ALTER TABLE `t` CHANGE COLUMN `mail` `email` varchar(64) NULL"]
        );
    }

    #[test]
    fn test_drop_column_removes_its_index_implicitly() {
        let declared = table(vec![Column::new("id", "int").not_null()]);
        let live = table(vec![
            Column::new("id", "int").not_null(),
            Column::new("legacy", "int").index(""),
        ]);
        assert_eq!(
            sql(&declared, &live),
            vec!["ALTER TABLE `t` DROP COLUMN `legacy`"]
        );
    }

    #[test]
    fn test_changed_index_is_dropped_then_added() {
        let declared = table(vec![
            Column::new("a", "int").index("ab"),
            Column::new("b", "int").index("ab"),
        ]);
        let mut live = table(vec![Column::new("a", "int"), Column::new("b", "int")]);
        live.add_index(Index::new("t", "ab", IndexType::Index).column("b").column("a"))
            .unwrap();
        let diff =
            diff_tables(&declared, &live, &MySqlDialect::new(), DiffOptions::default()).unwrap();
        assert_eq!(
            diff.warnings,
            vec![DiffWarning::IndexReordered {
                table: String::from("t"),
                index: String::from("ab"),
            }]
        );
        assert_eq!(
            diff.to_sql(&MySqlDialect::new()).unwrap(),
            vec![
                "ALTER TABLE `t` DROP INDEX `ab`",
                "ALTER TABLE `t` ADD INDEX `ab` (`a`, `b`)",
            ]
        );
    }

    #[test]
    fn test_inline_primary_for_new_auto_increment() {
        let declared = table(vec![
            Column::new("id", "int(11)").unsigned().increment().primary_key(),
            Column::new("name", "varchar(32)"),
        ]);
        let live = table(vec![Column::new("name", "varchar(32)")]);
        assert_eq!(
            sql(&declared, &live),
            vec![
                "ALTER TABLE `t` ADD COLUMN `id` int(11) unsigned NOT NULL AUTO_INCREMENT PRIMARY KEY"
            ]
        );
    }

    #[test]
    fn test_compound_primary_is_never_inline() {
        let declared = table(vec![
            Column::new("a", "int(11)").increment().primary_key(),
            Column::new("b", "int(11)").primary_key(),
            Column::new("name", "varchar(32)"),
        ]);
        let live = table(vec![
            Column::new("b", "int(11)").not_null(),
            Column::new("name", "varchar(32)"),
        ]);
        assert_eq!(
            sql(&declared, &live),
            vec![
                "ALTER TABLE `t` ADD COLUMN `a` int(11) NOT NULL AUTO_INCREMENT",
                "ALTER TABLE `t` ADD PRIMARY KEY (`a`, `b`)",
            ]
        );
    }

    #[test]
    fn test_follow_keys_gate() {
        let declared = table(vec![Column::new("code", "varchar(8)").not_null().unique("")]);
        let live = table(vec![Column::new("code", "varchar(8)").unique("")]);
        let options = DiffOptions { follow_keys: false };
        let diff = diff_tables(&declared, &live, &MySqlDialect::new(), options).unwrap();
        assert!(diff.is_empty());
        assert!(matches!(
            diff.warnings[0],
            DiffWarning::NullabilityChangeSkipped { .. }
        ));
        assert_eq!(
            sql(&declared, &live),
            vec!["ALTER TABLE `t` CHANGE COLUMN `code` `code` varchar(8) NOT NULL"]
        );
    }

    #[test]
    fn test_attributes_changed() {
        let declared = table(vec![Column::new("id", "int")]).with_attribute("engine", "InnoDB");
        let live = table(vec![Column::new("id", "int")]).with_attribute("engine", "MyISAM");
        assert_eq!(sql(&declared, &live), vec!["ALTER TABLE `t` ENGINE=InnoDB"]);
    }
}
