//! PostgreSQL dialect.

use super::{require_index_name, SchemaDialect};
use crate::change::{AddIndexOp, AlterAttributesOp, ChangeColumnOp, CreateTableOp, DropIndexOp};
use crate::column::Column;
use crate::error::Result;
use crate::index::{Index, IndexType};
use crate::types::{TypeClass, TypeMap};

/// PostgreSQL dialect for schema SQL generation.
///
/// PostgreSQL has no column placement, so `AFTER` anchors are ignored, and
/// plain indexes are created with separate `CREATE INDEX` statements.
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    types: TypeMap,
}

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: TypeMap::postgres(),
        }
    }

    /// Maps increment columns onto serial types. Integer types take no size.
    fn column_type(&self, column: &Column) -> String {
        if column.increment && self.types.class_of(column.sql_type()) == Some(TypeClass::Integer) {
            let native = self.types.native_type(column.sql_type());
            return String::from(match native.base.as_str() {
                "bigint" => "bigserial",
                "smallint" => "smallserial",
                _ => "serial",
            });
        }
        self.storage_type(column)
    }

    /// Type accepted by `ALTER COLUMN ... TYPE`, which has no serial forms.
    fn storage_type(&self, column: &Column) -> String {
        if self.types.class_of(column.sql_type()) == Some(TypeClass::Integer) {
            return self.types.native_type(column.sql_type()).base;
        }
        column.sql_type().to_string()
    }

    fn create_index(&self, index: &Index) -> String {
        let unique = if index.kind == IndexType::Unique { "UNIQUE " } else { "" };
        let using = index
            .structure
            .map(|s| format!(" USING {}", s.as_sql().to_lowercase()))
            .unwrap_or_default();
        format!(
            "CREATE {unique}INDEX {} ON {}{using} ({})",
            self.quote_identifier(&index.name),
            self.quote_table(&index.table),
            self.index_columns(index)
        )
    }

    fn primary_constraint(&self, table: &str) -> String {
        self.quote_identifier(&format!("{table}_pkey"))
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn types(&self) -> &TypeMap {
        &self.types
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    fn drops_index_with_columns(&self, index: &Index, dropped: &[&str]) -> bool {
        index.column_names().any(|c| dropped.contains(&c))
    }

    fn index_columns(&self, index: &Index) -> String {
        index
            .column_names()
            .map(|c| self.quote_column(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn create_table(&self, op: &CreateTableOp) -> Result<Vec<String>> {
        let table = &op.table;
        let mut body: Vec<String> = table
            .columns()
            .map(|c| {
                format!(
                    "{} {}",
                    self.quote_column(&c.name),
                    self.column_definition(c, false)
                )
            })
            .collect();
        let mut trailing = Vec::new();
        for index in table.indexes() {
            match index.kind {
                IndexType::Primary => {
                    body.push(format!("PRIMARY KEY ({})", self.index_columns(index)));
                }
                IndexType::Unique if index.structure.is_none() => body.push(format!(
                    "CONSTRAINT {} UNIQUE ({})",
                    self.quote_identifier(&index.name),
                    self.index_columns(index)
                )),
                _ => trailing.push(self.create_index(index)),
            }
        }
        let mut statements = vec![format!(
            "CREATE TABLE {} (\n\t{}\n)",
            self.quote_table(&table.name),
            body.join(",\n\t")
        )];
        statements.extend(trailing);
        statements.extend(table.on_create_actions().iter().cloned());
        Ok(statements)
    }

    fn alter_attributes(&self, _op: &AlterAttributesOp) -> Vec<String> {
        Vec::new()
    }

    fn change_column(&self, op: &ChangeColumnOp) -> Vec<String> {
        let table = self.quote_table(&op.table);
        let column = self.quote_column(&op.to.name);
        let mut statements = Vec::new();
        if op.is_rename() {
            statements.push(format!(
                "ALTER TABLE {table} RENAME COLUMN {} TO {column}",
                self.quote_column(&op.from.name)
            ));
        }
        let mut clauses = vec![format!(
            "ALTER COLUMN {column} TYPE {}",
            self.storage_type(&op.to)
        )];
        if op.to.increment {
            clauses.push(format!("ALTER COLUMN {column} SET NOT NULL"));
            if !op.from.increment {
                clauses.push(format!(
                    "ALTER COLUMN {column} ADD GENERATED BY DEFAULT AS IDENTITY"
                ));
            }
        } else {
            clauses.push(if op.to.is_required() {
                format!("ALTER COLUMN {column} SET NOT NULL")
            } else {
                format!("ALTER COLUMN {column} DROP NOT NULL")
            });
            let default = self.default_clause(&op.to);
            clauses.push(if default.is_empty() {
                format!("ALTER COLUMN {column} DROP DEFAULT")
            } else {
                format!("ALTER COLUMN {column} SET{default}")
            });
        }
        statements.push(format!("ALTER TABLE {table} {}", clauses.join(", ")));
        if op.inline_primary && op.to.primary_key {
            statements.push(format!("ALTER TABLE {table} ADD PRIMARY KEY ({column})"));
        }
        statements
    }

    fn add_index(&self, op: &AddIndexOp) -> String {
        let index = &op.index;
        if index.is_primary() {
            return format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({})",
                self.quote_table(&index.table),
                self.index_columns(index)
            );
        }
        self.create_index(index)
    }

    fn drop_index(&self, op: &DropIndexOp) -> Result<Vec<String>> {
        let index = &op.index;
        if index.is_primary() {
            return Ok(vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.quote_table(&index.table),
                self.primary_constraint(&index.table)
            )]);
        }
        require_index_name(index)?;
        Ok(vec![format!("DROP INDEX {}", self.quote_identifier(&index.name))])
    }

    fn column_definition(&self, column: &Column, inline_primary: bool) -> String {
        let mut sql = self.column_type(column);
        if let Some(collation) = column
            .collation
            .as_ref()
            .filter(|_| self.types.is_text(column.sql_type()))
        {
            sql.push_str(" COLLATE ");
            sql.push_str(&self.quote_identifier(collation));
        }
        if column.increment {
            sql.push_str(" NOT NULL");
            if inline_primary && column.primary_key {
                sql.push_str(" PRIMARY KEY");
            }
            return sql;
        }
        sql.push_str(if column.is_required() { " NOT NULL" } else { " NULL" });
        sql.push_str(&self.default_clause(column));
        sql
    }
}
