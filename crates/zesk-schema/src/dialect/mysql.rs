//! MySQL dialect.

use super::{attribute_pairs, require_index_name, SchemaDialect};
use crate::change::{AddIndexOp, AlterAttributesOp, ChangeColumnOp, CreateTableOp, DropIndexOp};
use crate::column::Column;
use crate::error::Result;
use crate::index::{Index, IndexType};
use crate::types::TypeMap;

/// MySQL dialect for schema SQL generation.
#[derive(Debug, Clone)]
pub struct MySqlDialect {
    types: TypeMap,
}

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: TypeMap::mysql(),
        }
    }

    /// Index line inside a CREATE TABLE body.
    fn index_body(&self, index: &Index) -> String {
        let columns = self.index_columns(index);
        let using = index
            .structure
            .map(|s| format!(" USING {}", s.as_sql()))
            .unwrap_or_default();
        match index.kind {
            IndexType::Primary => format!("PRIMARY KEY ({columns})"),
            IndexType::Unique => format!(
                "UNIQUE KEY {} ({columns}){using}",
                self.quote_identifier(&index.name)
            ),
            IndexType::Index => {
                format!("KEY {} ({columns}){using}", self.quote_identifier(&index.name))
            }
        }
    }
}

impl Default for MySqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn types(&self) -> &TypeMap {
        &self.types
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn quote_text(&self, text: &str) -> String {
        let escaped = text
            .replace('\\', "\\\\")
            .replace('\'', "\\'")
            .replace('"', "\\\"")
            .replace('\0', "\\0");
        format!("'{escaped}'")
    }

    fn table_attribute_defaults(&self) -> &'static [(&'static str, &'static str)] {
        &[("engine", "InnoDB")]
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
        body.extend(table.indexes().map(|index| self.index_body(index)));
        let mut sql = format!(
            "CREATE TABLE {} (\n\t{}\n)",
            self.quote_table(&table.name),
            body.join(",\n\t")
        );
        if !table.attributes().is_empty() {
            sql.push(' ');
            sql.push_str(&attribute_pairs(table.attributes()));
        }
        let mut statements = vec![sql];
        statements.extend(table.on_create_actions().iter().cloned());
        Ok(statements)
    }

    fn alter_attributes(&self, op: &AlterAttributesOp) -> Vec<String> {
        if op.attributes.is_empty() {
            return Vec::new();
        }
        vec![format!(
            "ALTER TABLE {} {}",
            self.quote_table(&op.table),
            attribute_pairs(&op.attributes)
        )]
    }

    fn change_column(&self, op: &ChangeColumnOp) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} CHANGE COLUMN {} {} {}",
            self.quote_table(&op.table),
            self.quote_column(&op.from.name),
            self.quote_column(&op.to.name),
            self.column_definition(&op.to, op.inline_primary)
        )]
    }

    fn add_column(&self, op: &crate::change::AddColumnOp) -> String {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.quote_table(&op.table),
            self.quote_column(&op.column.name),
            self.column_definition(&op.column, op.inline_primary)
        );
        if let Some(after) = &op.after {
            sql.push_str(" AFTER ");
            sql.push_str(&self.quote_column(after));
        }
        sql
    }

    fn add_index(&self, op: &AddIndexOp) -> String {
        let index = &op.index;
        let table = self.quote_table(&index.table);
        let columns = self.index_columns(index);
        if index.is_primary() {
            return format!("ALTER TABLE {table} ADD PRIMARY KEY ({columns})");
        }
        let using = index
            .structure
            .map(|s| format!(" USING {}", s.as_sql()))
            .unwrap_or_default();
        format!(
            "ALTER TABLE {table} ADD {} {}{using} ({columns})",
            index.kind.as_sql(),
            self.quote_identifier(&index.name)
        )
    }

    fn drop_index(&self, op: &DropIndexOp) -> Result<Vec<String>> {
        let index = &op.index;
        let table = self.quote_table(&index.table);
        if index.is_primary() {
            return Ok(vec![format!("ALTER TABLE {table} DROP PRIMARY KEY")]);
        }
        require_index_name(index)?;
        Ok(vec![format!(
            "ALTER TABLE {table} DROP INDEX {}",
            self.quote_identifier(&index.name)
        )])
    }

    fn column_definition(&self, column: &Column, inline_primary: bool) -> String {
        let mut sql = column.sql_type().to_string();
        if column.unsigned && !sql.contains("unsigned") {
            sql.push_str(" unsigned");
        }
        if self.types.is_text(column.sql_type()) {
            if column.binary {
                sql.push_str(" BINARY");
            }
            if let Some(charset) = &column.charset {
                sql.push_str(" CHARACTER SET ");
                sql.push_str(charset);
            }
            if let Some(collation) = &column.collation {
                sql.push_str(" COLLATE ");
                sql.push_str(collation);
            }
        }
        if column.increment {
            sql.push_str(" NOT NULL AUTO_INCREMENT");
            if inline_primary && column.primary_key {
                sql.push_str(" PRIMARY KEY");
            }
        } else {
            sql.push_str(if column.is_required() { " NOT NULL" } else { " NULL" });
            sql.push_str(&self.default_clause(column));
        }
        if let Some(comment) = &column.comment {
            sql.push_str(" COMMENT ");
            sql.push_str(&self.quote_text(comment));
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{AddColumnOp, DropColumnOp};
    use crate::index::IndexStructure;
    use crate::table::Table;
    use crate::value::SqlValue;

    #[test]
    fn test_quoting() {
        let d = MySqlDialect::new();
        assert_eq!(d.quote_table("db.people"), "`db`.`people`");
        assert_eq!(d.quote_column("we`ird"), "`we``ird`");
        assert_eq!(d.quote_text("it's"), "'it\\'s'");
    }

    #[test]
    fn test_column_definition_variants() {
        let d = MySqlDialect::new();
        let id = Column::new("id", "int(11)").unsigned().increment().primary_key();
        assert_eq!(
            d.column_definition(&id, true),
            "int(11) unsigned NOT NULL AUTO_INCREMENT PRIMARY KEY"
        );
        assert_eq!(d.column_definition(&id, false), "int(11) unsigned NOT NULL AUTO_INCREMENT");

        let created = Column::new("created", "timestamp").nullable();
        assert_eq!(d.column_definition(&created, false), "timestamp NULL");

        let status = Column::new("status", "smallint(1)").not_null().default_value("3");
        assert_eq!(d.column_definition(&status, false), "smallint(1) NOT NULL DEFAULT 3");

        let name = Column::new("name", "varchar(64)")
            .default_value(SqlValue::Null)
            .charset("utf8mb4");
        assert_eq!(
            d.column_definition(&name, false),
            "varchar(64) CHARACTER SET utf8mb4 NULL DEFAULT NULL"
        );

        let body = Column::new("body", "text").not_null().default_value("x");
        assert_eq!(d.column_definition(&body, false), "text NOT NULL");
    }

    #[test]
    fn test_index_statements() {
        let d = MySqlDialect::new();
        let index = Index::new("t", "title", IndexType::Index)
            .column("a")
            .column_sized("title", 16)
            .with_structure(IndexStructure::Hash);
        assert_eq!(
            d.add_index(&AddIndexOp { index: index.clone() }),
            "ALTER TABLE `t` ADD INDEX `title` USING HASH (`a`, `title`(16))"
        );
        assert_eq!(
            d.drop_index(&DropIndexOp { index }).unwrap(),
            vec!["ALTER TABLE `t` DROP INDEX `title`"]
        );
        let primary = Index::primary("t").column("id");
        assert_eq!(
            d.add_index(&AddIndexOp { index: primary.clone() }),
            "ALTER TABLE `t` ADD PRIMARY KEY (`id`)"
        );
        assert_eq!(
            d.drop_index(&DropIndexOp { index: primary }).unwrap(),
            vec!["ALTER TABLE `t` DROP PRIMARY KEY"]
        );
        let unnamed = Index::new("t", "", IndexType::Unique).column("a");
        assert!(d.drop_index(&DropIndexOp { index: unnamed }).is_err());
    }

    #[test]
    fn test_column_statements() {
        let d = MySqlDialect::new();
        let add = AddColumnOp {
            table: String::from("t"),
            column: Column::new("age", "int(3)").not_null(),
            after: Some(String::from("name")),
            inline_primary: false,
        };
        assert_eq!(
            d.add_column(&add),
            "ALTER TABLE `t` ADD COLUMN `age` int(3) NOT NULL AFTER `name`"
        );
        let drop = DropColumnOp {
            table: String::from("t"),
            column: String::from("age"),
        };
        assert_eq!(d.drop_column(&drop), "ALTER TABLE `t` DROP COLUMN `age`");
    }

    #[test]
    fn test_create_table() {
        let d = MySqlDialect::new();
        let mut table = Table::new("people")
            .with_column(Column::new("id", "int(11)").increment().primary_key())
            .unwrap()
            .with_column(Column::new("email", "varchar(128)").not_null().unique(""))
            .unwrap()
            .with_attribute("engine", "InnoDB")
            .with_attribute("charset", "utf8mb4")
            .finalized();
        table.add_on_create("INSERT INTO `people` (`email`) VALUES ('root')");
        let statements = d.create_table(&CreateTableOp { table }).unwrap();
        assert_eq!(
            statements,
            vec![
                String::from(
                    "CREATE TABLE `people` (\n\t`id` int(11) NOT NULL AUTO_INCREMENT,\n\t\
                     `email` varchar(128) NOT NULL,\n\tPRIMARY KEY (`id`),\n\t\
                     UNIQUE KEY `email_Unique` (`email`)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
                ),
                String::from("INSERT INTO `people` (`email`) VALUES ('root')"),
            ]
        );
    }
}
