//! Parser turning `CREATE TABLE` scripts into [`Table`] snapshots.
//!
//! Accepts MySQL `SHOW CREATE TABLE` / mysqldump output and the common
//! subset of PostgreSQL dumps. Data statements following a `CREATE TABLE`
//! become that table's on-create actions; other statements are skipped.

use tracing::debug;

use crate::column::Column;
use crate::error::{Result, SchemaError};
use crate::index::{Index, IndexStructure, IndexType};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::table::Table;
use crate::value::SqlValue;

/// Words that end a column type and start its attributes.
const COLUMN_ATTRIBUTES: &[&str] = &[
    "UNSIGNED",
    "SIGNED",
    "ZEROFILL",
    "BINARY",
    "CHARACTER",
    "CHARSET",
    "COLLATE",
    "NOT",
    "NULL",
    "DEFAULT",
    "AUTO_INCREMENT",
    "AUTOINCREMENT",
    "PRIMARY",
    "UNIQUE",
    "KEY",
    "COMMENT",
    "ON",
    "REFERENCES",
    "CHECK",
    "GENERATED",
    "CONSTRAINT",
    "AS",
];

/// Statements recorded as on-create actions of the preceding table.
const DATA_STATEMENTS: &[&str] = &["INSERT", "REPLACE", "UPDATE", "DELETE"];

/// Parses every table defined in a script.
pub fn parse_tables(sql: &str) -> Result<Vec<Table>> {
    SchemaParser::new(sql)?.parse_script()
}

/// Parses the first table defined in a script.
pub fn parse_table(sql: &str) -> Result<Table> {
    parse_tables(sql)?
        .into_iter()
        .next()
        .ok_or_else(|| SchemaError::Semantics(String::from("No CREATE TABLE statement found")))
}

/// Recursive-descent parser over a token stream.
pub struct SchemaParser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> SchemaParser<'a> {
    /// Tokenizes the script.
    pub fn new(source: &'a str) -> Result<Self> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
        })
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        token
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.peek().is_word(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek().is_punct(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<()> {
        if self.eat_word(word) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected {word}")))
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<()> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected '{c}'")))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.peek().identifier() {
            Some(name) => {
                let name = name.to_string();
                self.pos += 1;
                Ok(name)
            }
            None => Err(self.error("Expected identifier")),
        }
    }

    /// Parses `name` or `schema.name`, keeping the last part.
    fn expect_table_name(&mut self) -> Result<String> {
        let mut name = self.expect_identifier()?;
        while self.eat_punct('.') {
            name = self.expect_identifier()?;
        }
        Ok(name)
    }

    fn error(&self, message: &str) -> SchemaError {
        SchemaError::Parse {
            message: message.to_string(),
            position: self.peek().span.start,
        }
    }

    fn at_item_end(&self) -> bool {
        let token = self.peek();
        token.is_punct(',') || token.is_punct(')') || token.kind == TokenKind::Eof
    }

    /// Skips a balanced parenthesized group, returning its inner text.
    fn skip_group(&mut self) -> Result<&'a str> {
        let source = self.source;
        let open = self.peek().span;
        self.expect_punct('(')?;
        let mut depth = 1;
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Punct('(') => depth += 1,
                TokenKind::Punct(')') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(source[open.end..token.span.start].trim());
                    }
                }
                TokenKind::Eof => return Err(self.error("Unbalanced parentheses")),
                _ => {}
            }
        }
    }

    /// Skips to the end of the current table item.
    fn skip_item(&mut self) -> Result<()> {
        while !self.at_item_end() {
            if self.peek().is_punct('(') {
                self.skip_group()?;
            } else {
                self.advance();
            }
        }
        Ok(())
    }

    /// Skips to the end of the statement, returning its text.
    fn skip_statement(&mut self) -> &'a str {
        let source = self.source;
        let start = self.peek().span.start;
        let mut end = start;
        while !self.at_eof() && !self.peek().is_punct(';') {
            end = self.advance().span.end;
        }
        source[start..end].trim()
    }

    /// Parses the whole script.
    pub fn parse_script(mut self) -> Result<Vec<Table>> {
        let mut tables: Vec<Table> = Vec::new();
        loop {
            while self.eat_punct(';') {}
            if self.at_eof() {
                return Ok(tables);
            }
            if self.peek().is_word("CREATE") {
                let mut offset = 1;
                while self.peek_at(offset).is_word("TEMPORARY")
                    || self.peek_at(offset).is_word("UNIQUE")
                {
                    offset += 1;
                }
                if self.peek_at(offset).is_word("TABLE") {
                    let table = self.parse_create_table()?;
                    debug!(table = %table.name, columns = table.column_count(), "Parsed table");
                    tables.push(table);
                    continue;
                }
                if self.peek_at(offset).is_word("INDEX") {
                    self.parse_create_index(&mut tables)?;
                    continue;
                }
            }
            if self.peek().is_word("ALTER") && self.peek_at(1).is_word("TABLE") {
                self.parse_alter_table(&mut tables)?;
                continue;
            }
            let is_data = DATA_STATEMENTS.iter().any(|w| self.peek().is_word(w));
            let statement = self.skip_statement();
            match tables.last_mut() {
                Some(table) if is_data => table.add_on_create(statement),
                _ => debug!(statement, "Skipping statement"),
            }
        }
    }

    fn parse_create_table(&mut self) -> Result<Table> {
        self.expect_word("CREATE")?;
        self.eat_word("TEMPORARY");
        self.expect_word("TABLE")?;
        if self.eat_word("IF") {
            self.expect_word("NOT")?;
            self.expect_word("EXISTS")?;
        }
        let mut table = Table::new(self.expect_table_name()?);
        self.expect_punct('(')?;
        let mut indexes = Vec::new();
        loop {
            self.parse_table_item(&mut table, &mut indexes)?;
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct(')')?;
        self.parse_table_options(&mut table)?;
        table.finalize_indexes();
        for index in indexes {
            attach_index(&mut table, index)?;
        }
        Ok(table)
    }

    fn parse_table_item(&mut self, table: &mut Table, indexes: &mut Vec<Index>) -> Result<()> {
        let mut constraint = None;
        if self.eat_word("CONSTRAINT")
            && !["PRIMARY", "UNIQUE", "FOREIGN", "CHECK"]
                .iter()
                .any(|w| self.peek().is_word(w))
        {
            constraint = Some(self.expect_identifier()?);
        }
        if self.eat_word("PRIMARY") {
            self.expect_word("KEY")?;
            indexes.push(self.parse_index_columns(Index::primary(&table.name))?);
        } else if self.eat_word("UNIQUE") {
            let _ = self.eat_word("KEY") || self.eat_word("INDEX");
            let name = self.optional_index_name()?.or(constraint);
            let index = self.parse_index_columns(Index::new(
                &table.name,
                name.unwrap_or_default(),
                IndexType::Unique,
            ))?;
            indexes.push(named_after_first_column(index));
        } else if ["KEY", "INDEX", "FULLTEXT", "SPATIAL"]
            .iter()
            .any(|w| self.peek().is_word(w))
        {
            let kind = self.advance();
            if !kind.is_word("KEY") && !kind.is_word("INDEX") {
                let _ = self.eat_word("KEY") || self.eat_word("INDEX");
            }
            let name = self.optional_index_name()?;
            let index = self.parse_index_columns(Index::new(
                &table.name,
                name.unwrap_or_default(),
                IndexType::Index,
            ))?;
            indexes.push(named_after_first_column(index));
        } else if self.peek().is_word("FOREIGN")
            || self.peek().is_word("CHECK")
            || constraint.is_some()
        {
            self.skip_item()?;
        } else {
            let column = self.parse_column()?;
            table.add_column(column)?;
        }
        Ok(())
    }

    fn optional_index_name(&mut self) -> Result<Option<String>> {
        if self.peek().is_punct('(') || self.peek().is_word("USING") {
            return Ok(None);
        }
        self.expect_identifier().map(Some)
    }

    /// Parses `[USING x] (col [(size)] [ASC|DESC], ...) [USING x]`.
    fn parse_index_columns(&mut self, mut index: Index) -> Result<Index> {
        self.parse_index_structure(&mut index)?;
        self.expect_punct('(')?;
        loop {
            let name = self.expect_identifier()?;
            let mut size = None;
            if self.eat_punct('(') {
                size = Some(self.expect_number()?);
                self.expect_punct(')')?;
            }
            let _ = self.eat_word("ASC") || self.eat_word("DESC");
            index.add_column(name, size);
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct(')')?;
        self.parse_index_structure(&mut index)?;
        Ok(index)
    }

    fn parse_index_structure(&mut self, index: &mut Index) -> Result<()> {
        if self.eat_word("USING") {
            let name = self.expect_identifier()?;
            index.structure = IndexStructure::parse(&name);
        }
        Ok(())
    }

    fn expect_number(&mut self) -> Result<u32> {
        match &self.peek().kind {
            TokenKind::Number(n) => {
                let value = n
                    .parse()
                    .map_err(|_| self.error(&format!("Invalid size '{n}'")))?;
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.error("Expected number")),
        }
    }

    fn parse_type(&mut self) -> Result<String> {
        let mut sql_type = match &self.peek().kind {
            TokenKind::Word(word) => word.to_lowercase(),
            _ => return Err(self.error("Expected column type")),
        };
        self.pos += 1;
        loop {
            if self.peek().is_punct('(') {
                let args = self.skip_group()?;
                sql_type.push('(');
                sql_type.push_str(args);
                sql_type.push(')');
                continue;
            }
            match &self.peek().kind {
                TokenKind::Word(word)
                    if !COLUMN_ATTRIBUTES.iter().any(|a| word.eq_ignore_ascii_case(a)) =>
                {
                    sql_type.push(' ');
                    sql_type.push_str(&word.to_lowercase());
                    self.pos += 1;
                }
                _ => break,
            }
        }
        Ok(normalize_type_name(&sql_type))
    }

    fn parse_column(&mut self) -> Result<Column> {
        let name = self.expect_identifier()?;
        let sql_type = self.parse_type()?;
        let mut column = Column::new(name, sql_type);
        if matches!(column.sql_type(), "serial" | "bigserial" | "smallserial") {
            column.increment = true;
        }
        while !self.at_item_end() {
            let token = self.advance();
            let TokenKind::Word(word) = &token.kind else {
                if token.is_punct('(') {
                    self.pos -= 1;
                    self.skip_group()?;
                }
                continue;
            };
            match word.to_uppercase().as_str() {
                "UNSIGNED" => column.unsigned = true,
                "BINARY" => column.binary = true,
                "CHARACTER" => {
                    self.expect_word("SET")?;
                    column.charset = Some(self.expect_identifier()?);
                }
                "CHARSET" => column.charset = Some(self.expect_identifier()?),
                "COLLATE" => column.collation = Some(self.expect_identifier()?),
                "NOT" => {
                    self.expect_word("NULL")?;
                    column.not_null = Some(true);
                }
                "NULL" => column.not_null = Some(false),
                "DEFAULT" => match self.parse_default()? {
                    SqlValue::Expression(expr) if expr.starts_with("NEXTVAL") => {
                        column.increment = true;
                    }
                    value => column.default = Some(value),
                },
                "AUTO_INCREMENT" | "AUTOINCREMENT" => column.increment = true,
                "PRIMARY" => {
                    self.expect_word("KEY")?;
                    column.add_membership(IndexType::Primary, "", None);
                }
                "KEY" => column.add_membership(IndexType::Primary, "", None),
                "UNIQUE" => {
                    self.eat_word("KEY");
                    column.add_membership(IndexType::Unique, "", None);
                }
                "COMMENT" => match self.advance().kind {
                    TokenKind::Str(comment) => column.comment = Some(comment),
                    _ => return Err(self.error("Expected comment string")),
                },
                "ON" => {
                    self.expect_word("UPDATE")?;
                    self.parse_default()?;
                }
                "GENERATED" => {
                    let start = self.pos;
                    self.skip_item()?;
                    if self.tokens[start..self.pos].iter().any(|t| t.is_word("IDENTITY")) {
                        column.increment = true;
                    }
                }
                _ => {}
            }
        }
        Ok(column)
    }

    fn parse_default(&mut self) -> Result<SqlValue> {
        let token = self.advance();
        let value = match token.kind {
            TokenKind::Str(s) | TokenKind::Quoted(s) => SqlValue::Text(s),
            TokenKind::Number(n) => parse_number(&n, false),
            TokenKind::Punct('-') => match self.advance().kind {
                TokenKind::Number(n) => parse_number(&n, true),
                _ => return Err(self.error("Expected number after '-'")),
            },
            TokenKind::Punct('(') => {
                self.pos -= 1;
                SqlValue::Expression(self.skip_group()?.to_string())
            }
            TokenKind::Word(word) => match word.to_uppercase().as_str() {
                "NULL" => SqlValue::Null,
                "TRUE" => SqlValue::Bool(true),
                "FALSE" => SqlValue::Bool(false),
                upper => {
                    let mut expr = upper.to_string();
                    if self.peek().is_punct('(') {
                        let args = self.skip_group()?;
                        expr = format!("{expr}({args})");
                    }
                    SqlValue::Expression(expr)
                }
            },
            _ => return Err(self.error("Expected default value")),
        };
        if self.peek().is_punct(':') && self.peek_at(1).is_punct(':') {
            self.pos += 2;
            self.parse_type()?;
        }
        Ok(value)
    }

    fn parse_table_options(&mut self, table: &mut Table) -> Result<()> {
        while !self.at_eof() && !self.peek().is_punct(';') {
            if self.eat_word("DEFAULT") {
                continue;
            }
            let key = if self.eat_word("ENGINE") || self.eat_word("TYPE") {
                Some("engine")
            } else if self.eat_word("CHARSET") {
                Some("charset")
            } else if self.eat_word("CHARACTER") {
                self.expect_word("SET")?;
                Some("charset")
            } else if self.eat_word("COLLATE") {
                Some("collate")
            } else {
                None
            };
            match key {
                Some(key) => {
                    self.eat_punct('=');
                    let value = self.expect_identifier()?;
                    table.set_attribute(key, value);
                }
                None if self.peek().is_punct('(') => {
                    self.skip_group()?;
                }
                None => {
                    self.advance();
                    if self.eat_punct('=') {
                        self.advance();
                    }
                }
            }
        }
        Ok(())
    }

    /// `CREATE [UNIQUE] INDEX [IF NOT EXISTS] name ON table [USING x] (cols)`
    fn parse_create_index(&mut self, tables: &mut [Table]) -> Result<()> {
        self.expect_word("CREATE")?;
        let kind = if self.eat_word("UNIQUE") {
            IndexType::Unique
        } else {
            IndexType::Index
        };
        self.expect_word("INDEX")?;
        self.eat_word("CONCURRENTLY");
        if self.eat_word("IF") {
            self.expect_word("NOT")?;
            self.expect_word("EXISTS")?;
        }
        let name = self.expect_identifier()?;
        self.expect_word("ON")?;
        self.eat_word("ONLY");
        let table_name = self.expect_table_name()?;
        let table = find_table(tables, &table_name)?;
        let index = self.parse_index_columns(Index::new(&table.name, name, kind))?;
        attach_index(table, index)
    }

    /// `ALTER TABLE [ONLY] t ADD [CONSTRAINT name] PRIMARY KEY|UNIQUE (cols)`
    fn parse_alter_table(&mut self, tables: &mut [Table]) -> Result<()> {
        let start = self.pos;
        self.expect_word("ALTER")?;
        self.expect_word("TABLE")?;
        self.eat_word("ONLY");
        let table_name = self.expect_table_name()?;
        if !self.eat_word("ADD") {
            self.pos = start;
            let statement = self.skip_statement();
            debug!(statement, "Skipping statement");
            return Ok(());
        }
        let mut name = None;
        if self.eat_word("CONSTRAINT") {
            name = Some(self.expect_identifier()?);
        }
        let kind = if self.eat_word("PRIMARY") {
            self.expect_word("KEY")?;
            IndexType::Primary
        } else if self.eat_word("UNIQUE") {
            IndexType::Unique
        } else {
            self.pos = start;
            let statement = self.skip_statement();
            debug!(statement, "Skipping statement");
            return Ok(());
        };
        let table = find_table(tables, &table_name)?;
        let index = self.parse_index_columns(Index::new(
            &table.name,
            name.unwrap_or_default(),
            kind,
        ))?;
        attach_index(table, named_after_first_column(index))
    }
}

fn find_table<'t>(tables: &'t mut [Table], name: &str) -> Result<&'t mut Table> {
    tables
        .iter_mut()
        .find(|t| t.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| SchemaError::TableNotFound(name.to_string()))
}

fn attach_index(table: &mut Table, index: Index) -> Result<()> {
    if index.is_primary() && table.primary_index().is_some() {
        table.set_primary(index)?;
        return Ok(());
    }
    table.add_index(index)
}

/// Unnamed indexes take the name of their first column.
fn named_after_first_column(mut index: Index) -> Index {
    if index.name.is_empty() {
        if let Some(first) = index.columns.first() {
            index.name = first.name.clone();
        }
    }
    index
}

fn normalize_type_name(sql_type: &str) -> String {
    let sql_type = sql_type
        .replace("character varying", "varchar")
        .replace("double precision", "double")
        .replace(" without time zone", "")
        .replace(" with time zone", "");
    sql_type.trim().to_string()
}

fn parse_number(text: &str, negative: bool) -> SqlValue {
    let signed = if negative {
        format!("-{text}")
    } else {
        text.to_string()
    };
    signed.parse::<i64>().map_or_else(
        |_| {
            signed
                .parse::<f64>()
                .map_or(SqlValue::Text(signed.clone()), SqlValue::Float)
        },
        SqlValue::Int,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: &str = "
        -- users table
        DROP TABLE IF EXISTS `users`;
        CREATE TABLE `users` (
            `id` int(11) unsigned NOT NULL AUTO_INCREMENT,
            `email` varchar(128) CHARACTER SET utf8mb4 NOT NULL DEFAULT '',
            `name` varchar(64) DEFAULT NULL COMMENT 'display name',
            `status` smallint(1) NOT NULL DEFAULT '0',
            `balance` decimal(10,2) NOT NULL DEFAULT -1.5,
            `created` timestamp NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
            PRIMARY KEY (`id`),
            UNIQUE KEY `email` (`email`),
            KEY `name_status` (`name`(16), `status`) USING BTREE
        ) ENGINE=InnoDB AUTO_INCREMENT=12 DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci;
        INSERT INTO `users` (`email`) VALUES ('root@localhost');
    ";

    #[test]
    fn test_parse_mysql_dump() {
        let table = parse_table(USERS).unwrap();
        assert_eq!(table.name, "users");
        let names: Vec<_> = table.columns().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "email", "name", "status", "balance", "created"]
        );

        let id = table.column("id").unwrap();
        assert_eq!(id.sql_type(), "int(11)");
        assert!(id.unsigned && id.increment && id.primary_key && id.is_required());

        let email = table.column("email").unwrap();
        assert_eq!(email.charset.as_deref(), Some("utf8mb4"));
        assert_eq!(email.default, Some(SqlValue::Text(String::new())));

        let name = table.column("name").unwrap();
        assert_eq!(name.default, Some(SqlValue::Null));
        assert_eq!(name.comment.as_deref(), Some("display name"));
        assert!(!name.is_required());

        let balance = table.column("balance").unwrap();
        assert_eq!(balance.sql_type(), "decimal(10,2)");
        assert_eq!(balance.default, Some(SqlValue::Float(-1.5)));

        let created = table.column("created").unwrap();
        assert_eq!(
            created.default,
            Some(SqlValue::Expression(String::from("CURRENT_TIMESTAMP")))
        );

        assert_eq!(table.attributes()["engine"], "InnoDB");
        assert_eq!(table.attributes()["charset"], "utf8mb4");
        assert_eq!(table.attributes()["collate"], "utf8mb4_unicode_ci");
        assert_eq!(
            table.on_create_actions(),
            ["INSERT INTO `users` (`email`) VALUES ('root@localhost')"]
        );
    }

    #[test]
    fn test_parse_indexes() {
        let table = parse_table(USERS).unwrap();
        let primary = table.primary_index().unwrap();
        assert_eq!(primary.column_names().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(table.index("email").unwrap().kind, IndexType::Unique);
        let composite = table.index("name_status").unwrap();
        assert_eq!(composite.columns[0].size, Some(16));
        assert_eq!(composite.structure, Some(IndexStructure::BTree));
    }

    #[test]
    fn test_parse_postgres_dump() {
        let sql = r#"
            CREATE TABLE public.people (
                id integer DEFAULT nextval('people_id_seq'::regclass) NOT NULL,
                email character varying(128) DEFAULT ''::character varying NOT NULL,
                born timestamp without time zone,
                active boolean DEFAULT true
            );
            ALTER TABLE ONLY public.people ADD CONSTRAINT people_pkey PRIMARY KEY (id);
            CREATE UNIQUE INDEX people_email ON public.people USING btree (email);
        "#;
        let table = parse_table(sql).unwrap();
        assert_eq!(table.name, "people");
        let id = table.column("id").unwrap();
        assert!(id.increment && id.primary_key);
        assert_eq!(id.default, None);
        let email = table.column("email").unwrap();
        assert_eq!(email.sql_type(), "varchar(128)");
        assert_eq!(email.default, Some(SqlValue::Text(String::new())));
        assert_eq!(table.column("born").unwrap().sql_type(), "timestamp");
        assert_eq!(table.column("active").unwrap().default, Some(SqlValue::Bool(true)));
        let unique = table.index("people_email").unwrap();
        assert_eq!(unique.kind, IndexType::Unique);
        assert_eq!(unique.structure, Some(IndexStructure::BTree));
    }

    #[test]
    fn test_parse_multiple_tables() {
        let tables = parse_tables(
            "CREATE TABLE a (x int); CREATE TABLE IF NOT EXISTS b (y text, UNIQUE (y));",
        )
        .unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].index("y").unwrap().kind, IndexType::Unique);
    }

    #[test]
    fn test_index_on_unknown_table() {
        let err = parse_tables("CREATE INDEX i ON ghost (x)").unwrap_err();
        assert!(matches!(err, SchemaError::TableNotFound(name) if name == "ghost"));
    }

    #[test]
    fn test_parse_errors_report_position() {
        let err = parse_table("CREATE TABLE t (id int").unwrap_err();
        assert!(matches!(err, SchemaError::Parse { .. }));
        assert!(parse_table("SELECT 1").is_err());
    }
}
