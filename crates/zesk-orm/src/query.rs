//! SELECT query object mutated by the link walker.

use indexmap::IndexMap;
use zesk_schema::{SchemaDialect, SqlValue};

use crate::class::ClassBase;
use crate::error::{OrmError, Result};
use crate::link::{LinkOptions, LinkWalker};
use crate::registry::MetadataRegistry;

/// Join type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN.
    #[default]
    Inner,
    /// LEFT OUTER JOIN.
    LeftOuter,
}

impl JoinType {
    /// INNER when the joined row is required, else LEFT OUTER.
    #[must_use]
    pub const fn from_require(require: bool) -> Self {
        if require {
            Self::Inner
        } else {
            Self::LeftOuter
        }
    }

    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::LeftOuter => "LEFT OUTER",
        }
    }
}

/// Right-hand side of an equality.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Another column, `alias.column`.
    Column(String),
    /// A literal value.
    Value(SqlValue),
}

/// An equality between a column and an operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Column, optionally `alias.column`.
    pub column: String,
    /// Compared operand.
    pub operand: Operand,
}

impl Condition {
    /// `left = right` between two columns.
    #[must_use]
    pub fn columns(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            column: left.into(),
            operand: Operand::Column(right.into()),
        }
    }

    /// `column = value`.
    #[must_use]
    pub fn value(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            column: column.into(),
            operand: Operand::Value(value.into()),
        }
    }

    fn to_sql(&self, dialect: &dyn SchemaDialect, separator: &str) -> String {
        let column = dialect.quote_column(&self.column);
        match &self.operand {
            Operand::Column(other) => format!("{column}={}", dialect.quote_column(other)),
            Operand::Value(SqlValue::Null) => format!("{column} IS NULL"),
            Operand::Value(value) => {
                format!("{column}{separator}{}", dialect.render_value(value))
            }
        }
    }
}

/// A joined table.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join type.
    pub join_type: JoinType,
    /// Joined table.
    pub table: String,
    /// Alias of the joined table.
    pub alias: String,
    /// Class mapped to the table, when known.
    pub class: Option<String>,
    /// ON equalities, joined with AND.
    pub on: Vec<Condition>,
}

impl Join {
    /// Joins a class's table.
    #[must_use]
    pub fn class(join_type: JoinType, class: &ClassBase, alias: impl Into<String>) -> Self {
        Self {
            join_type,
            table: class.table.clone(),
            alias: alias.into(),
            class: Some(class.class.clone()),
            on: Vec::new(),
        }
    }

    /// Joins a bare table.
    #[must_use]
    pub fn table(join_type: JoinType, table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            join_type,
            table: table.into(),
            alias: alias.into(),
            class: None,
            on: Vec::new(),
        }
    }

    /// Adds an ON equality.
    #[must_use]
    pub fn on(mut self, condition: Condition) -> Self {
        self.on.push(condition);
        self
    }

    fn relation(&self) -> &str {
        self.class.as_deref().unwrap_or(&self.table)
    }
}

/// A SELECT of every column of one aliased table, with joins.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    class: Option<String>,
    table: String,
    alias: String,
    joins: Vec<Join>,
    aliases: IndexMap<String, String>,
    wheres: Vec<Condition>,
    order_by: Vec<String>,
}

impl Select {
    /// Selects from a bare table.
    #[must_use]
    pub fn new(table: impl Into<String>, alias: impl Into<String>) -> Self {
        let table = table.into();
        let alias = alias.into();
        Self {
            class: None,
            aliases: IndexMap::from([(alias.clone(), table.clone())]),
            table,
            alias,
            joins: Vec::new(),
            wheres: Vec::new(),
            order_by: Vec::new(),
        }
    }

    /// Selects from a class's table.
    #[must_use]
    pub fn for_class(class: &ClassBase, alias: impl Into<String>) -> Self {
        let mut select = Self::new(class.table.clone(), alias);
        select
            .aliases
            .insert(select.alias.clone(), class.class.clone());
        select.class = Some(class.class.clone());
        select
    }

    /// Root alias.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Root class, if the query was built for one.
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Root table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Joins, in order.
    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Returns the class or table bound to `alias`.
    #[must_use]
    pub fn find_alias(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    /// Adds a join, failing when its alias is already bound.
    pub fn join(&mut self, join: Join) -> Result<&mut Self> {
        if let Some(existing) = self.find_alias(&join.alias) {
            return Err(OrmError::AliasCollision {
                alias: join.alias.clone(),
                existing: existing.to_string(),
                requested: join.relation().to_string(),
            });
        }
        self.aliases
            .insert(join.alias.clone(), join.relation().to_string());
        self.joins.push(join);
        Ok(self)
    }

    /// Adds `column = value` to the WHERE clause.
    pub fn add_where(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> &mut Self {
        self.wheres.push(Condition::value(column, value));
        self
    }

    /// Adds several equalities to the WHERE clause.
    pub fn append_where(&mut self, conditions: &IndexMap<String, SqlValue>) -> &mut Self {
        for (column, value) in conditions {
            self.add_where(column.clone(), value.clone());
        }
        self
    }

    /// Replaces the ORDER BY terms.
    pub fn set_order_by(&mut self, terms: Vec<String>) -> &mut Self {
        self.order_by = terms;
        self
    }

    /// ORDER BY terms.
    #[must_use]
    pub fn order_by(&self) -> &[String] {
        &self.order_by
    }

    /// Joins the path from the root class to `class`.
    ///
    /// Without an explicit path the default link from the root class is used.
    pub fn link(
        &mut self,
        registry: &MetadataRegistry,
        class: &str,
        options: LinkOptions,
    ) -> Result<&mut Self> {
        let mut options = options;
        if options.path.is_none() {
            let root = self.class.as_deref().ok_or_else(|| {
                OrmError::Semantics(format!("Cannot link '{class}' from a query without a class"))
            })?;
            let root = registry.class(root)?;
            options.path = Some(root.link_default_path_to(&registry.resolve_name(class))?);
        }
        LinkWalker::new(registry).walk(self, &options)?;
        Ok(self)
    }

    /// Renders the query, one clause per line.
    #[must_use]
    pub fn to_sql(&self, dialect: &dyn SchemaDialect) -> String {
        let alias = dialect.quote_identifier(&self.alias);
        let mut lines = vec![format!(
            "SELECT {alias}.* FROM {} AS {alias}",
            dialect.quote_table(&self.table)
        )];
        for join in &self.joins {
            let mut line = format!(
                "{} JOIN {} AS {}",
                join.join_type.as_sql(),
                dialect.quote_table(&join.table),
                dialect.quote_identifier(&join.alias)
            );
            if !join.on.is_empty() {
                line.push_str(" ON ");
                line.push_str(&render_conditions(dialect, &join.on, "="));
            }
            lines.push(line);
        }
        if !self.wheres.is_empty() {
            lines.push(format!(
                "WHERE {}",
                render_conditions(dialect, &self.wheres, " = ")
            ));
        }
        if !self.order_by.is_empty() {
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|term| order_term(dialect, term))
                .collect();
            lines.push(format!("ORDER BY {}", terms.join(", ")));
        }
        lines.join("\n")
    }
}

fn render_conditions(dialect: &dyn SchemaDialect, conditions: &[Condition], separator: &str) -> String {
    conditions
        .iter()
        .map(|condition| condition.to_sql(dialect, separator))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn order_term(dialect: &dyn SchemaDialect, term: &str) -> String {
    let term = term.trim();
    match term.rsplit_once(char::is_whitespace) {
        Some((column, direction))
            if direction.eq_ignore_ascii_case("asc") || direction.eq_ignore_ascii_case("desc") =>
        {
            format!(
                "{} {}",
                dialect.quote_column(column.trim()),
                direction.to_uppercase()
            )
        }
        _ => dialect.quote_column(term),
    }
}
