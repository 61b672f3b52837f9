//! Derived class metadata.
//!
//! [`ClassBase::build`] turns a [`ClassDeclaration`] into the metadata used
//! by the link walker and the schema synchronizer. Derivation runs in a fixed
//! order: table name, primary keys and id column, auto column, find keys,
//! has-one targets, then has-many members.

use std::collections::HashMap;
use std::sync::OnceLock;

use indexmap::IndexMap;
use tracing::{debug, warn};
use zesk_schema::{parse_table, Column, SchemaDialect, SqlValue, Table};

use crate::coerce::{Assignment, CoercionRegistry, EncodeContext, MemberValue};
use crate::declaration::{ClassDeclaration, HasManySpec, IdColumn};
use crate::error::{OrmError, Result};
use crate::member::MemberType;
use crate::registry::MetadataRegistry;

/// Options applied to every class built by a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Prefix for derived table names.
    pub table_prefix: String,
    /// Id column used when a class declares no primary keys.
    pub id_column: String,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
            id_column: String::from("id"),
        }
    }
}

/// Target of a has-one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HasOneTarget {
    /// A declared class.
    Fixed(String),
    /// The class named by another member's current value.
    Dynamic(String),
}

impl HasOneTarget {
    fn parse(target: &str) -> Self {
        match target.strip_prefix('*') {
            Some(member) => Self::Dynamic(member.to_string()),
            None => Self::Fixed(target.to_string()),
        }
    }
}

/// A has-many member with all defaults filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHasMany {
    /// Member name on the owning class.
    pub member: String,
    /// Target class.
    pub class: String,
    /// Target table.
    pub target_table: String,
    /// Target id column.
    pub target_id: Option<String>,
    /// Link table, for many-to-many members.
    pub table: Option<String>,
    /// Class whose table is the link table.
    pub link_class: Option<String>,
    /// Column referencing the owner.
    pub foreign_key: String,
    /// Column referencing the target.
    pub far_key: String,
    /// Ordering, unprefixed.
    pub order_by: Vec<String>,
    /// Extra WHERE equalities, unprefixed.
    pub conditions: IndexMap<String, SqlValue>,
    /// Extra join ON equalities, unprefixed.
    pub on: IndexMap<String, SqlValue>,
}

#[derive(Debug)]
struct HasManyEntry {
    spec: HasManySpec,
    resolved: OnceLock<ResolvedHasMany>,
}

/// Fully derived metadata for one mapped class.
#[derive(Debug)]
pub struct ClassBase {
    /// Class name.
    pub class: String,
    /// Human readable name.
    pub name: String,
    /// Code name.
    pub code_name: String,
    /// Table name.
    pub table: String,
    /// Id column, absent for compound or keyless classes.
    pub id_column: Option<String>,
    /// Primary key columns.
    pub primary_keys: Vec<String>,
    /// Auto-increment column.
    pub auto_column: Option<String>,
    /// Columns used to find existing rows.
    pub find_keys: Vec<String>,
    /// Column types; has-one members are always objects.
    pub column_types: IndexMap<String, MemberType>,
    /// Has-one members.
    pub has_one: IndexMap<String, HasOneTarget>,
    /// Polymorphic base class.
    pub polymorphic: Option<String>,
    /// Member checksummed by `crc32` columns.
    pub crc_column: Option<String>,
    has_one_flip: HashMap<String, Vec<String>>,
    has_many: IndexMap<String, HasManyEntry>,
    has_many_objects: HashMap<String, Vec<String>>,
    schema: Option<String>,
}

impl ClassBase {
    /// Derives class metadata.
    ///
    /// `deferred` holds has-many members registered for this class before it
    /// was built. `resolve` maps a class name through the registry's aliases.
    pub fn build(
        declaration: &ClassDeclaration,
        options: &RegistryOptions,
        deferred: &IndexMap<String, HasManySpec>,
        resolve: impl Fn(&str) -> String,
    ) -> Result<Self> {
        let class = declaration.class.clone();
        if class.trim().is_empty() {
            return Err(OrmError::Semantics(String::from(
                "Class declaration has no class name",
            )));
        }
        let code_name = declaration.code_name.clone().unwrap_or_else(|| {
            class
                .rsplit(['\\', ':'])
                .next()
                .unwrap_or(&class)
                .to_string()
        });
        let name = declaration.name.clone().unwrap_or_else(|| class.clone());
        let table = declaration
            .table
            .clone()
            .unwrap_or_else(|| format!("{}{code_name}", options.table_prefix));

        let (id_column, primary_keys) = derive_keys(declaration, options)?;

        let mut column_types = IndexMap::new();
        for (column, type_name) in &declaration.column_types {
            column_types.insert(column.clone(), MemberType::parse(column, type_name)?);
        }

        let auto_column = declaration.auto_column.clone().or_else(|| {
            let id = id_column.as_ref()?;
            match column_types.get(id) {
                None | Some(MemberType::Id) => Some(id.clone()),
                Some(_) => None,
            }
        });

        let find_keys = if declaration.find_keys.is_empty() {
            primary_keys.clone()
        } else {
            declaration.find_keys.clone()
        };

        let mut has_one = IndexMap::new();
        let mut has_one_flip: HashMap<String, Vec<String>> = HashMap::new();
        for (member, target) in &declaration.has_one {
            let target = match HasOneTarget::parse(target) {
                HasOneTarget::Fixed(target) => {
                    let target = resolve(&target);
                    has_one_flip
                        .entry(target.to_lowercase())
                        .or_default()
                        .push(member.clone());
                    HasOneTarget::Fixed(target)
                }
                dynamic @ HasOneTarget::Dynamic(_) => dynamic,
            };
            if let Some(declared) = column_types
                .get(member)
                .filter(|t| **t != MemberType::Object)
            {
                warn!(
                    class = %class,
                    member = %member,
                    declared = %declared,
                    "Has-one member type is not orm and will be overwritten"
                );
            }
            column_types.insert(member.clone(), MemberType::Object);
            has_one.insert(member.clone(), target);
        }

        let mut base = Self {
            class,
            name,
            code_name,
            table,
            id_column,
            primary_keys,
            auto_column,
            find_keys,
            column_types,
            has_one,
            polymorphic: declaration.polymorphic.clone(),
            crc_column: declaration.crc_column.clone(),
            has_one_flip,
            has_many: IndexMap::new(),
            has_many_objects: HashMap::new(),
            schema: declaration.schema.clone(),
        };
        for (member, spec) in &declaration.has_many {
            base.add_many(member, spec.clone(), &resolve)?;
        }
        for (member, spec) in deferred {
            debug!(class = %base.class, member = %member, "Adding deferred has-many link");
            base.add_many(member, spec.clone(), &resolve)?;
        }
        Ok(base)
    }

    fn add_many(
        &mut self,
        member: &str,
        mut spec: HasManySpec,
        resolve: &impl Fn(&str) -> String,
    ) -> Result<()> {
        if spec.class.trim().is_empty() {
            return Err(OrmError::Configuration {
                class: self.class.clone(),
                message: format!("has-many member '{member}' must name a class"),
            });
        }
        spec.class = resolve(&spec.class);
        if let Some(link_class) = spec.link_class.as_mut() {
            *link_class = resolve(link_class);
        }
        spec.table = spec
            .table
            .map(|table| table.replace("{table}", &self.table));
        let members = self
            .has_many_objects
            .entry(spec.class.to_lowercase())
            .or_default();
        if spec.default {
            members.insert(0, member.to_string());
        } else {
            members.push(member.to_string());
        }
        self.has_many.insert(
            member.to_string(),
            HasManyEntry {
                spec,
                resolved: OnceLock::new(),
            },
        );
        Ok(())
    }

    /// Returns true when `member` is a has-many member.
    #[must_use]
    pub fn is_has_many(&self, member: &str) -> bool {
        self.has_many.contains_key(member)
    }

    /// Has-many member names, in declaration order.
    pub fn has_many_members(&self) -> impl Iterator<Item = &str> {
        self.has_many.keys().map(String::as_str)
    }

    /// Declared has-many spec for `member`.
    #[must_use]
    pub fn has_many_spec(&self, member: &str) -> Option<&HasManySpec> {
        self.has_many.get(member).map(|entry| &entry.spec)
    }

    /// Resolves a has-many member, memoizing the result.
    ///
    /// Returns `None` when `member` is not a has-many member.
    pub fn has_many(
        &self,
        registry: &MetadataRegistry,
        member: &str,
    ) -> Result<Option<&ResolvedHasMany>> {
        let Some(entry) = self.has_many.get(member) else {
            return Ok(None);
        };
        if let Some(resolved) = entry.resolved.get() {
            return Ok(Some(resolved));
        }
        let resolved = self.resolve_has_many(registry, member, &entry.spec)?;
        debug!(class = %self.class, member = %member, target = %resolved.class, "Resolved has-many member");
        Ok(Some(entry.resolved.get_or_init(|| resolved)))
    }

    fn resolve_has_many(
        &self,
        registry: &MetadataRegistry,
        member: &str,
        spec: &HasManySpec,
    ) -> Result<ResolvedHasMany> {
        let target = registry.class(&spec.class)?;
        let table = match &spec.link_class {
            Some(link_class) => {
                if let Some(table) = &spec.table {
                    warn!(
                        class = %self.class,
                        member = %member,
                        table = %table,
                        "Has-many table is ignored when link_class is set"
                    );
                }
                let link = registry.class(link_class).map_err(|err| match err {
                    OrmError::ClassNotFound { class, .. } => OrmError::ClassNotFound {
                        class,
                        context: format!(
                            "link class of has-many member '{member}' in class '{}'",
                            self.class
                        ),
                    },
                    other => other,
                })?;
                Some(link.table.clone())
            }
            None => spec.table.clone(),
        };
        let far_key = spec.far_key.clone().unwrap_or_else(|| {
            if table.is_some() {
                target.class.clone()
            } else {
                target.id_column.clone().unwrap_or_default()
            }
        });
        Ok(ResolvedHasMany {
            member: member.to_string(),
            class: target.class.clone(),
            target_table: target.table.clone(),
            target_id: target.id_column.clone(),
            table,
            link_class: spec.link_class.clone(),
            foreign_key: spec
                .foreign_key
                .clone()
                .unwrap_or_else(|| self.class.clone()),
            far_key,
            order_by: spec.order_by.clone(),
            conditions: spec.conditions.clone(),
            on: spec.on.clone(),
        })
    }

    /// Finds the member linking this class to `class`.
    ///
    /// Has-one members win over has-many members; a default has-many member
    /// wins over the others.
    pub fn link_default_path_to(&self, class: &str) -> Result<String> {
        let key = class.to_lowercase();
        self.has_one_flip
            .get(&key)
            .or_else(|| self.has_many_objects.get(&key))
            .and_then(|members| members.first())
            .cloned()
            .ok_or_else(|| OrmError::ClassNotFound {
                class: class.to_string(),
                context: format!("no link from '{}'", self.class),
            })
    }

    /// Name/value pairs substituted into declared schema SQL.
    #[must_use]
    pub fn schema_map(&self) -> IndexMap<&'static str, String> {
        IndexMap::from([
            ("name", self.name.clone()),
            ("code_name", self.code_name.clone()),
            ("table", self.table.clone()),
            ("extra_keys", String::new()),
            (
                "auto_increment",
                String::from(if self.auto_column.is_some() {
                    "AUTO_INCREMENT"
                } else {
                    ""
                }),
            ),
            ("primary_keys", self.primary_keys.join(",")),
        ])
    }

    /// Builds the declared table for this class.
    ///
    /// Schema SQL is used when declared; otherwise the table is synthesized
    /// from the member types.
    pub fn declared_table(&self) -> Result<Table> {
        if let Some(sql) = &self.schema {
            let mut sql = sql.clone();
            for (key, value) in self.schema_map() {
                sql = sql.replace(&format!("{{{key}}}"), &value);
            }
            return Ok(parse_table(&sql)?);
        }
        let mut table = Table::new(self.table.clone());
        for (name, member_type) in &self.column_types {
            let mut column = Column::new(name.clone(), member_type.sql_type());
            if member_type.is_unsigned() {
                column = column.unsigned();
            }
            if self.auto_column.as_ref() == Some(name) {
                column = column.increment();
            }
            if self.primary_keys.contains(name) {
                column = column.primary_key();
            }
            table.add_column(column)?;
        }
        table.finalize_indexes();
        Ok(table)
    }

    /// Classes this class refers to, without duplicates.
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        let mut requires: Vec<String> = Vec::new();
        let fixed = self.has_one.values().filter_map(|target| match target {
            HasOneTarget::Fixed(class) => Some(class.clone()),
            HasOneTarget::Dynamic(_) => None,
        });
        let many = self.has_many.values().flat_map(|entry| {
            std::iter::once(entry.spec.class.clone()).chain(entry.spec.link_class.clone())
        });
        for class in fixed.chain(many) {
            if !requires.contains(&class) {
                requires.push(class);
            }
        }
        requires
    }

    /// Encodes member values for an INSERT or UPDATE.
    ///
    /// Only declared columns are encoded; omitted columns are left out.
    pub fn to_database(
        &self,
        coercions: &CoercionRegistry,
        dialect: &dyn SchemaDialect,
        values: &IndexMap<String, MemberValue>,
        insert: bool,
    ) -> Result<IndexMap<String, Assignment>> {
        let crc_source = self
            .crc_column
            .as_ref()
            .and_then(|member| values.get(member))
            .and_then(|value| value.to_sql_value())
            .and_then(|value| value.as_text());
        let context = EncodeContext {
            dialect,
            insert,
            class_name: &self.class,
            polymorphic: self.polymorphic.as_deref(),
            crc_source: crc_source.as_deref(),
        };
        let mut data = IndexMap::new();
        for (column, member_type) in &self.column_types {
            let value = values.get(column).unwrap_or(&MemberValue::Null);
            match coercions.encode(*member_type, value, &context)? {
                Assignment::Omit => {}
                assignment => {
                    data.insert(column.clone(), assignment);
                }
            }
        }
        Ok(data)
    }

    /// Decodes a database row into member values.
    ///
    /// Columns without a declared type are passed through as text.
    pub fn from_database(
        &self,
        coercions: &CoercionRegistry,
        row: &IndexMap<String, SqlValue>,
    ) -> Result<IndexMap<String, MemberValue>> {
        row.iter()
            .map(|(column, value)| {
                let member = match self.column_types.get(column) {
                    Some(member_type) => coercions.decode(*member_type, value)?,
                    None => value
                        .as_text()
                        .map_or(MemberValue::Null, MemberValue::Text),
                };
                Ok((column.clone(), member))
            })
            .collect()
    }
}

/// Derives the id column and primary keys.
fn derive_keys(
    declaration: &ClassDeclaration,
    options: &RegistryOptions,
) -> Result<(Option<String>, Vec<String>)> {
    let keys = &declaration.primary_keys;
    match (keys.len(), &declaration.id_column) {
        (1, IdColumn::Named(id)) if *id != keys[0] => Err(OrmError::Configuration {
            class: declaration.class.clone(),
            message: format!(
                "id column '{id}' conflicts with primary key '{}'",
                keys[0]
            ),
        }),
        (1, _) => Ok((Some(keys[0].clone()), keys.clone())),
        (0, IdColumn::Automatic) if options.id_column.is_empty() => Ok((None, Vec::new())),
        (0, IdColumn::Automatic) => Ok((
            Some(options.id_column.clone()),
            vec![options.id_column.clone()],
        )),
        (0, IdColumn::None) => Ok((None, Vec::new())),
        (0, IdColumn::Named(id)) => Ok((Some(id.clone()), vec![id.clone()])),
        (_, IdColumn::Named(id)) => Err(OrmError::Configuration {
            class: declaration.class.clone(),
            message: format!("id column '{id}' set with compound primary keys"),
        }),
        _ => Ok((None, keys.clone())),
    }
}
