//! Relationship link walker.
//!
//! Walks a dotted member path such as `Site.Account` from a query's root
//! class, adding one join per has-one segment and one or two joins per
//! has-many segment. Segments already joined under their alias are reused,
//! so repeating a link is a no-op.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;
use zesk_schema::SqlValue;

use crate::class::{ClassBase, HasOneTarget, ResolvedHasMany};
use crate::error::{OrmError, Result};
use crate::instance::Instance;
use crate::query::{Condition, Join, JoinType, Select};
use crate::registry::MetadataRegistry;

/// Options for one link walk.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkOptions {
    /// Dotted member path. Defaults to the root class's link to the target.
    pub path: Option<String>,
    /// Alias for the last segment's join. Defaults to the segment name.
    pub alias: Option<String>,
    /// Explicit join type, overriding `require`.
    pub join_type: Option<JoinType>,
    /// INNER when true, LEFT OUTER when false.
    pub require: bool,
    /// Extra equalities added to the last has-many join, unprefixed.
    pub on: IndexMap<String, SqlValue>,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            path: None,
            alias: None,
            join_type: None,
            require: true,
            on: IndexMap::new(),
        }
    }
}

impl LinkOptions {
    /// Options with an explicit path.
    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Sets the last segment's alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Uses LEFT OUTER joins.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.require = false;
        self
    }

    /// Sets the join type.
    #[must_use]
    pub const fn join_type(mut self, join_type: JoinType) -> Self {
        self.join_type = Some(join_type);
        self
    }

    /// Adds a join ON equality.
    #[must_use]
    pub fn on(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.on.insert(column.into(), value.into());
        self
    }

    fn effective_join_type(&self) -> JoinType {
        self.join_type
            .unwrap_or_else(|| JoinType::from_require(self.require))
    }
}

/// Position of a walk between segments.
struct LinkState {
    class: Arc<ClassBase>,
    previous_alias: String,
    walked: Vec<String>,
}

/// Walks member paths over the registry's class metadata.
pub struct LinkWalker<'a> {
    registry: &'a MetadataRegistry,
    instance: Option<&'a dyn Instance>,
}

impl<'a> LinkWalker<'a> {
    /// Creates a walker with no live object.
    #[must_use]
    pub const fn new(registry: &'a MetadataRegistry) -> Self {
        Self {
            registry,
            instance: None,
        }
    }

    /// Uses `instance` for the root class: its id filters has-many members
    /// and its members resolve dynamic has-one targets.
    #[must_use]
    pub const fn with_instance(mut self, instance: &'a dyn Instance) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Adds the joins for `options.path` to `query`.
    pub fn walk(&self, query: &mut Select, options: &LinkOptions) -> Result<()> {
        let path = options
            .path
            .as_deref()
            .filter(|path| !path.is_empty())
            .ok_or_else(|| OrmError::Semantics(String::from("Link walk needs a path")))?;
        let root = query.class().map(ToString::to_string).ok_or_else(|| {
            OrmError::Semantics(format!("Cannot walk '{path}' from a query without a class"))
        })?;
        let mut state = LinkState {
            class: self.registry.class(&root)?,
            previous_alias: query.alias().to_string(),
            walked: Vec::new(),
        };
        let join_type = options.effective_join_type();
        let segments: Vec<&str> = path.split('.').collect();
        for (position, segment) in segments.iter().copied().enumerate() {
            let last = position + 1 == segments.len();
            if let Some(joined) = query.find_alias(segment).map(ToString::to_string) {
                state.class = self.registry.class(&joined)?;
                state.advance(segment, segment);
                continue;
            }
            let alias = match &options.alias {
                Some(alias) if last => alias.as_str(),
                _ => segment,
            };
            let instance = if state.walked.is_empty() {
                self.instance
            } else {
                None
            };
            let next = if let Some(target) =
                self.try_resolve_has_one(&state.class, segment, instance)?
            {
                if !already_joined(query, alias, &target)? {
                    let join = Join::class(join_type, &target, alias).on(Condition::columns(
                        format!("{alias}.{}", id_column(&target)?),
                        format!("{}.{segment}", state.previous_alias),
                    ));
                    query.join(join)?;
                }
                target
            } else if let Some(many) = self.try_resolve_has_many(&state.class, segment)? {
                let target = self.registry.class(&many.class)?;
                if !already_joined(query, alias, &target)? {
                    let on = if last { Some(&options.on) } else { None };
                    self.join_has_many(
                        query,
                        &state,
                        &many,
                        &target,
                        alias,
                        join_type,
                        instance.and_then(|instance| instance.id()),
                        on,
                    )?;
                }
                target
            } else {
                return Err(OrmError::UnresolvedSegment {
                    segment: segment.to_string(),
                    class: state.class.class.clone(),
                });
            };
            state.class = next;
            state.advance(segment, alias);
        }
        debug!(path = %path, joins = query.joins().len(), "Walked link path");
        Ok(())
    }

    /// Resolves `segment` as a has-one member of `class`.
    pub fn try_resolve_has_one(
        &self,
        class: &ClassBase,
        segment: &str,
        instance: Option<&dyn Instance>,
    ) -> Result<Option<Arc<ClassBase>>> {
        let Some(target) = class.has_one.get(segment) else {
            return Ok(None);
        };
        let target = match target {
            HasOneTarget::Fixed(target) => target.clone(),
            HasOneTarget::Dynamic(member) => instance
                .and_then(|instance| instance.resolve_dynamic_target(member))
                .ok_or_else(|| {
                    OrmError::Semantics(format!(
                        "Has-one '{segment}' of class '{}' reads its class from member '{member}', which is not set",
                        class.class
                    ))
                })?,
        };
        self.registry.class(&target).map(Some)
    }

    /// Resolves `segment` as a has-many member of `class`.
    pub fn try_resolve_has_many(
        &self,
        class: &ClassBase,
        segment: &str,
    ) -> Result<Option<ResolvedHasMany>> {
        Ok(class.has_many(self.registry, segment)?.cloned())
    }

    #[allow(clippy::too_many_arguments)]
    fn join_has_many(
        &self,
        query: &mut Select,
        state: &LinkState,
        many: &ResolvedHasMany,
        target: &ClassBase,
        alias: &str,
        join_type: JoinType,
        id: Option<SqlValue>,
        extra_on: Option<&IndexMap<String, SqlValue>>,
    ) -> Result<()> {
        let mid_link = format!("{alias}_Link");
        let via = has_many_query(
            &state.class,
            id,
            query,
            many,
            &mid_link,
            alias,
            &state.previous_alias,
            join_type,
            false,
        )?;
        let mut join = Join::class(join_type, target, alias);
        join = match via {
            Some(link_alias) => join.on(Condition::columns(
                format!("{link_alias}.{}", many.far_key),
                format!("{alias}.{}", id_column(target)?),
            )),
            None => join.on(Condition::columns(
                format!("{alias}.{}", many.foreign_key),
                format!("{}.{}", state.previous_alias, id_column(&state.class)?),
            )),
        };
        for (column, value) in many.on.iter().chain(extra_on.into_iter().flatten()) {
            join = join.on(Condition::value(format!("{alias}.{column}"), value.clone()));
        }
        query.join(join)?;
        Ok(())
    }
}

impl LinkState {
    fn advance(&mut self, segment: &str, alias: &str) {
        self.walked.push(segment.to_string());
        self.previous_alias = alias.to_string();
    }
}

/// Returns true when `alias` already joins `target`, failing when it joins
/// anything else.
fn already_joined(query: &Select, alias: &str, target: &ClassBase) -> Result<bool> {
    match query.find_alias(alias) {
        None => Ok(false),
        Some(existing) if existing.eq_ignore_ascii_case(&target.class) => Ok(true),
        Some(existing) => Err(OrmError::AliasCollision {
            alias: alias.to_string(),
            existing: existing.to_string(),
            requested: target.class.clone(),
        }),
    }
}

fn id_column(class: &ClassBase) -> Result<&str> {
    class.id_column.as_deref().ok_or_else(|| {
        OrmError::Semantics(format!("Class '{}' has no id column to join on", class.class))
    })
}

/// Adds the link-table join and owner predicate for a has-many member.
///
/// With a link table, the table is joined as `<alias>_join` and that alias is
/// returned. `reverse` joins the link table to the target's id instead of the
/// owner's. The owner predicate filters the link table when there is one and
/// `target_alias` otherwise; it is skipped when `id` is `None`.
#[allow(clippy::too_many_arguments)]
fn has_many_query(
    owner: &ClassBase,
    id: Option<SqlValue>,
    query: &mut Select,
    many: &ResolvedHasMany,
    alias: &str,
    target_alias: &str,
    link_alias: &str,
    join_type: JoinType,
    reverse: bool,
) -> Result<Option<String>> {
    let mut this_alias = target_alias.to_string();
    let mut via = None;
    if let Some(table) = &many.table {
        let join_alias = format!("{alias}_join");
        let link_alias = if link_alias.is_empty() {
            query.alias().to_string()
        } else {
            link_alias.to_string()
        };
        let on = if reverse {
            let target_id = many.target_id.as_deref().ok_or_else(|| {
                OrmError::Semantics(format!("Class '{}' has no id column to join on", many.class))
            })?;
            Condition::columns(
                format!("{join_alias}.{}", many.far_key),
                format!("{link_alias}.{target_id}"),
            )
        } else {
            Condition::columns(
                format!("{join_alias}.{}", many.foreign_key),
                format!("{link_alias}.{}", id_column(owner)?),
            )
        };
        let mut join = Join::table(join_type, table.clone(), join_alias.clone()).on(on);
        join.class = many.link_class.clone();
        query.join(join)?;
        this_alias.clone_from(&join_alias);
        via = Some(join_alias);
    }
    match id {
        Some(id) => {
            query.add_where(format!("{this_alias}.{}", many.foreign_key), id);
        }
        None => debug!(class = %owner.class, member = %many.member, "Object is new, skipping owner predicate"),
    }
    if !many.order_by.is_empty() {
        query.set_order_by(
            many.order_by
                .iter()
                .map(|term| format!("{this_alias}.{term}"))
                .collect(),
        );
    }
    if !many.conditions.is_empty() {
        query.append_where(&many.conditions);
    }
    Ok(via)
}

/// Builds the query selecting the objects of `instance`'s has-many `member`.
///
/// The query's root alias is the member name.
pub fn member_query(
    registry: &MetadataRegistry,
    instance: &dyn Instance,
    member: &str,
) -> Result<Select> {
    let owner = registry.class(instance.class_name())?;
    let many = owner.has_many(registry, member)?.ok_or_else(|| {
        OrmError::Semantics(format!(
            "Member '{member}' of class '{}' is not a has-many member",
            owner.class
        ))
    })?;
    let target = registry.class(&many.class)?;
    let mut query = Select::for_class(&target, member);
    has_many_query(
        &owner,
        instance.id(),
        &mut query,
        many,
        member,
        member,
        "",
        JoinType::Inner,
        true,
    )?;
    Ok(query)
}
