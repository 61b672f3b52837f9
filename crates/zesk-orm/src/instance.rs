//! Live object access for the link walker.

use indexmap::IndexMap;
use zesk_schema::SqlValue;

use crate::coerce::MemberValue;

/// A live object of a mapped class.
pub trait Instance {
    /// Class of the object.
    fn class_name(&self) -> &str;

    /// Id of the object, `None` while it is new.
    fn id(&self) -> Option<SqlValue>;

    /// Current value of a member.
    fn member(&self, name: &str) -> Option<MemberValue>;

    /// Class named by a dynamic has-one member.
    fn resolve_dynamic_target(&self, member: &str) -> Option<String> {
        self.member(member)
            .and_then(|value| value.to_sql_value())
            .and_then(|value| value.as_text())
            .filter(|class| !class.is_empty())
    }
}

/// A plain in-memory object.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    class: String,
    id: Option<SqlValue>,
    members: IndexMap<String, MemberValue>,
}

impl Record {
    /// Creates a new object with no id.
    #[must_use]
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            id: None,
            members: IndexMap::new(),
        }
    }

    /// Sets the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<SqlValue>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets a member value.
    #[must_use]
    pub fn with_member(mut self, name: impl Into<String>, value: impl Into<MemberValue>) -> Self {
        self.members.insert(name.into(), value.into());
        self
    }

    /// All member values.
    #[must_use]
    pub const fn members(&self) -> &IndexMap<String, MemberValue> {
        &self.members
    }
}

impl Instance for Record {
    fn class_name(&self) -> &str {
        &self.class
    }

    fn id(&self) -> Option<SqlValue> {
        self.id.clone()
    }

    fn member(&self, name: &str) -> Option<MemberValue> {
        self.members.get(name).cloned()
    }
}
