//! # zesk-orm
//!
//! Class metadata and relationship queries for the zesk ORM.
//!
//! This crate provides:
//! - [`ClassDeclaration`]s describing mapped classes, deserializable from JSON
//! - A [`MetadataRegistry`] deriving and caching [`ClassBase`] metadata
//! - A [`CoercionRegistry`] converting member values to and from the database
//! - A [`LinkWalker`] turning member paths into joins on a [`Select`]
//!
//! ## Example
//!
//! ```rust
//! use zesk_orm::{ClassDeclaration, IdColumn, LinkOptions, MetadataRegistry};
//! use zesk_schema::{MySqlDialect, SqlValue};
//!
//! let registry = MetadataRegistry::default();
//! registry.declare(
//!     ClassDeclaration::new("Site")
//!         .id_column(IdColumn::Named(String::from("ID")))
//!         .has_one("Account", "Account"),
//! );
//! registry.declare(ClassDeclaration::new("Account").id_column(IdColumn::Named(String::from("ID"))));
//!
//! let mut query = registry.select("Site").unwrap();
//! query.link(&registry, "Account", LinkOptions::default()).unwrap();
//! query.add_where("Account.Cancelled", SqlValue::Null);
//! assert_eq!(
//!     query.to_sql(&MySqlDialect::new()),
//!     "SELECT `X`.* FROM `Site` AS `X`\n\
//!      INNER JOIN `Account` AS `Account` ON `Account`.`ID`=`X`.`Account`\n\
//!      WHERE `Account`.`Cancelled` IS NULL"
//! );
//! ```

pub mod class;
pub mod coerce;
pub mod declaration;
pub mod error;
pub mod instance;
pub mod link;
pub mod member;
pub mod query;
pub mod registry;

pub use class::{ClassBase, HasOneTarget, RegistryOptions, ResolvedHasMany};
pub use coerce::{Assignment, Coercion, CoercionRegistry, EncodeContext, MemberValue};
pub use declaration::{ClassDeclaration, DeclarationFile, HasManySpec, IdColumn};
pub use error::{OrmError, Result};
pub use instance::{Instance, Record};
pub use link::{member_query, LinkOptions, LinkWalker};
pub use member::MemberType;
pub use query::{Condition, Join, JoinType, Operand, Select};
pub use registry::{MetadataRegistry, ROOT_ALIAS};
