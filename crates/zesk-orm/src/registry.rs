//! Class metadata registry.
//!
//! The registry owns every class declaration and lazily builds the derived
//! [`ClassBase`] for a class on first access. Built metadata is cached until
//! [`MetadataRegistry::reset`]; a class is built at most once per cache
//! lifetime even when several threads ask for it at the same time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::class::{ClassBase, RegistryOptions};
use crate::coerce::CoercionRegistry;
use crate::declaration::{ClassDeclaration, DeclarationFile, HasManySpec};
use crate::error::{OrmError, Result};
use crate::query::Select;

/// Alias given to the root table of queries built by the registry.
pub const ROOT_ALIAS: &str = "X";

/// Registry of class declarations and their derived metadata.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    options: RegistryOptions,
    coercions: CoercionRegistry,
    declarations: RwLock<HashMap<String, ClassDeclaration>>,
    aliases: RwLock<HashMap<String, String>>,
    cache: RwLock<HashMap<String, Arc<ClassBase>>>,
    deferred: Mutex<HashMap<String, IndexMap<String, HasManySpec>>>,
}

impl MetadataRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(options: RegistryOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Creates a registry holding every class in a declaration file.
    #[must_use]
    pub fn from_file(file: DeclarationFile) -> Self {
        let registry = Self::new(RegistryOptions {
            table_prefix: file.table_prefix,
            ..RegistryOptions::default()
        });
        registry.declare_all(file.classes);
        registry
    }

    /// Parses a JSON declaration file.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: DeclarationFile = serde_json::from_str(json)?;
        Ok(Self::from_file(file))
    }

    /// Registry options.
    #[must_use]
    pub const fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Member coercions.
    #[must_use]
    pub const fn coercions(&self) -> &CoercionRegistry {
        &self.coercions
    }

    /// Declares a class, replacing any earlier declaration.
    pub fn declare(&self, declaration: ClassDeclaration) {
        let key = declaration.class.to_lowercase();
        self.declarations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), declaration);
        self.evict(&key);
    }

    /// Declares several classes.
    pub fn declare_all(&self, declarations: impl IntoIterator<Item = ClassDeclaration>) {
        for declaration in declarations {
            self.declare(declaration);
        }
    }

    /// Declared class names, sorted.
    #[must_use]
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .declarations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|declaration| declaration.class.clone())
            .collect();
        names.sort();
        names
    }

    /// Makes `alias` another name for `class`.
    pub fn register_alias(&self, alias: &str, class: &str) {
        self.aliases
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(alias.to_lowercase(), class.to_string());
    }

    /// Maps a class name through the registered aliases.
    #[must_use]
    pub fn resolve_name(&self, class: &str) -> String {
        self.aliases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&class.to_lowercase())
            .cloned()
            .unwrap_or_else(|| class.to_string())
    }

    /// Returns the metadata for `class`, building it on first access.
    pub fn class(&self, class: &str) -> Result<Arc<ClassBase>> {
        let key = self.resolve_name(class).to_lowercase();
        if let Some(base) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(base));
        }
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(base) = cache.get(&key) {
            return Ok(Arc::clone(base));
        }
        let declaration = self
            .declarations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .ok_or_else(|| OrmError::ClassNotFound {
                class: class.to_string(),
                context: String::from("not declared"),
            })?;
        let deferred = self
            .deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .unwrap_or_default();
        let base = Arc::new(ClassBase::build(
            &declaration,
            &self.options,
            &deferred,
            |name| self.resolve_name(name),
        )?);
        debug!(class = %base.class, table = %base.table, "Built class metadata");
        cache.insert(key, Arc::clone(&base));
        Ok(base)
    }

    /// Adds a has-many member to `class`, which need not be built yet.
    ///
    /// Metadata already built for the class is rebuilt on next access.
    pub fn link_many(&self, class: &str, member: &str, spec: HasManySpec) -> Result<()> {
        if spec.class.trim().is_empty() {
            return Err(OrmError::Configuration {
                class: class.to_string(),
                message: format!("has-many member '{member}' must name a class"),
            });
        }
        let key = self.resolve_name(class).to_lowercase();
        {
            let mut deferred = self.deferred.lock().unwrap_or_else(PoisonError::into_inner);
            let links = deferred.entry(key.clone()).or_default();
            if links.contains_key(member) {
                return Err(OrmError::DuplicateLink {
                    class: class.to_string(),
                    member: member.to_string(),
                });
            }
            links.insert(member.to_string(), spec);
        }
        self.evict(&key);
        debug!(class = %class, member = %member, "Registered deferred has-many link");
        Ok(())
    }

    fn evict(&self, key: &str) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Drops all built metadata and deferred links.
    pub fn reset(&self) {
        let built = {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            let built = cache.len();
            cache.clear();
            built
        };
        self.deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        info!(classes = built, "Reset class metadata");
    }

    /// Starts a query on `class` aliased as [`ROOT_ALIAS`].
    pub fn select(&self, class: &str) -> Result<Select> {
        let base = self.class(class)?;
        Ok(Select::for_class(&base, ROOT_ALIAS))
    }
}
