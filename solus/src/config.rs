//! Per-type configuration for singleton behavior.
//!
//! This module provides [`Config`], the behavior flags a managed type can
//! declare, and [`Configs`], the table those declarations live in. The table
//! replaces the reflective per-type attribute lookup of engine-style singleton
//! wrappers: the composition root declares every type's flags once at startup,
//! and the registry resolves them through generics at the call site.
//!
//! # Thread Safety
//!
//! `Configs` is safe to share across threads. Reads are lock-free via `DashMap`,
//! and registration is idempotent - the first declaration for a type wins and
//! later declarations return the stored value. Worlds and registries themselves
//! stay on one logical thread, but all of them need to agree on type
//! configuration, so the table is the one shareable piece of the crate.
//!
//! # Example
//!
//! ```rust,ignore
//! let configs = Configs::new();
//! configs.register::<AudioMixer>(Config {
//!     auto_create: true,
//!     persistent: true,
//!     force_single: true,
//! });
//!
//! assert!(configs.get::<AudioMixer>().unwrap().auto_create);
//! assert!(configs.get::<InputMap>().is_none());
//! ```

use std::any::TypeId;

use dashmap::DashMap;

use crate::singleton::Singleton;

/// Behavior flags for a singleton-managed type.
///
/// The default configuration is all-false: no auto-creation, no persistence,
/// no duplicate elimination. A type with no declared configuration behaves as
/// if it had the default.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Construct a new instance in the scene when the accessor finds none.
    pub auto_create: bool,

    /// Exempt the registered instance from scene-transition teardown.
    pub persistent: bool,

    /// Destroy every live duplicate, keeping only the registered instance.
    pub force_single: bool,
}

/// The table of per-type singleton configurations.
///
/// Declarations are keyed by [`TypeId`] and resolved generically. Registration
/// is first-writer-wins: re-registering a type is a no-op that returns the
/// stored configuration, mirroring idempotent type registration elsewhere in
/// the stack.
pub struct Configs {
    /// Map from TypeId to declared configuration. Lock-free reads.
    table: DashMap<TypeId, Config>,
}

impl Configs {
    /// Create a new, empty configuration table.
    #[inline]
    pub fn new() -> Self {
        Self {
            table: DashMap::new(),
        }
    }

    /// Declare the configuration for type `S`.
    ///
    /// The first declaration for a type wins. If `S` is already declared, the
    /// stored configuration is returned unchanged.
    pub fn register<S: Singleton>(&self, config: Config) -> Config {
        *self.table.entry(TypeId::of::<S>()).or_insert(config).value()
    }

    /// Get the declared configuration for type `S`, absent if never declared.
    #[inline]
    pub fn get<S: Singleton>(&self) -> Option<Config> {
        self.table.get(&TypeId::of::<S>()).map(|entry| *entry.value())
    }

    /// Returns `true` if type `S` has a declared configuration.
    #[inline]
    pub fn contains<S: Singleton>(&self) -> bool {
        self.table.contains_key(&TypeId::of::<S>())
    }

    /// Returns the number of declared types.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if no types are declared.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for Configs {
    fn default() -> Self {
        Self::new()
    }
}
