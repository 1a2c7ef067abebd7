//! A singleton registry for component types living in a scene graph.
//!
//! `solus` guarantees that at most one live instance of a given component type
//! exists within a running scene, with optional lazy auto-creation, optional
//! persistence across scene transitions, and optional destruction of duplicate
//! instances that appear at runtime.
//!
//! # Architecture
//!
//! The crate is a small set of cooperating pieces:
//! - [`Singleton`]: the trait a managed component type implements
//! - [`Config`] / [`Configs`]: per-type behavior flags, declared once at startup
//! - [`Scene`]: the boundary trait the host scene graph implements
//! - [`Registry`]: the per-type slots and the resolution/admission logic
//! - [`World`]: a reference in-memory scene host, used by tests and demos
//!
//! The registry never inherits from or assumes a host engine type. The host
//! integration layer owns a [`Registry`], implements [`Scene`] over its scene
//! graph, and forwards its lifecycle events to [`Registry::on_created`] and
//! [`Registry::on_activated`].
//!
//! # Example
//!
//! ```rust,ignore
//! use solus::{Config, Registry, World};
//! use solus_macros::Singleton;
//!
//! #[derive(Singleton, Default)]
//! struct AudioMixer { volume: f32 }
//!
//! let mut world = World::new();
//! let mut registry = Registry::new();
//! registry.register_config::<AudioMixer>(Config {
//!     auto_create: true,
//!     persistent: true,
//!     force_single: true,
//! });
//!
//! // Lazily created on first access, same handle on every later access.
//! let mixer = registry.instance::<AudioMixer>(&mut world).unwrap();
//! ```

// Allows the derive macros to use ::solus paths both inside and outside the crate.
extern crate self as solus;

pub mod config;
pub mod registry;
pub mod scene;
pub mod singleton;
pub mod world;

pub use config::{Config, Configs};
pub use registry::Registry;
pub use scene::Scene;
pub use singleton::Singleton;
pub use world::World;
