//! The boundary between the registry and the host scene graph.
//!
//! The registry never owns instances. The scene graph does: it decides how
//! objects are constructed, where they live, and when scheduled destruction
//! actually happens. [`Scene`] is the narrow surface the registry calls into
//! for those operations.
//!
//! Instances are shared handles (`Arc<S>`); two handles name the same instance
//! exactly when [`Arc::ptr_eq`] holds. A host integration implements this trait
//! over its own scene graph, while [`World`](crate::world::World) provides a
//! ready in-memory implementation.

use std::sync::Arc;

use crate::singleton::Singleton;

/// Operations the host scene graph provides to the registry.
pub trait Scene {
    /// Locate any one live instance of `S` in the current scene.
    fn find_instance<S: Singleton>(&self) -> Option<Arc<S>>;

    /// Locate every live instance of `S` in the current scene.
    fn find_all_instances<S: Singleton>(&self) -> Vec<Arc<S>>;

    /// Construct a new scene object hosting a new `S`.
    fn create_instance<S: Singleton>(&mut self) -> Arc<S>;

    /// Exempt an instance from normal scene-transition teardown.
    fn mark_persistent<S: Singleton>(&mut self, instance: &Arc<S>);

    /// Schedule removal of an instance from the scene.
    fn destroy<S: Singleton>(&mut self, instance: &Arc<S>);
}
