//! A reference in-memory scene host.
//!
//! This module provides [`World`], a minimal scene graph implementing the
//! [`Scene`] boundary: live instances grouped by type, persistence marks, and
//! a [`transition()`](World::transition) that tears the scene down the way a
//! host engine does between scenes. It is the host the tests and the demo run
//! against, and a usable default for applications without an engine.
//!
//! # Identity
//!
//! Instances are `Arc` handles; the world tracks persistence by allocation
//! address, so a handle and its type-erased clone name the same instance.
//!
//! # Destruction
//!
//! [`destroy()`](World::destroy) removes the instance immediately. Scheduling
//! (end-of-frame batching, deferred queues) is a host engine concern; a real
//! integration decides when its scheduled removals actually land.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut world = World::new();
//! let mixer = world.spawn(AudioMixer::default());
//! world.mark_persistent(&mixer);
//!
//! world.transition();
//!
//! // Persistent instances survive the scene change.
//! assert_eq!(world.instance_count::<AudioMixer>(), 1);
//! ```

use std::{
    any::{self, Any, TypeId},
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::{debug, info, warn};

use crate::{scene::Scene, singleton::Singleton};

/// Allocation address of a handle, used as instance identity.
fn addr<T: ?Sized>(handle: &Arc<T>) -> usize {
    Arc::as_ptr(handle) as *const () as usize
}

/// A minimal in-memory scene graph.
///
/// Not thread-safe; like the registry it lives on one logical thread.
pub struct World {
    /// Live instances grouped by their concrete type.
    objects: HashMap<TypeId, Vec<Arc<dyn Any + Send + Sync>>>,

    /// Addresses of instances exempt from scene-transition teardown.
    persistent: HashSet<usize>,
}

impl World {
    /// Create a new, empty world.
    #[inline]
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            persistent: HashSet::new(),
        }
    }

    /// Place an existing value into the scene and return its handle.
    pub fn spawn<S: Singleton>(&mut self, value: S) -> Arc<S> {
        let handle = Arc::new(value);
        let erased = Arc::clone(&handle) as Arc<dyn Any + Send + Sync>;
        self.objects.entry(TypeId::of::<S>()).or_default().push(erased);
        debug!("spawned `{}` instance", any::type_name::<S>());
        handle
    }

    /// Tear down the current scene, keeping only persistent instances.
    ///
    /// Persistence marks themselves survive, so a persistent instance keeps
    /// living through any number of transitions.
    pub fn transition(&mut self) {
        let persistent = &self.persistent;
        for list in self.objects.values_mut() {
            list.retain(|obj| persistent.contains(&addr(obj)));
        }
        self.objects.retain(|_, list| !list.is_empty());
        info!(
            "scene transition: {} persistent instance(s) survive",
            self.len()
        );
    }

    /// Returns the number of live instances of `S`.
    #[inline]
    pub fn instance_count<S: Singleton>(&self) -> usize {
        self.objects
            .get(&TypeId::of::<S>())
            .map_or(0, |list| list.len())
    }

    /// Returns `true` if the instance carries the persistence mark.
    #[inline]
    pub fn is_persistent<S: Singleton>(&self, instance: &Arc<S>) -> bool {
        self.persistent.contains(&addr(instance))
    }

    /// Returns the total number of live instances across all types.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.values().map(Vec::len).sum()
    }

    /// Returns `true` if no instance is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.values().all(Vec::is_empty)
    }
}

impl Scene for World {
    fn find_instance<S: Singleton>(&self) -> Option<Arc<S>> {
        self.objects
            .get(&TypeId::of::<S>())?
            .iter()
            .find_map(|obj| Arc::clone(obj).downcast::<S>().ok())
    }

    fn find_all_instances<S: Singleton>(&self) -> Vec<Arc<S>> {
        self.objects
            .get(&TypeId::of::<S>())
            .map(|list| {
                list.iter()
                    .filter_map(|obj| Arc::clone(obj).downcast::<S>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn create_instance<S: Singleton>(&mut self) -> Arc<S> {
        self.spawn(S::default())
    }

    fn mark_persistent<S: Singleton>(&mut self, instance: &Arc<S>) {
        self.persistent.insert(addr(instance));
    }

    fn destroy<S: Singleton>(&mut self, instance: &Arc<S>) {
        let target = addr(instance);
        let removed = match self.objects.get_mut(&TypeId::of::<S>()) {
            Some(list) => {
                let before = list.len();
                list.retain(|obj| addr(obj) != target);
                before != list.len()
            }
            None => false,
        };
        if removed {
            self.persistent.remove(&target);
        } else {
            warn!(
                "destroy requested for unknown `{}` instance",
                any::type_name::<S>()
            );
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
