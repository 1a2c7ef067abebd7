//! Per-type singleton slots and the resolution/admission logic.
//!
//! This module provides [`Registry`], the service that owns one slot per
//! managed type and keeps each slot pointing at "the" live instance of that
//! type. The registry is an explicit value owned by the application's
//! composition root and injected into call sites - there is no ambient static
//! state, and the registry does not inherit from any host engine type.
//!
//! # Overview
//!
//! A slot starts empty and is populated in one of two ways:
//! - **Lazily**, when [`instance()`](Registry::instance) resolves it by
//!   creating or finding a live instance in the scene
//! - **By self-registration**, when the host forwards a lifecycle event for an
//!   instance via [`on_created()`](Registry::on_created) or
//!   [`on_activated()`](Registry::on_activated) and the slot is still empty
//!
//! Admission of an instance then applies the type's declared
//! [`Config`](crate::config::Config): with `force_single`, every live
//! duplicate is destroyed (the registered instance always wins); with
//! `persistent`, the registered instance is marked exempt from scene-transition
//! teardown, at most once per registered instance.
//!
//! # Storage Model
//!
//! Slots are stored type-erased (`Box<dyn Any + Send + Sync>`) keyed by
//! [`TypeId`], with fully type-safe generic accessors. The slot itself is a
//! single optional reference, so "at most one registered instance per type"
//! holds structurally rather than by bookkeeping.
//!
//! # Empty Results
//!
//! The one non-nominal outcome is "no instance available": auto-creation is
//! disabled and nothing of the type is live in the scene. That is a valid
//! empty state surfaced as `None`, never a panic or an error.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut world = World::new();
//! let mut registry = Registry::new();
//! registry.register_config::<GameClock>(Config {
//!     auto_create: true,
//!     ..Config::default()
//! });
//!
//! let clock = registry.instance::<GameClock>(&mut world).unwrap();
//! // Same handle on every later access.
//! assert!(Arc::ptr_eq(&clock, &registry.instance::<GameClock>(&mut world).unwrap()));
//! ```

use std::{
    any::{self, Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use log::{debug, warn};

use crate::{
    config::{Config, Configs},
    scene::Scene,
    singleton::Singleton,
};

/// The state carried alongside a registered instance.
struct Slot<S: Singleton> {
    /// The registered live instance.
    handle: Arc<S>,

    /// Destroy live duplicates whenever this type is admitted.
    force_single: bool,

    /// The registered instance should survive scene transitions.
    persistent: bool,

    /// Whether the persistence mark has already been requested for `handle`.
    persisted: bool,
}

/// The singleton registry: one slot per managed type, plus the configuration
/// table the slots resolve against.
///
/// All mutation happens on one logical thread, driven by host lifecycle events
/// or direct accessor calls, so the registry itself needs no locking. Only the
/// [`Configs`] table it owns is shareable.
pub struct Registry {
    /// Type-erased slot storage, keyed by the managed type's TypeId.
    slots: HashMap<TypeId, Box<dyn Any + Send + Sync>>,

    /// Declared per-type behavior flags.
    configs: Configs,
}

impl Registry {
    /// Create a registry with an empty configuration table.
    #[inline]
    pub fn new() -> Self {
        Self::with_configs(Configs::new())
    }

    /// Create a registry over an already-populated configuration table.
    #[inline]
    pub fn with_configs(configs: Configs) -> Self {
        Self {
            slots: HashMap::new(),
            configs,
        }
    }

    /// The registry's configuration table.
    #[inline]
    pub fn configs(&self) -> &Configs {
        &self.configs
    }

    /// Declare the configuration for type `S`. First declaration wins.
    #[inline]
    pub fn register_config<S: Singleton>(&self, config: Config) -> Config {
        self.configs.register::<S>(config)
    }

    /// Resolve the singleton instance of `S`, lazily populating the slot.
    ///
    /// If the slot is already populated, the registered handle is returned.
    /// Otherwise resolution follows the type's declared configuration:
    ///
    /// - `auto_create` set: a new instance is constructed in the scene,
    ///   registered, and admitted (duplicate elimination and persistence
    ///   marking run inline, since construction activates the instance
    ///   immediately)
    /// - otherwise: any one live instance found in the scene is registered;
    ///   if none exists the slot stays empty and `None` is returned
    ///
    /// `None` is the valid "no instance available" state, not a failure.
    pub fn instance<S: Singleton>(&mut self, scene: &mut impl Scene) -> Option<Arc<S>> {
        if let Some(slot) = self.slot::<S>() {
            return Some(Arc::clone(&slot.handle));
        }

        match self.configs.get::<S>() {
            Some(config) if config.auto_create => {
                let handle = scene.create_instance::<S>();
                debug!("auto-created singleton `{}`", any::type_name::<S>());
                self.install::<S>(Arc::clone(&handle), config);
                // Construction activates the instance immediately, so the
                // admission routine runs inline rather than waiting on a
                // separate host event.
                self.admit(scene, &handle);
                Some(handle)
            }
            config => {
                let found = scene.find_instance::<S>()?;
                self.install::<S>(Arc::clone(&found), config.unwrap_or_default());
                Some(found)
            }
        }
    }

    /// Host lifecycle event: an instance of `S` was constructed.
    ///
    /// Runs the same admission routine as [`on_activated()`](Self::on_activated);
    /// firing both events for one instance is harmless.
    #[inline]
    pub fn on_created<S: Singleton>(&mut self, scene: &mut impl Scene, instance: &Arc<S>) {
        self.admit(scene, instance);
    }

    /// Host lifecycle event: an instance of `S` became part of the live scene.
    ///
    /// If the slot is empty the instance self-registers. The registered slot's
    /// flags are then applied: duplicate elimination under `force_single`,
    /// a one-time persistence mark under `persistent`.
    #[inline]
    pub fn on_activated<S: Singleton>(&mut self, scene: &mut impl Scene, instance: &Arc<S>) {
        self.admit(scene, instance);
    }

    /// Peek at the registered instance of `S` without resolving.
    #[inline]
    pub fn registered<S: Singleton>(&self) -> Option<Arc<S>> {
        self.slot::<S>().map(|slot| Arc::clone(&slot.handle))
    }

    /// Returns `true` if a slot holds a registered instance of `S`.
    #[inline]
    pub fn is_registered<S: Singleton>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<S>())
    }

    /// Clear the slot for `S`, returning the handle it held.
    ///
    /// The host calls this when the registered instance was destroyed outside
    /// the registry's control; the next access resolves from scratch.
    pub fn clear_slot<S: Singleton>(&mut self) -> Option<Arc<S>> {
        self.slots
            .remove(&TypeId::of::<S>())
            .and_then(|stored| (stored as Box<dyn Any>).downcast::<Slot<S>>().ok())
            .map(|slot| slot.handle)
    }

    /// Returns the number of populated slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no slot is populated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Shared admission routine behind both lifecycle events.
    fn admit<S: Singleton>(&mut self, scene: &mut impl Scene, instance: &Arc<S>) {
        if self.slot::<S>().is_none() {
            let config = self.configs.get::<S>().unwrap_or_default();
            self.install::<S>(Arc::clone(instance), config);
        }

        if self.slot::<S>().is_some_and(|slot| slot.force_single) {
            self.deduplicate::<S>(scene);
        }

        // Deduplication may have cleared the slot when nothing was live.
        let mark = match self.slot_mut::<S>() {
            Some(slot) if slot.persistent && !slot.persisted => {
                slot.persisted = true;
                Some(Arc::clone(&slot.handle))
            }
            _ => None,
        };
        if let Some(handle) = mark {
            scene.mark_persistent(&handle);
            debug!("marked singleton `{}` persistent", any::type_name::<S>());
        }
    }

    /// Destroy every live instance of `S` except the registered one.
    ///
    /// The registered instance always wins, regardless of creation order. If
    /// the registered handle is no longer live in the scene (destroyed without
    /// the slot being cleared), the slot falls back to the first live instance;
    /// with nothing live the slot is cleared instead.
    fn deduplicate<S: Singleton>(&mut self, scene: &mut impl Scene) {
        let live = scene.find_all_instances::<S>();

        let keep = {
            let Some(slot) = self.slot_mut::<S>() else {
                return;
            };
            if live.iter().any(|handle| Arc::ptr_eq(handle, &slot.handle)) {
                Some(Arc::clone(&slot.handle))
            } else if let Some(first) = live.first() {
                warn!(
                    "registered `{}` instance is no longer live; falling back to first live instance",
                    any::type_name::<S>()
                );
                slot.handle = Arc::clone(first);
                slot.persisted = false;
                Some(Arc::clone(first))
            } else {
                warn!(
                    "registered `{}` instance is no longer live and no instance exists in-scene",
                    any::type_name::<S>()
                );
                None
            }
        };

        let Some(keep) = keep else {
            self.slots.remove(&TypeId::of::<S>());
            return;
        };

        let mut destroyed = 0;
        for duplicate in live.iter().filter(|handle| !Arc::ptr_eq(handle, &keep)) {
            scene.destroy(duplicate);
            destroyed += 1;
        }
        if destroyed > 0 {
            debug!(
                "destroyed {destroyed} duplicate `{}` instance(s)",
                any::type_name::<S>()
            );
        }
    }

    /// Populate the slot for `S`. The caller has checked the slot is empty.
    fn install<S: Singleton>(&mut self, handle: Arc<S>, config: Config) {
        debug!("registered singleton `{}`", any::type_name::<S>());
        self.slots.insert(
            TypeId::of::<S>(),
            Box::new(Slot {
                handle,
                force_single: config.force_single,
                persistent: config.persistent,
                persisted: false,
            }),
        );
    }

    fn slot<S: Singleton>(&self) -> Option<&Slot<S>> {
        self.slots
            .get(&TypeId::of::<S>())
            .and_then(|stored| stored.downcast_ref::<Slot<S>>())
    }

    fn slot_mut<S: Singleton>(&mut self) -> Option<&mut Slot<S>> {
        self.slots
            .get_mut(&TypeId::of::<S>())
            .and_then(|stored| stored.downcast_mut::<Slot<S>>())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use solus_macros::Singleton;

    use super::*;
    use crate::world::World;

    #[derive(Singleton, Debug, Default)]
    struct GameClock {
        elapsed: f32,
    }

    #[derive(Singleton, Debug, Default)]
    struct AudioMixer;

    #[derive(Singleton, Debug, Default)]
    struct Logger;

    fn auto_create() -> Config {
        Config {
            auto_create: true,
            ..Config::default()
        }
    }

    /// Scene wrapper recording which instances get the persistence mark.
    struct CountingScene {
        world: World,
        persist_marks: Vec<usize>,
    }

    impl CountingScene {
        fn new() -> Self {
            Self {
                world: World::new(),
                persist_marks: Vec::new(),
            }
        }
    }

    impl Scene for CountingScene {
        fn find_instance<S: Singleton>(&self) -> Option<Arc<S>> {
            self.world.find_instance::<S>()
        }

        fn find_all_instances<S: Singleton>(&self) -> Vec<Arc<S>> {
            self.world.find_all_instances::<S>()
        }

        fn create_instance<S: Singleton>(&mut self) -> Arc<S> {
            self.world.create_instance::<S>()
        }

        fn mark_persistent<S: Singleton>(&mut self, instance: &Arc<S>) {
            self.persist_marks.push(Arc::as_ptr(instance) as usize);
            self.world.mark_persistent(instance);
        }

        fn destroy<S: Singleton>(&mut self, instance: &Arc<S>) {
            self.world.destroy(instance);
        }
    }

    // ==================== Accessor Resolution ====================

    #[test]
    fn accessor_is_idempotent() {
        let mut world = World::new();
        let mut registry = Registry::new();
        registry.register_config::<GameClock>(auto_create());

        let first = registry.instance::<GameClock>(&mut world).unwrap();
        let second = registry.instance::<GameClock>(&mut world).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(world.instance_count::<GameClock>(), 1);
    }

    #[test]
    fn auto_create_constructs_exactly_one_instance() {
        let mut world = World::new();
        let mut registry = Registry::new();
        registry.register_config::<GameClock>(auto_create());

        let handle = registry.instance::<GameClock>(&mut world);

        assert!(handle.is_some());
        assert!(registry.is_registered::<GameClock>());
        assert_eq!(world.instance_count::<GameClock>(), 1);
    }

    #[test]
    fn disabled_auto_create_with_empty_scene_yields_none() {
        let mut world = World::new();
        let mut registry = Registry::new();
        registry.register_config::<GameClock>(Config::default());

        let handle = registry.instance::<GameClock>(&mut world);

        assert!(handle.is_none());
        assert!(!registry.is_registered::<GameClock>());
        assert_eq!(world.instance_count::<GameClock>(), 0);
    }

    #[test]
    fn undeclared_type_with_empty_scene_yields_none() {
        let mut world = World::new();
        let mut registry = Registry::new();

        assert!(registry.instance::<AudioMixer>(&mut world).is_none());
        assert_eq!(world.instance_count::<AudioMixer>(), 0);
    }

    #[test]
    fn finds_existing_instance_when_auto_create_disabled() {
        let mut world = World::new();
        let mut registry = Registry::new();
        let existing = world.spawn(GameClock { elapsed: 4.2 });

        let handle = registry.instance::<GameClock>(&mut world).unwrap();

        assert!(Arc::ptr_eq(&handle, &existing));
        assert_eq!(handle.elapsed, 4.2);
        assert_eq!(world.instance_count::<GameClock>(), 1);
    }

    // ==================== Lifecycle Events ====================

    #[test]
    fn activation_self_registers_first_instance() {
        let mut world = World::new();
        let mut registry = Registry::new();
        let instance = world.spawn(AudioMixer);

        registry.on_activated(&mut world, &instance);

        assert!(Arc::ptr_eq(&registry.registered::<AudioMixer>().unwrap(), &instance));
    }

    #[test]
    fn later_activation_does_not_replace_registered_instance() {
        let mut world = World::new();
        let mut registry = Registry::new();
        let first = world.spawn(AudioMixer);
        let second = world.spawn(AudioMixer);

        registry.on_activated(&mut world, &first);
        registry.on_activated(&mut world, &second);

        // First writer wins; without force_single the duplicate stays live.
        assert!(Arc::ptr_eq(&registry.registered::<AudioMixer>().unwrap(), &first));
        assert_eq!(world.instance_count::<AudioMixer>(), 2);
    }

    #[test]
    fn created_and_activated_events_are_interchangeable() {
        let mut world = World::new();
        let mut registry = Registry::new();
        let instance = world.spawn(AudioMixer);

        registry.on_created(&mut world, &instance);
        registry.on_activated(&mut world, &instance);

        assert!(Arc::ptr_eq(&registry.registered::<AudioMixer>().unwrap(), &instance));
        assert_eq!(registry.len(), 1);
    }

    // ==================== Duplicate Elimination ====================

    #[test]
    fn force_single_destroys_every_duplicate() {
        let mut world = World::new();
        let mut registry = Registry::new();
        registry.register_config::<AudioMixer>(Config {
            force_single: true,
            ..Config::default()
        });
        let keeper = world.spawn(AudioMixer);
        world.spawn(AudioMixer);
        world.spawn(AudioMixer);

        registry.on_activated(&mut world, &keeper);

        assert_eq!(world.instance_count::<AudioMixer>(), 1);
        assert!(Arc::ptr_eq(&registry.registered::<AudioMixer>().unwrap(), &keeper));
    }

    #[test]
    fn registered_instance_wins_regardless_of_creation_order() {
        let mut world = World::new();
        let mut registry = Registry::new();
        registry.register_config::<AudioMixer>(Config {
            force_single: true,
            ..Config::default()
        });
        world.spawn(AudioMixer);
        world.spawn(AudioMixer);
        let latest = world.spawn(AudioMixer);

        registry.on_activated(&mut world, &latest);

        assert_eq!(world.instance_count::<AudioMixer>(), 1);
        assert!(Arc::ptr_eq(&registry.registered::<AudioMixer>().unwrap(), &latest));
    }

    #[test]
    fn stale_slot_falls_back_to_first_live_instance() {
        let mut world = World::new();
        let mut registry = Registry::new();
        registry.register_config::<AudioMixer>(Config {
            force_single: true,
            ..Config::default()
        });
        let stale = world.spawn(AudioMixer);
        registry.on_activated(&mut world, &stale);
        // Destroyed behind the registry's back: the slot still holds `stale`.
        world.destroy(&stale);

        let replacement = world.spawn(AudioMixer);
        let rogue = world.spawn(AudioMixer);
        registry.on_activated(&mut world, &rogue);

        let registered = registry.registered::<AudioMixer>().unwrap();
        assert!(Arc::ptr_eq(&registered, &replacement));
        assert_eq!(world.instance_count::<AudioMixer>(), 1);
    }

    #[test]
    fn stale_slot_with_empty_scene_clears_the_slot() {
        let mut world = World::new();
        let mut registry = Registry::new();
        registry.register_config::<AudioMixer>(Config {
            force_single: true,
            ..Config::default()
        });
        let stale = world.spawn(AudioMixer);
        registry.on_activated(&mut world, &stale);
        world.destroy(&stale);

        registry.on_activated(&mut world, &stale);

        assert!(!registry.is_registered::<AudioMixer>());
    }

    // ==================== Persistence ====================

    #[test]
    fn persistent_instance_is_marked_exactly_once() {
        let mut scene = CountingScene::new();
        let mut registry = Registry::new();
        registry.register_config::<AudioMixer>(Config {
            persistent: true,
            ..Config::default()
        });
        let instance = scene.world.spawn(AudioMixer);

        // Construction and activation both fire, as a host would.
        registry.on_created(&mut scene, &instance);
        registry.on_activated(&mut scene, &instance);

        assert_eq!(scene.persist_marks.len(), 1);
        assert_eq!(scene.persist_marks[0], Arc::as_ptr(&instance) as usize);
    }

    #[test]
    fn persistence_mark_targets_the_registered_instance() {
        let mut scene = CountingScene::new();
        let mut registry = Registry::new();
        registry.register_config::<AudioMixer>(Config {
            persistent: true,
            force_single: true,
            ..Config::default()
        });
        let keeper = scene.world.spawn(AudioMixer);
        let duplicate = scene.world.spawn(AudioMixer);
        registry.on_activated(&mut scene, &keeper);

        // The duplicate activating afterward must not receive the mark.
        registry.on_activated(&mut scene, &duplicate);

        assert_eq!(scene.persist_marks, vec![Arc::as_ptr(&keeper) as usize]);
    }

    // ==================== Slot Lifecycle ====================

    #[test]
    fn cleared_slot_resolves_from_scratch() {
        let mut world = World::new();
        let mut registry = Registry::new();
        registry.register_config::<GameClock>(auto_create());
        let first = registry.instance::<GameClock>(&mut world).unwrap();
        world.destroy(&first);

        let cleared = registry.clear_slot::<GameClock>().unwrap();
        let second = registry.instance::<GameClock>(&mut world).unwrap();

        assert!(Arc::ptr_eq(&cleared, &first));
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(world.instance_count::<GameClock>(), 1);
    }

    #[test]
    fn clear_slot_on_empty_registry_is_safe() {
        let mut registry = Registry::new();

        assert!(registry.clear_slot::<GameClock>().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn slots_are_independent_per_type() {
        let mut world = World::new();
        let mut registry = Registry::new();
        registry.register_config::<GameClock>(auto_create());
        registry.register_config::<AudioMixer>(auto_create());

        registry.instance::<GameClock>(&mut world);
        registry.instance::<AudioMixer>(&mut world);
        registry.clear_slot::<GameClock>();

        assert!(!registry.is_registered::<GameClock>());
        assert!(registry.is_registered::<AudioMixer>());
        assert_eq!(registry.len(), 1);
    }

    // ==================== End-To-End Scenario ====================

    #[test]
    fn logger_scenario_creates_persists_and_deduplicates() {
        let mut scene = CountingScene::new();
        let mut registry = Registry::new();
        registry.register_config::<Logger>(Config {
            auto_create: true,
            persistent: true,
            force_single: true,
        });
        // An unrelated pre-existing Logger object is already in the scene.
        let rogue = scene.world.spawn(Logger);

        let logger = registry.instance::<Logger>(&mut scene).unwrap();

        // A new Logger was created, registered, and marked persistent; the
        // pre-existing one lost to the registered instance.
        assert!(!Arc::ptr_eq(&logger, &rogue));
        assert_eq!(scene.world.instance_count::<Logger>(), 1);
        assert_eq!(scene.persist_marks, vec![Arc::as_ptr(&logger) as usize]);
        assert!(scene.world.is_persistent(&logger));

        // Another rogue appearing afterward is destroyed on activation.
        let late_rogue = scene.world.spawn(Logger);
        registry.on_activated(&mut scene, &late_rogue);

        assert_eq!(scene.world.instance_count::<Logger>(), 1);
        assert!(Arc::ptr_eq(&registry.registered::<Logger>().unwrap(), &logger));
        assert_eq!(scene.persist_marks.len(), 1);
    }
}
