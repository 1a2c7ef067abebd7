use std::sync::Arc;

use crossbeam::channel::Receiver;
use log::LevelFilter;
use solus::{Config, Registry, World};
use solus_macros::Singleton;

mod logger;

use logger::{ChannelLogger, LogMessage};

#[derive(Singleton, Debug, Default)]
struct AudioMixer {
    volume: f32,
}

#[derive(Singleton, Debug, Default)]
struct HudOverlay;

fn drain(messages: &Receiver<LogMessage>) {
    for msg in messages.try_iter() {
        println!("  [{}] {}", msg.level, msg.message);
    }
}

fn main() {
    let (channel_logger, messages) = ChannelLogger::with_receiver();
    if log::set_boxed_logger(Box::new(channel_logger)).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }

    let mut world = World::new();
    let mut registry = Registry::new();
    registry.register_config::<AudioMixer>(Config {
        auto_create: true,
        persistent: true,
        force_single: true,
    });

    println!("resolving AudioMixer (auto-created, persistent, force-single):");
    let mixer = match registry.instance::<AudioMixer>(&mut world) {
        Some(mixer) => mixer,
        None => return,
    };
    drain(&messages);
    println!("  -> volume {}\n", mixer.volume);

    println!("a rogue AudioMixer appears and activates:");
    let rogue = world.spawn(AudioMixer { volume: 1.0 });
    registry.on_activated(&mut world, &rogue);
    drain(&messages);
    let kept = registry
        .registered::<AudioMixer>()
        .is_some_and(|registered| Arc::ptr_eq(&registered, &mixer));
    println!(
        "  -> {} live AudioMixer instance(s), registered one kept: {}\n",
        world.instance_count::<AudioMixer>(),
        kept,
    );

    println!("HudOverlay has no config; an existing instance is adopted:");
    world.spawn(HudOverlay);
    let hud = registry.instance::<HudOverlay>(&mut world);
    drain(&messages);
    println!("  -> found: {}\n", hud.is_some());

    println!("scene transition:");
    world.transition();
    drain(&messages);
    println!(
        "  -> AudioMixer survives: {}, HudOverlay survives: {}",
        world.instance_count::<AudioMixer>() == 1,
        world.instance_count::<HudOverlay>() == 1,
    );
}
