//! Headless sandbox: loads a RON scene and drives a controller through a scripted input track.

mod player;
mod scene;

use std::path::PathBuf;

use env_logger::Env;
use kcc::{Controller, KccError};
use log::info;

use crate::{player::PlayerMachine, scene::Scene};

fn main() -> Result<(), KccError> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("scenes/demo.ron"));
    let scene = Scene::load(&path)?;

    let (mut world, moving) = scene.build_world();
    let mut controller = Controller::new(&scene.controller, scene.spawn())?;
    let mut player = PlayerMachine::new(scene.player.clone());

    controller.add_listener(|c: &Controller| {
        for contact in c.contacts() {
            log::trace!(
                "contact: sphere {} hit {:?} at {}",
                contact.sphere,
                contact.collider,
                contact.point
            );
        }
    });

    let mut time = 0.0;
    let mut ticks = 0;
    for (frame, input) in scene.frames().into_iter().enumerate() {
        time += scene.frame_delta;
        for platform in &moving {
            world.set_translation(platform.id, platform.origin + platform.motion.offset(time));
        }

        player.set_input(input);
        ticks += controller.update(&mut world, &mut player, scene.frame_delta)?;

        if frame % 30 == 0 {
            let ground = controller.ground();
            info!(
                "t={time:.2}s state={:?} pos=({:.2}, {:.2}, {:.2}) ground={:?} dist={:?}",
                player.state(),
                controller.position().x,
                controller.position().y,
                controller.position().z,
                ground.collider(),
                ground.distance()
            );
        }
    }

    info!(
        "Finished {:.2}s of script in {ticks} ticks, final position {}",
        time,
        controller.position()
    );
    Ok(())
}
