//! Tag scene generator
//!
//! Assembles the arena scene and writes `tag.xml` plus its mesh assets into
//! one directory, ready for the engine to load.

mod output;
mod run_config;

use run_config::{RunConfig, USAGE};
use std::error::Error;
use std::io::{self, Write};
use std::process::ExitCode;
use tag_scene::{assemble, EnvironmentConfig, Scene};

/// Configuration, generation or I/O failure
const EXIT_FAILURE: u8 = 1;
/// Unknown flag or missing flag value
const EXIT_USAGE: u8 = 2;

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let code = execute(
        std::env::args().skip(1),
        |key| std::env::var(key).ok(),
        &mut io::stdout().lock(),
    );
    ExitCode::from(code)
}

/// One generator invocation, returning the process exit code
fn execute<I, F>(args: I, var: F, out: &mut dyn Write) -> u8
where
    I: IntoIterator<Item = String>,
    F: Fn(&str) -> Option<String>,
{
    let mut config = match RunConfig::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return EXIT_USAGE;
        }
    };
    config.apply_env_with(var);

    match run(&config, out) {
        Ok(()) => 0,
        Err(e) => {
            log::error!("Scene generation failed: {}", e);
            EXIT_FAILURE
        }
    }
}

fn run(opts: &RunConfig, out: &mut dyn Write) -> Result<(), Box<dyn Error>> {
    if opts.help {
        writeln!(out, "{}", USAGE)?;
        return Ok(());
    }

    let env = opts.environment()?;
    let scene = assemble(&env)?;

    if opts.stdout {
        out.write_all(scene.xml().as_bytes())?;
        out.flush()?;
        return Ok(());
    }

    let document = output::write_scene(&scene, &opts.out_dir)?;
    log::info!("Wrote {}", document.display());

    print_summary(&env, &scene);
    Ok(())
}

fn print_summary(env: &EnvironmentConfig, scene: &Scene) {
    log::info!("=== Scene Summary ===");
    log::info!("Arena: {} x {}", env.arena_width, env.arena_height);
    log::info!(
        "Timestep: {} ({} physics steps per action)",
        env.timestep,
        env.physics_steps_per_action()
    );
    log::info!(
        "Episode: {} policy steps, chaser frozen for {}",
        env.max_episode_steps(),
        env.chaser_freeze_steps()
    );
    log::info!("Tag distance: {}", env.tag_distance());
    log::info!("Sensors: {}", scene.sensor_names().join(", "));
    log::info!("Assets: {}", scene.assets().len());
    log::info!("=====================");
}
