use std::env;
use std::fs;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use scene_runtime::app::{populate, print_final_state, HeadlessRenderer, HeadlessSurface};
use scene_runtime::input::canonical_code;
use scene_runtime::{ControlKind, InputState, ManualTicks, RuntimeBuilder, SceneManifest};

const USAGE: &str =
    "Usage: scene-runtime <scene.xml> [--frames N] [--controls KIND] [--no-post] [--hold KEY]";

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let xml = fs::read_to_string(&options.path)
        .with_context(|| format!("failed to read scene {}", options.path))?;
    let mut manifest = SceneManifest::from_xml(&xml).context("failed to parse scene XML")?;

    if let Some(controls) = options.controls {
        manifest.config.controls = controls;
    }
    if options.no_post {
        manifest.config.post_processing = false;
    }

    println!("Loaded scene with {} objects", manifest.objects.len());
    for object in &manifest.objects {
        println!(" - {} ({})", object.name, object.shape.type_name());
    }

    let input = Arc::new(InputState::new());
    for key in &options.held_keys {
        input.set_key_down(key);
    }

    let renderer = HeadlessRenderer::new();
    let stats = renderer.stats();
    let runtime = RuntimeBuilder::new(manifest.config.clone(), Box::new(renderer))
        .input_surface(Box::new(HeadlessSurface::new()))
        .input(input)
        .build();

    let registered = populate(&runtime, &manifest)?;
    println!("Registered {registered} object(s)");

    let passes = runtime.pass_names();
    if passes.is_empty() {
        println!("Post-processing: off");
    } else {
        println!("Post-processing: {}", passes.join(" -> "));
    }

    let summary = runtime.run(ManualTicks::at_rate(60.0, options.frames))?;
    println!(
        "Ran {} frames ({} failed)",
        summary.frames, summary.failures
    );
    println!(
        "Active controls: {}",
        runtime.control_kind().map_or("none", ControlKind::name)
    );

    print_final_state(&runtime);
    runtime.shutdown();
    println!(
        "Released {} GPU resource(s) after {} scene draw(s)",
        stats.released(),
        stats.scene_draws()
    );
    Ok(())
}

struct CliOptions {
    path: String,
    frames: usize,
    controls: Option<Option<ControlKind>>,
    no_post: bool,
    held_keys: Vec<String>,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!(USAGE));
        };
        let mut options = Self {
            path,
            frames: 60,
            controls: None,
            no_post: false,
            held_keys: Vec::new(),
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--frames" => {
                    let value = args.next().ok_or_else(|| anyhow!("--frames needs a value"))?;
                    options.frames = value
                        .parse()
                        .with_context(|| format!("invalid frame count `{value}`"))?;
                }
                "--controls" => {
                    let value = args.next().ok_or_else(|| anyhow!("--controls needs a value"))?;
                    options.controls = Some(if value.eq_ignore_ascii_case("none") {
                        None
                    } else {
                        Some(
                            ControlKind::from_name(&value)
                                .ok_or_else(|| anyhow!("unknown control kind `{value}`"))?,
                        )
                    });
                }
                "--no-post" => options.no_post = true,
                "--hold" => {
                    let value = args.next().ok_or_else(|| anyhow!("--hold needs a key"))?;
                    let code = canonical_code(&value)
                        .ok_or_else(|| anyhow!("unknown key `{value}`"))?;
                    options.held_keys.push(code);
                }
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
            }
        }
        Ok(options)
    }
}
