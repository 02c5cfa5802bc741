//! Inspect a DIVE `.vr` world file.
//!
//! Run with: cargo run --bin dive_inspect -- <world.vr> [--json]
//!     [--materials library.json] [--options options.json]

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use dive_core::scene::{MaterialLibrary, Object};
use dive_core::vr::{load_vr, ParseOptions, ParseOutcome};
use dive_math::Mat4Ext;

struct Args {
    path: PathBuf,
    json: bool,
    materials: Option<PathBuf>,
    options: Option<PathBuf>,
}

const USAGE: &str =
    "Usage: dive_inspect <world.vr> [--json] [--materials library.json] [--options options.json]";

fn parse_args() -> Result<Args> {
    let mut path = None;
    let mut json = false;
    let mut materials = None;
    let mut options = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--materials" => {
                materials = Some(args.next().context("--materials needs a path")?.into());
            }
            "--options" => {
                options = Some(args.next().context("--options needs a path")?.into());
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other if other.starts_with("--") => bail!("unknown flag {}\n{}", other, USAGE),
            other => {
                if path.replace(PathBuf::from(other)).is_some() {
                    bail!("more than one input file given\n{}", USAGE);
                }
            }
        }
    }

    let Some(path) = path else {
        bail!("{}", USAGE);
    };
    Ok(Args {
        path,
        json,
        materials,
        options,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_object(object: &Object, depth: usize) {
    let indent = "  ".repeat(depth);
    let name = object.name.as_deref().unwrap_or("<unnamed>");
    match object.id {
        Some(id) => println!("{}object {} (id {})", indent, name, id),
        None => println!("{}object {}", indent, name),
    }
    println!(
        "{}  {} materials, {} textures, {} transforms, {} gateways, {} scripts",
        indent,
        object.materials.len(),
        object.textures.len(),
        object.transforms.len(),
        object.gateways.len(),
        object.scripts.len()
    );

    for view in &object.views {
        let primitive = &view.primitive;
        print!("{}  view {}", indent, primitive.kind());
        if let Some(index) = view.index {
            print!(" #{}", index);
        }
        if primitive.triangle_count() > 0 {
            print!(", {} triangles", primitive.triangle_count());
        }
        println!();
    }

    let bounds = object.local_matrix().transform_aabb(&object.view_bounds());
    if !bounds.is_empty() {
        println!(
            "{}  bounds: ({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2})",
            indent, bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
        );
    }

    for child in &object.children {
        print_object(child, depth + 1);
    }
}

fn print_summary(outcome: &ParseOutcome) {
    let scene = &outcome.scene;
    let world = &scene.world;

    println!("\n=== World: {} ===", world.name.as_deref().unwrap_or("<unnamed>"));
    println!(
        "Background: ({:.2}, {:.2}, {:.2})",
        world.background.x, world.background.y, world.background.z
    );
    println!("Start: ({:.2}, {:.2}, {:.2})", world.start.x, world.start.y, world.start.z);
    if let Some(fog) = world.fog {
        println!("Fog: {:.2}", fog);
    }
    if let Some(terrain) = &world.terrain {
        println!("Terrain: {}", terrain);
    }

    println!("Objects: {}", scene.object_count());
    println!("Views: {}", scene.view_count());
    println!("Total triangles: {}", scene.triangle_count());

    println!("\n--- Objects ---");
    for object in &scene.objects {
        print_object(object, 0);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = parse_args()?;
    let options: ParseOptions = match &args.options {
        Some(path) => read_json(path)?,
        None => ParseOptions::default(),
    };
    let library: MaterialLibrary = match &args.materials {
        Some(path) => read_json(path)?,
        None => MaterialLibrary::new(),
    };
    log::debug!("Options: {:?}, {} library materials", options, library.len());

    let outcome = load_vr(&args.path, &options, &library)
        .with_context(|| format!("loading {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.scene)?);
    } else {
        println!("Loaded {}", args.path.display());
        print_summary(&outcome);
    }

    for diagnostic in &outcome.diagnostics {
        eprintln!("{}: {}", args.path.display(), diagnostic);
    }

    Ok(())
}
