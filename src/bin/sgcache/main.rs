//! sgcache - inspect and convert scene-graph model caches.

use std::env;
use std::path::Path;
use std::process::ExitCode;

use scenegraph::cache::{read_cache, read_cache_header, CacheModel};
use scenegraph::mesh::get_model;
use scenegraph::node::{Link, NodeId, NodeKind, SceneGraph};
use scenegraph::vrml::{write_vrml, VrmlOptions};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    let res = match filtered_args[0] {
        "info" | "i" => with_file(&filtered_args, "info <file.cache>", cmd_info),
        "tree" | "t" => with_file(&filtered_args, "tree <file.cache>", cmd_tree),
        "model" | "m" => {
            let json_mode = filtered_args.iter().any(|&s| s == "--json" || s == "-j");
            with_file(&filtered_args, "model <file.cache> [--json]", |p| cmd_model(p, json_mode))
        }
        "vrml" | "w" => {
            let rest: Vec<&str> = filtered_args[1..]
                .iter()
                .copied()
                .filter(|s| !s.starts_with("--"))
                .collect();
            if rest.len() < 2 {
                eprintln!("Error: missing arguments");
                eprintln!("Usage: sgcache vrml <in.cache> <out.wrl> [--no-reuse] [--force]");
                return ExitCode::FAILURE;
            }
            let options = VrmlOptions {
                overwrite: filtered_args.contains(&"--force"),
                reuse: !filtered_args.contains(&"--no-reuse"),
                ..VrmlOptions::default()
            };
            cmd_vrml(rest[0], rest[1], &options)
        }
        "version" | "-V" | "--version" => {
            print_version();
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        // Default: if file exists, show info; otherwise error
        other => {
            if Path::new(other).exists() {
                cmd_info(other)
            } else {
                eprintln!("Unknown command: {other}");
                eprintln!();
                print_help();
                return ExitCode::FAILURE;
            }
        }
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn with_file(
    args: &[&str],
    usage: &str,
    cmd: impl FnOnce(&str) -> scenegraph::Result<()>,
) -> scenegraph::Result<()> {
    match args.get(1) {
        Some(path) => cmd(path),
        None => {
            eprintln!("Error: missing file argument");
            eprintln!("Usage: sgcache {usage}");
            std::process::exit(1);
        }
    }
}

fn print_version() {
    let (major, minor, patch, rev) = scenegraph::lib_version();
    println!(
        "sgcache {major}.{minor}.{patch}.{rev} (built {} {})",
        env!("SCENEGRAPH_BUILD_DATE"),
        env!("SCENEGRAPH_BUILD_TIME")
    );
}

fn print_help() {
    println!("sgcache - scene-graph model cache toolkit");
    println!();
    println!("USAGE:");
    println!("    sgcache [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <file>              Show header and node counts");
    println!("    t, tree   <file>              Show node hierarchy (shared nodes marked)");
    println!("    m, model  <file> [--json]     Flatten to meshes and print a summary");
    println!("    w, vrml   <in> <out>          Convert to VRML2.0");
    println!("                [--no-reuse]      Write shared nodes in full, no DEF/USE");
    println!("                [--force]         Overwrite an existing output file");
    println!("    version                       Show version and build date");
    println!("    h, help                       Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Errors only");
    println!();
    println!("NOTES:");
    println!("    - Passing a cache file directly is equivalent to 'info'");
    println!("    - RUST_LOG overrides the verbosity flags");
}

fn load(path: &str) -> scenegraph::Result<CacheModel> {
    info!("Opening cache: {path}");
    let model = read_cache(path)?;
    debug!("{} nodes loaded", model.graph.len());
    Ok(model)
}

fn cmd_info(path: &str) -> scenegraph::Result<()> {
    let (version, plugin) = read_cache_header(path)?;
    let model = load(path)?;

    let mut counts = [0usize; NodeKind::COUNT];
    for id in model.graph.ids() {
        if let Some(k) = model.graph.kind(id) {
            counts[k as usize] += 1;
        }
    }
    let shared = model
        .graph
        .ids()
        .filter(|&id| model.graph.node(id).is_some_and(|n| !n.back_refs().is_empty()))
        .count();

    println!("Cache:   {path}");
    println!("Version: {version}");
    println!("Plugin:  {plugin}");
    println!();
    println!("Nodes:");
    for kind in NodeKind::ALL {
        println!("  {:<9} {}", kind.abbrev(), counts[kind as usize]);
    }
    println!();
    println!("Total nodes:  {}", model.graph.len());
    println!("Shared nodes: {shared}");
    Ok(())
}

fn cmd_tree(path: &str) -> scenegraph::Result<()> {
    let model = load(path)?;
    println!("Cache: {path}");
    println!();
    print_tree(&model.graph, model.root, 0, false);
    Ok(())
}

fn print_tree(g: &SceneGraph, id: NodeId, depth: usize, is_ref: bool) {
    let indent = "  ".repeat(depth);
    let name = g.node(id).and_then(|n| n.name()).unwrap_or("?");
    let kind = g.kind(id).map_or("?", NodeKind::abbrev);

    if is_ref {
        println!("{indent}-> {name}");
        return;
    }
    let detail = if let Some(c) = g.coords(id) {
        format!(" ({} points)", c.len())
    } else if let Some(n) = g.normals(id) {
        format!(" ({} normals)", n.len())
    } else if let Some(c) = g.colors(id) {
        format!(" ({} colors)", c.len())
    } else if let Some(i) = g.coord_index(id) {
        format!(" ({} triangles)", i.len() / 3)
    } else {
        String::new()
    };
    println!("{indent}[{kind}] {name}{detail}");

    let children: Vec<Link> = g
        .owned_children(id)
        .into_iter()
        .map(Link::Owned)
        .chain(g.references(id).into_iter().map(Link::Ref))
        .collect();
    for link in children {
        print_tree(g, link.id(), depth + 1, !link.is_owned());
    }
}

fn cmd_model(path: &str, json_mode: bool) -> scenegraph::Result<()> {
    let model = load(path)?;
    let Some(flat) = get_model(&model.graph, model.root) else {
        println!("No renderable meshes in {path}");
        return Ok(());
    };

    if json_mode {
        let bounds = flat.bounds();
        let meshes: Vec<serde_json::Value> = flat
            .meshes
            .iter()
            .map(|m| {
                serde_json::json!({
                    "vertices": m.vertex_size(),
                    "triangles": m.triangle_count(),
                    "colors": m.has_colors(),
                    "material": m.material_idx,
                })
            })
            .collect();
        let materials: Vec<serde_json::Value> = flat
            .materials
            .iter()
            .map(|m| {
                serde_json::json!({
                    "diffuse": m.diffuse.to_array(),
                    "specular": m.specular.to_array(),
                    "shininess": m.shininess,
                    "transparency": m.transparency,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "cache": path,
                "bounds": { "min": bounds.min.to_array(), "max": bounds.max.to_array() },
                "meshes": meshes,
                "materials": materials,
            }))
            .unwrap_or_default()
        );
    } else {
        println!("Cache: {path}");
        println!("Meshes:    {}", flat.mesh_count());
        println!("Materials: {}", flat.material_count());
        println!("Vertices:  {}", flat.vertex_count());
        println!("Triangles: {}", flat.triangle_count());
        let b = flat.bounds();
        println!("Bounds:    {:?} - {:?}", b.min, b.max);
    }
    Ok(())
}

fn cmd_vrml(input: &str, output: &str, options: &VrmlOptions) -> scenegraph::Result<()> {
    let mut model = load(input)?;
    write_vrml(&mut model.graph, model.root, output, options)?;
    println!("Wrote {output}");
    Ok(())
}
