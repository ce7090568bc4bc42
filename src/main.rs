//! # rust_nodes
//!
//! Builds BSP nodes for every level of a WAD (or a JSON level, or a
//! generated grid map) and prints a summary per level.
//!
//! ```text
//! rust_nodes [--gl] [--config FILE] [--level NAME] [--json OUT] <input.wad|input.json>
//! rust_nodes --generate COLSxROWS [--seed N] [--gl] [--json OUT]
//! ```

use log::{info, warn};
use rayon::prelude::*;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rust_nodes::bsp::bsp_procedural::{GeneratorConfig, GridGenerator};
use rust_nodes::document::Document;
use rust_nodes::{BspLevel, BuildOptions, Level};

#[derive(Debug, Default)]
struct Args {
    input: Option<PathBuf>,
    gl: bool,
    config: Option<PathBuf>,
    level: Option<String>,
    json: Option<PathBuf>,
    generate: Option<(usize, usize)>,
    seed: u64,
}

const USAGE: &str = "usage: rust_nodes [--gl] [--config FILE] [--level NAME] [--json OUT] <input.wad|input.json>
       rust_nodes --generate COLSxROWS [--seed N] [--gl] [--json OUT]";

fn parse_args() -> Result<Args, Box<dyn Error>> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| iter.next().ok_or_else(|| format!("{} needs a value", name));
        match arg.as_str() {
            "--gl" => args.gl = true,
            "--config" => args.config = Some(value("--config")?.into()),
            "--level" => args.level = Some(value("--level")?),
            "--json" => args.json = Some(value("--json")?.into()),
            "--seed" => args.seed = value("--seed")?.parse()?,
            "--generate" => {
                let dims = value("--generate")?;
                let (cols, rows) = dims
                    .split_once(['x', 'X'])
                    .ok_or_else(|| format!("--generate expects COLSxROWS, got {}", dims))?;
                args.generate = Some((cols.parse()?, rows.parse()?));
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ if arg.starts_with("--") => return Err(format!("unknown option {}\n{}", arg, USAGE).into()),
            _ => args.input = Some(arg.into()),
        }
    }
    if args.input.is_none() && args.generate.is_none() {
        return Err(USAGE.into());
    }
    Ok(args)
}

/// Reads the levels named by the arguments.
fn load_levels(args: &Args) -> Result<Vec<Level>, Box<dyn Error>> {
    if let Some((columns, rows)) = args.generate {
        let config = GeneratorConfig {
            columns,
            rows,
            seed: args.seed,
            ..Default::default()
        };
        return Ok(vec![GridGenerator::new(config).generate()]);
    }

    let Some(path) = args.input.as_deref() else {
        return Err(USAGE.into());
    };
    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let level: Level = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        return Ok(vec![level]);
    }

    let mut doc = Document::new();
    doc.load_wad(&mut BufReader::new(File::open(path)?))?;
    let names = match &args.level {
        Some(name) => vec![name.clone()],
        None => doc.available_levels(),
    };
    if names.is_empty() {
        warn!("{} contains no levels", path.display());
    }
    let levels = names
        .iter()
        .map(|name| doc.load_level(name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(levels)
}

fn write_json(path: &Path, built: &[BspLevel]) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    serde_json::to_writer(std::io::BufWriter::new(file), built)?;
    info!("wrote {}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = parse_args()?;
    let mut options = match &args.config {
        Some(path) => BuildOptions::load(path)?,
        None => BuildOptions::default(),
    };
    options.gl_nodes |= args.gl;

    let levels = load_levels(&args)?;
    info!("building {} level(s)", levels.len());

    // One builder per level; they share nothing.
    let results: Vec<_> = levels
        .par_iter()
        .map(|level| (level.name.clone(), BspLevel::build(level, &options)))
        .collect();

    let mut built = Vec::with_capacity(results.len());
    let mut failed = 0;
    for (name, result) in results {
        match result {
            Ok(bsp) => {
                println!(
                    "{:8} {:6} nodes {:6} subsectors {:7} segs {:6} vertices {:5} splits",
                    name,
                    bsp.nodes.len(),
                    bsp.subsectors.len(),
                    bsp.segs.len(),
                    bsp.vertices.len(),
                    bsp.stats.splits
                );
                built.push(bsp);
            }
            Err(err) => {
                eprintln!("{}: {}", name, err);
                failed += 1;
            }
        }
    }

    if let Some(path) = &args.json {
        write_json(path, &built)?;
    }
    if failed > 0 {
        return Err(format!("{} level(s) failed to build", failed).into());
    }
    Ok(())
}
