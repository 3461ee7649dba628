//! Scene mesh combiner.
//!
//! Reads a TOML scene of placed primitives, drops objects carrying an
//! excluded tag, combines the rest into one world-space mesh, and writes it
//! as a Wavefront OBJ.

mod obj;
mod scene;

use anyhow::{Context, Result};
use clap::Parser;
use mesh_combine::{combine, ExecutionStrategy, InputMesh, MeshData};
use std::path::PathBuf;
use web_time::Instant;

use scene::{Scene, DEFAULT_EXCLUDED_TAG};

/// Combines scene meshes into a single OBJ.
#[derive(Parser, Debug)]
#[command(name = "combine_meshes")]
#[command(about = "Combines the meshes of a TOML scene into a single OBJ")]
struct Args {
	/// Path to scene TOML file.
	#[arg(short, long)]
	scene: PathBuf,

	/// Output OBJ path (default: scene path with .obj extension).
	#[arg(short, long)]
	output: Option<PathBuf>,

	/// Skip objects with this tag. Repeatable; defaults to EditorOnly.
	#[arg(long = "exclude-tag", value_name = "TAG")]
	exclude_tags: Vec<String>,

	/// Dedicated worker count (overrides the scene's [combine] table).
	#[arg(short, long, conflicts_with = "sequential")]
	threads: Option<usize>,

	/// Combine on the calling thread.
	#[arg(long)]
	sequential: bool,
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let args = Args::parse();
	let output_path = args
		.output
		.clone()
		.unwrap_or_else(|| args.scene.with_extension("obj"));

	log::info!("Loading scene from: {}", args.scene.display());
	let scene = Scene::load(&args.scene)?;

	let excluded_tags = if args.exclude_tags.is_empty() {
		vec![DEFAULT_EXCLUDED_TAG.to_string()]
	} else {
		args.exclude_tags.clone()
	};

	let meshes: Vec<MeshData> = scene
		.included(&excluded_tags)
		.map(|object| {
			log::debug!("  + {} ({:?})", object.name, object.primitive);
			object.to_mesh()
		})
		.collect();

	log::info!(
		"Combining {} of {} objects (excluded tags: {:?})",
		meshes.len(),
		scene.objects.len(),
		excluded_tags
	);

	let mut config = scene.combine.to_config();
	if args.sequential {
		config = config.with_strategy(ExecutionStrategy::Sequential);
	} else if let Some(threads) = args.threads {
		anyhow::ensure!(threads > 0, "--threads must be at least 1");
		config = config.with_threads(threads);
	}

	let inputs: Vec<InputMesh> = meshes.iter().map(MeshData::as_input).collect();
	let start = Instant::now();
	let output = combine(&inputs, &config).context("Combine failed")?;
	let elapsed = start.elapsed();

	log::info!(
		"Combined {} vertices, {} triangles in {:.2?} ({:?})",
		output.vertex_count(),
		output.triangle_count(),
		elapsed,
		config.strategy
	);
	if output.bounds.is_empty() {
		log::info!("Bounds: empty");
	} else {
		log::info!("Bounds: min {} max {}", output.bounds.min, output.bounds.max);
	}

	obj::save_obj(&output, &output_path)?;
	log::info!("Output written to: {}", output_path.display());

	Ok(())
}
