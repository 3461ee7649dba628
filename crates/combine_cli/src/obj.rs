//! Wavefront OBJ export for combined meshes.

use anyhow::{Context, Result};
use mesh_combine::OutputMesh;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write positions, normals, and faces. Faces reference the normal with the
/// same index as the vertex (`f a//a b//b c//c`, 1-based).
pub fn write_obj<W: Write>(mesh: &OutputMesh, mut out: W) -> std::io::Result<()> {
	writeln!(out, "# combine_meshes")?;
	writeln!(
		out,
		"# {} vertices, {} triangles",
		mesh.vertex_count(),
		mesh.triangle_count()
	)?;

	for p in &mesh.positions {
		writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
	}
	for n in &mesh.normals {
		writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
	}
	for tri in mesh.indices.chunks_exact(3) {
		let [a, b, c] = [tri[0] + 1, tri[1] + 1, tri[2] + 1];
		writeln!(out, "f {a}//{a} {b}//{b} {c}//{c}")?;
	}

	out.flush()
}

pub fn save_obj(mesh: &OutputMesh, path: &Path) -> Result<()> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		std::fs::create_dir_all(parent)
			.with_context(|| format!("Failed to create output dir: {}", parent.display()))?;
	}

	let file = std::fs::File::create(path)
		.with_context(|| format!("Failed to create: {}", path.display()))?;
	write_obj(mesh, BufWriter::new(file))
		.with_context(|| format!("Failed to write: {}", path.display()))
}
