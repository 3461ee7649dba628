//! Scene description parsing and mesh enumeration.

use anyhow::{Context, Result};
use glam::{EulerRot, Mat4, Quat, Vec3};
use mesh_combine::{CombineConfig, ExecutionStrategy, Indices, MeshData};
use serde::Deserialize;
use std::path::Path;

/// Tag excluded when the command line names none.
pub const DEFAULT_EXCLUDED_TAG: &str = "EditorOnly";

/// Root scene description.
#[derive(Debug, Deserialize)]
pub struct Scene {
	/// Combine options (defaults to parallel on the shared pool).
	#[serde(default)]
	pub combine: CombineSection,
	/// Placed objects, in enumeration order.
	#[serde(default)]
	pub objects: Vec<SceneObject>,
}

/// `[combine]` table.
#[derive(Debug, Default, Deserialize)]
pub struct CombineSection {
	#[serde(default)]
	pub strategy: StrategyName,
	/// Dedicated worker count for the parallel strategy.
	pub threads: Option<usize>,
	#[serde(default)]
	pub allow_empty: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyName {
	Sequential,
	#[default]
	Parallel,
}

/// Built-in mesh shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
	/// Single triangle in the XY plane.
	Triangle,
	/// Unit quad in the XY plane, centered on the origin.
	Quad,
	/// Unit cube centered on the origin, 4 vertices per face.
	Cube,
}

/// One placed mesh.
#[derive(Debug, Deserialize)]
pub struct SceneObject {
	pub name: String,
	/// Optional tag used by the exclusion filter.
	pub tag: Option<String>,
	pub primitive: Primitive,
	#[serde(default)]
	pub translation: [f32; 3],
	/// Intrinsic XYZ Euler angles in degrees (`Rx * Ry * Rz`): a vertex is
	/// rotated about Z first, then Y, then X.
	#[serde(default)]
	pub rotation: [f32; 3],
	#[serde(default = "default_scale")]
	pub scale: [f32; 3],
	/// Force a 32-bit index buffer even when 16 bits suffice.
	#[serde(default)]
	pub wide_indices: bool,
}

fn default_scale() -> [f32; 3] {
	[1.0; 3]
}

impl Scene {
	/// Load a scene from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read scene file: {}", path.display()))?;
		Self::parse(&content)
	}

	pub fn parse(content: &str) -> Result<Self> {
		let scene: Scene = toml::from_str(content).context("Failed to parse scene TOML")?;

		if scene.combine.threads == Some(0) {
			anyhow::bail!("combine.threads must be at least 1");
		}
		for object in &scene.objects {
			if object.scale.contains(&0.0) {
				anyhow::bail!("object '{}' has a zero scale component", object.name);
			}
		}

		Ok(scene)
	}

	/// Objects that pass the exclusion filter, in scene order.
	pub fn included<'a>(
		&'a self,
		excluded_tags: &'a [String],
	) -> impl Iterator<Item = &'a SceneObject> + 'a {
		self.objects
			.iter()
			.filter(move |object| is_included(object, excluded_tags))
	}
}

/// Filter predicate: drop objects whose tag is excluded.
pub fn is_included(object: &SceneObject, excluded_tags: &[String]) -> bool {
	match &object.tag {
		Some(tag) => !excluded_tags.iter().any(|excluded| excluded == tag),
		None => true,
	}
}

impl CombineSection {
	pub fn to_config(&self) -> CombineConfig {
		let strategy = match self.strategy {
			StrategyName::Sequential => ExecutionStrategy::Sequential,
			StrategyName::Parallel => ExecutionStrategy::Parallel {
				threads: self.threads,
			},
		};
		CombineConfig::default()
			.with_strategy(strategy)
			.with_allow_empty(self.allow_empty)
	}
}

impl SceneObject {
	/// Local-to-world matrix (scale, then rotation, then translation).
	pub fn transform(&self) -> Mat4 {
		let [rx, ry, rz] = self.rotation.map(f32::to_radians);
		Mat4::from_scale_rotation_translation(
			Vec3::from_array(self.scale),
			Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
			Vec3::from_array(self.translation),
		)
	}

	/// Build the object's mesh with its transform attached.
	pub fn to_mesh(&self) -> MeshData {
		let (positions, normals, indices) = self.primitive.geometry();
		let indices = if self.wide_indices {
			Indices::U32(indices)
		} else {
			Indices::from_u32(indices, positions.len())
		};
		MeshData::new(positions, normals, indices).with_transform(self.transform())
	}
}

impl Primitive {
	fn geometry(self) -> (Vec<Vec3>, Vec<Vec3>, Vec<u32>) {
		match self {
			Primitive::Triangle => (
				vec![Vec3::ZERO, Vec3::X, Vec3::Y],
				vec![Vec3::Z; 3],
				vec![0, 1, 2],
			),
			Primitive::Quad => (
				vec![
					Vec3::new(-0.5, -0.5, 0.0),
					Vec3::new(0.5, -0.5, 0.0),
					Vec3::new(0.5, 0.5, 0.0),
					Vec3::new(-0.5, 0.5, 0.0),
				],
				vec![Vec3::Z; 4],
				vec![0, 1, 2, 0, 2, 3],
			),
			Primitive::Cube => cube(),
		}
	}
}

fn cube() -> (Vec<Vec3>, Vec<Vec3>, Vec<u32>) {
	// (normal, tangent u, tangent v) with u × v = normal for CCW winding.
	const FACES: [(Vec3, Vec3, Vec3); 6] = [
		(Vec3::X, Vec3::NEG_Z, Vec3::Y),
		(Vec3::NEG_X, Vec3::Z, Vec3::Y),
		(Vec3::Y, Vec3::X, Vec3::NEG_Z),
		(Vec3::NEG_Y, Vec3::X, Vec3::Z),
		(Vec3::Z, Vec3::X, Vec3::Y),
		(Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
	];

	let mut positions = Vec::with_capacity(24);
	let mut normals = Vec::with_capacity(24);
	let mut indices = Vec::with_capacity(36);

	for (normal, u, v) in FACES {
		let base = positions.len() as u32;
		for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
			positions.push(normal * 0.5 + u * su + v * sv);
			normals.push(normal);
		}
		indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
	}

	(positions, normals, indices)
}

#[cfg(test)]
mod tests {
	use super::*;

	const DEMO: &str = r#"
[combine]
strategy = "sequential"

[[objects]]
name = "floor"
primitive = "quad"
rotation = [-90.0, 0.0, 0.0]
scale = [10.0, 10.0, 1.0]

[[objects]]
name = "gizmo"
tag = "EditorOnly"
primitive = "triangle"

[[objects]]
name = "crate"
tag = "Props"
primitive = "cube"
translation = [2.0, 0.5, 0.0]
wide_indices = true
"#;

	#[test]
	fn test_parse_demo_scene() {
		let scene = Scene::parse(DEMO).unwrap();
		assert_eq!(scene.objects.len(), 3);
		assert_eq!(scene.combine.strategy, StrategyName::Sequential);
		assert_eq!(scene.objects[0].scale, [10.0, 10.0, 1.0]);
		assert_eq!(scene.objects[1].scale, [1.0; 3]);
		assert_eq!(scene.objects[2].primitive, Primitive::Cube);
		assert!(scene.objects[2].wide_indices);
	}

	#[test]
	fn test_missing_sections_default() {
		let scene = Scene::parse("").unwrap();
		assert!(scene.objects.is_empty());
		let config = scene.combine.to_config();
		assert_eq!(config.strategy, ExecutionStrategy::Parallel { threads: None });
		assert!(!config.allow_empty);
	}

	#[test]
	fn test_rejects_bad_scene() {
		assert!(Scene::parse("[combine]\nthreads = 0\n").is_err());
		assert!(Scene::parse("[[objects]]\nname = \"x\"\nprimitive = \"torus\"\n").is_err());
		assert!(
			Scene::parse("[[objects]]\nname = \"x\"\nprimitive = \"cube\"\nscale = [1.0, 0.0, 1.0]\n")
				.is_err()
		);
	}

	#[test]
	fn test_filter_excludes_tagged_objects() {
		let scene = Scene::parse(DEMO).unwrap();

		let excluded = vec![DEFAULT_EXCLUDED_TAG.to_string()];
		let names: Vec<_> = scene.included(&excluded).map(|o| o.name.as_str()).collect();
		assert_eq!(names, ["floor", "crate"]);

		let excluded = vec!["EditorOnly".to_string(), "Props".to_string()];
		let names: Vec<_> = scene.included(&excluded).map(|o| o.name.as_str()).collect();
		assert_eq!(names, ["floor"]);

		let names: Vec<_> = scene.included(&[]).map(|o| o.name.as_str()).collect();
		assert_eq!(names, ["floor", "gizmo", "crate"]);
	}

	#[test]
	fn test_transform_order() {
		let scene = Scene::parse(DEMO).unwrap();
		let floor = scene.objects[0].transform();

		// Quad corner (0.5, 0.5, 0) scaled to (5, 5, 0), then rotated onto the XZ plane.
		let corner = floor.transform_point3(Vec3::new(0.5, 0.5, 0.0));
		assert!((corner - Vec3::new(5.0, 0.0, -5.0)).length() < 1e-4, "{corner}");

		let crate_transform = scene.objects[2].transform();
		assert_eq!(crate_transform.transform_point3(Vec3::ZERO), Vec3::new(2.0, 0.5, 0.0));
	}

	#[test]
	fn test_euler_rotation_order() {
		let object = SceneObject {
			name: "tilted".into(),
			tag: None,
			primitive: Primitive::Triangle,
			translation: [0.0; 3],
			rotation: [90.0, 90.0, 0.0],
			scale: [1.0; 3],
			wide_indices: false,
		};

		// Y first sends +X to -Z, then X sends -Z to +Y.
		let rotated = object.transform().transform_vector3(Vec3::X);
		assert!((rotated - Vec3::Y).length() < 1e-5, "{rotated}");
	}

	#[test]
	fn test_primitive_meshes() {
		let scene = Scene::parse(DEMO).unwrap();

		let quad = scene.objects[0].to_mesh();
		assert_eq!(quad.positions.len(), 4);
		assert!(matches!(quad.indices, Indices::U16(_)));

		let cube = scene.objects[2].to_mesh();
		assert_eq!(cube.positions.len(), 24);
		assert_eq!(cube.indices.len(), 36);
		assert!(matches!(cube.indices, Indices::U32(_)));
	}

	#[test]
	fn test_cube_winding_matches_normals() {
		let (positions, normals, indices) = cube();
		for tri in indices.chunks(3) {
			let [a, b, c] = [0, 1, 2].map(|i| positions[tri[i] as usize]);
			let face_normal = (b - a).cross(c - a).normalize();
			assert!(face_normal.dot(normals[tri[0] as usize]) > 0.99);
		}
	}
}
