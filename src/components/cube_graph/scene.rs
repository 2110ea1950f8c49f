//! The renderer seam and the built-in scene that sits behind it.
//!
//! Core components only talk to [`Renderer`]: they add and remove nodes,
//! push material/label changes, and ask for ray casts. [`Scene`] is the
//! implementation the canvas draws from; it owns the camera and the two layer
//! transforms (cube and hypercube).

use std::collections::BTreeMap;

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

use super::geometry::{Collider, Cylinder, Ray};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
	Cube,
	Hypercube,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

impl Color {
	pub const fn hex(value: u32) -> Self {
		Self {
			r: (value >> 16) as u8,
			g: (value >> 8) as u8,
			b: value as u8,
		}
	}

	pub fn css(&self, alpha: f64) -> String {
		format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, alpha)
	}
}

/// Visual attributes; the only thing selection highlighting may touch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
	pub color: Color,
	pub opacity: f32,
	pub scale: f32,
}

impl Material {
	pub const fn new(color: Color, opacity: f32) -> Self {
		Self {
			color,
			opacity,
			scale: 1.0,
		}
	}

	pub const INVISIBLE: Self = Self::new(Color::hex(0x000000), 0.0);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IconCategory {
	Planet,
	Trigram,
	Sign,
}

impl IconCategory {
	pub fn dir(&self) -> &'static str {
		match self {
			IconCategory::Planet => "planets",
			IconCategory::Trigram => "trigrams",
			IconCategory::Sign => "signs",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IconKey {
	pub category: IconCategory,
	pub symbol: String,
}

impl IconKey {
	/// Relative asset path, named after the symbol's code points.
	pub fn path(&self) -> String {
		let stem = self
			.symbol
			.chars()
			.map(|c| format!("{:x}", c as u32))
			.collect::<Vec<_>>()
			.join("-");
		format!("{}/{}.svg", self.category.dir(), stem)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Icon {
	pub key: IconKey,
	pub url: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LabelIcon {
	None,
	/// Image requested; the symbol text is shown until it arrives.
	Pending(IconKey),
	Loaded(Icon),
	/// Image failed; the symbol text is shown for good.
	Placeholder(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelStyle {
	/// Round badge centred on a vertex.
	Badge,
	/// Boxed text floating around a vertex.
	Satellite,
	/// Boxed tag at an edge midpoint.
	Tag,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelContent {
	pub style: LabelStyle,
	pub text: String,
	pub color: Color,
	pub icon: LabelIcon,
}

impl LabelContent {
	/// Text drawn in place of the icon when no image is available.
	pub fn glyph(&self) -> Option<&str> {
		match &self.icon {
			LabelIcon::Pending(key) => Some(&key.symbol),
			LabelIcon::Placeholder(text) => Some(text),
			LabelIcon::None | LabelIcon::Loaded(_) => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
	Sphere { center: Vec3, radius: f32 },
	Tube { from: Vec3, to: Vec3, radius: f32 },
	Line { from: Vec3, to: Vec3 },
	/// Invisible stand-in used only for ray casts.
	Collider(Collider),
	Label { anchor: Vec3, content: LabelContent },
}

impl Geometry {
	pub fn collider(&self) -> Option<Collider> {
		match self {
			Geometry::Sphere { center, radius } => Some(Collider::Sphere {
				center: *center,
				radius: *radius,
			}),
			Geometry::Tube { from, to, radius } => {
				Some(Collider::Cylinder(Cylinder::between(*from, *to, *radius)))
			}
			Geometry::Collider(collider) => Some(*collider),
			Geometry::Line { .. } | Geometry::Label { .. } => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
	pub layer: Layer,
	pub geometry: Geometry,
	pub material: Material,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
	pub node: NodeId,
	pub distance: f32,
}

/// What the core needs from whatever draws the scene.
pub trait Renderer {
	fn add_node(&mut self, node: SceneNode) -> NodeId;
	fn remove_node(&mut self, id: NodeId) -> Option<SceneNode>;
	fn set_material(&mut self, id: NodeId, material: Material);
	fn set_label(&mut self, id: NodeId, content: LabelContent);
	/// Hits among `targets` along the ray through `ndc`, nearest first.
	fn cast_ray(&self, ndc: Vec2, targets: &[NodeId]) -> Vec<RayHit>;
	/// Pixel position (relative to the canvas) to normalized device coordinates.
	fn pointer_to_ndc(&self, pointer: Vec2) -> Vec2;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
	pub position: Vec3,
	pub target: Vec3,
	pub fov_y: f32,
	pub aspect: f32,
	pub near: f32,
	pub far: f32,
}

impl Camera {
	pub fn new(aspect: f32) -> Self {
		Self {
			position: Vec3::new(5.0, 4.0, 6.0),
			target: Vec3::ZERO,
			fov_y: 75f32.to_radians(),
			aspect,
			near: 0.1,
			far: 1000.0,
		}
	}

	pub fn view(&self) -> Mat4 {
		Mat4::look_at_rh(self.position, self.target, Vec3::Y)
	}

	pub fn view_projection(&self) -> Mat4 {
		Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far) * self.view()
	}

	/// World-space ray from the near plane through `ndc`.
	pub fn ray(&self, ndc: Vec2) -> Ray {
		let inverse = self.view_projection().inverse();
		let near = inverse.project_point3(ndc.extend(0.0));
		let far = inverse.project_point3(ndc.extend(1.0));
		Ray::new(near, far - near)
	}

	/// NDC of a world point, or `None` behind the camera.
	pub fn project(&self, world: Vec3) -> Option<Vec3> {
		let clip = self.view_projection() * world.extend(1.0);
		(clip.w > self.near).then(|| clip.truncate() / clip.w)
	}

	/// Distance in front of the camera along its view axis.
	pub fn depth(&self, world: Vec3) -> f32 {
		-(self.view().transform_point3(world)).z
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerTransform {
	pub offset: Vec3,
	/// Euler angles (XYZ order), radians.
	pub angles: Vec3,
	pub visible: bool,
}

impl LayerTransform {
	pub fn at(offset: Vec3) -> Self {
		Self {
			offset,
			angles: Vec3::ZERO,
			visible: true,
		}
	}

	pub fn rotation(&self) -> Quat {
		Quat::from_euler(EulerRot::XYZ, self.angles.x, self.angles.y, self.angles.z)
	}

	pub fn to_world(&self, local: Vec3) -> Vec3 {
		self.rotation() * local + self.offset
	}
}

pub struct Scene {
	nodes: BTreeMap<NodeId, SceneNode>,
	next_id: u32,
	pub camera: Camera,
	cube: LayerTransform,
	hypercube: LayerTransform,
	pub width: f64,
	pub height: f64,
}

impl Scene {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			nodes: BTreeMap::new(),
			next_id: 0,
			camera: Camera::new((width / height.max(1.0)) as f32),
			cube: LayerTransform::at(Vec3::ZERO),
			hypercube: LayerTransform::at(Vec3::ZERO),
			width,
			height,
		}
	}

	pub fn layer(&self, layer: Layer) -> &LayerTransform {
		match layer {
			Layer::Cube => &self.cube,
			Layer::Hypercube => &self.hypercube,
		}
	}

	pub fn layer_mut(&mut self, layer: Layer) -> &mut LayerTransform {
		match layer {
			Layer::Cube => &mut self.cube,
			Layer::Hypercube => &mut self.hypercube,
		}
	}

	pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
		self.nodes.get(&id)
	}

	/// Nodes in insertion order.
	pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
		self.nodes.iter().map(|(id, node)| (*id, node))
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Canvas pixel position of a point in `layer`'s local space.
	pub fn to_screen(&self, layer: Layer, local: Vec3) -> Option<Vec2> {
		let ndc = self.camera.project(self.layer(layer).to_world(local))?;
		Some(Vec2::new(
			(ndc.x + 1.0) * 0.5 * self.width as f32,
			(1.0 - ndc.y) * 0.5 * self.height as f32,
		))
	}

	/// How many pixels one world unit spans at `world`'s depth.
	pub fn pixels_per_unit(&self, world: Vec3) -> f32 {
		let depth = self.camera.depth(world).max(self.camera.near);
		(self.height as f32 * 0.5) / ((self.camera.fov_y * 0.5).tan() * depth)
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.camera.aspect = (width / height.max(1.0)) as f32;
	}
}

impl Renderer for Scene {
	fn add_node(&mut self, node: SceneNode) -> NodeId {
		let id = NodeId(self.next_id);
		self.next_id += 1;
		self.nodes.insert(id, node);
		id
	}

	fn remove_node(&mut self, id: NodeId) -> Option<SceneNode> {
		self.nodes.remove(&id)
	}

	fn set_material(&mut self, id: NodeId, material: Material) {
		if let Some(node) = self.nodes.get_mut(&id) {
			node.material = material;
		}
	}

	fn set_label(&mut self, id: NodeId, content: LabelContent) {
		if let Some(SceneNode {
			geometry: Geometry::Label { content: slot, .. },
			..
		}) = self.nodes.get_mut(&id)
		{
			*slot = content;
		}
	}

	fn cast_ray(&self, ndc: Vec2, targets: &[NodeId]) -> Vec<RayHit> {
		let ray = self.camera.ray(ndc);
		let mut hits: Vec<RayHit> = targets
			.iter()
			.filter_map(|&id| {
				let node = self.nodes.get(&id)?;
				let layer = self.layer(node.layer);
				if !layer.visible {
					return None;
				}
				let local = ray.into_local(layer.rotation(), layer.offset);
				let distance = node.geometry.collider()?.intersect(&local)?;
				Some(RayHit { node: id, distance })
			})
			.collect();
		// stable: equal distances keep target order
		hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
		hits
	}

	fn pointer_to_ndc(&self, pointer: Vec2) -> Vec2 {
		Vec2::new(
			pointer.x / self.width as f32 * 2.0 - 1.0,
			-(pointer.y / self.height as f32) * 2.0 + 1.0,
		)
	}
}
