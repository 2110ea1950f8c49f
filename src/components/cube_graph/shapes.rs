//! Scene construction for the graph: one decorative shape and one larger,
//! invisible hit proxy per vertex and edge, floating labels, and the
//! decorative hypercube layer.
//!
//! Highlighting only ever rewrites decorative materials; identity used by
//! picking lives on the hit proxies.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use glam::Vec3;
use log::{debug, info, warn};
use thiserror::Error;

use super::geometry::{Collider, Cylinder};
use super::model::GraphModel;
use super::projector::{NCube, ProjectionError, Projector};
use super::scene::{
	Color, Geometry, Icon, IconCategory, IconKey, LabelContent, LabelIcon, LabelStyle, Layer,
	Material, NodeId, Renderer, SceneNode,
};
use super::types::{EdgeId, EntityRef, VertexId};

pub const VERTEX_RADIUS: f32 = 0.08;
pub const VERTEX_HIT_RADIUS: f32 = 0.16;
pub const EDGE_RADIUS: f32 = 0.018;
pub const EDGE_HIT_RADIUS: f32 = 0.07;
pub const HYPERCUBE_VERTEX_RADIUS: f32 = 0.08;

const SATELLITE_ABOVE: Vec3 = Vec3::new(0.0, 0.26, 0.0);
const SATELLITE_RIGHT: Vec3 = Vec3::new(0.38, 0.10, 0.0);
const SATELLITE_BELOW: Vec3 = Vec3::new(0.0, -0.26, 0.0);
const EDGE_TAG_LIFT: Vec3 = Vec3::new(0.0, 0.14, 0.0);

const VERTEX_MATERIAL: Material = Material::new(Color::hex(0x5577aa), 0.9);
const EDGE_MATERIAL: Material = Material::new(Color::hex(0x223344), 0.85);
const HYPERCUBE_VERTEX_MATERIAL: Material = Material::new(Color::hex(0x9d4edd), 0.6);
const HYPERCUBE_EDGE_MATERIAL: Material = Material::new(Color::hex(0x9d4edd), 0.4);

const PIVOT_COLOR: Color = Color::hex(0xffd93d);
const PARTNER_COLOR: Color = Color::hex(0xff9f43);
const ACTIVE_EDGE_COLOR: Color = Color::hex(0x6bcf7f);

const NUMBER_INK: Color = Color::hex(0x6b0a3a);
const TRIGRAM_INK: Color = Color::hex(0x0a1a3a);
const VESSEL_INK: Color = Color::hex(0x0a2010);
const SYMBOL_INK: Color = Color::hex(0x000000);
const TAG_INK: Color = Color::hex(0x0a0a0a);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Highlight {
	#[default]
	None,
	Pivot,
	Partner,
	ActiveEdge,
}

impl Highlight {
	fn apply(self, base: Material) -> Material {
		match self {
			Highlight::None => base,
			Highlight::Pivot => Material {
				color: PIVOT_COLOR,
				opacity: 1.0,
				scale: 1.4,
			},
			Highlight::Partner => Material {
				color: PARTNER_COLOR,
				opacity: 1.0,
				scale: 1.25,
			},
			Highlight::ActiveEdge => Material {
				color: ACTIVE_EDGE_COLOR,
				opacity: 1.0,
				scale: 1.6,
			},
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Decorative {
	pub node: NodeId,
	base: Material,
	material: Material,
	highlight: Highlight,
}

impl Decorative {
	fn new(node: NodeId, base: Material) -> Self {
		Self {
			node,
			base,
			material: base,
			highlight: Highlight::None,
		}
	}

	pub fn material(&self) -> Material {
		self.material
	}

	pub fn highlight(&self) -> Highlight {
		self.highlight
	}
}

/// The ray-cast stand-in for an entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitProxy {
	pub node: NodeId,
	pub entity: EntityRef,
	pub decorative: NodeId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VertexProxy {
	pub vertex: VertexId,
	pub position: Vec3,
	pub decorative: Decorative,
	pub hit: HitProxy,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeProxy {
	pub edge: EdgeId,
	pub endpoints: (VertexId, VertexId),
	pub decorative: Decorative,
	pub hit: HitProxy,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IconError {
	#[error("icon {0} is unavailable")]
	Unavailable(String),
}

struct LabelProxy {
	node: NodeId,
	content: LabelContent,
	dirty: bool,
}

struct LabelBoard {
	labels: Vec<LabelProxy>,
	alive: bool,
}

/// A pending icon fetch for one label. Completing it after the builder has
/// been disposed (or dropped) does nothing.
pub struct IconRequest {
	pub key: IconKey,
	pub url: String,
	label: usize,
	board: Weak<RefCell<LabelBoard>>,
}

impl IconRequest {
	/// Apply the outcome to the label; a failure swaps in the text
	/// placeholder. Returns whether the label was still there to update.
	pub fn complete(self, outcome: Result<(), IconError>) -> bool {
		let Some(board) = self.board.upgrade() else {
			debug!("Icon {} arrived after its labels were dropped", self.url);
			return false;
		};
		let mut board = board.borrow_mut();
		if !board.alive {
			debug!("Icon {} arrived after disposal", self.url);
			return false;
		}
		let Some(label) = board.labels.get_mut(self.label) else {
			return false;
		};
		label.content.icon = match outcome {
			Ok(()) => LabelIcon::Loaded(Icon {
				key: self.key,
				url: self.url,
			}),
			Err(err) => {
				warn!("{err}; using text placeholder");
				LabelIcon::Placeholder(self.key.symbol)
			}
		};
		label.dirty = true;
		true
	}
}

/// Fire-and-forget icon fetching. Implementations call
/// [`IconRequest::complete`] whenever the asset settles.
pub trait IconLoader {
	fn load(&mut self, request: IconRequest);
}

pub struct ShapeBuilder {
	vertices: Vec<VertexProxy>,
	edges: Vec<EdgeProxy>,
	vertex_index: HashMap<VertexId, usize>,
	edge_index: HashMap<EdgeId, usize>,
	hit_index: HashMap<NodeId, EntityRef>,
	labels: Rc<RefCell<LabelBoard>>,
	hypercube: Vec<NodeId>,
	disposed: bool,
}

impl ShapeBuilder {
	pub fn build(model: &GraphModel, renderer: &mut dyn Renderer) -> Self {
		let mut builder = Self {
			vertices: Vec::with_capacity(model.vertices().len()),
			edges: Vec::with_capacity(model.edges().len()),
			vertex_index: HashMap::new(),
			edge_index: HashMap::new(),
			hit_index: HashMap::new(),
			labels: Rc::new(RefCell::new(LabelBoard {
				labels: Vec::new(),
				alive: true,
			})),
			hypercube: Vec::new(),
			disposed: false,
		};

		for vertex in model.vertices() {
			let position = Vec3::from_array(vertex.position);
			let decorative = renderer.add_node(SceneNode {
				layer: Layer::Cube,
				geometry: Geometry::Sphere {
					center: position,
					radius: VERTEX_RADIUS,
				},
				material: VERTEX_MATERIAL,
			});
			let entity = EntityRef::Vertex(vertex.id);
			let hit = builder.add_hit_proxy(
				renderer,
				Collider::Sphere {
					center: position,
					radius: VERTEX_HIT_RADIUS,
				},
				entity,
				decorative,
			);
			builder.vertex_index.insert(vertex.id, builder.vertices.len());
			builder.vertices.push(VertexProxy {
				vertex: vertex.id,
				position,
				decorative: Decorative::new(decorative, VERTEX_MATERIAL),
				hit,
			});

			if let Some(planet) = &vertex.planet {
				builder.add_label(renderer, position, LabelContent {
					style: LabelStyle::Badge,
					text: planet.clone(),
					color: SYMBOL_INK,
					icon: LabelIcon::Pending(IconKey {
						category: IconCategory::Planet,
						symbol: planet.clone(),
					}),
				});
			}
			if let Some(number) = &vertex.number {
				builder.add_label(renderer, position + SATELLITE_ABOVE, LabelContent {
					style: LabelStyle::Satellite,
					text: number.clone(),
					color: NUMBER_INK,
					icon: LabelIcon::None,
				});
			}
			if let Some(trigram) = &vertex.trigram {
				builder.add_label(renderer, position + SATELLITE_RIGHT, LabelContent {
					style: LabelStyle::Satellite,
					text: vertex.trigram_name.clone().unwrap_or_default(),
					color: TRIGRAM_INK,
					icon: LabelIcon::Pending(IconKey {
						category: IconCategory::Trigram,
						symbol: trigram.clone(),
					}),
				});
			}
			if let Some(vessel) = &vertex.vessel {
				builder.add_label(renderer, position + SATELLITE_BELOW, LabelContent {
					style: LabelStyle::Satellite,
					text: vessel.clone(),
					color: VESSEL_INK,
					icon: LabelIcon::None,
				});
			}
		}

		for edge in model.edges() {
			let (Some(from), Some(to)) = (builder.position(edge.from), builder.position(edge.to))
			else {
				warn!("Edge {} has no built endpoints, skipping", edge.id);
				continue;
			};
			let decorative = renderer.add_node(SceneNode {
				layer: Layer::Cube,
				geometry: Geometry::Tube {
					from,
					to,
					radius: EDGE_RADIUS,
				},
				material: EDGE_MATERIAL,
			});
			let entity = EntityRef::Edge(edge.id);
			let hit = builder.add_hit_proxy(
				renderer,
				Collider::Cylinder(Cylinder::between(from, to, EDGE_HIT_RADIUS)),
				entity,
				decorative,
			);
			builder.edge_index.insert(edge.id, builder.edges.len());
			builder.edges.push(EdgeProxy {
				edge: edge.id,
				endpoints: (edge.from, edge.to),
				decorative: Decorative::new(decorative, EDGE_MATERIAL),
				hit,
			});

			if let Some(sign) = &edge.sign {
				let text = [edge.number.as_deref(), edge.vessel.as_deref()]
					.into_iter()
					.flatten()
					.collect::<Vec<_>>()
					.join("  ");
				builder.add_label(renderer, (from + to) * 0.5 + EDGE_TAG_LIFT, LabelContent {
					style: LabelStyle::Tag,
					text,
					color: TAG_INK,
					icon: LabelIcon::Pending(IconKey {
						category: IconCategory::Sign,
						symbol: sign.clone(),
					}),
				});
			}
		}

		info!(
			"Built {} vertex and {} edge proxies, {} labels",
			builder.vertices.len(),
			builder.edges.len(),
			builder.labels.borrow().labels.len()
		);
		builder
	}

	fn add_hit_proxy(
		&mut self,
		renderer: &mut dyn Renderer,
		collider: Collider,
		entity: EntityRef,
		decorative: NodeId,
	) -> HitProxy {
		let node = renderer.add_node(SceneNode {
			layer: Layer::Cube,
			geometry: Geometry::Collider(collider),
			material: Material::INVISIBLE,
		});
		self.hit_index.insert(node, entity);
		HitProxy {
			node,
			entity,
			decorative,
		}
	}

	fn add_label(&mut self, renderer: &mut dyn Renderer, anchor: Vec3, content: LabelContent) {
		let node = renderer.add_node(SceneNode {
			layer: Layer::Cube,
			geometry: Geometry::Label {
				anchor,
				content: content.clone(),
			},
			material: Material::new(content.color, 0.97),
		});
		self.labels.borrow_mut().labels.push(LabelProxy {
			node,
			content,
			dirty: false,
		});
	}

	fn position(&self, vertex: VertexId) -> Option<Vec3> {
		self.vertex_proxy(vertex).map(|p| p.position)
	}

	/// Add the projected n-cube as decorative spheres and lines on the
	/// hypercube layer. Nothing here is ever ray-cast.
	pub fn build_hypercube(
		&mut self,
		cube: &NCube,
		projector: &Projector,
		renderer: &mut dyn Renderer,
	) -> Result<usize, ProjectionError> {
		let points = cube.project(projector)?;
		for &center in &points {
			self.hypercube.push(renderer.add_node(SceneNode {
				layer: Layer::Hypercube,
				geometry: Geometry::Sphere {
					center,
					radius: HYPERCUBE_VERTEX_RADIUS,
				},
				material: HYPERCUBE_VERTEX_MATERIAL,
			}));
		}
		for &(a, b) in &cube.edges {
			self.hypercube.push(renderer.add_node(SceneNode {
				layer: Layer::Hypercube,
				geometry: Geometry::Line {
					from: points[a],
					to: points[b],
				},
				material: HYPERCUBE_EDGE_MATERIAL,
			}));
		}
		debug!(
			"Hypercube layer: {} points, {} edges",
			points.len(),
			cube.edges.len()
		);
		Ok(points.len())
	}

	pub fn vertex_proxy(&self, id: VertexId) -> Option<&VertexProxy> {
		self.vertex_index.get(&id).map(|&i| &self.vertices[i])
	}

	pub fn edge_proxy(&self, id: EdgeId) -> Option<&EdgeProxy> {
		self.edge_index.get(&id).map(|&i| &self.edges[i])
	}

	pub fn vertex_targets(&self) -> Vec<NodeId> {
		self.vertices.iter().map(|p| p.hit.node).collect()
	}

	pub fn edge_targets(&self) -> Vec<NodeId> {
		self.edges.iter().map(|p| p.hit.node).collect()
	}

	/// Follow a hit proxy back to its logical entity.
	pub fn entity_for(&self, node: NodeId) -> Option<EntityRef> {
		self.hit_index.get(&node).copied()
	}

	pub fn highlight_of(&self, entity: EntityRef) -> Highlight {
		self.decorative(entity)
			.map(Decorative::highlight)
			.unwrap_or_default()
	}

	fn decorative(&self, entity: EntityRef) -> Option<&Decorative> {
		match entity {
			EntityRef::Vertex(id) => self.vertex_proxy(id).map(|p| &p.decorative),
			EntityRef::Edge(id) => self.edge_proxy(id).map(|p| &p.decorative),
		}
	}

	fn decorative_mut(&mut self, entity: EntityRef) -> Option<&mut Decorative> {
		match entity {
			EntityRef::Vertex(id) => {
				let i = *self.vertex_index.get(&id)?;
				Some(&mut self.vertices[i].decorative)
			}
			EntityRef::Edge(id) => {
				let i = *self.edge_index.get(&id)?;
				Some(&mut self.edges[i].decorative)
			}
		}
	}

	/// Restyle an entity's decorative shape. Returns `false` (and touches
	/// nothing) when the entity already carries that highlight.
	pub fn set_highlight(
		&mut self,
		entity: EntityRef,
		highlight: Highlight,
		renderer: &mut dyn Renderer,
	) -> bool {
		let Some(decorative) = self.decorative_mut(entity) else {
			return false;
		};
		if decorative.highlight == highlight {
			return false;
		}
		decorative.highlight = highlight;
		decorative.material = highlight.apply(decorative.base);
		renderer.set_material(decorative.node, decorative.material);
		true
	}

	pub fn set_edge_opacity(&mut self, edge: EdgeId, opacity: f32, renderer: &mut dyn Renderer) {
		if let Some(decorative) = self.decorative_mut(EntityRef::Edge(edge)) {
			decorative.material.opacity = opacity;
			renderer.set_material(decorative.node, decorative.material);
		}
	}

	/// Hand every label's icon to `loader`. Never waits on the result.
	pub fn request_icons(&self, base_url: &str, loader: &mut dyn IconLoader) -> usize {
		let requests: Vec<IconRequest> = {
			let board = self.labels.borrow();
			if !board.alive {
				return 0;
			}
			board
				.labels
				.iter()
				.enumerate()
				.filter_map(|(i, label)| match &label.content.icon {
					LabelIcon::Pending(key) => Some(IconRequest {
						url: format!("{}/{}", base_url.trim_end_matches('/'), key.path()),
						key: key.clone(),
						label: i,
						board: Rc::downgrade(&self.labels),
					}),
					_ => None,
				})
				.collect()
		};
		let count = requests.len();
		for request in requests {
			loader.load(request);
		}
		count
	}

	/// Push labels changed by icon completions to the renderer.
	pub fn sync_labels(&mut self, renderer: &mut dyn Renderer) -> usize {
		let mut board = self.labels.borrow_mut();
		let mut pushed = 0;
		for label in board.labels.iter_mut().filter(|l| l.dirty) {
			label.dirty = false;
			renderer.set_label(label.node, label.content.clone());
			pushed += 1;
		}
		pushed
	}

	pub fn labels(&self) -> Vec<LabelContent> {
		self.labels
			.borrow()
			.labels
			.iter()
			.map(|l| l.content.clone())
			.collect()
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed
	}

	/// Remove every node this builder added, exactly once. Later calls are
	/// no-ops and return `false`.
	pub fn dispose(&mut self, renderer: &mut dyn Renderer) -> bool {
		if self.disposed {
			debug!("Shapes already disposed");
			return false;
		}
		self.disposed = true;

		let mut released = 0;
		{
			let mut board = self.labels.borrow_mut();
			board.alive = false;
			for label in board.labels.drain(..) {
				renderer.remove_node(label.node);
				released += 1;
			}
		}
		for proxy in self.vertices.drain(..) {
			renderer.remove_node(proxy.decorative.node);
			renderer.remove_node(proxy.hit.node);
			released += 2;
		}
		for proxy in self.edges.drain(..) {
			renderer.remove_node(proxy.decorative.node);
			renderer.remove_node(proxy.hit.node);
			released += 2;
		}
		for node in self.hypercube.drain(..) {
			renderer.remove_node(node);
			released += 1;
		}
		self.vertex_index.clear();
		self.edge_index.clear();
		self.hit_index.clear();
		info!("Released {released} scene nodes");
		true
	}
}
