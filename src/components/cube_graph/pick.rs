//! Pointer-to-entity resolution.

use glam::Vec2;
use log::debug;

use super::scene::{NodeId, Renderer};
use super::shapes::ShapeBuilder;
use super::types::{EdgeId, EntityRef, VertexId};

/// Press/release displacement, in pixels, above which a click is a drag.
pub const DRAG_THRESHOLD_PX: f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pick {
	Vertex(VertexId),
	Edge(EdgeId),
	Nothing,
}

/// What is under the pointer right now. Vertex and edge are resolved
/// independently.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Hover {
	pub vertex: Option<VertexId>,
	pub edge: Option<EdgeId>,
	pub pointer: Vec2,
}

impl Hover {
	/// The entity a tooltip would describe; a vertex shadows an edge.
	pub fn entity(&self) -> Option<EntityRef> {
		self.vertex
			.map(EntityRef::Vertex)
			.or(self.edge.map(EntityRef::Edge))
	}
}

#[derive(Clone, Debug)]
pub struct PickEngine {
	threshold: f32,
	pressed_at: Option<Vec2>,
}

impl Default for PickEngine {
	fn default() -> Self {
		Self::new(DRAG_THRESHOLD_PX)
	}
}

impl PickEngine {
	pub fn new(threshold: f32) -> Self {
		Self {
			threshold,
			pressed_at: None,
		}
	}

	fn first_hit(
		pointer: Vec2,
		targets: &[NodeId],
		shapes: &ShapeBuilder,
		renderer: &dyn Renderer,
	) -> Option<EntityRef> {
		let ndc = renderer.pointer_to_ndc(pointer);
		renderer
			.cast_ray(ndc, targets)
			.into_iter()
			.find_map(|hit| shapes.entity_for(hit.node))
	}

	/// Vertices are cast first; an edge is only reported when no vertex is
	/// struck.
	pub fn pick(&self, pointer: Vec2, shapes: &ShapeBuilder, renderer: &dyn Renderer) -> Pick {
		let hit = Self::first_hit(pointer, &shapes.vertex_targets(), shapes, renderer)
			.or_else(|| Self::first_hit(pointer, &shapes.edge_targets(), shapes, renderer));
		match hit {
			Some(EntityRef::Vertex(id)) => Pick::Vertex(id),
			Some(EntityRef::Edge(id)) => Pick::Edge(id),
			None => Pick::Nothing,
		}
	}

	pub fn hover(&self, pointer: Vec2, shapes: &ShapeBuilder, renderer: &dyn Renderer) -> Hover {
		let vertex = match Self::first_hit(pointer, &shapes.vertex_targets(), shapes, renderer) {
			Some(EntityRef::Vertex(id)) => Some(id),
			_ => None,
		};
		let edge = match Self::first_hit(pointer, &shapes.edge_targets(), shapes, renderer) {
			Some(EntityRef::Edge(id)) => Some(id),
			_ => None,
		};
		Hover {
			vertex,
			edge,
			pointer,
		}
	}

	pub fn press(&mut self, pointer: Vec2) {
		self.pressed_at = Some(pointer);
	}

	pub fn is_pressed(&self) -> bool {
		self.pressed_at.is_some()
	}

	/// Whether the pointer has left the click radius of the current press.
	pub fn is_drag(&self, pointer: Vec2) -> bool {
		self.pressed_at
			.is_some_and(|start| start.distance(pointer) > self.threshold)
	}

	/// End a press. Returns `None` when the gesture was a drag (or there was
	/// no press), otherwise the pick at the release position.
	pub fn release(
		&mut self,
		pointer: Vec2,
		shapes: &ShapeBuilder,
		renderer: &dyn Renderer,
	) -> Option<Pick> {
		let start = self.pressed_at.take()?;
		let moved = start.distance(pointer);
		if moved > self.threshold {
			debug!("Click discarded as drag ({moved:.1}px)");
			return None;
		}
		Some(self.pick(pointer, shapes, renderer))
	}

	pub fn cancel(&mut self) {
		self.pressed_at = None;
	}
}
