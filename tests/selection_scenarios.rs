use std::cell::RefCell;
use std::rc::Rc;

use cube_graph_canvas::components::cube_graph::scene::{
	LabelContent, Layer, Material, NodeId, RayHit, Renderer, Scene, SceneNode,
};
use cube_graph_canvas::components::cube_graph::shapes::{Highlight, ShapeBuilder};
use cube_graph_canvas::components::cube_graph::{
	AppState, CubeGraphState, EntityRef, GraphModel, Pick, PickEngine, Selection,
	SelectionController, VertexId, ViewerSettings,
};
use glam::{Vec2, Vec3};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Scene wrapper that counts material writes.
struct Recording {
	scene: Scene,
	material_writes: usize,
}

impl Renderer for Recording {
	fn add_node(&mut self, node: SceneNode) -> NodeId {
		self.scene.add_node(node)
	}

	fn remove_node(&mut self, id: NodeId) -> Option<SceneNode> {
		self.scene.remove_node(id)
	}

	fn set_material(&mut self, id: NodeId, material: Material) {
		self.material_writes += 1;
		self.scene.set_material(id, material);
	}

	fn set_label(&mut self, id: NodeId, content: LabelContent) {
		self.scene.set_label(id, content);
	}

	fn cast_ray(&self, ndc: Vec2, targets: &[NodeId]) -> Vec<RayHit> {
		self.scene.cast_ray(ndc, targets)
	}

	fn pointer_to_ndc(&self, pointer: Vec2) -> Vec2 {
		self.scene.pointer_to_ndc(pointer)
	}
}

struct Rig {
	model: Rc<GraphModel>,
	renderer: Recording,
	shapes: ShapeBuilder,
	controller: SelectionController,
}

impl Rig {
	fn new() -> Self {
		let model = Rc::new(GraphModel::embedded());
		let mut renderer = Recording {
			scene: Scene::new(800.0, 600.0),
			material_writes: 0,
		};
		let shapes = ShapeBuilder::build(&model, &mut renderer);
		let controller = SelectionController::new(model.clone(), AppState::default(), 50);
		Self {
			model,
			renderer,
			shapes,
			controller,
		}
	}

	fn click(&mut self, vertex: VertexId) -> Selection {
		self.controller
			.handle_pick(Pick::Vertex(vertex), &mut self.shapes, &mut self.renderer);
		self.controller.selection()
	}

	fn highlighted(&self) -> Vec<(EntityRef, Highlight)> {
		let vertices = self.model.vertices().iter().map(|v| EntityRef::Vertex(v.id));
		let edges = self.model.edges().iter().map(|e| EntityRef::Edge(e.id));
		vertices
			.chain(edges)
			.map(|entity| (entity, self.shapes.highlight_of(entity)))
			.filter(|(_, h)| *h != Highlight::None)
			.collect()
	}

	fn active_edges(&self) -> Vec<EntityRef> {
		self.highlighted()
			.into_iter()
			.filter(|(_, h)| *h == Highlight::ActiveEdge)
			.map(|(e, _)| e)
			.collect()
	}
}

#[test]
fn scenario_a_connected_pair() {
	let mut rig = Rig::new();
	rig.click(0);
	let selection = rig.click(1);
	assert_eq!(selection, Selection::TwoSelected {
		pivot: 0,
		partner: 1,
		edge: 8
	});
	assert_eq!(rig.active_edges(), vec![EntityRef::Edge(8)]);
}

#[test]
fn scenario_b_reclick_clears_everything() {
	let mut rig = Rig::new();
	rig.click(0);
	assert_eq!(rig.click(0), Selection::Idle);
	assert_eq!(rig.highlighted(), vec![]);
}

#[test]
fn scenario_c_unconnected_click_moves_pivot() {
	let mut rig = Rig::new();
	rig.click(0);
	assert_eq!(rig.click(2), Selection::OneSelected { pivot: 2 });
	assert_eq!(rig.highlighted(), vec![(EntityRef::Vertex(2), Highlight::Pivot)]);
}

#[test]
fn scenario_d_third_click_rederives_from_pivot() {
	let mut rig = Rig::new();
	rig.click(0);
	rig.click(1);
	assert_eq!(rig.click(3), Selection::TwoSelected {
		pivot: 0,
		partner: 3,
		edge: 10
	});
	assert_eq!(rig.active_edges(), vec![EntityRef::Edge(10)]);

	let mut rig = Rig::new();
	rig.click(0);
	rig.click(1);
	assert_eq!(rig.click(6), Selection::OneSelected { pivot: 6 });
	assert_eq!(rig.highlighted(), vec![(EntityRef::Vertex(6), Highlight::Pivot)]);
}

#[test]
fn reset_twice_is_idempotent() {
	let mut rig = Rig::new();
	rig.click(0);
	rig.click(1);
	assert!(rig.controller.reset(&mut rig.shapes, &mut rig.renderer));
	let (writes, history) = (rig.renderer.material_writes, rig.controller.history().len());

	assert!(!rig.controller.reset(&mut rig.shapes, &mut rig.renderer));
	assert_eq!(rig.controller.selection(), Selection::Idle);
	assert_eq!(rig.renderer.material_writes, writes);
	assert_eq!(rig.controller.history().len(), history);
	assert_eq!(rig.highlighted(), vec![]);
}

#[test]
fn nothing_struck_resets() {
	let mut rig = Rig::new();
	rig.click(0);
	rig.click(1);
	rig.controller
		.handle_pick(Pick::Nothing, &mut rig.shapes, &mut rig.renderer);
	assert_eq!(rig.controller.selection(), Selection::Idle);
	assert_eq!(rig.highlighted(), vec![]);
}

#[test]
fn subscribers_see_each_transition() {
	let mut rig = Rig::new();
	let seen = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&seen);
	let _ = rig.controller.subscribe(move |new, old| {
		sink.borrow_mut().push((old.selection, new.selection));
		Ok(())
	});
	rig.click(0);
	rig.click(0);
	assert_eq!(*seen.borrow(), vec![
		(Selection::Idle, Selection::OneSelected { pivot: 0 }),
		(Selection::OneSelected { pivot: 0 }, Selection::Idle),
	]);
}

#[test]
fn vertex_preempts_edge_at_shared_pixel() {
	let rig = Rig::new();
	let at = rig
		.renderer
		.scene
		.to_screen(Layer::Cube, Vec3::new(-1.0, 1.0, 1.0))
		.unwrap();
	let engine = PickEngine::default();
	let hover = engine.hover(at, &rig.shapes, &rig.renderer);
	assert!(hover.edge.is_some());
	assert_eq!(engine.pick(at, &rig.shapes, &rig.renderer), Pick::Vertex(0));
}

#[test]
fn drag_release_leaves_selection_alone() {
	let mut state = CubeGraphState::new(GraphModel::embedded(), &ViewerSettings::default(), 800.0, 600.0);
	let at = state
		.scene
		.to_screen(Layer::Cube, Vec3::new(-1.0, 1.0, 1.0))
		.unwrap();
	state.pointer_down(at);
	state.pointer_up(at);
	assert_eq!(state.controller.selection(), Selection::OneSelected { pivot: 0 });

	let other = state
		.scene
		.to_screen(Layer::Cube, Vec3::new(1.0, 1.0, 1.0))
		.unwrap();
	state.pointer_down(other);
	state.pointer_move(other + Vec2::new(0.0, 12.0));
	state.pointer_up(other + Vec2::new(0.0, 12.0));
	assert_eq!(state.controller.selection(), Selection::OneSelected { pivot: 0 });
}

proptest! {
	#[test]
	fn at_most_one_active_edge_and_it_matches_the_pair(
		clicks in prop::collection::vec(prop_oneof![(0u32..8).prop_map(Some), Just(None)], 1..30)
	) {
		let mut rig = Rig::new();
		for click in clicks {
			match click {
				Some(v) => {
					rig.click(v);
				}
				None => rig
					.controller
					.handle_pick(Pick::Nothing, &mut rig.shapes, &mut rig.renderer),
			}
			let selection = rig.controller.selection();
			let active = rig.active_edges();
			prop_assert!(active.len() <= 1);
			match selection {
				Selection::TwoSelected { pivot, partner, edge } => {
					prop_assert_eq!(active, vec![EntityRef::Edge(edge)]);
					prop_assert_eq!(rig.model.edge_between(pivot, partner), Some(edge));
				}
				_ => prop_assert!(active.is_empty()),
			}
			let expected: Vec<_> = selection.highlights();
			let mut actual = rig.highlighted();
			let mut expected = expected;
			actual.sort_by_key(|(e, _)| *e);
			expected.sort_by_key(|(e, _)| *e);
			prop_assert_eq!(actual, expected);
		}
	}
}
