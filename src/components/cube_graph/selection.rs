//! Two-vertex selection: the pure state machine, the application state it
//! lives in, and the controller that turns picks into transitions, highlight
//! changes and outward events.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use log::{debug, warn};
use thiserror::Error;

use super::model::GraphModel;
use super::pick::{Hover, Pick};
use super::scene::Renderer;
use super::shapes::{Highlight, ShapeBuilder};
use super::store::{Merge, ObservableStore, Subscription, Transition};
use super::types::{EdgeId, EntityRef, VertexId};

/// Angular frequency of the active-edge pulse, radians per second.
pub const PULSE_RATE: f64 = 3.0;

/// Opacity of the active edge at `seconds`; oscillates in `[0.4, 1.0]`.
pub fn pulse_opacity(seconds: f64) -> f32 {
	((seconds * PULSE_RATE).sin() * 0.3 + 0.7) as f32
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Selection {
	#[default]
	Idle,
	OneSelected {
		pivot: VertexId,
	},
	/// `edge` is always the direct edge between `pivot` and `partner`.
	TwoSelected {
		pivot: VertexId,
		partner: VertexId,
		edge: EdgeId,
	},
}

impl Selection {
	pub fn pivot(&self) -> Option<VertexId> {
		match *self {
			Selection::Idle => None,
			Selection::OneSelected { pivot } | Selection::TwoSelected { pivot, .. } => Some(pivot),
		}
	}

	pub fn partner(&self) -> Option<VertexId> {
		match *self {
			Selection::TwoSelected { partner, .. } => Some(partner),
			_ => None,
		}
	}

	pub fn active_edge(&self) -> Option<EdgeId> {
		match *self {
			Selection::TwoSelected { edge, .. } => Some(edge),
			_ => None,
		}
	}

	/// Next state after a click on vertex `v`.
	pub fn on_vertex_click(self, v: VertexId, model: &GraphModel) -> Selection {
		match self {
			Selection::Idle => Selection::OneSelected { pivot: v },
			Selection::OneSelected { pivot } if pivot == v => Selection::Idle,
			Selection::OneSelected { pivot } => Self::pair_or_restart(pivot, v, model),
			Selection::TwoSelected { pivot, partner, .. } if partner == v => {
				Selection::OneSelected { pivot }
			}
			// A re-click on the pivot lands here too and re-anchors on it.
			Selection::TwoSelected { pivot, .. } => Self::pair_or_restart(pivot, v, model),
		}
	}

	fn pair_or_restart(pivot: VertexId, v: VertexId, model: &GraphModel) -> Selection {
		match model.edge_between(pivot, v) {
			Some(edge) => Selection::TwoSelected {
				pivot,
				partner: v,
				edge,
			},
			None => Selection::OneSelected { pivot: v },
		}
	}

	/// Decorative styling implied by this state.
	pub fn highlights(&self) -> Vec<(EntityRef, Highlight)> {
		match *self {
			Selection::Idle => Vec::new(),
			Selection::OneSelected { pivot } => vec![(EntityRef::Vertex(pivot), Highlight::Pivot)],
			Selection::TwoSelected {
				pivot,
				partner,
				edge,
			} => vec![
				(EntityRef::Vertex(pivot), Highlight::Pivot),
				(EntityRef::Vertex(partner), Highlight::Partner),
				(EntityRef::Edge(edge), Highlight::ActiveEdge),
			],
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
	pub selection: Selection,
	pub hovered: Option<EntityRef>,
	pub auto_rotate: bool,
	pub show_hypercube: bool,
	pub dragging: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppStatePatch {
	pub selection: Option<Selection>,
	pub hovered: Option<Option<EntityRef>>,
	pub auto_rotate: Option<bool>,
	pub show_hypercube: Option<bool>,
	pub dragging: Option<bool>,
}

impl Merge for AppState {
	type Patch = AppStatePatch;

	fn merge(&mut self, patch: AppStatePatch) {
		if let Some(selection) = patch.selection {
			self.selection = selection;
		}
		if let Some(hovered) = patch.hovered {
			self.hovered = hovered;
		}
		if let Some(auto_rotate) = patch.auto_rotate {
			self.auto_rotate = auto_rotate;
		}
		if let Some(show_hypercube) = patch.show_hypercube {
			self.show_hypercube = show_hypercube;
		}
		if let Some(dragging) = patch.dragging {
			self.dragging = dragging;
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
	VertexClicked,
	EdgeClicked,
	HoverChanged,
	NoSelection,
}

impl EventKind {
	pub const ALL: [EventKind; 4] = [
		EventKind::VertexClicked,
		EventKind::EdgeClicked,
		EventKind::HoverChanged,
		EventKind::NoSelection,
	];

	pub fn name(&self) -> &'static str {
		match self {
			EventKind::VertexClicked => "vertex-clicked",
			EventKind::EdgeClicked => "edge-clicked",
			EventKind::HoverChanged => "hover-changed",
			EventKind::NoSelection => "no-selection",
		}
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown event `{0}`")]
pub struct UnknownEvent(pub String);

impl FromStr for EventKind {
	type Err = UnknownEvent;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		EventKind::ALL
			.into_iter()
			.find(|kind| kind.name() == s)
			.ok_or_else(|| UnknownEvent(s.to_string()))
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectionEvent {
	VertexClicked {
		vertex: VertexId,
		selection: Selection,
	},
	/// Only emitted for the active edge.
	EdgeClicked {
		edge: EdgeId,
		selection: Selection,
	},
	HoverChanged(Hover),
	NoSelection,
}

impl SelectionEvent {
	pub fn kind(&self) -> EventKind {
		match self {
			SelectionEvent::VertexClicked { .. } => EventKind::VertexClicked,
			SelectionEvent::EdgeClicked { .. } => EventKind::EdgeClicked,
			SelectionEvent::HoverChanged(_) => EventKind::HoverChanged,
			SelectionEvent::NoSelection => EventKind::NoSelection,
		}
	}
}

pub type EventHandler = Box<dyn FnMut(&SelectionEvent)>;

pub struct SelectionController {
	model: Rc<GraphModel>,
	store: ObservableStore<AppState>,
	handlers: HashMap<EventKind, EventHandler>,
	disposed: bool,
}

impl SelectionController {
	pub fn new(model: Rc<GraphModel>, initial: AppState, history_capacity: usize) -> Self {
		Self {
			model,
			store: ObservableStore::with_capacity(initial, history_capacity),
			handlers: HashMap::new(),
			disposed: false,
		}
	}

	pub fn model(&self) -> &GraphModel {
		&self.model
	}

	pub fn state(&self) -> &AppState {
		self.store.state()
	}

	pub fn selection(&self) -> Selection {
		self.store.state().selection
	}

	pub fn history(&self) -> Vec<Transition<AppState>> {
		self.store.history()
	}

	pub fn subscribe<F>(&mut self, listener: F) -> Subscription
	where
		F: FnMut(&AppState, &AppState) -> anyhow::Result<()> + 'static,
	{
		self.store.subscribe(listener)
	}

	pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
		self.store.unsubscribe(subscription)
	}

	/// Register the handler for a named event, replacing any previous one.
	/// Unknown names are ignored with a warning.
	pub fn on<F>(&mut self, name: &str, handler: F) -> bool
	where
		F: FnMut(&SelectionEvent) + 'static,
	{
		match name.parse::<EventKind>() {
			Ok(kind) => {
				self.on_kind(kind, handler);
				true
			}
			Err(err) => {
				warn!("{err}; handler ignored");
				false
			}
		}
	}

	pub fn on_kind<F>(&mut self, kind: EventKind, handler: F)
	where
		F: FnMut(&SelectionEvent) + 'static,
	{
		if self.handlers.insert(kind, Box::new(handler)).is_some() {
			debug!("Replaced {kind} handler");
		}
	}

	fn emit(&mut self, event: SelectionEvent) {
		if let Some(handler) = self.handlers.get_mut(&event.kind()) {
			handler(&event);
		}
	}

	/// Route a resolved click.
	pub fn handle_pick(&mut self, pick: Pick, shapes: &mut ShapeBuilder, renderer: &mut dyn Renderer) {
		if self.disposed {
			return;
		}
		match pick {
			Pick::Vertex(vertex) => {
				let next = self.selection().on_vertex_click(vertex, &self.model);
				self.apply(next, shapes, renderer);
				self.emit(SelectionEvent::VertexClicked {
					vertex,
					selection: next,
				});
			}
			Pick::Edge(edge) if self.selection().active_edge() == Some(edge) => {
				let selection = self.selection();
				self.emit(SelectionEvent::EdgeClicked { edge, selection });
			}
			Pick::Edge(edge) => debug!("Ignoring click on inactive edge {edge}"),
			Pick::Nothing => {
				self.reset(shapes, renderer);
				self.emit(SelectionEvent::NoSelection);
			}
		}
	}

	pub fn handle_hover(&mut self, hover: Hover) {
		if self.disposed {
			return;
		}
		let hovered = hover.entity();
		if self.state().hovered != hovered {
			self.store.set_state(AppStatePatch {
				hovered: Some(hovered),
				..Default::default()
			});
		}
		self.emit(SelectionEvent::HoverChanged(hover));
	}

	/// Full reset to `Idle`. Returns `false` when already idle; nothing is
	/// touched in that case.
	pub fn reset(&mut self, shapes: &mut ShapeBuilder, renderer: &mut dyn Renderer) -> bool {
		self.apply(Selection::Idle, shapes, renderer)
	}

	/// Move to `next`, clearing stale highlights before applying new ones.
	fn apply(&mut self, next: Selection, shapes: &mut ShapeBuilder, renderer: &mut dyn Renderer) -> bool {
		let current = self.selection();
		if current == next {
			return false;
		}
		let incoming = next.highlights();
		for (entity, _) in current.highlights() {
			if !incoming.iter().any(|(e, _)| *e == entity) {
				shapes.set_highlight(entity, Highlight::None, renderer);
			}
		}
		for (entity, highlight) in incoming {
			shapes.set_highlight(entity, highlight, renderer);
		}
		debug!("Selection {current:?} -> {next:?}");
		self.store.set_state(AppStatePatch {
			selection: Some(next),
			..Default::default()
		});
		true
	}

	/// Per-frame update: pulses the active edge only.
	pub fn tick(&mut self, seconds: f64, shapes: &mut ShapeBuilder, renderer: &mut dyn Renderer) {
		if self.disposed {
			return;
		}
		if let Some(edge) = self.selection().active_edge() {
			shapes.set_edge_opacity(edge, pulse_opacity(seconds), renderer);
		}
	}

	pub fn set_auto_rotate(&mut self, on: bool) {
		if self.state().auto_rotate != on {
			self.store.set_state(AppStatePatch {
				auto_rotate: Some(on),
				..Default::default()
			});
		}
	}

	pub fn set_show_hypercube(&mut self, on: bool) {
		if self.state().show_hypercube != on {
			self.store.set_state(AppStatePatch {
				show_hypercube: Some(on),
				..Default::default()
			});
		}
	}

	pub fn set_dragging(&mut self, on: bool) {
		if self.state().dragging != on {
			self.store.set_state(AppStatePatch {
				dragging: Some(on),
				..Default::default()
			});
		}
	}

	/// Drop every handler and stop reacting to input. Safe to call twice.
	pub fn dispose(&mut self) {
		if self.disposed {
			return;
		}
		self.disposed = true;
		self.handlers.clear();
		debug!("Selection controller disposed");
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use glam::Vec2;
	use pretty_assertions::assert_eq;

	use super::super::scene::Scene;
	use super::*;

	fn two(pivot: VertexId, partner: VertexId, edge: EdgeId) -> Selection {
		Selection::TwoSelected {
			pivot,
			partner,
			edge,
		}
	}

	fn one(pivot: VertexId) -> Selection {
		Selection::OneSelected { pivot }
	}

	#[test]
	fn transition_rules() {
		let model = GraphModel::embedded();
		let click = |s: Selection, v| s.on_vertex_click(v, &model);

		assert_eq!(click(Selection::Idle, 0), one(0));
		assert_eq!(click(one(0), 0), Selection::Idle);
		assert_eq!(click(one(0), 1), two(0, 1, 8));
		assert_eq!(click(one(0), 2), one(2));
		assert_eq!(click(two(0, 1, 8), 1), one(0));
		assert_eq!(click(two(0, 1, 8), 3), two(0, 3, 10));
		assert_eq!(click(two(0, 1, 8), 6), one(6));
		// the pivot itself has no edge to itself
		assert_eq!(click(two(0, 1, 8), 0), one(0));
	}

	#[test]
	fn event_names_parse() {
		for kind in EventKind::ALL {
			assert_eq!(kind.name().parse::<EventKind>(), Ok(kind));
		}
		assert_eq!(
			"vertex-hovered".parse::<EventKind>(),
			Err(UnknownEvent("vertex-hovered".into()))
		);
	}

	#[test]
	fn pulse_stays_in_range() {
		for i in 0..200 {
			let o = pulse_opacity(i as f64 * 0.05);
			assert!((0.4 - 1e-6..=1.0 + 1e-6).contains(&o), "{o}");
		}
		assert!((pulse_opacity(0.0) - 0.7).abs() < 1e-6);
	}

	fn controller() -> (SelectionController, ShapeBuilder, Scene) {
		let model = Rc::new(GraphModel::embedded());
		let mut scene = Scene::new(800.0, 600.0);
		let shapes = ShapeBuilder::build(&model, &mut scene);
		(SelectionController::new(model, AppState::default(), 50), shapes, scene)
	}

	#[test]
	fn unknown_event_is_ignored_and_one_handler_per_kind() {
		let (mut ctl, mut shapes, mut scene) = controller();
		let log = Rc::new(RefCell::new(Vec::new()));
		assert!(!ctl.on("selection-changed", |_| {}));
		for tag in ["first", "second"] {
			let log = Rc::clone(&log);
			assert!(ctl.on("vertex-clicked", move |_| log.borrow_mut().push(tag)));
		}
		ctl.handle_pick(Pick::Vertex(0), &mut shapes, &mut scene);
		assert_eq!(*log.borrow(), vec!["second"]);
	}

	#[test]
	fn edge_click_only_counts_for_the_active_edge() {
		let (mut ctl, mut shapes, mut scene) = controller();
		let clicked = Rc::new(RefCell::new(Vec::new()));
		let sink = Rc::clone(&clicked);
		ctl.on_kind(EventKind::EdgeClicked, move |event| {
			if let SelectionEvent::EdgeClicked { edge, .. } = event {
				sink.borrow_mut().push(*edge);
			}
		});

		ctl.handle_pick(Pick::Edge(8), &mut shapes, &mut scene);
		ctl.handle_pick(Pick::Vertex(0), &mut shapes, &mut scene);
		ctl.handle_pick(Pick::Vertex(1), &mut shapes, &mut scene);
		ctl.handle_pick(Pick::Edge(10), &mut shapes, &mut scene);
		ctl.handle_pick(Pick::Edge(8), &mut shapes, &mut scene);
		assert_eq!(*clicked.borrow(), vec![8]);
		assert_eq!(ctl.selection(), two(0, 1, 8));
	}

	#[test]
	fn stale_highlights_are_cleared() {
		let (mut ctl, mut shapes, mut scene) = controller();
		ctl.handle_pick(Pick::Vertex(0), &mut shapes, &mut scene);
		ctl.handle_pick(Pick::Vertex(1), &mut shapes, &mut scene);
		ctl.handle_pick(Pick::Vertex(3), &mut shapes, &mut scene);
		assert_eq!(shapes.highlight_of(EntityRef::Vertex(1)), Highlight::None);
		assert_eq!(shapes.highlight_of(EntityRef::Edge(8)), Highlight::None);
		assert_eq!(shapes.highlight_of(EntityRef::Vertex(3)), Highlight::Partner);
		assert_eq!(shapes.highlight_of(EntityRef::Edge(10)), Highlight::ActiveEdge);
	}

	#[test]
	fn hover_updates_state_only_on_change() {
		let (mut ctl, _, _) = controller();
		let hover = Hover {
			vertex: Some(2),
			edge: Some(9),
			pointer: Vec2::new(10.0, 10.0),
		};
		ctl.handle_hover(hover);
		ctl.handle_hover(Hover {
			pointer: Vec2::new(11.0, 10.0),
			..hover
		});
		assert_eq!(ctl.state().hovered, Some(EntityRef::Vertex(2)));
		assert_eq!(ctl.history().len(), 1);
	}

	#[test]
	fn disposed_controller_ignores_input() {
		let (mut ctl, mut shapes, mut scene) = controller();
		ctl.dispose();
		ctl.dispose();
		ctl.handle_pick(Pick::Vertex(0), &mut shapes, &mut scene);
		assert_eq!(ctl.selection(), Selection::Idle);
		assert!(ctl.is_disposed());
	}
}
