use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::{Vec2, Vec3};
use log::{info, warn};

use super::model::GraphModel;
use super::pick::{Hover, Pick, PickEngine};
use super::presentation::{Panels, ToggleButtons};
use super::projector::{EXTRA_OFFSET, NCube, Projector};
use super::scene::{Layer, Scene};
use super::selection::{AppState, EventKind, SelectionController, SelectionEvent};
use super::shapes::{IconLoader, ShapeBuilder};
use super::store::{DEFAULT_HISTORY_CAPACITY, Subscription};

/// Cube rotation per dragged pixel, radians.
pub const ROTATE_PER_PX: f32 = 0.01;
/// Auto-rotation per frame, radians.
pub const CUBE_SPIN: f32 = 0.005;
pub const HYPERCUBE_SPIN: Vec2 = Vec2::new(0.002, 0.003);
pub const HYPERCUBE_OFFSET: Vec3 = Vec3::new(6.0, 0.0, 0.0);

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerSettings {
	pub dataset_url: String,
	pub icon_base: String,
	pub drag_threshold_px: f32,
	pub history_capacity: usize,
	pub show_hypercube: bool,
	pub auto_rotate: bool,
	pub hypercube_dimension: usize,
	pub hypercube_offset: f32,
	pub projector: Projector,
}

impl Default for ViewerSettings {
	fn default() -> Self {
		Self {
			dataset_url: "/cube-data.json".into(),
			icon_base: "/icons".into(),
			drag_threshold_px: super::pick::DRAG_THRESHOLD_PX,
			history_capacity: DEFAULT_HISTORY_CAPACITY,
			show_hypercube: true,
			auto_rotate: false,
			hypercube_dimension: 4,
			hypercube_offset: EXTRA_OFFSET,
			projector: Projector::default(),
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub rotating: bool,
	pub last: Vec2,
}

pub struct CubeGraphState {
	pub scene: Scene,
	pub shapes: ShapeBuilder,
	pub controller: SelectionController,
	pub picker: PickEngine,
	pub panels: Panels,
	pub drag: DragState,
	pub animation_running: bool,
	pub time: f64,
	outbox: Rc<RefCell<Vec<SelectionEvent>>>,
	buttons: Rc<Cell<ToggleButtons>>,
	button_subscription: Subscription,
	disposed: bool,
}

impl CubeGraphState {
	pub fn new(model: GraphModel, settings: &ViewerSettings, width: f64, height: f64) -> Self {
		info!(
			"Dataset: {:?} origin, {} records skipped",
			model.origin(),
			model.issues().len()
		);
		let model = Rc::new(model);
		let mut scene = Scene::new(width, height);
		let mut shapes = ShapeBuilder::build(&model, &mut scene);

		if let Err(err) = NCube::new(settings.hypercube_dimension, settings.hypercube_offset)
			.and_then(|cube| shapes.build_hypercube(&cube, &settings.projector, &mut scene))
		{
			warn!("Hypercube layer skipped: {err}");
		}
		let layer = scene.layer_mut(Layer::Hypercube);
		layer.offset = HYPERCUBE_OFFSET;
		layer.visible = settings.show_hypercube;

		let mut controller = SelectionController::new(
			model,
			AppState {
				auto_rotate: settings.auto_rotate,
				show_hypercube: settings.show_hypercube,
				..Default::default()
			},
			settings.history_capacity,
		);
		let outbox = Rc::new(RefCell::new(Vec::new()));
		for kind in EventKind::ALL {
			let outbox = Rc::clone(&outbox);
			controller.on_kind(kind, move |event| outbox.borrow_mut().push(event.clone()));
		}

		let initial = ToggleButtons {
			auto_rotate: settings.auto_rotate,
			show_hypercube: settings.show_hypercube,
		};
		let buttons = Rc::new(Cell::new(initial));
		let mirror = Rc::clone(&buttons);
		let button_subscription = controller.subscribe(move |new, old| {
			if new.auto_rotate != old.auto_rotate || new.show_hypercube != old.show_hypercube {
				mirror.set(ToggleButtons {
					auto_rotate: new.auto_rotate,
					show_hypercube: new.show_hypercube,
				});
			}
			Ok(())
		});

		Self {
			scene,
			shapes,
			controller,
			picker: PickEngine::new(settings.drag_threshold_px),
			panels: Panels {
				buttons: initial,
				..Default::default()
			},
			drag: DragState::default(),
			animation_running: true,
			time: 0.0,
			outbox,
			buttons,
			button_subscription,
			disposed: false,
		}
	}

	/// Feed queued controller events to the panels.
	fn flush_events(&mut self) -> usize {
		let events: Vec<_> = self.outbox.borrow_mut().drain(..).collect();
		let selection = self.controller.selection();
		for event in &events {
			self.panels.apply(self.controller.model(), event, selection);
		}
		self.panels.buttons = self.buttons.get();
		events.len()
	}

	pub fn pointer_down(&mut self, pointer: Vec2) {
		self.picker.press(pointer);
		self.drag = DragState {
			active: true,
			rotating: false,
			last: pointer,
		};
	}

	pub fn pointer_move(&mut self, pointer: Vec2) {
		if self.drag.active {
			if !self.drag.rotating && self.picker.is_drag(pointer) {
				self.drag.rotating = true;
				self.picker.cancel();
				self.controller.set_dragging(true);
				self.panels.set_dragging(true);
			}
			if self.drag.rotating {
				let delta = pointer - self.drag.last;
				let cube = self.scene.layer_mut(Layer::Cube);
				cube.angles.y += delta.x * ROTATE_PER_PX;
				cube.angles.x += delta.y * ROTATE_PER_PX;
				self.drag.last = pointer;
				return;
			}
		}
		let hover = self.picker.hover(pointer, &self.shapes, &self.scene);
		self.controller.handle_hover(hover);
		self.flush_events();
	}

	pub fn pointer_up(&mut self, pointer: Vec2) {
		let was_rotating = self.drag.rotating;
		self.drag = DragState::default();
		if was_rotating {
			self.controller.set_dragging(false);
			self.panels.set_dragging(false);
		}
		if let Some(pick) = self.picker.release(pointer, &self.shapes, &self.scene) {
			let selection = self.controller.selection();
			if matches!(pick, Pick::Edge(edge) if selection.active_edge() != Some(edge)) {
				self.panels.warn_inactive_edge(selection);
			}
			self.controller
				.handle_pick(pick, &mut self.shapes, &mut self.scene);
			self.flush_events();
		}
	}

	pub fn pointer_leave(&mut self) {
		self.picker.cancel();
		if self.drag.rotating {
			self.controller.set_dragging(false);
			self.panels.set_dragging(false);
		}
		self.drag = DragState::default();
		self.controller.handle_hover(Hover::default());
		self.flush_events();
	}

	pub fn tick(&mut self, dt: f32) {
		self.time += dt as f64;
		if self.controller.state().auto_rotate {
			self.scene.layer_mut(Layer::Cube).angles.y += CUBE_SPIN;
			let hyper = self.scene.layer_mut(Layer::Hypercube);
			hyper.angles.x += HYPERCUBE_SPIN.x;
			hyper.angles.y += HYPERCUBE_SPIN.y;
		}
		self.controller
			.tick(self.time, &mut self.shapes, &mut self.scene);
		self.shapes.sync_labels(&mut self.scene);
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.scene.resize(width, height);
	}

	pub fn request_icons(&self, base_url: &str, loader: &mut dyn IconLoader) -> usize {
		self.shapes.request_icons(base_url, loader)
	}

	pub fn reset_selection(&mut self, now_ms: f64) {
		self.controller.reset(&mut self.shapes, &mut self.scene);
		self.flush_events();
		let selection = self.controller.selection();
		self.panels
			.apply(self.controller.model(), &SelectionEvent::NoSelection, selection);
		self.panels.notify("Selection reset", now_ms);
	}

	pub fn toggle_hypercube(&mut self, now_ms: f64) -> bool {
		let on = !self.controller.state().show_hypercube;
		self.controller.set_show_hypercube(on);
		self.flush_events();
		self.scene.layer_mut(Layer::Hypercube).visible = on;
		self.panels.notify(
			if on { "Hypercube visible" } else { "Hypercube hidden" },
			now_ms,
		);
		on
	}

	pub fn toggle_auto_rotate(&mut self, now_ms: f64) -> bool {
		let on = !self.controller.state().auto_rotate;
		self.controller.set_auto_rotate(on);
		self.flush_events();
		self.panels.notify(
			if on {
				"Auto-rotation on"
			} else {
				"Auto-rotation off"
			},
			now_ms,
		);
		on
	}

	/// Tear down shapes and controller. Safe to call more than once.
	pub fn dispose(&mut self) {
		if self.disposed {
			return;
		}
		self.disposed = true;
		self.animation_running = false;
		self.shapes.dispose(&mut self.scene);
		self.controller.unsubscribe(self.button_subscription);
		self.controller.dispose();
		info!("Cube graph disposed");
	}
}
