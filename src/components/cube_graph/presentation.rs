//! What the side panels show. Pure: fed controller events, read by the page.

use glam::Vec2;

use super::model::GraphModel;
use super::selection::{Selection, SelectionEvent};
use super::types::{EdgeId, EntityRef};

pub const NOTIFICATION_MS: f64 = 3000.0;
/// Tooltip offset from the pointer, pixels.
pub const TOOLTIP_OFFSET: f32 = 15.0;

pub const IDLE_HINT: &str = "Waiting for interaction...";
const VERTEX_HINT: &str = "Click a highlighted vertex or the green connection for details";
pub const NO_PIVOT_WARNING: &str = "Select a vertex first";
pub const DETACHED_EDGE_WARNING: &str = "That connection is not attached to the selected vertex";

/// `"sign_name"` -> `"Sign Name"`.
pub fn format_key(key: &str) -> String {
	key.split('_')
		.map(|word| {
			let mut chars = word.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().chain(chars).collect(),
				None => String::new(),
			}
		})
		.collect::<Vec<_>>()
		.join(" ")
}

#[derive(Clone, Debug, PartialEq)]
pub struct Status {
	pub lines: Vec<(String, String)>,
	pub hint: String,
	/// Cleared on the next selection change.
	pub warning: Option<String>,
}

impl Default for Status {
	fn default() -> Self {
		Self {
			lines: Vec::new(),
			hint: IDLE_HINT.to_string(),
			warning: None,
		}
	}
}

/// Pressed state of the two toggle buttons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ToggleButtons {
	pub auto_rotate: bool,
	pub show_hypercube: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InfoCard {
	pub edge: EdgeId,
	pub title: String,
	pub rows: Vec<(String, String)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
	pub title: String,
	pub hint: String,
	pub position: Vec2,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cursor {
	#[default]
	Default,
	Pointer,
	Grabbing,
}

impl Cursor {
	pub fn css(&self) -> &'static str {
		match self {
			Cursor::Default => "default",
			Cursor::Pointer => "pointer",
			Cursor::Grabbing => "grabbing",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
	pub id: u32,
	pub message: String,
	pub expires_at: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Panels {
	pub status: Status,
	pub card: Option<InfoCard>,
	pub tooltip: Option<Tooltip>,
	pub cursor: Cursor,
	pub notifications: Vec<Notification>,
	pub buttons: ToggleButtons,
	pub(crate) next_notification: u32,
}

impl Panels {
	pub fn apply(&mut self, model: &GraphModel, event: &SelectionEvent, selection: Selection) {
		match event {
			SelectionEvent::VertexClicked { .. } => self.show_selection(model, selection),
			SelectionEvent::EdgeClicked { edge, .. } => self.card = edge_card(model, *edge),
			SelectionEvent::HoverChanged(hover) => {
				let target = match (hover.vertex, hover.edge) {
					(Some(vertex), _) => Some(EntityRef::Vertex(vertex)),
					(None, Some(edge)) if selection.active_edge() == Some(edge) => {
						Some(EntityRef::Edge(edge))
					}
					_ => None,
				};
				self.tooltip = target.map(|entity| tooltip(model, entity, hover.pointer));
				self.cursor = if self.tooltip.is_some() {
					Cursor::Pointer
				} else {
					Cursor::Default
				};
			}
			SelectionEvent::NoSelection => self.show_selection(model, Selection::Idle),
		}
	}

	fn show_selection(&mut self, model: &GraphModel, selection: Selection) {
		if self
			.card
			.as_ref()
			.is_some_and(|card| selection.active_edge() != Some(card.edge))
		{
			self.card = None;
		}
		let Some(pivot) = selection.pivot().and_then(|id| model.vertex(id)) else {
			self.status = Status::default();
			return;
		};
		let mut lines = vec![
			("Vertex".to_string(), pivot.name.clone()),
			(
				"Connections".to_string(),
				model.adjacent_edges(pivot.id).len().to_string(),
			),
		];
		if let Some(partner) = selection.partner().and_then(|id| model.vertex(id)) {
			lines.push(("Paired with".to_string(), partner.name.clone()));
		}
		self.status = Status {
			lines,
			hint: VERTEX_HINT.to_string(),
			warning: None,
		};
	}

	/// Explain why a click on an edge that is not the active one did nothing.
	pub fn warn_inactive_edge(&mut self, selection: Selection) {
		let message = if selection.pivot().is_none() {
			NO_PIVOT_WARNING
		} else {
			DETACHED_EDGE_WARNING
		};
		self.status.warning = Some(message.to_string());
	}

	pub fn notify(&mut self, message: impl Into<String>, now_ms: f64) {
		self.next_notification += 1;
		self.notifications.push(Notification {
			id: self.next_notification,
			message: message.into(),
			expires_at: now_ms + NOTIFICATION_MS,
		});
	}

	/// Drop expired notifications. Returns whether any were removed.
	pub fn expire(&mut self, now_ms: f64) -> bool {
		let before = self.notifications.len();
		self.notifications.retain(|n| n.expires_at > now_ms);
		self.notifications.len() != before
	}

	pub fn set_dragging(&mut self, dragging: bool) {
		if dragging {
			self.tooltip = None;
			self.cursor = Cursor::Grabbing;
		} else if self.cursor == Cursor::Grabbing {
			self.cursor = Cursor::Default;
		}
	}
}

/// From/To names followed by the edge's own metadata, keys humanised.
pub fn edge_card(model: &GraphModel, edge: EdgeId) -> Option<InfoCard> {
	let edge = model.edge(edge)?;
	let name = |id| model.vertex(id).map(|v| v.name.clone()).unwrap_or_default();
	let mut rows = vec![
		("From".to_string(), name(edge.from)),
		("To".to_string(), name(edge.to)),
	];
	rows.extend(edge.data.iter().map(|(k, v)| (format_key(k), v.clone())));
	Some(InfoCard {
		edge: edge.id,
		title: "Connection Data".to_string(),
		rows,
	})
}

fn tooltip(model: &GraphModel, entity: EntityRef, pointer: Vec2) -> Tooltip {
	let (title, hint) = match entity {
		EntityRef::Vertex(id) => (
			model.vertex(id).map(|v| v.name.clone()).unwrap_or_default(),
			"Click to select",
		),
		EntityRef::Edge(_) => ("Connection".to_string(), "Click to view data"),
	};
	Tooltip {
		title,
		hint: hint.to_string(),
		position: pointer + Vec2::splat(TOOLTIP_OFFSET),
	}
}
