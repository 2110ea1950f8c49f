//! The vertex/edge dataset and its lookup queries.
//!
//! Loading never fails: an unreachable or malformed external payload falls
//! back to the embedded cube, and edges that break referential integrity are
//! dropped one by one instead of rejecting the whole graph.

use std::collections::HashMap;

use log::{info, warn};
use thiserror::Error;

use super::types::{Adjacency, CubeData, Dataset, Edge, EdgeId, Metadata, Vertex, VertexId};

#[derive(Debug, Error)]
pub enum DatasetError {
	#[error("dataset fetch failed: {0}")]
	Fetch(String),
	#[error("dataset request returned HTTP {0}")]
	Status(u16),
	#[error("dataset is not valid JSON: {0}")]
	Parse(#[from] serde_json::Error),
	#[error("dataset has no edge carrying a `vessel` field")]
	MissingSentinel,
}

/// A problem found while validating a dataset. The offending record is skipped.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationIssue {
	#[error("vertex {0} appears more than once, keeping the first")]
	DuplicateVertex(VertexId),
	#[error("edge {0} appears more than once, keeping the first")]
	DuplicateEdge(EdgeId),
	#[error("edge {edge} references unknown vertex {vertex}")]
	UnknownVertex { edge: EdgeId, vertex: VertexId },
	#[error("edge {0} connects a vertex to itself")]
	SelfLoop(EdgeId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetOrigin {
	External,
	Embedded,
}

/// Read-only graph built once at startup.
#[derive(Clone, Debug)]
pub struct GraphModel {
	vertices: Vec<Vertex>,
	edges: Vec<Edge>,
	vertex_index: HashMap<VertexId, usize>,
	edge_index: HashMap<EdgeId, usize>,
	origin: DatasetOrigin,
	issues: Vec<ValidationIssue>,
}

impl GraphModel {
	/// Build from the outcome of an external fetch, falling back to the
	/// embedded dataset on any failure.
	pub fn load(payload: Result<String, DatasetError>) -> Self {
		match payload.and_then(|body| parse_dataset(&body)) {
			Ok(dataset) => {
				info!(
					"Loaded external dataset ({} vertices, {} edges)",
					dataset.cube.vertices.len(),
					dataset.cube.edges.len()
				);
				Self::validate(dataset, DatasetOrigin::External)
			}
			Err(err) => {
				warn!("{err}; using embedded dataset");
				Self::embedded()
			}
		}
	}

	pub fn embedded() -> Self {
		Self::validate(default_dataset(), DatasetOrigin::Embedded)
	}

	/// Index a dataset, skipping (and logging) every record that would break
	/// the id-uniqueness or endpoint invariants.
	pub fn validate(dataset: Dataset, origin: DatasetOrigin) -> Self {
		let CubeData {
			vertices: raw_vertices,
			edges: raw_edges,
		} = dataset.cube;
		let mut issues = Vec::new();

		let mut vertices = Vec::with_capacity(raw_vertices.len());
		let mut vertex_index = HashMap::new();
		for vertex in raw_vertices {
			if vertex_index.contains_key(&vertex.id) {
				issues.push(ValidationIssue::DuplicateVertex(vertex.id));
				continue;
			}
			vertex_index.insert(vertex.id, vertices.len());
			vertices.push(vertex);
		}

		let mut edges = Vec::with_capacity(raw_edges.len());
		let mut edge_index = HashMap::new();
		for edge in raw_edges {
			if edge_index.contains_key(&edge.id) {
				issues.push(ValidationIssue::DuplicateEdge(edge.id));
				continue;
			}
			if let Some(&missing) = [edge.from, edge.to]
				.iter()
				.find(|id| !vertex_index.contains_key(*id))
			{
				issues.push(ValidationIssue::UnknownVertex {
					edge: edge.id,
					vertex: missing,
				});
				continue;
			}
			if edge.from == edge.to {
				issues.push(ValidationIssue::SelfLoop(edge.id));
				continue;
			}
			edge_index.insert(edge.id, edges.len());
			edges.push(edge);
		}

		for issue in &issues {
			warn!("Skipping dataset record: {issue}");
		}

		Self {
			vertices,
			edges,
			vertex_index,
			edge_index,
			origin,
			issues,
		}
	}

	pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
		self.vertex_index.get(&id).map(|&i| &self.vertices[i])
	}

	pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
		self.edge_index.get(&id).map(|&i| &self.edges[i])
	}

	pub fn vertices(&self) -> &[Vertex] {
		&self.vertices
	}

	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	/// Every edge touching `vertex`, in dataset order.
	pub fn adjacent_edges(&self, vertex: VertexId) -> Vec<Adjacency<'_>> {
		self.edges
			.iter()
			.filter_map(|edge| {
				edge.other(vertex).map(|other| Adjacency {
					edge_id: edge.id,
					other_vertex_id: other,
					metadata: &edge.data,
				})
			})
			.collect()
	}

	/// The direct edge between two vertices, found by scanning `a`'s adjacency.
	pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
		self.adjacent_edges(a)
			.into_iter()
			.find(|adj| adj.other_vertex_id == b)
			.map(|adj| adj.edge_id)
	}

	pub fn origin(&self) -> DatasetOrigin {
		self.origin
	}

	pub fn issues(&self) -> &[ValidationIssue] {
		&self.issues
	}
}

/// Parse a payload and apply the minimal shape check.
pub fn parse_dataset(body: &str) -> Result<Dataset, DatasetError> {
	let dataset: Dataset = serde_json::from_str(body)?;
	let has_sentinel = dataset
		.cube
		.edges
		.iter()
		.any(|edge| edge.vessel.as_deref().is_some_and(|v| !v.is_empty()));
	if !has_sentinel {
		return Err(DatasetError::MissingSentinel);
	}
	Ok(dataset)
}

// (id, name, position, planet, planet name, number, element, element name, trigram, trigram name)
type VertexRow = (
	VertexId,
	&'static str,
	[f32; 3],
	&'static str,
	&'static str,
	&'static str,
	&'static str,
	&'static str,
	&'static str,
	&'static str,
);

// x: -1 left / +1 right, y: -1 bottom / +1 top, z: -1 back / +1 front
const VERTICES: [VertexRow; 8] = [
	(0, "Dai Mai", [-1.0, 1.0, 1.0], "♃", "Jupiter", "3", "▽", "Earth", "☲", "Fire"),
	(1, "Du Mai", [1.0, 1.0, 1.0], "☉", "Sun", "5", "△", "Fire", "☰", "Heaven"),
	(2, "Yang Wei Mai", [1.0, 1.0, -1.0], "♂", "Mars", "4", "△", "Air", "☱", "Lake"),
	(3, "Yang Qiao Mai", [-1.0, 1.0, -1.0], "☿", "Mercury", "7", "▽", "Water", "☳", "Thunder"),
	(4, "Yin Wei Mai", [-1.0, -1.0, 1.0], "♀", "Venus", "6", "▽", "Earth", "☶", "Mountain"),
	(5, "Yin Qiao Mai", [1.0, -1.0, 1.0], "⊕", "Earth", "9", "△", "Fire", "☴", "Wind"),
	(6, "Chong Mai", [1.0, -1.0, -1.0], "♄", "Saturn", "2", "△", "Air", "☵", "Water/Kan"),
	(7, "Ren Mai", [-1.0, -1.0, -1.0], "☽", "Moon", "8", "▽", "Water", "☷", "Earth/Kun"),
];

// (id, from, to, sign, sign name, vessel, number)
type EdgeRow = (
	EdgeId,
	VertexId,
	VertexId,
	&'static str,
	&'static str,
	&'static str,
	&'static str,
);

const EDGES: [EdgeRow; 12] = [
	(0, 4, 5, "♐", "Sagittarius", "Shou Jue Yin", "8"),
	(1, 5, 6, "♒", "Aquarius", "Zu Shao Yang", "88→16→7"),
	(2, 4, 7, "♏", "Scorpio", "Zu Shao Yin", "55→10→1"),
	(3, 6, 7, "♑", "Capricorn", "Shou Shao Yang", "27→9"),
	(4, 1, 5, "♈", "Aries", "Shou Tai Yin", "9"),
	(5, 0, 4, "♎", "Libra", "Zu Tai Yang", "72→9"),
	(6, 2, 6, "♍", "Virgo", "Shou Tai Yang", "24→6"),
	(7, 3, 7, "♓", "Pisces", "Zu Jue Yin", "40→4"),
	(8, 0, 1, "♌", "Leo", "Shou Shao Yin", "11→2"),
	(9, 1, 2, "♊", "Gemini", "Zu Yang Ming", "64"),
	(10, 0, 3, "♋", "Cancer", "Zu Tai Yin", "45→9"),
	(11, 2, 3, "♉", "Taurus", "Shou Yang Ming", "33"),
];

/// The embedded 8-vertex, 12-edge cube.
pub fn default_dataset() -> Dataset {
	let vertices = VERTICES
		.iter()
		.map(
			|&(id, name, position, planet, planet_name, number, element, element_name, trigram, trigram_name)| {
				let data = Metadata::from_iter([
					("planet".to_string(), format!("{planet_name} {planet}")),
					("number".to_string(), number.to_string()),
					("element".to_string(), format!("{element_name} {element}")),
					("trigram".to_string(), format!("{trigram} {trigram_name}")),
					("vessel".to_string(), name.to_string()),
				]);
				Vertex {
					id,
					name: name.to_string(),
					position,
					planet: Some(planet.to_string()),
					planet_name: Some(planet_name.to_string()),
					number: Some(number.to_string()),
					element: Some(element.to_string()),
					trigram: Some(trigram.to_string()),
					trigram_name: Some(trigram_name.to_string()),
					vessel: Some(name.to_string()),
					data,
				}
			},
		)
		.collect();

	let edges = EDGES
		.iter()
		.map(|&(id, from, to, sign, sign_name, vessel, number)| Edge {
			id,
			from,
			to,
			sign: Some(sign.to_string()),
			sign_name: Some(sign_name.to_string()),
			vessel: Some(vessel.to_string()),
			number: Some(number.to_string()),
			data: Metadata::from_iter([
				("sign".to_string(), format!("{sign} {sign_name}")),
				("number".to_string(), number.to_string()),
				("channel".to_string(), vessel.to_string()),
			]),
		})
		.collect();

	Dataset {
		cube: CubeData { vertices, edges },
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use proptest::prelude::*;

	use super::*;

	fn bare_vertex(id: VertexId) -> Vertex {
		Vertex {
			id,
			name: format!("V{id}"),
			position: [id as f32, 0.0, 0.0],
			planet: None,
			planet_name: None,
			number: None,
			element: None,
			trigram: None,
			trigram_name: None,
			vessel: None,
			data: Metadata::new(),
		}
	}

	fn bare_edge(id: EdgeId, from: VertexId, to: VertexId) -> Edge {
		Edge {
			id,
			from,
			to,
			sign: None,
			sign_name: None,
			vessel: Some("x".into()),
			number: None,
			data: Metadata::new(),
		}
	}

	#[test]
	fn embedded_cube_is_complete() {
		let model = GraphModel::embedded();
		assert_eq!(model.vertices().len(), 8);
		assert_eq!(model.edges().len(), 12);
		assert!(model.issues().is_empty());
		assert_eq!(model.origin(), DatasetOrigin::Embedded);
		for vertex in model.vertices() {
			assert_eq!(model.adjacent_edges(vertex.id).len(), 3, "{}", vertex.name);
		}
	}

	#[test]
	fn adjacency_follows_dataset_order() {
		let model = GraphModel::embedded();
		let adj: Vec<_> = model
			.adjacent_edges(0)
			.into_iter()
			.map(|a| (a.edge_id, a.other_vertex_id))
			.collect();
		assert_eq!(adj, vec![(5, 4), (8, 1), (10, 3)]);
		assert_eq!(
			model.adjacent_edges(0)[0].metadata.get("channel").map(String::as_str),
			Some("Zu Tai Yang")
		);
	}

	#[test]
	fn edge_between_is_symmetric() {
		let model = GraphModel::embedded();
		assert_eq!(model.edge_between(0, 1), Some(8));
		assert_eq!(model.edge_between(1, 0), Some(8));
		assert_eq!(model.edge_between(0, 2), None);
		assert_eq!(model.edge_between(0, 0), None);
	}

	#[test]
	fn unreachable_source_falls_back() {
		let model = GraphModel::load(Err(DatasetError::Fetch("offline".into())));
		assert_eq!(model.origin(), DatasetOrigin::Embedded);
		assert_eq!(model.edges().len(), 12);
	}

	#[test]
	fn payload_without_sentinel_falls_back() {
		let body = r#"{"cube":{"vertices":[{"id":1,"position":[0,0,0]}],"edges":[]}}"#;
		assert!(matches!(parse_dataset(body), Err(DatasetError::MissingSentinel)));
		let model = GraphModel::load(Ok(body.to_string()));
		assert_eq!(model.origin(), DatasetOrigin::Embedded);
	}

	#[test]
	fn garbage_payload_falls_back() {
		assert!(matches!(parse_dataset("<html>"), Err(DatasetError::Parse(_))));
		let model = GraphModel::load(Ok("<html>".into()));
		assert_eq!(model.origin(), DatasetOrigin::Embedded);
	}

	#[test]
	fn external_payload_is_used_when_valid() {
		let body = r#"{"cube":{
			"vertices":[{"id":1,"name":"a","position":[0,0,0]},{"id":2,"name":"b","position":[1,0,0]}],
			"edges":[{"id":9,"from":1,"to":2,"vessel":"Ren Mai"}]}}"#;
		let model = GraphModel::load(Ok(body.to_string()));
		assert_eq!(model.origin(), DatasetOrigin::External);
		assert_eq!(model.edge(9).map(|e| e.from), Some(1));
		assert_eq!(model.vertex(2).map(|v| v.name.as_str()), Some("b"));
	}

	#[test]
	fn numeric_metadata_keeps_external_payload() {
		let body = r#"{"cube":{
			"vertices":[{"id":1,"name":"a","number":3,"position":[0,0,0]},{"id":2,"name":"b","position":[1,0,0]}],
			"edges":[{"id":9,"from":1,"to":2,"vessel":"Ren Mai","number":12,"data":{"weight":3}}]}}"#;
		let model = GraphModel::load(Ok(body.to_string()));
		assert_eq!(model.origin(), DatasetOrigin::External);
		assert_eq!(model.vertex(1).and_then(|v| v.number.as_deref()), Some("3"));
		let edge = model.edge(9).unwrap();
		assert_eq!(edge.number.as_deref(), Some("12"));
		assert_eq!(edge.data.get("weight").map(String::as_str), Some("3"));
	}

	#[test]
	fn served_dataset_matches_embedded() {
		let served = parse_dataset(include_str!("../../../public/cube-data.json")).unwrap();
		assert_eq!(served, default_dataset());
	}

	#[test]
	fn bad_records_are_skipped_individually() {
		let dataset = Dataset {
			cube: CubeData {
				vertices: vec![bare_vertex(0), bare_vertex(1), bare_vertex(1), bare_vertex(2)],
				edges: vec![
					bare_edge(0, 0, 1),
					bare_edge(1, 1, 42),
					bare_edge(0, 1, 2),
					bare_edge(2, 2, 2),
					bare_edge(3, 1, 2),
				],
			},
		};
		let model = GraphModel::validate(dataset, DatasetOrigin::External);
		assert_eq!(model.vertices().len(), 3);
		let kept: Vec<_> = model.edges().iter().map(|e| e.id).collect();
		assert_eq!(kept, vec![0, 3]);
		assert_eq!(
			model.issues(),
			&[
				ValidationIssue::DuplicateVertex(1),
				ValidationIssue::UnknownVertex { edge: 1, vertex: 42 },
				ValidationIssue::DuplicateEdge(0),
				ValidationIssue::SelfLoop(2),
			]
		);
	}

	proptest! {
		#[test]
		fn edges_kept_iff_endpoints_exist(
			endpoints in prop::collection::vec((0u32..12, 0u32..12), 0..24)
		) {
			let vertices = (0..8).map(bare_vertex).collect();
			let edges: Vec<Edge> = endpoints
				.iter()
				.enumerate()
				.map(|(i, &(from, to))| bare_edge(i as EdgeId, from, to))
				.collect();
			let expected: Vec<EdgeId> = edges
				.iter()
				.filter(|e| e.from < 8 && e.to < 8 && e.from != e.to)
				.map(|e| e.id)
				.collect();
			let model = GraphModel::validate(
				Dataset { cube: CubeData { vertices, edges } },
				DatasetOrigin::External,
			);
			let kept: Vec<EdgeId> = model.edges().iter().map(|e| e.id).collect();
			prop_assert_eq!(kept, expected);
		}
	}
}
