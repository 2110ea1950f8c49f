use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub type VertexId = u32;
pub type EdgeId = u32;

/// Free-form display metadata, kept in dataset order. Scalar payload values
/// of any JSON type are stored as their display text.
pub type Metadata = IndexMap<String, String>;

/// A corner of the cube with its display attributes.
///
/// The symbol/name pairs are the category tags used for icons and labels;
/// anything else a dataset wants to show goes into `data`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vertex {
	pub id: VertexId,
	#[serde(default, deserialize_with = "display_text::string")]
	pub name: String,
	pub position: [f32; 3],
	#[serde(default, deserialize_with = "display_text::option")]
	pub planet: Option<String>,
	#[serde(default, deserialize_with = "display_text::option")]
	pub planet_name: Option<String>,
	#[serde(default, deserialize_with = "display_text::option")]
	pub number: Option<String>,
	#[serde(default, deserialize_with = "display_text::option")]
	pub element: Option<String>,
	#[serde(default, deserialize_with = "display_text::option")]
	pub trigram: Option<String>,
	#[serde(default, deserialize_with = "display_text::option")]
	pub trigram_name: Option<String>,
	#[serde(default, deserialize_with = "display_text::option")]
	pub vessel: Option<String>,
	#[serde(default, deserialize_with = "display_text::map")]
	pub data: Metadata,
}

/// An undirected connection between two vertices. `from`/`to` only matter
/// for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
	pub id: EdgeId,
	pub from: VertexId,
	pub to: VertexId,
	#[serde(default, deserialize_with = "display_text::option")]
	pub sign: Option<String>,
	#[serde(default, deserialize_with = "display_text::option")]
	pub sign_name: Option<String>,
	#[serde(default, deserialize_with = "display_text::option")]
	pub vessel: Option<String>,
	#[serde(default, deserialize_with = "display_text::option")]
	pub number: Option<String>,
	#[serde(default, deserialize_with = "display_text::map")]
	pub data: Metadata,
}

impl Edge {
	/// The endpoint opposite `vertex`, if the edge touches it.
	pub fn other(&self, vertex: VertexId) -> Option<VertexId> {
		if self.from == vertex {
			Some(self.to)
		} else if self.to == vertex {
			Some(self.from)
		} else {
			None
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CubeData {
	#[serde(default)]
	pub vertices: Vec<Vertex>,
	#[serde(default)]
	pub edges: Vec<Edge>,
}

/// Top-level payload, as served at the dataset URL.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
	pub cube: CubeData,
}

/// Display-field readers: any JSON scalar becomes its display text, `null`
/// counts as absent.
mod display_text {
	use indexmap::IndexMap;
	use serde::{Deserialize, Deserializer};
	use serde_json::Value;

	use super::Metadata;

	fn text(value: Value) -> Option<String> {
		match value {
			Value::Null => None,
			Value::String(s) => Some(s),
			other => Some(other.to_string()),
		}
	}

	pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
		Ok(Option::<Value>::deserialize(deserializer)?
			.and_then(text)
			.unwrap_or_default())
	}

	pub fn option<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
		Ok(Option::<Value>::deserialize(deserializer)?.and_then(text))
	}

	pub fn map<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Metadata, D::Error> {
		Ok(Option::<IndexMap<String, Value>>::deserialize(deserializer)?
			.unwrap_or_default()
			.into_iter()
			.filter_map(|(key, value)| text(value).map(|text| (key, text)))
			.collect())
	}
}

/// Identity of a logical entity, carried by hit-test proxies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityRef {
	Vertex(VertexId),
	Edge(EdgeId),
}

/// One entry of a vertex's adjacency list.
#[derive(Clone, Debug, PartialEq)]
pub struct Adjacency<'a> {
	pub edge_id: EdgeId,
	pub other_vertex_id: VertexId,
	pub metadata: &'a Metadata,
}
