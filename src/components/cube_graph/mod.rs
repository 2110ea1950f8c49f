//! Interactive cube graph: a read-only vertex/edge dataset shown as a 3D
//! cube with two-vertex selection, plus a decorative projected hypercube.

mod component;
pub mod geometry;
pub mod model;
pub mod pick;
pub mod presentation;
pub mod projector;
mod render;
pub mod scene;
pub mod selection;
pub mod shapes;
pub mod state;
pub mod store;
pub mod types;

pub use component::CubeGraphCanvas;
pub use model::{DatasetError, DatasetOrigin, GraphModel, ValidationIssue};
pub use pick::{Hover, Pick, PickEngine};
pub use selection::{AppState, EventKind, Selection, SelectionController, SelectionEvent};
pub use state::{CubeGraphState, ViewerSettings};
pub use store::{Merge, ObservableStore, Subscription};
pub use types::{CubeData, Dataset, Edge, EdgeId, EntityRef, Vertex, VertexId};
