//! N-cube generation and perspective-divide projection to three dimensions.
//!
//! Pure and stateless; used only for the decorative hypercube layer.

use glam::Vec3;
use thiserror::Error;

pub const VIEWER_DISTANCE: f32 = 3.0;
pub const DISPLAY_SCALE: f32 = 1.8;
/// Offset of the two nested cubes along the extra axis.
pub const EXTRA_OFFSET: f32 = 0.5;
/// Largest n-cube generated: 256 corners, 1024 edges.
pub const MAX_DIMENSION: usize = 8;

#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
	#[error("need at least 3 coordinates, got {0}")]
	TooFewDimensions(usize),
	#[error("{0}-cube exceeds the {MAX_DIMENSION}-dimension limit")]
	TooManyDimensions(usize),
	#[error("coordinate {coordinate} on axis {axis} is not in front of the viewer at {distance}")]
	BehindViewer {
		axis: usize,
		coordinate: f32,
		distance: f32,
	},
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projector {
	pub viewer_distance: f32,
	pub scale: f32,
}

impl Default for Projector {
	fn default() -> Self {
		Self {
			viewer_distance: VIEWER_DISTANCE,
			scale: DISPLAY_SCALE,
		}
	}
}

impl Projector {
	/// Fold each axis beyond the third into the remaining ones with
	/// `factor = d / (d - extra)`, highest axis first, then apply the display
	/// scale.
	pub fn project(&self, point: &[f32]) -> Result<Vec3, ProjectionError> {
		if point.len() < 3 {
			return Err(ProjectionError::TooFewDimensions(point.len()));
		}
		let distance = self.viewer_distance;
		let mut coords = point.to_vec();
		while coords.len() > 3 {
			let axis = coords.len() - 1;
			let Some(extra) = coords.pop() else { break };
			let denominator = distance - extra;
			if denominator <= 0.0 {
				return Err(ProjectionError::BehindViewer {
					axis,
					coordinate: extra,
					distance,
				});
			}
			let factor = distance / denominator;
			coords.iter_mut().for_each(|c| *c *= factor);
		}
		Ok(Vec3::new(coords[0], coords[1], coords[2]) * self.scale)
	}
}

/// Boundary of an n-cube: two (n-1)-cubes with corners at ±1, nested at
/// `-offset` and `+offset` on the last axis.
#[derive(Clone, Debug, PartialEq)]
pub struct NCube {
	pub dimension: usize,
	pub vertices: Vec<Vec<f32>>,
	/// Index pairs into `vertices`: edges of the first nested cube, then the
	/// second, then one extra-dimension edge per corner.
	pub edges: Vec<(usize, usize)>,
}

impl NCube {
	pub fn new(dimension: usize, offset: f32) -> Result<Self, ProjectionError> {
		if dimension > MAX_DIMENSION {
			return Err(ProjectionError::TooManyDimensions(dimension));
		}
		Ok(Self::generate(dimension, offset))
	}

	fn generate(dimension: usize, offset: f32) -> Self {
		let inner = dimension.saturating_sub(1);
		let half = 1usize << inner;

		let corner = |i: usize| -> Vec<f32> {
			(0..inner)
				.map(|k| if i & (1 << k) != 0 { 1.0 } else { -1.0 })
				.collect()
		};
		let vertices = [-offset, offset]
			.iter()
			.flat_map(|&extra| {
				(0..half).map(move |i| {
					let mut v = corner(i);
					v.push(extra);
					v
				})
			})
			.collect();

		let mut edges = Vec::with_capacity(2 * half * inner / 2 + half);
		for base in [0, half] {
			for i in 0..half {
				for k in 0..inner {
					let j = i ^ (1 << k);
					if i < j {
						edges.push((base + i, base + j));
					}
				}
			}
		}
		edges.extend((0..half).map(|i| (i, i + half)));

		Self {
			dimension,
			vertices,
			edges,
		}
	}

	/// The 4-cube used by the viewer.
	pub fn tesseract(offset: f32) -> Self {
		Self::generate(4, offset)
	}

	/// Number of corners in each nested cube.
	pub fn half(&self) -> usize {
		self.vertices.len() / 2
	}

	pub fn project(&self, projector: &Projector) -> Result<Vec<Vec3>, ProjectionError> {
		self.vertices.iter().map(|v| projector.project(v)).collect()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use proptest::prelude::*;

	use super::*;

	#[test]
	fn tesseract_counts() {
		let cube = NCube::tesseract(EXTRA_OFFSET);
		assert_eq!(cube.vertices.len(), 16);
		assert_eq!(cube.edges.len(), 32);
		assert_eq!(cube.half(), 8);
		assert!(cube.vertices.iter().all(|v| v.len() == 4));
	}

	#[test]
	fn edges_join_corners_differing_on_one_axis() {
		let cube = NCube::tesseract(EXTRA_OFFSET);
		for &(a, b) in &cube.edges {
			let differing = cube.vertices[a]
				.iter()
				.zip(&cube.vertices[b])
				.filter(|(x, y)| x != y)
				.count();
			assert_eq!(differing, 1, "edge {a}-{b}");
		}
		// the last `half` edges are the extra-dimension ones
		let bridges: Vec<_> = cube.edges[24..].to_vec();
		assert_eq!(bridges, (0..8).map(|i| (i, i + 8)).collect::<Vec<_>>());
	}

	#[test]
	fn perspective_divide_matches_formula() {
		let projector = Projector::default();
		let p = projector.project(&[1.0, -1.0, 1.0, 0.5]).unwrap();
		let factor = 3.0 / (3.0 - 0.5);
		assert!((p - Vec3::new(1.0, -1.0, 1.0) * factor * 1.8).length() < 1e-6);

		let inner = projector.project(&[1.0, 1.0, 1.0, -0.5]).unwrap();
		assert!(inner.length() < p.length() + 1e-6);
	}

	#[test]
	fn three_dimensional_points_are_only_scaled() {
		let projector = Projector {
			viewer_distance: 3.0,
			scale: 2.0,
		};
		assert_eq!(projector.project(&[1.0, 2.0, 3.0]), Ok(Vec3::new(2.0, 4.0, 6.0)));
	}

	#[test]
	fn degenerate_inputs_are_rejected() {
		let projector = Projector::default();
		assert_eq!(
			projector.project(&[1.0, 2.0]),
			Err(ProjectionError::TooFewDimensions(2))
		);
		assert!(matches!(
			projector.project(&[0.0, 0.0, 0.0, 3.0]),
			Err(ProjectionError::BehindViewer { axis: 3, .. })
		));
	}

	#[test]
	fn oversized_dimension_is_rejected() {
		assert_eq!(
			NCube::new(MAX_DIMENSION + 1, EXTRA_OFFSET),
			Err(ProjectionError::TooManyDimensions(MAX_DIMENSION + 1))
		);
		assert_eq!(
			NCube::new(65, EXTRA_OFFSET),
			Err(ProjectionError::TooManyDimensions(65))
		);
		let largest = NCube::new(MAX_DIMENSION, EXTRA_OFFSET).unwrap();
		assert_eq!(largest.vertices.len(), 1 << MAX_DIMENSION);
	}

	proptest! {
		#[test]
		fn zero_offset_collapses_nested_cubes(dimension in 3usize..7, scale in 0.1f32..4.0) {
			let projector = Projector { viewer_distance: VIEWER_DISTANCE, scale };
			let cube = NCube::new(dimension, 0.0).unwrap();
			let points = cube.project(&projector).unwrap();
			let half = cube.half();
			for i in 0..half {
				prop_assert_eq!(points[i], points[i + half]);
			}
		}
	}
}
