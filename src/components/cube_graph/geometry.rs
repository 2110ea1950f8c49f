use glam::{Quat, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
	pub origin: Vec3,
	/// Unit length, so hit parameters are distances.
	pub direction: Vec3,
}

impl Ray {
	pub fn new(origin: Vec3, direction: Vec3) -> Self {
		Self {
			origin,
			direction: direction.normalize_or_zero(),
		}
	}

	/// The same ray expressed in a frame rotated by `rotation` and moved to
	/// `offset`. Distances are preserved.
	pub fn into_local(&self, rotation: Quat, offset: Vec3) -> Self {
		let inverse = rotation.inverse();
		Self {
			origin: inverse * (self.origin - offset),
			direction: inverse * self.direction,
		}
	}
}

/// Capped cylinder whose local +Y axis runs along its length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cylinder {
	pub center: Vec3,
	pub rotation: Quat,
	pub radius: f32,
	pub length: f32,
}

impl Cylinder {
	/// Span `from`..`to`: centred on the midpoint and turned from +Y onto the
	/// segment by the shortest rotation.
	pub fn between(from: Vec3, to: Vec3, radius: f32) -> Self {
		let span = to - from;
		let rotation = span
			.try_normalize()
			.map(|dir| Quat::from_rotation_arc(Vec3::Y, dir))
			.unwrap_or(Quat::IDENTITY);
		Self {
			center: (from + to) * 0.5,
			rotation,
			radius,
			length: span.length(),
		}
	}

	pub fn axis(&self) -> Vec3 {
		self.rotation * Vec3::Y
	}

	pub fn intersect(&self, ray: &Ray) -> Option<f32> {
		let local = ray.into_local(self.rotation, self.center);
		let (o, d) = (local.origin, local.direction);
		let (r2, half) = (self.radius * self.radius, self.length * 0.5);
		let mut candidates = [f32::NAN; 4];

		let a = d.x * d.x + d.z * d.z;
		if a > f32::EPSILON {
			let b = 2.0 * (o.x * d.x + o.z * d.z);
			let c = o.x * o.x + o.z * o.z - r2;
			let disc = b * b - 4.0 * a * c;
			if disc >= 0.0 {
				let sq = disc.sqrt();
				for (slot, t) in [(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)]
					.into_iter()
					.enumerate()
				{
					if (o.y + t * d.y).abs() <= half {
						candidates[slot] = t;
					}
				}
			}
		}

		if d.y.abs() > f32::EPSILON {
			for (slot, cap) in [-half, half].into_iter().enumerate() {
				let t = (cap - o.y) / d.y;
				let p = o + d * t;
				if p.x * p.x + p.z * p.z <= r2 {
					candidates[2 + slot] = t;
				}
			}
		}

		nearest(candidates)
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Collider {
	Sphere { center: Vec3, radius: f32 },
	Cylinder(Cylinder),
}

impl Collider {
	/// Distance along `ray` to the first surface in front of its origin.
	pub fn intersect(&self, ray: &Ray) -> Option<f32> {
		match self {
			Collider::Sphere { center, radius } => {
				let oc = ray.origin - *center;
				let b = oc.dot(ray.direction);
				let c = oc.length_squared() - radius * radius;
				let disc = b * b - c;
				if disc < 0.0 {
					return None;
				}
				let sq = disc.sqrt();
				nearest([-b - sq, -b + sq])
			}
			Collider::Cylinder(cylinder) => cylinder.intersect(ray),
		}
	}
}

fn nearest<const N: usize>(ts: [f32; N]) -> Option<f32> {
	ts.into_iter()
		.filter(|t| t.is_finite() && *t >= 0.0)
		.min_by(f32::total_cmp)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn close(a: f32, b: f32) -> bool {
		(a - b).abs() < 1e-4
	}

	#[test]
	fn sphere_hit_from_outside_and_inside() {
		let sphere = Collider::Sphere {
			center: Vec3::ZERO,
			radius: 1.0,
		};
		let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
		assert!(close(sphere.intersect(&ray).unwrap(), 4.0));

		let inside = Ray::new(Vec3::ZERO, Vec3::X);
		assert!(close(sphere.intersect(&inside).unwrap(), 1.0));

		let miss = Ray::new(Vec3::new(0.0, 2.0, 5.0), Vec3::NEG_Z);
		assert_eq!(sphere.intersect(&miss), None);

		let behind = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
		assert_eq!(sphere.intersect(&behind), None);
	}

	#[test]
	fn cylinder_aligns_with_segment() {
		let from = Vec3::new(-1.0, 1.0, 1.0);
		let to = Vec3::new(1.0, 1.0, 1.0);
		let cylinder = Cylinder::between(from, to, 0.07);
		assert!((cylinder.axis() - Vec3::X).length() < 1e-5);
		assert!(close(cylinder.length, 2.0));
		assert_eq!(cylinder.center, Vec3::new(0.0, 1.0, 1.0));
	}

	#[test]
	fn cylinder_side_and_cap_hits() {
		let cylinder = Cylinder::between(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 0.5);

		let side = Ray::new(Vec3::new(0.0, 0.5, 5.0), Vec3::NEG_Z);
		assert!(close(cylinder.intersect(&side).unwrap(), 4.5));

		let past_end = Ray::new(Vec3::new(0.0, 1.5, 5.0), Vec3::NEG_Z);
		assert_eq!(cylinder.intersect(&past_end), None);

		let down_axis = Ray::new(Vec3::new(0.1, 4.0, 0.0), Vec3::NEG_Y);
		assert!(close(cylinder.intersect(&down_axis).unwrap(), 3.0));
	}

	#[test]
	fn zero_length_cylinder_keeps_identity_rotation() {
		let cylinder = Cylinder::between(Vec3::ONE, Vec3::ONE, 0.1);
		assert_eq!(cylinder.rotation, Quat::IDENTITY);
		assert_eq!(cylinder.length, 0.0);
	}
}
