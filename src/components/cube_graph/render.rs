use std::collections::HashMap;
use std::f64::consts::PI;

use glam::Vec2;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use super::scene::{Geometry, LabelContent, LabelIcon, LabelStyle, Material, Scene, SceneNode};
use super::state::CubeGraphState;

/// Decoded icon images keyed by URL.
pub type IconImages = HashMap<String, HtmlImageElement>;

const BACKGROUND: &str = "#1a1a2e";
const LABEL_FONT_PX: f64 = 11.0;
const BADGE_RADIUS_PX: f64 = 14.0;
const ICON_PX: f64 = 16.0;

struct Projected<'a> {
	depth: f32,
	node: &'a SceneNode,
}

pub fn render(state: &CubeGraphState, icons: &IconImages, ctx: &CanvasRenderingContext2d) {
	let scene = &state.scene;
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, scene.width, scene.height);

	let (mut shapes, mut labels): (Vec<_>, Vec<_>) = scene
		.nodes()
		.filter(|(_, node)| scene.layer(node.layer).visible && node.material.opacity > 0.0)
		.filter_map(|(_, node)| {
			let anchor = match &node.geometry {
				Geometry::Sphere { center, .. } => *center,
				Geometry::Tube { from, to, .. } | Geometry::Line { from, to } => (*from + *to) * 0.5,
				Geometry::Label { anchor, .. } => *anchor,
				Geometry::Collider(_) => return None,
			};
			let world = scene.layer(node.layer).to_world(anchor);
			Some(Projected {
				depth: scene.camera.depth(world),
				node,
			})
		})
		.partition(|p| !matches!(p.node.geometry, Geometry::Label { .. }));

	// painter's order: farthest first, labels over geometry
	shapes.sort_by(|a, b| b.depth.total_cmp(&a.depth));
	labels.sort_by(|a, b| b.depth.total_cmp(&a.depth));

	for item in &shapes {
		draw_shape(scene, item.node, ctx);
	}
	for item in &labels {
		if let Geometry::Label { anchor, content } = &item.node.geometry {
			if let Some(at) = scene.to_screen(item.node.layer, *anchor) {
				draw_label(at, content, icons, ctx);
			}
		}
	}
}

fn draw_shape(scene: &Scene, node: &SceneNode, ctx: &CanvasRenderingContext2d) {
	let material = node.material;
	let transform = scene.layer(node.layer);
	match &node.geometry {
		Geometry::Sphere { center, radius } => {
			let Some(at) = scene.to_screen(node.layer, *center) else {
				return;
			};
			let world = transform.to_world(*center);
			let r = (radius * material.scale * scene.pixels_per_unit(world)) as f64;
			draw_sphere(at, r.max(1.5), material, ctx);
		}
		Geometry::Tube { from, to, radius } => {
			let (Some(a), Some(b)) = (
				scene.to_screen(node.layer, *from),
				scene.to_screen(node.layer, *to),
			) else {
				return;
			};
			let world = transform.to_world((*from + *to) * 0.5);
			let width = 2.0 * radius * material.scale * scene.pixels_per_unit(world);
			stroke_segment(a, b, (width as f64).max(1.0), material, ctx);
		}
		Geometry::Line { from, to } => {
			let (Some(a), Some(b)) = (
				scene.to_screen(node.layer, *from),
				scene.to_screen(node.layer, *to),
			) else {
				return;
			};
			stroke_segment(a, b, 1.0, material, ctx);
		}
		Geometry::Collider(_) | Geometry::Label { .. } => {}
	}
}

fn stroke_segment(a: Vec2, b: Vec2, width: f64, material: Material, ctx: &CanvasRenderingContext2d) {
	ctx.set_stroke_style_str(&material.color.css(material.opacity as f64));
	ctx.set_line_width(width);
	ctx.set_line_cap("round");
	ctx.begin_path();
	ctx.move_to(a.x as f64, a.y as f64);
	ctx.line_to(b.x as f64, b.y as f64);
	ctx.stroke();
}

fn draw_sphere(at: Vec2, r: f64, material: Material, ctx: &CanvasRenderingContext2d) {
	let (x, y) = (at.x as f64, at.y as f64);
	let alpha = material.opacity as f64;
	ctx.begin_path();
	let _ = ctx.arc(x, y, r, 0.0, 2.0 * PI);
	match ctx.create_radial_gradient(x - r * 0.35, y - r * 0.35, r * 0.1, x, y, r) {
		Ok(gradient) => {
			let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", alpha));
			let _ = gradient.add_color_stop(0.35, &material.color.css(alpha));
			let _ = gradient.add_color_stop(1.0, &material.color.css(alpha * 0.6));
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		Err(_) => ctx.set_fill_style_str(&material.color.css(alpha)),
	}
	ctx.fill();
}

fn draw_label(
	at: Vec2,
	content: &LabelContent,
	icons: &IconImages,
	ctx: &CanvasRenderingContext2d,
) {
	let (x, y) = (at.x as f64, at.y as f64);
	let image = match &content.icon {
		LabelIcon::Loaded(icon) => icons.get(&icon.url),
		_ => None,
	};
	ctx.set_font(&format!("{}px sans-serif", LABEL_FONT_PX));
	ctx.set_text_baseline("middle");

	if content.style == LabelStyle::Badge {
		ctx.begin_path();
		let _ = ctx.arc(x, y, BADGE_RADIUS_PX, 0.0, 2.0 * PI);
		ctx.set_fill_style_str("rgba(255, 255, 255, 0.95)");
		ctx.fill();
		ctx.set_stroke_style_str(&content.color.css(0.8));
		ctx.set_line_width(1.5);
		ctx.stroke();
		ctx.set_text_align("center");
		match image {
			Some(img) => {
				let half = ICON_PX * 0.5;
				let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
					img,
					x - half,
					y - half,
					ICON_PX,
					ICON_PX,
				);
			}
			None => {
				ctx.set_fill_style_str(&content.color.css(1.0));
				let _ = ctx.fill_text(content.glyph().unwrap_or(content.text.as_str()), x, y);
			}
		}
		return;
	}

	let glyph = if image.is_some() { None } else { content.glyph() };
	let text = match glyph {
		Some(glyph) if content.text.is_empty() => glyph.to_string(),
		Some(glyph) => format!("{glyph} {}", content.text),
		None => content.text.clone(),
	};
	let text_width = ctx
		.measure_text(&text)
		.map(|m| m.width())
		.unwrap_or(text.chars().count() as f64 * LABEL_FONT_PX * 0.6);
	let icon_width = if image.is_some() { ICON_PX + 4.0 } else { 0.0 };
	let (pad, height) = (5.0, LABEL_FONT_PX + 8.0);
	let width = text_width + icon_width + pad * 2.0;
	let (left, top) = (x - width * 0.5, y - height * 0.5);

	ctx.set_fill_style_str("rgba(255, 255, 255, 0.9)");
	ctx.fill_rect(left, top, width, height);
	ctx.set_stroke_style_str(&content.color.css(0.6));
	ctx.set_line_width(1.0);
	ctx.stroke_rect(left, top, width, height);

	if let Some(img) = image {
		let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
			img,
			left + pad,
			y - ICON_PX * 0.5,
			ICON_PX,
			ICON_PX,
		);
	}
	ctx.set_text_align("left");
	ctx.set_fill_style_str(&content.color.css(1.0));
	let _ = ctx.fill_text(&text, left + pad + icon_width, y);
}
