use std::cell::Cell;
use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::state::{NODE_RADIUS, NetworkCanvasState};
use super::types::Selection;

const BACKGROUND: &str = "#1a1a2e";
const EDGE_COLOR: &str = "rgba(100, 180, 255, 0.6)";
const SELECTED_COLOR: &str = "#ffd54f";

/// Lets at most one frame be in flight. Requests made while a frame is
/// pending are dropped; that frame draws the latest state anyway.
#[derive(Debug, Default)]
pub struct FrameGate {
	in_flight: Cell<bool>,
}

impl FrameGate {
	pub fn try_begin(&self) -> bool {
		!self.in_flight.replace(true)
	}

	pub fn finish(&self) {
		self.in_flight.set(false);
	}
}

pub fn render(state: &NetworkCanvasState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn draw_edges(state: &NetworkCanvasState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	for (id, edge) in &state.edges {
		let (Some(a), Some(b)) = (state.nodes.get(&edge.source), state.nodes.get(&edge.target))
		else {
			continue;
		};
		let selected = state.selection == Some(Selection::Edge(id.clone()));
		let lit = state.highlighted.is_some()
			&& state.is_highlighted(&edge.source)
			&& state.is_highlighted(&edge.target);
		if selected {
			ctx.set_stroke_style_str(SELECTED_COLOR);
			ctx.set_line_width(3.0 / k);
		} else if lit {
			ctx.set_stroke_style_str("rgba(200, 220, 255, 0.9)");
			ctx.set_line_width(2.5 / k);
		} else {
			ctx.set_stroke_style_str(EDGE_COLOR);
			ctx.set_line_width(1.5 / k);
		}
		ctx.begin_path();
		ctx.move_to(a.x, a.y);
		ctx.line_to(b.x, b.y);
		ctx.stroke();
	}
}

fn draw_nodes(state: &NetworkCanvasState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	for (id, node) in &state.nodes {
		let (x, y) = (node.x, node.y);

		if state.is_highlighted(id) {
			// the focused node glows wider than its neighbours
			let scale = if state.highlighted.as_deref() == Some(id.as_str()) { 2.4 } else { 1.6 };
			let glow_radius = NODE_RADIUS * scale;
			if let Ok(gradient) = ctx.create_radial_gradient(x, y, NODE_RADIUS * 0.3, x, y, glow_radius)
			{
				let _ = gradient.add_color_stop(0.0, "rgba(255, 255, 255, 0.35)");
				let _ = gradient.add_color_stop(0.6, "rgba(200, 220, 255, 0.1)");
				let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
				ctx.begin_path();
				let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		ctx.begin_path();
		let _ = ctx.arc(x, y, NODE_RADIUS, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&node.color);
		ctx.fill();

		if state.selection == Some(Selection::Node(id.clone())) {
			ctx.begin_path();
			let _ = ctx.arc(x, y, NODE_RADIUS + 3.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(SELECTED_COLOR);
			ctx.set_line_width(2.0 / k);
			ctx.stroke();
		}

		ctx.set_fill_style_str("rgba(255, 255, 255, 0.85)");
		ctx.set_font(&format!("{}px sans-serif", 11.0 / k.max(0.5)));
		let _ = ctx.fill_text(&node.label, x + NODE_RADIUS + 3.0, y + 3.0);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn overlapping_frames_are_dropped() {
		let gate = FrameGate::default();
		assert!(gate.try_begin());
		assert!(!gate.try_begin());
		gate.finish();
		assert!(gate.try_begin());
	}
}
