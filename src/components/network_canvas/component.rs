use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, KeyboardEvent, MouseEvent, WheelEvent,
	Window,
};

use super::render::{self, FrameGate};
use super::state::NetworkCanvasState;
use super::types::{CanvasEvent, KeyPress, is_text_entry};
use crate::interaction::InteractionService;
use crate::network::SubscriptionId;
use crate::sync::{NetworkService, Outbound};

type SharedState = Rc<RefCell<Option<NetworkCanvasState>>>;

/// Everything the canvas hooks into outside its own element. Dropping it
/// detaches the canvas from the service and the window.
struct CanvasListeners {
	service: NetworkService,
	network_sub: SubscriptionId,
	bus_sub: usize,
	window: Window,
	resize: Closure<dyn FnMut()>,
	keydown: Closure<dyn FnMut(KeyboardEvent)>,
}

impl Drop for CanvasListeners {
	fn drop(&mut self) {
		self.service.unsubscribe(self.network_sub);
		self.service.bus().unsubscribe(self.bus_sub);
		let _ = self
			.window
			.remove_event_listener_with_callback("resize", self.resize.as_ref().unchecked_ref());
		let _ = self
			.window
			.remove_event_listener_with_callback("keydown", self.keydown.as_ref().unchecked_ref());
		debug!("canvas listeners detached");
	}
}

#[component]
pub fn NetworkCanvas(
	service: NetworkService,
	interaction: Rc<RefCell<InteractionService>>,
	#[prop(default = 30.0)] fit_padding: f64,
	#[prop(into)] default_layout: String,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: SharedState = Rc::new(RefCell::new(None));
	let ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>> = Rc::new(RefCell::new(None));
	let listeners: Rc<RefCell<Option<CanvasListeners>>> = Rc::new(RefCell::new(None));
	let _listeners = StoredValue::new_local(listeners.clone());
	let layout_busy = RwSignal::new(service.layout_pending());
	let layout_error = RwSignal::new(None::<String>);
	let can_undo = RwSignal::new(service.can_undo_layout());

	let request_render = render_scheduler(state.clone(), ctx.clone());

	// keep the canvas selection styling in step with the interaction state
	let sync_selection = {
		let (state, interaction, request_render) =
			(state.clone(), interaction.clone(), request_render.clone());
		Rc::new(move || {
			let selection = interaction.borrow().selection().cloned();
			if let Some(ref mut s) = *state.borrow_mut() {
				s.selection = selection;
			}
			request_render();
		})
	};
	let dispatch = {
		let (interaction, sync_selection) = (interaction.clone(), sync_selection.clone());
		move |event: CanvasEvent| {
			interaction.borrow_mut().handle_canvas_event(event);
			sync_selection();
		}
	};

	let (state_init, ctx_init, service_init, render_init) = (
		state.clone(),
		ctx.clone(),
		service.clone(),
		request_render.clone(),
	);
	let (interaction_init, sync_init) = (interaction.clone(), sync_selection.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if state_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = (
			canvas
				.parent_element()
				.map(|p| p.client_width() as f64)
				.filter(|w| *w > 0.0)
				.unwrap_or(800.0),
			canvas
				.parent_element()
				.map(|p| p.client_height() as f64)
				.filter(|h| *h > 0.0)
				.unwrap_or(600.0),
		);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(context) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			log::error!("canvas has no 2d context");
			return;
		};
		*ctx_init.borrow_mut() = Some(context);

		let mut initial = NetworkCanvasState::new(w, h, fit_padding);
		initial.load_network(&service_init.network());
		*state_init.borrow_mut() = Some(initial);

		let (state_sub, render_sub) = (state_init.clone(), render_init.clone());
		let network_sub = service_init.subscribe(move |network, change| {
			if let Some(ref mut s) = *state_sub.borrow_mut() {
				s.apply_change(network, change);
			}
			render_sub();
		});

		let (state_bus, render_bus, service_bus) =
			(state_init.clone(), render_init.clone(), service_init.clone());
		let bus_sub = service_init.bus().subscribe(move |event| match event {
			Outbound::NodeFocused(uuid) => {
				if let Some(ref mut s) = *state_bus.borrow_mut() {
					let network = service_bus.network();
					s.center_and_highlight(uuid, network.neighbours(uuid));
				}
				render_bus();
			}
			// undo availability changes whenever the network is replaced
			Outbound::NodeListChanged(_) => can_undo.set(service_bus.can_undo_layout()),
			Outbound::LayoutPending(pending) => {
				layout_busy.set(*pending);
				if *pending {
					layout_error.set(None);
				} else {
					can_undo.set(service_bus.can_undo_layout());
				}
			}
			Outbound::LayoutFailed(message) => layout_error.set(Some(message.clone())),
			_ => {}
		});

		let (state_resize, canvas_resize, render_resize) =
			(state_init.clone(), canvas.clone(), render_init.clone());
		let resize = Closure::<dyn FnMut()>::new(move || {
			let Some(parent) = canvas_resize.parent_element() else {
				return;
			};
			let (nw, nh) = (parent.client_width() as f64, parent.client_height() as f64);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			if let Some(ref mut s) = *state_resize.borrow_mut() {
				s.resize(nw, nh);
			}
			render_resize();
		});
		let _ = window.add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref());

		let (interaction_key, sync_key) = (interaction_init.clone(), sync_init.clone());
		let keydown = Closure::<dyn FnMut(KeyboardEvent)>::new(move |ev: KeyboardEvent| {
			let in_text_entry = ev
				.target()
				.and_then(|target| target.dyn_into::<HtmlElement>().ok())
				.is_some_and(|el| is_text_entry(&el.tag_name(), el.is_content_editable()));
			let key = KeyPress {
				key: ev.key(),
				shift: ev.shift_key(),
				ctrl: ev.ctrl_key() || ev.meta_key(),
				in_text_entry,
			};
			let changed = interaction_key.borrow_mut().handle_key(&key);
			if changed {
				ev.prevent_default();
				sync_key();
			}
		});
		let _ = window.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref());

		*listeners.borrow_mut() = Some(CanvasListeners {
			service: service_init.clone(),
			network_sub,
			bus_sub,
			window,
			resize,
			keydown,
		});

		render_init();
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pointer_down(x, y);
		}
	};

	let (state_mm, dispatch_mm, render_mm) = (state.clone(), dispatch.clone(), request_render.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		let event = state_mm
			.borrow_mut()
			.as_mut()
			.and_then(|s| s.pointer_move(x, y));
		match event {
			Some(event) => dispatch_mm(event),
			None => render_mm(),
		}
	};

	let (state_mu, dispatch_mu) = (state.clone(), dispatch.clone());
	let on_mouseup = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		let event = state_mu
			.borrow_mut()
			.as_mut()
			.and_then(|s| s.pointer_up(x, y));
		if let Some(event) = event {
			dispatch_mu(event);
		}
	};

	let (state_dc, dispatch_dc) = (state.clone(), dispatch.clone());
	let on_dblclick = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		let event = state_dc.borrow().as_ref().and_then(|s| s.double_click(x, y));
		if let Some(event) = event {
			dispatch_dc(event);
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_leave();
		}
	};

	let (state_wh, render_wh) = (state.clone(), request_render.clone());
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.zoom(x, y, ev.delta_y());
		}
		render_wh();
	};

	let (state_fit, render_fit) = (state.clone(), request_render.clone());
	let on_reset_view = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_fit.borrow_mut() {
			s.reset_view();
		}
		render_fit();
	};

	let (state_layout, service_layout) = (state.clone(), service.clone());
	let on_layout = move |_: MouseEvent| {
		let size = state_layout.borrow().as_ref().map(|s| (s.width, s.height));
		if let Some((w, h)) = size {
			service_layout.request_layout(&default_layout, w, h);
		}
	};

	let service_undo = service.clone();
	let on_undo_layout = move |_: MouseEvent| {
		if !service_undo.undo_layout() {
			debug!("nothing to undo");
		}
	};

	view! {
		<div class="network-canvas">
			<canvas
				node_ref=canvas_ref
				class="network-canvas__surface"
				tabindex="0"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:dblclick=on_dblclick
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: crosshair;"
			/>
			<div class="network-canvas__controls">
				<button on:click=on_reset_view>"Reset view"</button>
				<button on:click=on_layout disabled=move || layout_busy.get()>
					{move || if layout_busy.get() { "Laying out..." } else { "Auto layout" }}
				</button>
				<button on:click=on_undo_layout disabled=move || !can_undo.get() || layout_busy.get()>
					"Undo layout"
				</button>
				<span class="network-canvas__error">
					{move || layout_error.get().unwrap_or_default()}
				</span>
			</div>
		</div>
	}
}

/// Schedule a frame unless one is already pending.
fn render_scheduler(
	state: SharedState,
	ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>>,
) -> Rc<dyn Fn()> {
	let gate = Rc::new(FrameGate::default());
	Rc::new(move || {
		if !gate.try_begin() {
			debug!("frame already pending, dropping render");
			return;
		}
		let (state, ctx, frame_gate) = (state.clone(), ctx.clone(), gate.clone());
		let frame = Closure::once_into_js(move || {
			frame_gate.finish();
			if let (Some(s), Some(c)) = (state.borrow().as_ref(), ctx.borrow().as_ref()) {
				render::render(s, c);
			}
		});
		let window: Option<Window> = web_sys::window();
		let requested = window.is_some_and(|w| w.request_animation_frame(frame.unchecked_ref()).is_ok());
		if !requested {
			gate.finish();
		}
	})
}

fn local_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}
