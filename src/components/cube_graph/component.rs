use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, info};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
	CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, MouseEvent, Request,
	RequestInit, RequestMode, Response, Window,
};

use super::model::{DatasetError, GraphModel};
use super::presentation::Panels;
use super::render::{self, IconImages};
use super::shapes::{IconError, IconLoader, IconRequest};
use super::state::{CubeGraphState, ViewerSettings};

type SharedState = Rc<RefCell<Option<CubeGraphState>>>;

async fn fetch_dataset(url: &str) -> Result<String, DatasetError> {
	let fail = |what: &str, e: JsValue| DatasetError::Fetch(format!("{what}: {e:?}"));

	let opts = RequestInit::new();
	opts.set_method("GET");
	opts.set_mode(RequestMode::SameOrigin);
	let request = Request::new_with_str_and_init(url, &opts).map_err(|e| fail("request", e))?;

	let window = web_sys::window().ok_or_else(|| DatasetError::Fetch("no window".into()))?;
	let value = JsFuture::from(window.fetch_with_request(&request))
		.await
		.map_err(|e| fail("fetch", e))?;
	let resp: Response = value
		.dyn_into()
		.map_err(|_| DatasetError::Fetch("response is not a Response".into()))?;
	if !resp.ok() {
		return Err(DatasetError::Status(resp.status()));
	}
	let body = JsFuture::from(resp.text().map_err(|e| fail("body", e))?)
		.await
		.map_err(|e| fail("body", e))?;
	body.as_string()
		.ok_or_else(|| DatasetError::Fetch("body is not text".into()))
}

/// Loads icons as `<img>` elements and keeps the decoded ones for drawing.
struct BrowserIconLoader {
	images: Rc<RefCell<IconImages>>,
}

impl IconLoader for BrowserIconLoader {
	fn load(&mut self, request: IconRequest) {
		let Ok(img) = HtmlImageElement::new() else {
			let url = request.url.clone();
			request.complete(Err(IconError::Unavailable(url)));
			return;
		};
		let url = request.url.clone();
		let pending = Rc::new(RefCell::new(Some(request)));

		let (loaded, images, element) = (pending.clone(), self.images.clone(), img.clone());
		let onload = Closure::once_into_js(move || {
			if let Some(request) = loaded.borrow_mut().take() {
				images
					.borrow_mut()
					.insert(request.url.clone(), element);
				request.complete(Ok(()));
			}
		});
		let onerror = Closure::once_into_js(move || {
			if let Some(request) = pending.borrow_mut().take() {
				let url = request.url.clone();
				request.complete(Err(IconError::Unavailable(url)));
			}
		});
		img.set_onload(Some(onload.unchecked_ref()));
		img.set_onerror(Some(onerror.unchecked_ref()));
		img.set_src(&url);
	}
}

fn pointer(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<Vec2> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some(Vec2::new(
		(ev.client_x() as f64 - rect.left()) as f32,
		(ev.client_y() as f64 - rect.top()) as f32,
	))
}

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

/// Push panel changes to the view.
fn publish(state: &CubeGraphState, panels: RwSignal<Panels>) {
	if panels.with_untracked(|p| p != &state.panels) {
		panels.set(state.panels.clone());
	}
}

#[component]
pub fn CubeGraphCanvas(
	#[prop(default = ViewerSettings::default())] settings: ViewerSettings,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let panels = RwSignal::new(Panels::default());
	let state: SharedState = Rc::new(RefCell::new(None));
	let images: Rc<RefCell<IconImages>> = Rc::new(RefCell::new(IconImages::new()));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, images_init, animate_init, resize_cb_init) =
		(state.clone(), images.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			return;
		};

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_load, images_load, animate_load) =
			(state_init.clone(), images_init.clone(), animate_init.clone());
		let settings = settings.clone();
		spawn_local(async move {
			let model = GraphModel::load(fetch_dataset(&settings.dataset_url).await);
			let graph = CubeGraphState::new(model, &settings, w, h);
			let mut loader = BrowserIconLoader {
				images: images_load.clone(),
			};
			let requested = graph.request_icons(&settings.icon_base, &mut loader);
			debug!("Requested {requested} icons");
			*state_load.borrow_mut() = Some(graph);

			let (state_anim, animate_inner) = (state_load.clone(), animate_load.clone());
			*animate_load.borrow_mut() = Some(Closure::new(move || {
				let mut keep_running = true;
				if let Some(ref mut s) = *state_anim.borrow_mut() {
					if !canvas.is_connected() {
						s.dispose();
						keep_running = false;
					} else {
						if s.animation_running {
							s.tick(0.016);
						}
						if s.panels.expire(js_sys::Date::now()) {
							publish(s, panels);
						}
						render::render(s, &images_load.borrow(), &ctx);
					}
				}
				if !keep_running {
					info!("Canvas detached, animation stopped");
					return;
				}
				if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
					let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
				}
			}));
			if let (Some(cb), Some(win)) = (&*animate_load.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		});
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(at) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pointer_down(at);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(at) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			s.pointer_move(at);
			publish(s, panels);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some(at) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			s.pointer_up(at);
			publish(s, panels);
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_leave();
			publish(s, panels);
		}
	};

	let state_reset = state.clone();
	let on_reset = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_reset.borrow_mut() {
			s.reset_selection(js_sys::Date::now());
			publish(s, panels);
		}
	};

	let state_hyper = state.clone();
	let on_toggle_hypercube = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_hyper.borrow_mut() {
			s.toggle_hypercube(js_sys::Date::now());
			publish(s, panels);
		}
	};

	let state_rotate = state.clone();
	let on_auto_rotate = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_rotate.borrow_mut() {
			s.toggle_auto_rotate(js_sys::Date::now());
			publish(s, panels);
		}
	};

	view! {
		<div class="cube-graph">
			<canvas
				node_ref=canvas_ref
				class="cube-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				style=move || format!("display: block; cursor: {};", panels.with(|p| p.cursor.css()))
			/>

			<div id="status" class="status-panel">
				{move || {
					panels
						.with(|p| p.status.lines.clone())
						.into_iter()
						.map(|(key, value)| view! {
							<div><strong>{format!("{key}:")}</strong>" "{value}</div>
						})
						.collect_view()
				}}
				{move || {
					panels
						.with(|p| p.status.warning.clone())
						.map(|warning| view! { <div class="warning">{warning}</div> })
				}}
				<div class="hint">{move || panels.with(|p| p.status.hint.clone())}</div>
			</div>

			{move || {
				panels
					.with(|p| p.card.clone())
					.map(|card| view! {
						<div id="data-display" class="data-display">
							<h3>{card.title}</h3>
							{card
								.rows
								.into_iter()
								.map(|(key, value)| view! {
									<div class="data-item"><strong>{format!("{key}:")}</strong>" "{value}</div>
								})
								.collect_view()}
						</div>
					})
			}}

			{move || {
				panels
					.with(|p| p.tooltip.clone())
					.map(|tip| view! {
						<div
							id="tooltip"
							class="tooltip"
							style=format!("left: {}px; top: {}px;", tip.position.x, tip.position.y)
						>
							<strong>{tip.title}</strong>
							<br />
							{tip.hint}
						</div>
					})
			}}

			<div class="controls">
				<button id="reset-btn" on:click=on_reset>"Reset selection"</button>
				<button
					id="toggle-hypercube"
					class:active=move || panels.with(|p| p.buttons.show_hypercube)
					on:click=on_toggle_hypercube
				>
					"Toggle hypercube"
				</button>
				<button
					id="auto-rotate"
					class:active=move || panels.with(|p| p.buttons.auto_rotate)
					on:click=on_auto_rotate
				>
					"Auto-rotate"
				</button>
			</div>

			<div class="notifications">
				{move || {
					panels
						.with(|p| p.notifications.clone())
						.into_iter()
						.map(|n| view! { <div class="notification">{n.message}</div> })
						.collect_view()
				}}
			</div>
		</div>
	}
}
