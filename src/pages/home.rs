use leptos::prelude::*;

use crate::components::cube_graph::{CubeGraphCanvas, ViewerSettings};

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<CubeGraphCanvas settings=ViewerSettings::default() fullscreen=true />
				<div class="graph-overlay">
					<h1>"Cube Graph"</h1>
					<p class="subtitle">
						"Click a vertex, then a neighbour. Click the green edge for its data. Drag to rotate."
					</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}
