//! Properties panel for the selected node.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::warn;
use web_sys::{Event, FocusEvent};

use crate::interaction::InteractionService;
use crate::sync::{NetworkService, NodeFormValues, Outbound};

#[component]
pub fn NodeProperties(
	service: NetworkService,
	interaction: Rc<RefCell<InteractionService>>,
) -> impl IntoView {
	let form = RwSignal::new(service.form_values());
	service.bus().subscribe(move |event| {
		if let Outbound::FormChanged(values) = event {
			form.set(values.clone());
		}
	});

	// Apply one edited field and write the whole form back to the node.
	let commit = {
		let service = service.clone();
		move |edit: &dyn Fn(&mut NodeFormValues)| {
			let Some(mut values) = form.get_untracked() else {
				return;
			};
			edit(&mut values);
			if let Err(reason) = service.submit_form(&values) {
				warn!("node update rejected: {reason}");
				form.set(service.form_values());
			}
		}
	};
	// Unparseable numbers put the stored value back in the field.
	let numeric = {
		let (commit, service) = (commit.clone(), service.clone());
		move |ev: &Event, apply: fn(&mut NodeFormValues, f64)| match event_target_value(ev)
			.trim()
			.parse::<f64>()
		{
			Ok(value) if value.is_finite() => commit(&|v| apply(v, value)),
			_ => form.set(service.form_values()),
		}
	};

	let on_name = {
		let commit = commit.clone();
		move |ev: Event| {
			let name = event_target_value(&ev);
			commit(&|v| v.name = name.clone());
		}
	};
	let on_x = {
		let numeric = numeric.clone();
		move |ev: Event| numeric(&ev, |v, x| v.x_pos = x)
	};
	let on_y = {
		let numeric = numeric.clone();
		move |ev: Event| numeric(&ev, |v, y| v.y_pos = y)
	};
	let on_vulnerability = move |ev: Event| numeric(&ev, |v, p| v.vulnerability = p);
	let on_entry = {
		let commit = commit.clone();
		move |ev: Event| {
			let checked = event_target_checked(&ev);
			commit(&|v| v.entry_node = checked);
		}
	};
	let on_high_value = move |ev: Event| {
		let checked = event_target_checked(&ev);
		commit(&|v| v.high_value_node = checked);
	};

	let interaction_in = interaction.clone();
	let on_focus_in = move |_: FocusEvent| interaction_in.borrow_mut().set_input_focused(true);
	let on_focus_out = move |_: FocusEvent| interaction.borrow_mut().set_input_focused(false);

	let field = move |read: fn(&NodeFormValues) -> String| {
		move || form.with(|f| f.as_ref().map(read).unwrap_or_default())
	};
	let flag = move |read: fn(&NodeFormValues) -> bool| {
		move || form.with(|f| f.as_ref().is_some_and(read))
	};

	view! {
		<form
			class="node-properties"
			style:display=move || if form.with(Option::is_some) { "block" } else { "none" }
			on:submit=|ev| ev.prevent_default()
			on:focusin=on_focus_in
			on:focusout=on_focus_out
		>
			<label>
				"Name"
				<input type="text" prop:value=field(|v| v.name.clone()) on:change=on_name />
			</label>
			<label>
				"X"
				<input type="number" step="0.01" prop:value=field(|v| v.x_pos.to_string()) on:change=on_x />
			</label>
			<label>
				"Y"
				<input type="number" step="0.01" prop:value=field(|v| v.y_pos.to_string()) on:change=on_y />
			</label>
			<label>
				"Vulnerability"
				<input
					type="number"
					min="0"
					max="1"
					step="0.000001"
					prop:value=field(|v| v.vulnerability.to_string())
					on:change=on_vulnerability
				/>
			</label>
			<label>
				<input type="checkbox" prop:checked=flag(|v| v.entry_node) on:change=on_entry />
				"Entry node"
			</label>
			<label>
				<input type="checkbox" prop:checked=flag(|v| v.high_value_node) on:change=on_high_value />
				"High value node"
			</label>
		</form>
	}
}
