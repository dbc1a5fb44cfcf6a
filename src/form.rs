use crate::{Handle, Listener, Record};
use serde_json::Value;
use tracing::{error, instrument, trace, trace_span, warn};
use wasm_bindgen::JsCast;

/// The value-carrying form controls.
pub(crate) enum Control<'a> {
	Input(&'a web_sys::HtmlInputElement),
	Select(&'a web_sys::HtmlSelectElement),
	TextArea(&'a web_sys::HtmlTextAreaElement),
	Button(&'a web_sys::HtmlButtonElement),
}
impl<'a> Control<'a> {
	pub(crate) fn of(element: &'a web_sys::Element) -> Option<Self> {
		if let Some(input) = element.dyn_ref() {
			Some(Self::Input(input))
		} else if let Some(select) = element.dyn_ref() {
			Some(Self::Select(select))
		} else if let Some(text_area) = element.dyn_ref() {
			Some(Self::TextArea(text_area))
		} else {
			element.dyn_ref().map(Self::Button)
		}
	}

	pub(crate) fn value(&self) -> String {
		match self {
			Self::Input(input) => input.value(),
			Self::Select(select) => select.value(),
			Self::TextArea(text_area) => text_area.value(),
			Self::Button(button) => button.value(),
		}
	}

	pub(crate) fn set_value(&self, value: &str) {
		match self {
			Self::Input(input) => input.set_value(value),
			Self::Select(select) => select.set_value(value),
			Self::TextArea(text_area) => text_area.set_value(value),
			Self::Button(button) => button.set_value(value),
		}
	}

	fn set_custom_validity(&self, message: &str) {
		match self {
			Self::Input(input) => input.set_custom_validity(message),
			Self::Select(select) => select.set_custom_validity(message),
			Self::TextArea(text_area) => text_area.set_custom_validity(message),
			Self::Button(button) => button.set_custom_validity(message),
		}
	}
}

impl Handle {
	/// Takes over submission of the wrapped `<form>`s.
	///
	/// Native navigation is prevented and `callback` receives the form's fields flattened into a
	/// [`Record`] (for repeated names the last value wins, file fields are skipped) together with a
	/// handle over the submitted form. Repeated submits are not debounced.
	#[instrument(skip(callback))]
	pub fn submit(&self, callback: impl 'static + Fn(Record, &Handle)) -> Listener {
		let listener = Listener::new(move |event| {
			event.prevent_default();
			let form = match event.current_target().and_then(|target| target.dyn_into::<web_sys::HtmlFormElement>().ok()) {
				Some(form) => form,
				None => return error!("`submit` fired on something that isn't a <form>."),
			};
			let span = trace_span!("Submitting form", id = %form.id());
			let _enter = span.enter();
			let fields = form_fields(&form);
			callback(fields, &Handle::from(web_sys::Element::from(form)));
		});
		self.on("submit", &listener);
		listener
	}

	/// Sets (or with [`None`] clears) each control's validity message from its current value.
	///
	/// `check` sees one element's value at a time. Elements that aren't form controls are skipped.
	pub fn validate(&self, check: impl Fn(&str) -> Option<String>) -> &Self {
		for element in self.elements() {
			match Control::of(element) {
				Some(control) => control.set_custom_validity(check(&control.value()).as_deref().unwrap_or_default()),
				None => trace!("Skipping validation of non-control <{}>.", element.tag_name()),
			}
		}
		self
	}
}

fn form_fields(form: &web_sys::HtmlFormElement) -> Record {
	let mut fields = Record::new();
	let form_data = match web_sys::FormData::new_with_form(form) {
		Ok(form_data) => form_data,
		Err(error) => {
			error!("Failed to read form data: {:?}", error);
			return fields;
		}
	};
	let entries = match js_sys::try_iter(&form_data) {
		Ok(Some(entries)) => entries,
		Ok(None) | Err(_) => {
			error!("Form data is not iterable.");
			return fields;
		}
	};
	for entry in entries {
		let entry = match entry {
			Ok(entry) => js_sys::Array::from(&entry),
			Err(error) => {
				error!("Failed to iterate form data: {:?}", error);
				break;
			}
		};
		match (entry.get(0).as_string(), entry.get(1).as_string()) {
			(Some(name), Some(value)) => {
				fields.insert(name, Value::String(value));
			}
			(Some(name), None) => warn!("Skipping non-text form field {:?}.", name),
			(None, _) => warn!("Skipping form entry without a name."),
		}
	}
	fields
}
