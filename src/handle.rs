use crate::{actions, contract_violation, form::Control, listeners::Subscriptions, markup, query, slot::Slot};
use core::{cell::RefCell, fmt};
use hashbrown::HashMap;
use serde_json::Value;
use std::rc::Rc;
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::JsCast;

/// A batch of zero or more elements with a uniform imperative API.
///
/// Reading accessors look at the first element only and return [`None`] for an empty batch.
/// Writing accessors apply to every element, so on an empty batch they do nothing.
///
/// Cloning a [`Handle`] is cheap and shares its event subscriptions. Subscriptions still active when
/// the last clone is dropped stay attached to their elements; [`Handle::remove`] or
/// [`Handle::off`] detaches them.
#[derive(Clone)]
pub struct Handle(pub(crate) Rc<Inner>);

pub(crate) struct Inner {
	pub(crate) elements: Vec<web_sys::Element>,
	pub(crate) subscriptions: RefCell<Subscriptions>,
	pub(crate) instance: Option<Instance>,
}

/// Index of a rendered template clone, built once at clone time.
pub(crate) struct Instance {
	pub(crate) parts: HashMap<String, Handle>,
	pub(crate) slots: HashMap<String, Rc<Slot>>,
}

impl fmt::Debug for Handle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("Handle");
		debug.field("elements", &self.0.elements.iter().map(web_sys::Element::tag_name).collect::<Vec<_>>());
		if let Some(instance) = &self.0.instance {
			debug.field("parts", &instance.parts.keys().collect::<Vec<_>>());
			debug.field("slots", &instance.slots.keys().collect::<Vec<_>>());
		}
		debug.finish()
	}
}

impl From<web_sys::Element> for Handle {
	fn from(element: web_sys::Element) -> Self {
		Self::new(vec![element])
	}
}

impl Handle {
	#[must_use]
	pub fn new(elements: Vec<web_sys::Element>) -> Self {
		Self(Rc::new(Inner {
			elements,
			subscriptions: RefCell::default(),
			instance: None,
		}))
	}

	#[must_use]
	pub fn empty() -> Self {
		Self::new(Vec::new())
	}

	fn new_instance(root: web_sys::Element, instance: Instance) -> Self {
		Self(Rc::new(Inner {
			elements: vec![root],
			subscriptions: RefCell::default(),
			instance: Some(instance),
		}))
	}

	pub fn len(&self) -> usize {
		self.0.elements.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.elements.is_empty()
	}

	/// Raw access to the first element, for anything the typed surface doesn't cover.
	pub fn element(&self) -> Option<&web_sys::Element> {
		self.0.elements.first()
	}

	/// Raw access to the whole batch.
	pub fn elements(&self) -> &[web_sys::Element] {
		&self.0.elements
	}

	/// Whether `self` and `other` are clones of the same handle.
	pub fn same(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub(crate) fn instance(&self) -> Option<&Instance> {
		self.0.instance.as_ref()
	}

	/// The elements carrying the part `name` inside this handle.
	///
	/// Rendered instances answer from the index built when they were cloned, so parts that slot
	/// content brings in later aren't included. Other handles search their elements live.
	pub fn part(&self, name: &str) -> Handle {
		if name.is_empty() {
			contract_violation("A part name is required.")
		}
		match &self.0.instance {
			Some(instance) => instance.parts.get(name).cloned().unwrap_or_else(Handle::empty),
			None => Handle::new(query::select_within(&self.0.elements, &markup::part_selector(name))),
		}
	}

	pub fn text(&self) -> Option<String> {
		self.element().and_then(|element| element.text_content())
	}

	pub fn set_text(&self, text: &str) -> &Self {
		for element in &self.0.elements {
			element.set_text_content(Some(text));
		}
		self
	}

	/// The current value of the first element if it is a form control.
	pub fn value(&self) -> Option<String> {
		self.element().and_then(Control::of).map(|control| control.value())
	}

	pub fn set_value(&self, value: &str) -> &Self {
		for element in &self.0.elements {
			match Control::of(element) {
				Some(control) => control.set_value(value),
				None => trace!("Skipping value of non-control <{}>.", element.tag_name()),
			}
		}
		self
	}

	pub fn attr(&self, name: &str) -> Option<String> {
		self.element().and_then(|element| element.get_attribute(name))
	}

	/// Sets the attribute `name` on all elements, or removes it for [`None`].
	pub fn set_attr(&self, name: &str, value: Option<&str>) -> &Self {
		for element in &self.0.elements {
			let result = match value {
				Some(value) => element.set_attribute(name, value),
				None => element.remove_attribute(name),
			};
			if let Err(error) = result {
				error!("Failed to set attribute {:?}: {:?}", name, error);
			}
		}
		self
	}

	pub fn rect(&self) -> Option<web_sys::DomRect> {
		self.element().map(web_sys::Element::get_bounding_client_rect)
	}

	/// Clears (`force`) or sets (`!force`) the hidden state.
	pub fn shown(&self, force: bool) -> &Self {
		self.toggle_attribute("hidden", !force)
	}

	/// Sets (`force`) or clears (`!force`) the hidden state.
	pub fn hidden(&self, force: bool) -> &Self {
		self.toggle_attribute("hidden", force)
	}

	pub fn show(&self) -> &Self {
		self.shown(true)
	}

	pub fn hide(&self) -> &Self {
		self.hidden(true)
	}

	pub fn is_hidden(&self) -> Option<bool> {
		self.element().map(|element| element.has_attribute("hidden"))
	}

	pub fn disabled(&self) -> Option<bool> {
		self.element().map(|element| element.has_attribute("disabled"))
	}

	pub fn set_disabled(&self, disabled: bool) -> &Self {
		self.toggle_attribute("disabled", disabled)
	}

	pub fn read_only(&self) -> Option<bool> {
		self.element().map(|element| element.has_attribute("readonly"))
	}

	pub fn set_read_only(&self, read_only: bool) -> &Self {
		self.toggle_attribute("readonly", read_only)
	}

	fn toggle_attribute(&self, name: &str, force: bool) -> &Self {
		for element in &self.0.elements {
			if let Err(error) = element.toggle_attribute_with_force(name, force) {
				error!("Failed to toggle attribute {:?}: {:?}", name, error);
			}
		}
		self
	}

	/// All `data-*` entries of the first element, keyed like `HTMLElement.dataset`.
	pub fn data(&self) -> Option<HashMap<String, String>> {
		let element = self.element()?;
		Some(
			element
				.get_attribute_names()
				.iter()
				.filter_map(|name| name.as_string())
				.filter_map(|name| {
					let key = markup::dataset_key(&name)?;
					Some((key, element.get_attribute(&name)?))
				})
				.collect(),
		)
	}

	/// One `data-*` entry of the first element.
	pub fn data_get(&self, key: &str) -> Option<String> {
		self.attr(&markup::data_attribute_name(key))
	}

	/// Writes a `data-*` entry on all elements.
	///
	/// `null` and `false` remove the entry and `true` leaves it present but empty,
	/// so attribute selectors like `[data-selected]` follow the value.
	pub fn set_data(&self, key: &str, value: impl Into<Value>) -> &Self {
		let text = attribute_text(&value.into());
		self.set_attr(&markup::data_attribute_name(key), text.as_deref())
	}

	/// A custom style property of the first element, without the `--` prefix being required.
	pub fn css_prop(&self, key: &str) -> Option<String> {
		let style = style_of(self.element()?)?;
		match style.get_property_value(&markup::custom_property_name(key)) {
			Ok(value) if !value.is_empty() => Some(value),
			Ok(_) => None,
			Err(error) => {
				error!("Failed to read custom property {:?}: {:?}", key, error);
				None
			}
		}
	}

	/// Writes a custom style property on all elements; `null` and `false` remove it.
	pub fn set_css_prop(&self, key: &str, value: impl Into<Value>) -> &Self {
		let name = markup::custom_property_name(key);
		let value = value.into();
		for element in &self.0.elements {
			let style = match style_of(element) {
				Some(style) => style,
				None => {
					trace!("<{}> has no inline style.", element.tag_name());
					continue;
				}
			};
			let result = match &value {
				Value::Null | Value::Bool(false) => style.remove_property(&name).map(drop),
				value => style.set_property(&name, &crate::text_of(value)),
			};
			if let Err(error) = result {
				error!("Failed to write custom property {:?}: {:?}", name, error);
			}
		}
		self
	}

	/// Clones the wrapped `<template>`'s top-level element into a new, detached instance.
	///
	/// The instance indexes its part-tagged descendants (see [`Handle::part`]) and replaces each
	/// `<slot name="…">` placeholder with a `slot:…`/`slot-end:…` comment pair bounding an empty region.
	#[instrument]
	pub fn render(&self) -> Option<Handle> {
		let template = match self.element().and_then(|element| element.dyn_ref::<web_sys::HtmlTemplateElement>()) {
			Some(template) => template,
			None => {
				error!("`render` requires a handle over a <template>.");
				return None;
			}
		};

		let fragment = match template.content().clone_node_with_deep(true) {
			Ok(fragment) => fragment.unchecked_into::<web_sys::DocumentFragment>(),
			Err(error) => {
				error!("Failed to clone template content: {:?}", error);
				return None;
			}
		};

		let root = match fragment.first_element_child() {
			Some(root) => root,
			None => {
				error!("Template has no top-level element to render.");
				return None;
			}
		};
		if fragment.child_element_count() > 1 {
			warn!("Template has {} top-level elements; only the first is rendered.", fragment.child_element_count());
		}

		let slots = consume_slots(&root);
		let parts = index_parts(&root);
		trace!("Rendered instance with {} part name(s) and {} slot(s).", parts.len(), slots.len());
		Some(Handle::new_instance(root, Instance { parts, slots }))
	}

	/// Appends all elements to `parent`, in batch order.
	pub fn append_to(&self, parent: &web_sys::Node) -> &Self {
		for element in &self.0.elements {
			if let Err(error) = parent.append_child(element) {
				error!("Failed to append <{}>: {:?}", element.tag_name(), error);
			}
		}
		self
	}

	/// Puts all elements where the first element of `target` is, and removes that element.
	pub fn replace(&self, target: &Handle) -> &Self {
		let target = match target.element() {
			Some(target) => target,
			None => return self,
		};
		let parent = match target.parent_node() {
			Some(parent) => parent,
			None => {
				error!("Can't replace a detached <{}>.", target.tag_name());
				return self;
			}
		};
		for element in &self.0.elements {
			if let Err(error) = parent.insert_before(element, Some(&**target)) {
				error!("Failed to insert <{}>: {:?}", element.tag_name(), error);
			}
		}
		target.remove();
		self
	}

	/// Removes all elements from the document and tears down what this handle owns:
	/// its subscriptions, those of its parts, delegated actions and all slot content.
	#[instrument]
	pub fn remove(&self) {
		self.0.subscriptions.borrow_mut().clear(&self.0.elements);
		if let Some(instance) = &self.0.instance {
			for part in instance.parts.values() {
				part.0.subscriptions.borrow_mut().clear(&part.0.elements);
				actions::forget_roots(&part.0.elements);
			}
			for slot in instance.slots.values() {
				slot.clear();
			}
		}
		actions::forget_roots(&self.0.elements);
		for element in &self.0.elements {
			element.remove();
		}
	}
}

fn consume_slots(root: &web_sys::Element) -> HashMap<String, Rc<Slot>> {
	let mut slots = HashMap::new();
	if root.tag_name().eq_ignore_ascii_case(markup::SLOT_TAG) {
		error!("A <slot> can't be a template's top-level element. Leaving it in place.");
		return slots;
	}

	let document = match root.owner_document() {
		Some(document) => document,
		None => {
			error!("Rendered root has no owner document.");
			return slots;
		}
	};

	let placeholders = match root.query_selector_all(&format!("{}[name]", markup::SLOT_TAG)) {
		Ok(list) => query::elements_of(&list),
		Err(error) => {
			error!("Failed to look up slot placeholders: {:?}", error);
			return slots;
		}
	};

	for placeholder in placeholders {
		let name = placeholder.get_attribute("name").unwrap_or_default();
		let parent = match placeholder.parent_node() {
			Some(parent) => parent,
			None => continue,
		};
		let start = document.create_comment(&markup::slot_start_marker(&name));
		let end = document.create_comment(&markup::slot_end_marker(&name));
		if let Err(error) = parent.insert_before(&start, Some(&*placeholder)).and_then(|_| parent.replace_child(&end, &placeholder)) {
			error!("Failed to replace slot placeholder {:?}: {:?}", name, error);
			continue;
		}
		if slots.insert(name.clone(), Rc::new(Slot::new(name.clone(), start, end))).is_some() {
			warn!("Duplicate slot name {:?}; only the last one is addressable.", name);
		}
	}
	slots
}

fn index_parts(root: &web_sys::Element) -> HashMap<String, Handle> {
	let mut grouped = HashMap::<String, Vec<web_sys::Element>>::new();
	let selector = format!("[{}]", markup::PART_ATTRIBUTE);
	for element in query::select_within(std::slice::from_ref(root), &selector) {
		if let Some(name) = element.get_attribute(markup::PART_ATTRIBUTE) {
			grouped.entry(name).or_default().push(element);
		}
	}
	grouped.into_iter().map(|(name, elements)| (name, Handle::new(elements))).collect()
}

fn style_of(element: &web_sys::Element) -> Option<web_sys::CssStyleDeclaration> {
	if let Some(element) = element.dyn_ref::<web_sys::HtmlElement>() {
		Some(element.style())
	} else {
		element.dyn_ref::<web_sys::SvgElement>().map(web_sys::SvgElement::style)
	}
}

/// `data-*` text for a written value, [`None`] meaning "remove the attribute".
fn attribute_text(value: &Value) -> Option<String> {
	match value {
		Value::Null | Value::Bool(false) => None,
		Value::Bool(true) => Some(String::new()),
		value => Some(crate::text_of(value)),
	}
}
