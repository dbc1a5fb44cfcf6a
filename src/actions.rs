use crate::{markup, Handle};
use hashbrown::HashMap;
use std::{cell::RefCell, rc::Rc};
use tracing::{error, instrument, trace, trace_span};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

type Action = Rc<dyn Fn(&Handle, &web_sys::Event)>;

/// Events a root listens to, each with the controls that can trigger an action through it.
const TRIGGERS: [(&str, &str); 3] = [
	("click", "button[data-action], button[value], button[name]"),
	("change", "input[data-action], input[name], select[data-action], select[name], textarea[data-action], textarea[name]"),
	("input", "input[data-action], input[name], select[data-action], select[name], textarea[data-action], textarea[name]"),
];

/// Property (not attribute, so clones don't inherit it) holding an element's key in [`ACTION_ROOTS`].
const ROOT_PROPERTY: &str = "__partsDomActionRoot";

struct ActionRoot {
	element: web_sys::Element,
	actions: HashMap<String, Action>,
	listeners: Vec<(&'static str, Closure<dyn Fn(web_sys::Event)>)>,
}

#[derive(Default)]
struct ActionRoots {
	next_id: u32,
	roots: HashMap<u32, ActionRoot>,
}

thread_local! {
	/// Only pruned through [`forget_roots`]: roots removed from the document by other means keep their
	/// listeners and actions until the page unloads.
	static ACTION_ROOTS: RefCell<ActionRoots> = RefCell::default();
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn root_id(element: &web_sys::Element) -> Option<u32> {
	let id = js_sys::Reflect::get(element, &JsValue::from_str(ROOT_PROPERTY)).ok()?.as_f64()?;
	Some(id as u32)
}

impl Handle {
	/// Registers `callback` for the action `name` on every element of this handle.
	///
	/// Each element gets one set of delegated listeners the first time an action is registered on it,
	/// so actions added later fire without further setup. An interaction triggers the action named by
	/// the control's `data-action`, else (buttons only) its `value`, else its `name`. The callback
	/// receives a handle over the control that triggered it.
	#[instrument(skip(callback))]
	pub fn action(&self, name: &str, callback: impl 'static + Fn(&Handle, &web_sys::Event)) -> &Self {
		let callback: Action = Rc::new(callback);
		ACTION_ROOTS.with(|roots| {
			let mut roots = roots.borrow_mut();
			for element in self.elements() {
				let id = match root_id(element).filter(|id| roots.roots.contains_key(id)) {
					Some(id) => id,
					None => {
						let id = roots.next_id;
						roots.next_id += 1;
						if let Err(error) = js_sys::Reflect::set(element, &JsValue::from_str(ROOT_PROPERTY), &JsValue::from(id)) {
							error!("Failed to mark action root: {:?}", error);
							continue;
						}
						roots.roots.insert(id, install(id, element));
						id
					}
				};
				if let Some(root) = roots.roots.get_mut(&id) {
					root.actions.insert(name.to_owned(), Rc::clone(&callback));
				}
			}
		});
		self
	}

	/// [`Handle::action`] for several actions at once.
	pub fn actions<'a>(&self, actions: impl IntoIterator<Item = (&'a str, Box<dyn Fn(&Handle, &web_sys::Event)>)>) -> &Self {
		for (name, callback) in actions {
			self.action(name, callback);
		}
		self
	}
}

fn install(id: u32, element: &web_sys::Element) -> ActionRoot {
	trace!("Installing action listeners on <{}>.", element.tag_name());
	let listeners = TRIGGERS
		.iter()
		.map(|&(event, selector)| {
			let root = element.clone();
			let closure = Closure::wrap(Box::new(move |event: web_sys::Event| dispatch(id, &root, selector, &event)) as Box<dyn Fn(web_sys::Event)>);
			if let Err(error) = element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
				error!("Failed to add {:?} action listener: {:?}", event, error);
			}
			(event, closure)
		})
		.collect();
	ActionRoot {
		element: element.clone(),
		actions: HashMap::new(),
		listeners,
	}
}

fn dispatch(id: u32, root: &web_sys::Element, selector: &str, event: &web_sys::Event) {
	let control = match event
		.target()
		.and_then(|target| target.dyn_into::<web_sys::Element>().ok())
		.and_then(|target| target.closest(selector).ok().flatten())
	{
		Some(control) if root.contains(Some(&*control)) => control,
		_ => return,
	};

	let name = match action_name(&control) {
		Some(name) => name,
		None => return,
	};

	// Looked up at dispatch time so actions registered after installation still fire.
	let action = ACTION_ROOTS.with(|roots| roots.borrow().roots.get(&id).and_then(|action_root| action_root.actions.get(&name).cloned()));

	match action {
		Some(action) => {
			let span = trace_span!("Dispatching action", %name, event = %event.type_());
			let _enter = span.enter();
			action(&Handle::from(control), event);
		}
		None => trace!("No action registered for {:?}.", name),
	}
}

fn action_name(control: &web_sys::Element) -> Option<String> {
	let non_empty = |value: Option<String>| value.filter(|value| !value.is_empty());
	non_empty(control.get_attribute(markup::ACTION_ATTRIBUTE))
		.or_else(|| {
			control
				.dyn_ref::<web_sys::HtmlButtonElement>()
				.and_then(|button| non_empty(Some(button.value())))
		})
		.or_else(|| non_empty(control.get_attribute("name")))
}

/// Drops the action listeners and registrations of removed roots.
pub(crate) fn forget_roots(elements: &[web_sys::Element]) {
	let removed: Vec<ActionRoot> = ACTION_ROOTS.with(|roots| {
		let mut roots = roots.borrow_mut();
		elements.iter().filter_map(root_id).filter_map(|id| roots.roots.remove(&id)).collect()
	});

	// Dropped outside the borrow, as this may run from within a dispatched action.
	for root in removed {
		for (event, closure) in &root.listeners {
			if let Err(error) = root.element.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
				error!("Failed to remove {:?} action listener: {:?}", event, error);
			}
		}
		trace!("Forgot {} action(s) of <{}>.", root.actions.len(), root.element.tag_name());
	}
}
