//! Self-removing notifications.
//!
//! Expiry and the exit transition are left to CSS: a toast is dismissed when its `expire` animation
//! ends (or its `toast-dismiss` part is clicked), which sets `data-clear`. It then removes itself once
//! the animation or transition started by that ends, or right away if `[data-clear]` starts none.
//!
//! ```html
//! <ul data-part="toast-list"></ul>
//! <template data-part="toast-template">
//! 	<li class="toast"><span data-part="toast-message"></span><button data-part="toast-dismiss">×</button></li>
//! </template>
//! ```

use crate::{query, Handle, Listener};
use core::fmt;
use std::rc::Rc;
use tracing::{debug, error, instrument, trace};
use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};

#[wasm_bindgen]
extern "C" {
	#[wasm_bindgen(extends = web_sys::Element)]
	type Animatable;

	#[wasm_bindgen(method, catch, js_name = getAnimations)]
	fn get_animations(this: &Animatable) -> Result<js_sys::Array, JsValue>;
}

/// Name of the CSS animation whose end dismisses a toast.
pub const EXPIRE_ANIMATION: &str = "expire";

/// Severity of a toast, written to its `data-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastLevel {
	#[default]
	Error,
	Warning,
	Info,
	Success,
}
impl ToastLevel {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Error => "error",
			Self::Warning => "warning",
			Self::Info => "info",
			Self::Success => "success",
		}
	}
}
impl fmt::Display for ToastLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Shows toasts cloned from a template in a list container.
#[derive(Debug, Clone)]
pub struct Toaster {
	list: Handle,
	template: Handle,
}

impl Toaster {
	pub fn new(list: Handle, template: Handle) -> Self {
		Self { list, template }
	}

	/// A [`Toaster`] over the document's `toast-list` and `toast-template` parts.
	pub fn from_document() -> Self {
		Self::new(query("toast-list"), query("toast-template"))
	}

	/// Appends a toast showing `message` and returns it.
	///
	/// Dropping the returned handle doesn't affect the toast.
	#[instrument(skip(message))]
	pub fn show(&self, message: &str, level: ToastLevel) -> Option<Handle> {
		let list = match self.list.element() {
			Some(list) => list,
			None => {
				debug!("No toast list; dropping {} toast.", level);
				return None;
			}
		};
		let toast = self.template.render()?;
		toast.part("toast-message").set_text(message);
		toast.set_data("level", level.as_str());

		let root = toast.element()?.clone();
		let finish: Rc<dyn Fn()> = Rc::new({
			let root = root.clone();
			let weak = Rc::downgrade(&toast.0);
			move || {
				trace!("Removing cleared toast.");
				match weak.upgrade() {
					Some(inner) => Handle(inner).remove(),
					None => root.remove(),
				}
			}
		});

		let ended = Listener::new({
			let (root, finish) = (root.clone(), Rc::clone(&finish));
			move |event| {
				let own: &web_sys::EventTarget = &root;
				if event.target().as_ref() != Some(own) {
					return;
				}
				if root.has_attribute("data-clear") {
					finish();
				} else if event.dyn_ref::<web_sys::AnimationEvent>().map(web_sys::AnimationEvent::animation_name).as_deref() == Some(EXPIRE_ANIMATION) {
					dismiss(&root, &*finish);
				}
			}
		});
		toast.on("animationend", &ended).on("transitionend", &ended);

		toast.part("toast-dismiss").on("click", &Listener::new(move |_| dismiss(&root, &*finish)));

		toast.append_to(list);
		Some(toast)
	}
}

/// Starts the exit of `toast`, calling `finish` right away if that doesn't animate anything.
fn dismiss(toast: &web_sys::Element, finish: &dyn Fn()) {
	if toast.has_attribute("data-clear") {
		return;
	}
	if let Err(error) = toast.set_attribute("data-clear", "") {
		error!("Failed to mark toast as cleared: {:?}", error);
		return finish();
	}
	match toast.unchecked_ref::<Animatable>().get_animations() {
		Ok(animations) if animations.length() > 0 => trace!("Waiting for {} exit animation(s).", animations.length()),
		Ok(_) => finish(),
		Err(error) => {
			debug!("Can't list toast animations: {:?}", error);
			finish();
		}
	}
}
