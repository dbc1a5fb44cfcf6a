use crate::Handle;
use core::fmt;
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{error, instrument, trace};
use wasm_bindgen::{closure::Closure, JsCast};

/// An event callback with identity, so that it can later be detached with [`Handle::off`].
///
/// Clones are the same listener.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&web_sys::Event)>);
impl Listener {
	pub fn new(callback: impl 'static + Fn(&web_sys::Event)) -> Self {
		Self(Rc::new(callback))
	}

	fn id(&self) -> *const () {
		Rc::as_ptr(&self.0).cast()
	}
}
impl PartialEq for Listener {
	fn eq(&self, other: &Self) -> bool {
		self.id() == other.id()
	}
}
impl Eq for Listener {}
impl fmt::Debug for Listener {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Listener").field(&self.id()).finish()
	}
}

struct Subscription {
	listener: Listener,
	closure: Closure<dyn Fn(web_sys::Event)>,
}

/// A handle's own listeners, grouped by event name so one group can be cancelled at once.
#[derive(Default)]
pub(crate) struct Subscriptions(HashMap<String, Vec<Subscription>>);
impl Subscriptions {
	fn subscribe(&mut self, elements: &[web_sys::Element], event: &str, listener: &Listener) {
		let group = self.0.entry_ref(event).or_default();
		if group.iter().any(|subscription| &subscription.listener == listener) {
			// Matches `addEventListener`, which ignores identical registrations.
			return trace!("{:?} is already subscribed to {:?}.", listener, event);
		}

		let callback = Rc::clone(&listener.0);
		let closure = Closure::wrap(Box::new(move |event: web_sys::Event| callback(&event)) as Box<dyn Fn(web_sys::Event)>);
		for element in elements {
			if let Err(error) = element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
				error!("Failed to add {:?} listener: {:?}", event, error);
			}
		}
		group.push(Subscription {
			listener: listener.clone(),
			closure,
		});
	}

	fn unsubscribe(&mut self, elements: &[web_sys::Element], event: &str, listener: Option<&Listener>) -> usize {
		let group = match self.0.get_mut(event) {
			Some(group) => group,
			None => return 0,
		};

		let before = group.len();
		group.retain(|subscription| {
			if listener.map_or(false, |listener| listener != &subscription.listener) {
				return true;
			}
			detach(elements, event, &subscription.closure);
			false
		});
		let removed = before - group.len();

		if group.is_empty() {
			self.0.remove(event);
		}
		removed
	}

	pub(crate) fn clear(&mut self, elements: &[web_sys::Element]) {
		for (event, group) in self.0.drain() {
			for subscription in group {
				detach(elements, &event, &subscription.closure);
			}
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.0.values().map(Vec::len).sum()
	}
}
impl Drop for Subscriptions {
	fn drop(&mut self) {
		let mut forgotten = 0;
		for (_, group) in self.0.drain() {
			for subscription in group {
				subscription.closure.forget();
				forgotten += 1;
			}
		}
		if forgotten > 0 {
			trace!("Handle dropped with {} active listener(s); leaving them attached.", forgotten);
		}
	}
}

fn detach(elements: &[web_sys::Element], event: &str, closure: &Closure<dyn Fn(web_sys::Event)>) {
	for element in elements {
		if let Err(error) = element.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
			error!("Failed to remove {:?} listener: {:?}", event, error);
		}
	}
}

impl Handle {
	/// Subscribes `listener` to `event` on every element.
	///
	/// Subscribing the same listener to the same event twice has no further effect.
	#[instrument]
	pub fn on(&self, event: &str, listener: &Listener) -> &Self {
		self.0.subscriptions.borrow_mut().subscribe(&self.0.elements, event, listener);
		self
	}

	/// Detaches `listener` from `event`, or every listener this handle subscribed to `event` if [`None`].
	///
	/// Listeners attached through other handles are never affected.
	#[instrument]
	pub fn off(&self, event: &str, listener: Option<&Listener>) -> &Self {
		let removed = self.0.subscriptions.borrow_mut().unsubscribe(&self.0.elements, event, listener);
		trace!("Removed {} {:?} listener(s).", removed, event);
		self
	}

	/// The number of listeners currently subscribed through this handle.
	pub fn listener_count(&self) -> usize {
		self.0.subscriptions.borrow().len()
	}

	/// Subscribes `callback` to `event`, called with the closest ancestor of the event target matching
	/// `selector` that lies within the element the listener is attached to.
	///
	/// The returned [`Listener`] can be passed to [`Handle::off`].
	pub fn delegate(&self, event: &str, selector: &str, callback: impl 'static + Fn(&Handle, &web_sys::Event)) -> Listener {
		let selector = selector.to_owned();
		let listener = Listener::new(move |event| {
			let current = event.current_target().and_then(|target| target.dyn_into::<web_sys::Node>().ok());
			let matched = event
				.target()
				.and_then(|target| target.dyn_into::<web_sys::Element>().ok())
				.and_then(|target| target.closest(&selector).ok().flatten())
				.filter(|matched| current.as_ref().map_or(true, |current| current.contains(Some(&**matched))));
			if let Some(matched) = matched {
				callback(&Handle::from(matched), event);
			}
		});
		self.on(event, &listener);
		listener
	}
}
