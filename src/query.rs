use crate::{contract_violation, markup, Handle};
use tracing::{error, instrument, trace};
use wasm_bindgen::JsCast;

/// Finds every element in the document carrying the part `name`, in document order.
///
/// Never fails: without matches (or without a document) the returned [`Handle`] is empty.
#[instrument]
pub fn query(name: &str) -> Handle {
	if name.is_empty() {
		contract_violation("A part name is required.")
	}
	match document() {
		Some(document) => Handle::new(select_all(&document, &markup::part_selector(name))),
		None => {
			error!("No document available to query part {:?}.", name);
			Handle::empty()
		}
	}
}

/// Finds every element within `scope` (including `scope` itself) carrying the part `name`.
#[instrument]
pub fn query_in(name: &str, scope: &web_sys::Element) -> Handle {
	if name.is_empty() {
		contract_violation("A part name is required.")
	}
	Handle::new(select_within(std::slice::from_ref(scope), &markup::part_selector(name)))
}

/// Finds every element matching the CSS `selector` within `scope`, or the whole document if `None`.
#[instrument]
pub fn select(selector: &str, scope: Option<&web_sys::Element>) -> Handle {
	match (scope, document()) {
		(Some(scope), _) => Handle::new(select_within(std::slice::from_ref(scope), selector)),
		(None, Some(document)) => Handle::new(select_all(&document, selector)),
		(None, None) => {
			error!("No document available to select {:?}.", selector);
			Handle::empty()
		}
	}
}

pub(crate) fn document() -> Option<web_sys::Document> {
	web_sys::window().and_then(|window| window.document())
}

fn select_all(document: &web_sys::Document, selector: &str) -> Vec<web_sys::Element> {
	match document.query_selector_all(selector) {
		Ok(list) => elements_of(&list),
		Err(error) => {
			error!("Invalid selector {:?}: {:?}", selector, error);
			Vec::new()
		}
	}
}

/// Scope-inclusive search over several roots, deduplicated and in root order.
pub(crate) fn select_within(scopes: &[web_sys::Element], selector: &str) -> Vec<web_sys::Element> {
	let mut found = Vec::new();
	for scope in scopes {
		match scope.matches(selector) {
			Ok(true) => found.push(scope.clone()),
			Ok(false) => (),
			Err(error) => {
				error!("Invalid selector {:?}: {:?}", selector, error);
				return Vec::new();
			}
		}
		match scope.query_selector_all(selector) {
			Ok(list) => found.extend(elements_of(&list)),
			Err(error) => error!("Invalid selector {:?}: {:?}", selector, error),
		}
	}
	if scopes.len() > 1 {
		// Nested scopes would otherwise report shared descendants twice.
		let mut unique = Vec::with_capacity(found.len());
		for element in found {
			if !unique.contains(&element) {
				unique.push(element);
			}
		}
		found = unique;
	}
	trace!("Selected {} element(s) with {:?}.", found.len(), selector);
	found
}

pub(crate) fn elements_of(list: &web_sys::NodeList) -> Vec<web_sys::Element> {
	(0..list.length()).filter_map(|i| list.item(i)).filter_map(|node| node.dyn_into::<web_sys::Element>().ok()).collect()
}
