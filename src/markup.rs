//! The markup contract shared between page HTML and this crate.
//!
//! ```html
//! <template data-name="reservation-list">
//! 	<li><span data-part="name"></span> <span data-part="time"></span></li>
//! </template>
//!
//! <template data-part="content">
//! 	<main><ul><slot name="reservations"></slot></ul></main>
//! </template>
//! ```

/// Marks an element with a semantic role within its nearest scope.
pub const PART_ATTRIBUTE: &str = "data-part";

/// Names a `<template>` so the registry can instantiate it.
pub const TEMPLATE_NAME_ATTRIBUTE: &str = "data-name";

/// Discriminates between mutually exclusive `<template>`s sharing a [`TEMPLATE_NAME_ATTRIBUTE`].
pub const TEMPLATE_VARIANT_ATTRIBUTE: &str = "data-variant";

/// Overrides the action name resolved from a control's `value` or `name`.
pub const ACTION_ATTRIBUTE: &str = "data-action";

/// Placeholder element consumed (once per clone) when a template is rendered.
pub const SLOT_TAG: &str = "slot";

/// Payload of the comment node opening the slot named `name`.
#[must_use]
pub fn slot_start_marker(name: &str) -> String {
	format!("slot:{}", name)
}

/// Payload of the comment node closing the slot named `name`.
#[must_use]
pub fn slot_end_marker(name: &str) -> String {
	format!("slot-end:{}", name)
}

pub(crate) fn part_selector(name: &str) -> String {
	format!("[{}=\"{}\"]", PART_ATTRIBUTE, name)
}

pub(crate) fn template_selector(name: &str, variant: Option<&str>) -> String {
	match variant {
		Some(variant) => format!("template[{}=\"{}\"][{}=\"{}\"]", TEMPLATE_NAME_ATTRIBUTE, name, TEMPLATE_VARIANT_ATTRIBUTE, variant),
		None => format!("template[{}=\"{}\"]:not([{}])", TEMPLATE_NAME_ATTRIBUTE, name, TEMPLATE_VARIANT_ATTRIBUTE),
	}
}

/// Converts a dataset key (`floorplanId`) into its attribute name (`data-floorplan-id`).
#[must_use]
pub fn data_attribute_name(key: &str) -> String {
	let mut name = String::with_capacity(key.len() + 8);
	name.push_str("data-");
	for c in key.chars() {
		if c.is_ascii_uppercase() {
			name.push('-');
			name.push(c.to_ascii_lowercase());
		} else {
			name.push(c);
		}
	}
	name
}

/// Converts a `data-*` attribute name back into its dataset key.
///
/// Returns [`None`] for attributes outside the `data-` namespace.
#[must_use]
pub fn dataset_key(attribute_name: &str) -> Option<String> {
	let rest = attribute_name.strip_prefix("data-")?;
	let mut key = String::with_capacity(rest.len());
	let mut chars = rest.chars().peekable();
	while let Some(c) = chars.next() {
		match (c, chars.peek()) {
			('-', Some(next)) if next.is_ascii_lowercase() => {
				key.push(next.to_ascii_uppercase());
				chars.next();
			}
			_ => key.push(c),
		}
	}
	Some(key)
}

/// Custom properties always carry the `--` prefix; callers may omit it.
pub(crate) fn custom_property_name(key: &str) -> String {
	if key.starts_with("--") {
		key.to_owned()
	} else {
		format!("--{}", key)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dataset_names() {
		assert_eq!(data_attribute_name("floorplanId"), "data-floorplan-id");
		assert_eq!(data_attribute_name("day"), "data-day");
		assert_eq!(dataset_key("data-floorplan-id").as_deref(), Some("floorplanId"));
		assert_eq!(dataset_key("data-day").as_deref(), Some("day"));
		assert_eq!(dataset_key("data-x-1").as_deref(), Some("x-1"));
		assert_eq!(dataset_key("hidden"), None);
	}

	#[test]
	fn markers() {
		assert_eq!(slot_start_marker("tabs"), "slot:tabs");
		assert_eq!(slot_end_marker("tabs"), "slot-end:tabs");
		assert_eq!(custom_property_name("x"), "--x");
		assert_eq!(custom_property_name("--y"), "--y");
	}

	#[test]
	fn template_selectors() {
		assert_eq!(template_selector("guests", Some("one")), r#"template[data-name="guests"][data-variant="one"]"#);
		assert_eq!(template_selector("guests", None), r#"template[data-name="guests"]:not([data-variant])"#);
	}
}
