use parts_dom::{markup, query_in, register_template, serde_json::json, text_of, Handle, Recipe, Registry, RenderStats};
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

use web_fixture_::{children, Fixture};

const MARKUP: &str = r#"
	<template data-part="party"><section><h2 data-part="title"></h2><slot name="guests"></slot><slot name="status"></slot></section></template>
	<template data-name="guest-count" data-variant="one"><p><span data-part="count"></span> guest</p></template>
	<template data-name="guest-count" data-variant="other"><p><span data-part="count"></span> guests</p></template>
	<template data-name="status-card"><p class="booked" data-part="status"></p></template>
	<template data-name="status-card" data-variant="cancelled"><p class="cancelled" data-part="status"></p></template>
	<template data-name="status-line"><p class="line" data-part="status"></p></template>
	<template data-name="echo-line"><p class="echo"></p></template>
"#;

fn setup(fixture: &Fixture) -> (Handle, web_sys::Element) {
	register_template(
		"guest-count",
		Recipe::new().field("count", |card, count| {
			card.part("count").set_text(&text_of(count));
		}),
	);
	for name in ["status-card", "status-line"] {
		register_template(
			name,
			Recipe::new().field("status", |card, status| {
				card.part("status").set_text(&text_of(status));
			}),
		);
	}

	let party = query_in("party", fixture.root()).render().unwrap();
	party.append_to(fixture.root());
	let section = party.element().unwrap().clone();
	(party, section)
}

fn paragraphs(section: &web_sys::Element) -> Vec<web_sys::Element> {
	children(section).into_iter().filter(|child| child.tag_name() == "P").collect()
}

fn comments(section: &web_sys::Element) -> Vec<String> {
	let nodes = section.child_nodes();
	(0..nodes.length())
		.filter_map(|i| nodes.item(i))
		.filter_map(|node| node.dyn_into::<web_sys::Comment>().ok())
		.map(|comment| comment.data())
		.collect()
}

#[wasm_bindgen_test]
fn slots_become_markers() {
	let fixture = Fixture::new(MARKUP);
	let (_party, section) = setup(&fixture);

	assert!(section.query_selector("slot").unwrap().is_none());
	assert_eq!(
		comments(&section),
		[
			markup::slot_start_marker("guests"),
			markup::slot_end_marker("guests"),
			markup::slot_start_marker("status"),
			markup::slot_end_marker("status"),
		]
	);
}

#[wasm_bindgen_test]
fn pluralized() {
	let fixture = Fixture::new(MARKUP);
	let (party, section) = setup(&fixture);
	Registry::with(|registry| registry.set_locale(Some("en")));

	assert_eq!(Registry::with(|registry| registry.plural_category(0.0)), "other");
	assert_eq!(Registry::with(|registry| registry.plural_category(1.0)), "one");

	let zero = party.render_pluralized("guests", "guest-count", 0.0, &json!({ "count": 0 }));
	assert_eq!(zero.created, 1);
	assert_eq!(paragraphs(&section)[0].text_content().unwrap(), "0 guests");

	let one = party.render_pluralized("guests", "guest-count", 1.0, &json!({ "count": 1 }));
	assert_eq!(one.created, 1);
	assert_eq!(one.removed, 1);
	assert_eq!(paragraphs(&section)[0].text_content().unwrap(), "1 guest");

	let two = party.render_pluralized("guests", "guest-count", 2.0, &json!({ "count": 2 }));
	assert_eq!(two.removed, 1);
	assert_eq!(paragraphs(&section)[0].text_content().unwrap(), "2 guests");

	let three = party.render_pluralized("guests", "guest-count", 3.0, &json!({ "count": 3 }));
	assert_eq!(
		three,
		RenderStats {
			updated: 1,
			..RenderStats::default()
		}
	);
	assert_eq!(paragraphs(&section).len(), 1);
	assert_eq!(paragraphs(&section)[0].text_content().unwrap(), "3 guests");

	Registry::with(|registry| registry.set_locale(None));
}

#[wasm_bindgen_test]
fn variant_switch_replaces_the_instance() {
	let fixture = Fixture::new(MARKUP);
	let (party, section) = setup(&fixture);

	party.render_variant("status", "status-card", None, &json!({ "status": "Booked" }));
	let booked = paragraphs(&section)[0].clone();
	assert_eq!(booked.class_name(), "booked");

	let switched = party.render_variant("status", "status-card", Some("cancelled"), &json!({ "status": "Cancelled" }));
	assert_eq!(switched.created, 1);
	assert_eq!(switched.removed, 1);
	assert!(!booked.is_connected());
	let cancelled = paragraphs(&section)[0].clone();
	assert_eq!(cancelled.class_name(), "cancelled");
	assert_eq!(cancelled.text_content().unwrap(), "Cancelled");

	// Same variant name, different template.
	let line = party.render_from_template("status", "status-line", &json!({ "status": "Cancelled" }));
	assert_eq!(line.created, 1);
	assert_eq!(line.removed, 1);
	assert_eq!(paragraphs(&section)[0].class_name(), "line");
}

#[wasm_bindgen_test]
fn single_record_updates_only_changes() {
	let fixture = Fixture::new(MARKUP);
	let (party, section) = setup(&fixture);

	party.render_from_template("status", "status-card", &json!({ "status": "Booked" }));
	let card = paragraphs(&section)[0].clone();

	assert_eq!(party.render_from_template("status", "status-card", &json!({ "status": "Booked" })), RenderStats::default());
	// Absent fields keep their last value.
	assert_eq!(party.render_from_template("status", "status-card", &json!({})), RenderStats::default());
	assert_eq!(card.text_content().unwrap(), "Booked");

	let seated = party.render_from_template("status", "status-card", &json!({ "status": "Seated" }));
	assert_eq!(seated.updated, 1);
	assert_eq!(paragraphs(&section)[0], card);
	assert_eq!(card.text_content().unwrap(), "Seated");
}

#[wasm_bindgen_test]
fn slots_stay_independent() {
	let fixture = Fixture::new(MARKUP);
	let (party, section) = setup(&fixture);
	party.part("title").set_text("Table 4");

	party.render_from_template("status", "status-card", &json!({ "status": "Booked" }));
	party.render_pluralized("guests", "guest-count", 5.0, &json!({ "count": 5 }));
	let status = section.query_selector(".booked").unwrap().unwrap();

	party.render_pluralized("guests", "guest-count", 1.0, &json!({ "count": 1 }));
	assert!(status.is_connected());
	assert_eq!(party.part("title").text().as_deref(), Some("Table 4"));
	assert_eq!(paragraphs(&section).len(), 2);
}

#[wasm_bindgen_test]
fn clearing() {
	let fixture = Fixture::new(MARKUP);
	let (party, section) = setup(&fixture);

	party.render_from_template("status", "status-card", &json!({ "status": "Booked" }));
	assert_eq!(party.clear_slot("status").removed, 1);
	assert!(paragraphs(&section).is_empty());
	assert_eq!(comments(&section).len(), 4);
	assert_eq!(party.clear_slot("status"), RenderStats::default());
	assert_eq!(party.clear_slot("missing"), RenderStats::default());

	let again = party.render_from_template("status", "status-card", &json!({ "status": "Booked" }));
	assert_eq!(again.created, 1);
}

#[wasm_bindgen_test]
fn list_and_single_modes_replace_each_other() {
	let fixture = Fixture::new(MARKUP);
	let (party, section) = setup(&fixture);

	party.render_from_template("status", "status-line", &json!([{ "id": 1, "status": "A" }, { "id": 2, "status": "B" }]));
	assert_eq!(paragraphs(&section).len(), 2);

	let single = party.render_from_template("status", "status-line", &json!({ "status": "C" }));
	assert_eq!(single.removed, 2);
	assert_eq!(single.created, 1);

	let list = party.render_from_template("status", "status-line", &json!([{ "id": 1, "status": "A" }]));
	assert_eq!(list.removed, 1);
	assert_eq!(list.created, 1);
	assert_eq!(paragraphs(&section).len(), 1);
}

#[wasm_bindgen_test]
fn rendered_instances_are_detached_and_indexed() {
	let fixture = Fixture::new(MARKUP);
	let template = query_in("party", fixture.root());

	let first = template.render().unwrap();
	let second = template.render().unwrap();
	assert!(first.element().unwrap().parent_node().is_none());
	assert_ne!(first.element(), second.element());
	assert_eq!(first.part("title").len(), 1);
	assert!(first.part("missing").is_empty());

	assert!(query_in("title", fixture.root()).render().is_none());
}

/// Registers `echo-line` with a create hook that renders into the `status` slot of `host`,
/// returning what those nested renders did.
fn register_echo(host: &Handle) -> Rc<RefCell<Vec<RenderStats>>> {
	let host = host.clone();
	let nested = Rc::new(RefCell::new(Vec::new()));
	register_template(
		"echo-line",
		Recipe::new().create({
			let nested = Rc::clone(&nested);
			move |_| {
				let stats = host.render_from_template("status", "status-line", &json!({ "status": "Nested" }));
				nested.borrow_mut().push(stats);
			}
		}),
	);
	nested
}

#[cfg(debug_assertions)]
#[wasm_bindgen_test]
#[should_panic(expected = "Reentrant render")]
fn reentrant_renders_panic() {
	let fixture = Fixture::new(MARKUP);
	let (party, _section) = setup(&fixture);
	register_echo(&party);
	party.render_from_template("status", "echo-line", &json!({}));
}

#[cfg(not(debug_assertions))]
#[wasm_bindgen_test]
fn reentrant_renders_are_refused() {
	let fixture = Fixture::new(MARKUP);
	let (party, section) = setup(&fixture);
	let nested = register_echo(&party);

	let stats = party.render_from_template("status", "echo-line", &json!({}));
	assert_eq!(stats.created, 1);
	assert_eq!(comments(&section).len(), 4);
	assert_eq!(paragraphs(&section).len(), 1);
	assert_eq!(paragraphs(&section)[0].class_name(), "echo");
	assert!(section.query_selector(".line").unwrap().is_none());
	assert_eq!(*nested.borrow(), [RenderStats::default()]);

	// The slot isn't left locked.
	let next = party.render_from_template("status", "status-line", &json!({ "status": "After" }));
	assert_eq!(next.removed, 1);
	assert_eq!(paragraphs(&section)[0].text_content().unwrap(), "After");
}

#[wasm_bindgen_test]
fn other_slots_may_render_from_a_create_hook() {
	let fixture = Fixture::new(MARKUP);
	let (party, section) = setup(&fixture);
	let host = party.clone();
	register_template(
		"guest-echo",
		Recipe::new().create(move |_| {
			host.render_from_template("status", "status-line", &json!({ "status": "Nested" }));
		}),
	);
	fixture.root().insert_adjacent_html("beforeend", r#"<template data-name="guest-echo"><p class="guest-echo"></p></template>"#).unwrap();

	let stats = party.render_from_template("guests", "guest-echo", &json!({}));
	assert_eq!(stats.created, 1);
	assert_eq!(paragraphs(&section).len(), 2);
	assert_eq!(section.query_selector(".line").unwrap().unwrap().text_content().unwrap(), "Nested");
}
