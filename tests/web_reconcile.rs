use parts_dom::{query_in, register_template, serde_json::json, text_of, Handle, Recipe, RenderStats};
use std::{cell::Cell, rc::Rc};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

use web_fixture_::{children, texts, Fixture};

const MARKUP: &str = r#"
	<template data-part="guest-list"><ul><slot name="rows"></slot></ul></template>
	<template data-name="guest-row"><li><span data-part="name"></span><span data-part="time"></span></li></template>
"#;

/// Registers `guest-row` and returns the number of instances its create hook has seen.
fn register_rows(key: Option<&str>) -> Rc<Cell<usize>> {
	let created = Rc::new(Cell::new(0));
	let mut recipe = Recipe::new()
		.create({
			let created = Rc::clone(&created);
			move |_| created.set(created.get() + 1)
		})
		.field("name", |row, name| {
			row.part("name").set_text(&text_of(name));
		})
		.field("time", |row, time| {
			row.part("time").set_text(&text_of(time));
		});
	if let Some(key) = key {
		recipe = recipe.key(key);
	}
	register_template("guest-row", recipe);
	created
}

fn mount(fixture: &Fixture) -> (Handle, web_sys::Element) {
	let list = query_in("guest-list", fixture.root()).render().unwrap();
	list.append_to(fixture.root());
	let ul = list.element().unwrap().clone();
	(list, ul)
}

fn counts(created: usize, updated: usize, removed: usize, moved: usize) -> RenderStats {
	RenderStats {
		created,
		updated,
		removed,
		moved,
	}
}

#[wasm_bindgen_test]
fn reservations() {
	let fixture = Fixture::new(MARKUP);
	register_rows(Some("id"));
	let (list, ul) = mount(&fixture);

	let first = list.render_from_template(
		"rows",
		"guest-row",
		&json!([
			{ "id": 1, "name": "John", "time": "18:00" },
			{ "id": 2, "name": "Jane", "time": "19:00" },
		]),
	);
	assert_eq!(first, counts(2, 4, 0, 0));
	assert_eq!(texts(&ul), ["John18:00", "Jane19:00"]);
	let john = children(&ul)[0].clone();

	let second = list.render_from_template(
		"rows",
		"guest-row",
		&json!([
			{ "id": 2, "name": "Jane", "time": "19:00" },
			{ "id": 1, "name": "Johnny", "time": "18:00" },
		]),
	);
	assert_eq!(second, counts(0, 1, 0, 1));
	assert_eq!(texts(&ul), ["Jane19:00", "Johnny18:00"]);
	assert_eq!(children(&ul)[1], john);
}

#[wasm_bindgen_test]
fn changed_time_only() {
	let fixture = Fixture::new(MARKUP);
	let created = register_rows(None);
	let (list, ul) = mount(&fixture);

	let jane = json!({ "id": 2, "name": "Jane", "time": "19:00" });
	list.render_from_template("rows", "guest-row", &json!([{ "id": 1, "name": "John", "time": "18:00" }, jane]));
	let before = children(&ul);

	let stats = list.render_from_template("rows", "guest-row", &json!([{ "id": 1, "name": "John", "time": "18:30" }, jane]));
	assert_eq!(stats, counts(0, 1, 0, 0));
	assert_eq!(created.get(), 2);
	assert_eq!(children(&ul), before);
	assert_eq!(texts(&ul), ["John18:30", "Jane19:00"]);
}

#[wasm_bindgen_test]
fn reapplying_is_a_no_op() {
	let fixture = Fixture::new(MARKUP);
	register_rows(None);
	let (list, ul) = mount(&fixture);

	let data = json!([
		{ "id": "a", "name": "Ana", "time": "12:00" },
		{ "id": "b", "name": "Ben", "time": "12:30" },
		{ "id": "c", "name": "Cem", "time": "13:00" },
	]);
	list.render_from_template("rows", "guest-row", &data);
	let before = children(&ul);

	assert_eq!(list.render_from_template("rows", "guest-row", &data), RenderStats::default());
	assert_eq!(children(&ul), before);
}

#[wasm_bindgen_test]
fn create_hook_runs_once_per_instance() {
	let fixture = Fixture::new(MARKUP);
	let created = register_rows(Some("id"));
	let (list, _ul) = mount(&fixture);

	for name in ["Ana", "Anna", "Ana"] {
		list.render_from_template("rows", "guest-row", &json!([{ "id": 7, "name": name }]));
	}
	assert_eq!(created.get(), 1);

	list.render_from_template("rows", "guest-row", &json!([{ "id": 7 }, { "id": 8 }]));
	assert_eq!(created.get(), 2);
}

#[wasm_bindgen_test]
fn removal_keeps_remaining_nodes() {
	let fixture = Fixture::new(MARKUP);
	register_rows(Some("id"));
	let (list, ul) = mount(&fixture);

	list.render_from_template("rows", "guest-row", &json!([{ "id": 1, "name": "A" }, { "id": 2, "name": "B" }, { "id": 3, "name": "C" }]));
	let before = children(&ul);

	let stats = list.render_from_template("rows", "guest-row", &json!([{ "id": 1, "name": "A" }, { "id": 3, "name": "C" }]));
	assert_eq!(stats.removed, 1);
	assert_eq!(stats.created, 0);
	assert_eq!(stats.moved, 0);
	assert_eq!(children(&ul), [before[0].clone(), before[2].clone()]);
	assert!(!before[1].is_connected());
}

#[wasm_bindgen_test]
fn reversal_moves_fewer_than_all() {
	let fixture = Fixture::new(MARKUP);
	register_rows(Some("id"));
	let (list, ul) = mount(&fixture);

	let forward: Vec<_> = (0..100).map(|i| json!({ "id": i, "name": i.to_string() })).collect();
	assert_eq!(list.render_from_template("rows", "guest-row", &json!(forward)).created, 100);

	let reversed: Vec<_> = forward.iter().rev().cloned().collect();
	let stats = list.render_from_template("rows", "guest-row", &json!(reversed));
	assert_eq!(stats.created, 0);
	assert_eq!(stats.updated, 0);
	assert_eq!(stats.moved, 99);
	assert_eq!(texts(&ul).first().map(String::as_str), Some("99"));
	assert_eq!(texts(&ul).last().map(String::as_str), Some("0"));
}

#[wasm_bindgen_test]
fn empty_list_and_back() {
	let fixture = Fixture::new(MARKUP);
	register_rows(Some("id"));
	let (list, ul) = mount(&fixture);

	list.render_from_template("rows", "guest-row", &json!([{ "id": 1, "name": "A" }, { "id": 2, "name": "B" }]));
	assert_eq!(list.render_from_template("rows", "guest-row", &json!([])), counts(0, 0, 2, 0));
	assert!(children(&ul).is_empty());
	// Only the slot markers are left.
	assert_eq!(ul.child_nodes().length(), 2);

	let again = list.render_from_template("rows", "guest-row", &json!([{ "id": 1, "name": "A" }]));
	assert_eq!(again.created, 1);
	assert_eq!(texts(&ul), ["A"]);
}

#[wasm_bindgen_test]
fn duplicate_keys_are_matched_in_order() {
	let fixture = Fixture::new(MARKUP);
	register_rows(Some("id"));
	let (list, ul) = mount(&fixture);

	let first = list.render_from_template("rows", "guest-row", &json!([{ "id": 1, "name": "A" }, { "id": 1, "name": "B" }]));
	assert_eq!(first.created, 2);
	assert_eq!(texts(&ul), ["A", "B"]);
	let before = children(&ul);

	let second = list.render_from_template("rows", "guest-row", &json!([{ "id": 1, "name": "A" }]));
	assert_eq!(second, counts(0, 0, 1, 0));
	assert_eq!(children(&ul), [before[0].clone()]);
}

#[wasm_bindgen_test]
fn keys_compare_by_type() {
	let fixture = Fixture::new(MARKUP);
	register_rows(None);
	let (list, _ul) = mount(&fixture);

	list.render_from_template("rows", "guest-row", &json!([{ "_id": 1, "name": "A" }]));
	let stats = list.render_from_template("rows", "guest-row", &json!([{ "_id": "1", "name": "A" }]));
	assert_eq!(stats.created, 1);
	assert_eq!(stats.removed, 1);
}

#[wasm_bindgen_test]
fn keyless_items_are_reused_by_position() {
	let fixture = Fixture::new(MARKUP);
	register_rows(None);
	let (list, ul) = mount(&fixture);

	list.render_from_template("rows", "guest-row", &json!([{ "name": "A" }, { "name": "B" }]));
	let before = children(&ul);

	let stats = list.render_from_template("rows", "guest-row", &json!([{ "name": "B" }]));
	assert_eq!(stats, counts(0, 1, 1, 0));
	assert_eq!(children(&ul), [before[0].clone()]);
	assert_eq!(texts(&ul), ["B"]);
}

#[wasm_bindgen_test]
fn unknown_targets_are_ignored() {
	let fixture = Fixture::new(MARKUP);
	register_rows(Some("id"));
	let (list, ul) = mount(&fixture);

	assert_eq!(list.render_from_template("no-such-slot", "guest-row", &json!([{ "id": 1 }])), RenderStats::default());
	assert_eq!(Handle::empty().render_from_template("rows", "guest-row", &json!([{ "id": 1 }])), RenderStats::default());
	assert!(children(&ul).is_empty());

	list.render_from_template("rows", "guest-row", &json!([{ "id": 1, "name": "A" }, { "id": 2, "name": "B" }]));
	let before = children(&ul);
	let nodes = ul.child_nodes().length();

	assert_eq!(list.render_from_template("rows", "unregistered", &json!([{ "id": 3, "name": "C" }])), RenderStats::default());
	assert_eq!(list.render_from_template("rows", "unregistered", &json!({ "name": "C" })), RenderStats::default());
	assert_eq!(list.render_variant("rows", "unregistered", Some("one"), &json!({ "name": "C" })), RenderStats::default());
	assert_eq!(list.render_pluralized("rows", "unregistered", 1.0, &json!({ "name": "C" })), RenderStats::default());

	assert_eq!(children(&ul), before);
	assert_eq!(ul.child_nodes().length(), nodes);
	assert_eq!(texts(&ul), ["A", "B"]);

	// The list is still tracked, so the next render only applies the change.
	let stats = list.render_from_template("rows", "guest-row", &json!([{ "id": 1, "name": "A" }, { "id": 2, "name": "Bea" }]));
	assert_eq!(stats, counts(0, 1, 0, 0));
	assert_eq!(children(&ul), before);
}

#[wasm_bindgen_test]
fn existing_items_update_without_markup() {
	let fixture = Fixture::new(MARKUP);
	register_rows(Some("id"));
	let (list, ul) = mount(&fixture);

	list.render_from_template("rows", "guest-row", &json!([{ "id": 1, "name": "A" }]));
	let before = children(&ul);
	fixture.root().query_selector("template[data-name=guest-row]").unwrap().unwrap().remove();

	let stats = list.render_from_template("rows", "guest-row", &json!([{ "id": 1, "name": "Ann" }, { "id": 2, "name": "B" }]));
	assert_eq!(stats, counts(0, 1, 0, 0));
	assert_eq!(children(&ul), before);
	assert_eq!(texts(&ul), ["Ann"]);
}

#[wasm_bindgen_test]
fn removing_the_instance_tears_down_the_list() {
	let fixture = Fixture::new(MARKUP);
	register_rows(Some("id"));
	let (list, ul) = mount(&fixture);

	list.render_from_template("rows", "guest-row", &json!([{ "id": 1, "name": "A" }]));
	let row = children(&ul)[0].clone();
	list.remove();
	assert!(!ul.is_connected());
	assert!(!row.is_connected());
	assert!(row.parent_node().is_none());
}
