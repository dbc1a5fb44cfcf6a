use crate::{
	registry::{Markup, AUTO_KEYS},
	scratch::ScratchTable,
	Handle, Recipe, Record,
};
use core::ops::AddAssign;
use hashbrown::HashSet;
use serde_json::Value;
use tracing::{error, trace, trace_span, warn};

/// What a render call did to the DOM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
	/// Instances cloned from a template (each ran the create hook once).
	pub created: usize,
	/// Field update functions called.
	pub updated: usize,
	/// Instances removed from the document.
	pub removed: usize,
	/// Insertions of nodes that were already in the slot, i.e. reorders.
	pub moved: usize,
}
impl AddAssign for RenderStats {
	fn add_assign(&mut self, other: Self) {
		self.created += other.created;
		self.updated += other.updated;
		self.removed += other.removed;
		self.moved += other.moved;
	}
}

/// A list key, compared by the canonical JSON text of the key field's value (so `1` and `"1"` differ).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Key(String);
impl Key {
	/// The key of the one entry a slot holds in single mode.
	pub(crate) fn single() -> Self {
		Self(String::new())
	}

	fn of(value: Option<&Value>) -> Self {
		Self(value.map_or_else(|| Value::Null.to_string(), Value::to_string))
	}
}

/// A live instance owned by a slot, with the field values last written into it.
pub(crate) struct Entry {
	pub(crate) key: Key,
	pub(crate) instance: Handle,
	pub(crate) snapshot: Record,
}
impl Entry {
	/// Clones a new instance and writes every field of `record` into it.
	pub(crate) fn create(recipe: &Recipe, markup: &Markup<'_>, key: Key, record: &Record, stats: &mut RenderStats) -> Option<Self> {
		let instance = recipe.instantiate(markup)?;
		stats.created += 1;
		let mut entry = Self {
			key,
			instance,
			snapshot: Record::new(),
		};
		stats.updated += entry.apply(recipe, record);
		Some(entry)
	}

	/// Calls the update of each recipe field that is present in `record` and differs from the snapshot.
	/// Absent fields are left alone, in the DOM and in the snapshot.
	pub(crate) fn apply(&mut self, recipe: &Recipe, record: &Record) -> usize {
		let mut updated = 0;
		for (field, update) in recipe.fields() {
			let value = match record.get(field) {
				Some(value) => value,
				None => continue,
			};
			if self.snapshot.get(field) == Some(value) {
				continue;
			}
			if cfg!(feature = "dangerous-logging") {
				trace!(field, %value, "Updating field.");
			} else {
				trace!(field, "Updating field.");
			}
			update(&self.instance, value);
			updated += 1;
		}
		for (field, value) in record {
			self.snapshot.insert(field.clone(), value.clone());
		}
		updated
	}

	pub(crate) fn destroy(self) {
		self.instance.remove();
	}
}

/// Brings the region after `start` in line with `items`, reusing previous entries by key.
///
/// Previous entries are matched in order, so for repeated keys the first occurrence in `items` takes
/// over the first previous entry with that key, the next occurrence the next one, and so on. Items
/// without a match get fresh instances. Nothing is left behind untracked.
pub(crate) fn reconcile(
	table: &mut ScratchTable<Key, Entry>,
	previous: Vec<Entry>,
	recipe: &Recipe,
	markup: &Markup<'_>,
	items: &[Value],
	start: &web_sys::Comment,
) -> (Vec<Entry>, RenderStats) {
	let span = trace_span!("Reconciling", items = items.len(), previous = previous.len());
	let _enter = span.enter();
	let mut stats = RenderStats::default();

	let key_field = recipe.key_field().or_else(|| {
		let first = items.iter().find_map(Value::as_object)?;
		AUTO_KEYS.iter().copied().find(|key| first.contains_key(*key))
	});
	if key_field.is_none() && !items.is_empty() {
		warn!("No key field for list items; previous instances are reused by position.");
	}

	let lookup = table.temp();
	for entry in previous {
		lookup.entry(entry.key.clone()).or_default().push_back(entry);
	}

	let mut next = Vec::with_capacity(items.len());
	let mut seen = HashSet::with_capacity(items.len());
	for item in items {
		let record = match item.as_object() {
			Some(record) => record,
			None => {
				warn!("Skipping list item that isn't a record.");
				continue;
			}
		};
		let key = Key::of(key_field.and_then(|key_field| record.get(key_field)));
		if key_field.is_some() && !seen.insert(key.clone()) {
			warn!(key = %key.0, "Duplicate key in list data.");
		}

		let span = trace_span!("Item", key = %key.0);
		let _enter = span.enter();
		match lookup.get_mut(&key).and_then(|entries| entries.pop_front()) {
			Some(mut entry) => {
				stats.updated += entry.apply(recipe, record);
				next.push(entry);
			}
			None => match Entry::create(recipe, markup, key, record, &mut stats) {
				Some(entry) => next.push(entry),
				None => error!("Failed to instantiate list item."),
			},
		}
	}

	for (_, unclaimed) in lookup.drain() {
		for entry in unclaimed {
			trace!(key = %entry.key.0, "Removing item.");
			entry.destroy();
			stats.removed += 1;
		}
	}

	stats.moved = place_after(start, &next);
	trace!("Key table capacity: {}", table.capacity());
	(next, stats)
}

/// Makes each entry's node directly follow the previous entry's (or `start`), inserting only where
/// the current next sibling isn't already the expected node. Returns how many already placed nodes moved.
fn place_after(start: &web_sys::Comment, entries: &[Entry]) -> usize {
	let parent = match start.parent_node() {
		Some(parent) => parent,
		None => {
			error!("Slot start marker is detached; not placing {} item(s).", entries.len());
			return 0;
		}
	};

	let mut moved = 0;
	let mut previous: web_sys::Node = start.clone().into();
	for entry in entries {
		let node = match entry.instance.element() {
			Some(node) => node,
			None => continue,
		};
		let next_sibling = previous.next_sibling();
		if next_sibling.as_ref() != Some(&**node) {
			let placed = node.parent_node().as_ref() == Some(&parent);
			match parent.insert_before(node, next_sibling.as_ref()) {
				Ok(_) if placed => moved += 1,
				Ok(_) => (),
				Err(error) => {
					error!("Failed to place item: {:?}", error);
					continue;
				}
			}
		}
		previous = web_sys::Node::from(node.clone());
	}
	moved
}
