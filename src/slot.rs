use crate::{
	reconcile::{self, Entry, Key, RenderStats},
	recoverable_contract_violation,
	registry::Markup,
	scratch::ScratchTable,
	Handle, Recipe, Record, Registry,
};
use core::cell::{Cell, RefCell};
use serde_json::Value;
use std::rc::Rc;
use tracing::{debug, error, instrument, trace, warn};

/// A region of a rendered instance between two comment markers that stay put for the instance's lifetime.
pub(crate) struct Slot {
	name: String,
	start: web_sys::Comment,
	end: web_sys::Comment,
	state: RefCell<SlotState>,
	rendering: Cell<bool>,
	table: RefCell<ScratchTable<Key, Entry>>,
}

#[derive(Default)]
enum SlotState {
	#[default]
	Unset,
	Single {
		template: String,
		variant: Option<String>,
		entry: Entry,
	},
	List {
		template: String,
		entries: Vec<Entry>,
	},
}

/// Marks a slot as mid-render until dropped.
struct RenderGuard<'a>(&'a Cell<bool>);
impl Drop for RenderGuard<'_> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

impl Slot {
	pub(crate) fn new(name: String, start: web_sys::Comment, end: web_sys::Comment) -> Self {
		Self {
			name,
			start,
			end,
			state: RefCell::default(),
			rendering: Cell::new(false),
			table: RefCell::new(ScratchTable::new()),
		}
	}

	/// Rendering into a slot from within its own render (a create hook or field update) is a bug.
	/// Debug builds panic. Release builds refuse the nested call and let the outer render finish,
	/// since throwing would leave the outer render's guard and borrows behind.
	fn enter(&self) -> Option<RenderGuard<'_>> {
		if self.rendering.replace(true) {
			recoverable_contract_violation(&format!(
				"Reentrant render of slot {:?} from within its own render; ignoring the nested call.",
				self.name
			));
			return None;
		}
		Some(RenderGuard(&self.rendering))
	}

	pub(crate) fn render_list(&self, name: &str, recipe: &Recipe, markup: &Markup<'_>, items: &[Value]) -> RenderStats {
		let _guard = match self.enter() {
			Some(guard) => guard,
			None => return RenderStats::default(),
		};

		let mut stats = RenderStats::default();
		let previous = match self.state.take() {
			SlotState::List { template: previous, entries } if previous == name => entries,
			other => {
				stats.removed += tear_down(other);
				Vec::new()
			}
		};

		let (entries, reconciled) = reconcile::reconcile(&mut self.table.borrow_mut(), previous, recipe, markup, items, &self.start);
		stats += reconciled;
		*self.state.borrow_mut() = SlotState::List {
			template: name.to_owned(),
			entries,
		};
		stats
	}

	pub(crate) fn render_single(&self, name: &str, variant: Option<&str>, recipe: &Recipe, markup: &Markup<'_>, record: &Record) -> RenderStats {
		let _guard = match self.enter() {
			Some(guard) => guard,
			None => return RenderStats::default(),
		};

		let mut stats = RenderStats::default();
		let entry = match self.state.take() {
			SlotState::Single {
				template: previous,
				variant: previous_variant,
				mut entry,
			} if previous == name && previous_variant.as_deref() == variant => {
				stats.updated += entry.apply(recipe, record);
				entry
			}
			other => {
				stats.removed += tear_down(other);
				let mut entry = match self.insert_new(recipe, markup) {
					Some(entry) => entry,
					None => return stats,
				};
				stats.created += 1;
				stats.updated += entry.apply(recipe, record);
				entry
			}
		};

		*self.state.borrow_mut() = SlotState::Single {
			template: name.to_owned(),
			variant: variant.map(str::to_owned),
			entry,
		};
		stats
	}

	/// Clones a fresh instance and puts it directly before the end marker.
	fn insert_new(&self, recipe: &Recipe, markup: &Markup<'_>) -> Option<Entry> {
		let instance = recipe.instantiate(markup)?;
		let parent = match self.end.parent_node() {
			Some(parent) => parent,
			None => {
				error!("Slot {:?} end marker is detached.", self.name);
				return None;
			}
		};
		if let Some(root) = instance.element() {
			if let Err(error) = parent.insert_before(root, Some(&**self.end)) {
				error!("Failed to insert into slot {:?}: {:?}", self.name, error);
				return None;
			}
		}
		Some(Entry {
			key: Key::single(),
			instance,
			snapshot: Record::new(),
		})
	}

	/// Destroys all content and returns the slot to its unset state.
	pub(crate) fn clear(&self) -> RenderStats {
		let _guard = match self.enter() {
			Some(guard) => guard,
			None => return RenderStats::default(),
		};
		RenderStats {
			removed: tear_down(self.state.take()),
			..RenderStats::default()
		}
	}
}

fn tear_down(state: SlotState) -> usize {
	match state {
		SlotState::Unset => 0,
		SlotState::Single { entry, .. } => {
			entry.destroy();
			1
		}
		SlotState::List { entries, .. } => {
			let count = entries.len();
			for entry in entries {
				entry.destroy();
			}
			count
		}
	}
}

impl Handle {
	fn resolve_slot(&self, slot: &str, template: &str) -> Option<(Rc<Slot>, Rc<Recipe>)> {
		let found = match self.instance().and_then(|instance| instance.slots.get(slot)) {
			Some(found) => Rc::clone(found),
			None => {
				debug!("No slot {:?} here; ignoring render.", slot);
				return None;
			}
		};
		let recipe = match Registry::with(|registry| registry.lookup(template)) {
			Some(recipe) => recipe,
			None => {
				debug!("Template {:?} is not registered; ignoring render.", template);
				return None;
			}
		};
		Some((found, recipe))
	}

	/// Renders `data` into the slot `slot` of this instance using the template `template`.
	///
	/// An array of records is reconciled as a keyed list, a single record is shown through the
	/// template's default variant. Unknown slots and unregistered templates make this a no-op.
	#[instrument(skip(data))]
	pub fn render_from_template(&self, slot: &str, template: &str, data: &Value) -> RenderStats {
		match data {
			Value::Array(items) => match self.resolve_slot(slot, template) {
				Some((found, recipe)) => found.render_list(template, &recipe, &Markup::new(template, None), items),
				None => RenderStats::default(),
			},
			Value::Object(_) => self.render_variant(slot, template, None, data),
			_ => {
				warn!("Render data must be a record or an array of records.");
				RenderStats::default()
			}
		}
	}

	/// Renders the record `data` into `slot` through the given `variant` of `template`.
	///
	/// Switching templates or variants replaces the slot's content with a fresh instance.
	/// Otherwise, only changed fields are written into the existing one.
	#[instrument(skip(data))]
	pub fn render_variant(&self, slot: &str, template: &str, variant: Option<&str>, data: &Value) -> RenderStats {
		let record = match data.as_object() {
			Some(record) => record,
			None => {
				warn!("Variant render data must be a record.");
				return RenderStats::default();
			}
		};
		match self.resolve_slot(slot, template) {
			Some((found, recipe)) => found.render_single(template, variant, &recipe, &Markup::new(template, variant), record),
			None => RenderStats::default(),
		}
	}

	/// Renders `data` through the variant of `template` named by the plural category of `count`.
	#[instrument(skip(data))]
	pub fn render_pluralized(&self, slot: &str, template: &str, count: f64, data: &Value) -> RenderStats {
		let category = Registry::with(|registry| registry.plural_category(count));
		trace!("Plural category of {} is {:?}.", count, category);
		self.render_variant(slot, template, Some(&category), data)
	}

	/// Destroys the content of `slot`, leaving it unset.
	#[instrument]
	pub fn clear_slot(&self, slot: &str) -> RenderStats {
		match self.instance().and_then(|instance| instance.slots.get(slot)) {
			Some(found) => found.clear(),
			None => RenderStats::default(),
		}
	}
}
