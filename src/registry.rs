use crate::{markup, query, Handle};
use core::fmt;
use hashbrown::HashMap;
use serde_json::Value;
use std::{cell::RefCell, rc::Rc};
use tracing::{debug, instrument, trace, warn};

pub(crate) type FieldUpdate = Rc<dyn Fn(&Handle, &Value)>;
type CreateHook = Rc<dyn Fn(&Handle)>;

/// Key fields tried, in order, when a [`Recipe`] doesn't name one.
pub const AUTO_KEYS: [&str; 4] = ["id", "_id", "key", "_key"];

/// How record fields are written into an instance of a template.
///
/// ```
/// use parts_dom::{text_of, Recipe};
///
/// let recipe = Recipe::new()
/// 	.key("id")
/// 	.field("name", |item, name| {
/// 		item.part("name").set_text(&text_of(name));
/// 	})
/// 	.field("urgent", |item, urgent| {
/// 		item.set_data("urgent", urgent.clone());
/// 	});
/// assert_eq!(recipe.key_field(), Some("id"));
/// ```
#[derive(Clone, Default)]
pub struct Recipe {
	fields: Vec<(String, FieldUpdate)>,
	create: Option<CreateHook>,
	key: Option<String>,
}
impl fmt::Debug for Recipe {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Recipe")
			.field("fields", &self.fields.iter().map(|(name, _)| name).collect::<Vec<_>>())
			.field("create", &self.create.is_some())
			.field("key", &self.key)
			.finish()
	}
}
impl Recipe {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds (or replaces) the update for `name`, called with the instance root whenever the field's value changes.
	#[must_use]
	pub fn field(mut self, name: &str, update: impl 'static + Fn(&Handle, &Value)) -> Self {
		let update: FieldUpdate = Rc::new(update);
		match self.fields.iter_mut().find(|(field, _)| field == name) {
			Some((_, existing)) => *existing = update,
			None => self.fields.push((name.to_owned(), update)),
		}
		self
	}

	/// Sets the hook run exactly once per newly cloned instance, before any field is written.
	#[must_use]
	pub fn create(mut self, hook: impl 'static + Fn(&Handle)) -> Self {
		self.create = Some(Rc::new(hook));
		self
	}

	/// Names the field identifying list items across renders.
	#[must_use]
	pub fn key(mut self, field: &str) -> Self {
		self.key = Some(field.to_owned());
		self
	}

	pub fn key_field(&self) -> Option<&str> {
		self.key.as_deref()
	}

	/// The field updates, in the order they were added.
	pub(crate) fn fields(&self) -> impl Iterator<Item = (&str, &FieldUpdate)> {
		self.fields.iter().map(|(name, update)| (name.as_str(), update))
	}

	/// Clones the template behind `markup` and runs the create hook on the new instance.
	pub(crate) fn instantiate(&self, markup: &Markup<'_>) -> Option<Handle> {
		let instance = markup.get()?.render()?;
		if let Some(create) = &self.create {
			trace!("Running create hook.");
			create(&instance);
		}
		Some(instance)
	}
}

/// Process-wide template recipes and pluralization settings.
///
/// Template sets are fixed per page, so recipes are never unregistered.
/// Use [`Registry::with`] to reach the instance.
#[derive(Default)]
pub struct Registry {
	recipes: RefCell<HashMap<String, Rc<Recipe>>>,
	locale: RefCell<Option<String>>,
	plural_rules: RefCell<Option<js_sys::Intl::PluralRules>>,
}

thread_local! {
	static REGISTRY: Registry = Registry::default();
}

impl Registry {
	pub fn with<R>(f: impl FnOnce(&Registry) -> R) -> R {
		REGISTRY.with(f)
	}

	/// Stores `recipe` under `name`, replacing any earlier registration.
	#[instrument(skip(self))]
	pub fn register(&self, name: &str, recipe: Recipe) {
		if self.recipes.borrow_mut().insert(name.to_owned(), Rc::new(recipe)).is_some() {
			debug!("Replaced recipe {:?}.", name);
		}
	}

	pub fn lookup(&self, name: &str) -> Option<Rc<Recipe>> {
		self.recipes.borrow().get(name).cloned()
	}

	/// Sets the locale for plural categories, [`None`] meaning the host's default.
	pub fn set_locale(&self, locale: Option<&str>) {
		*self.locale.borrow_mut() = locale.map(str::to_owned);
		*self.plural_rules.borrow_mut() = None;
	}

	/// The plural category (`"zero"`, `"one"`, `"two"`, `"few"`, `"many"` or `"other"`) of `count`.
	pub fn plural_category(&self, count: f64) -> String {
		let mut plural_rules = self.plural_rules.borrow_mut();
		let plural_rules = plural_rules.get_or_insert_with(|| js_sys::Intl::PluralRules::new(&self.locales(), &js_sys::Object::new()));
		plural_rules.select(count).into()
	}

	/// The `locales` argument for `Intl` constructors: empty for the host's default.
	pub(crate) fn locales(&self) -> js_sys::Array {
		let locales = js_sys::Array::new();
		if let Some(locale) = &*self.locale.borrow() {
			locales.push(&locale.into());
		}
		locales
	}

	/// The `<template>` defining `name` (and `variant`) in the current document.
	pub(crate) fn markup(name: &str, variant: Option<&str>) -> Option<Handle> {
		let template = query::select(&markup::template_selector(name, variant), None);
		if template.is_empty() {
			warn!("No markup for template {:?} (variant {:?}); can't create instances.", name, variant);
			None
		} else {
			Some(template)
		}
	}
}

/// The markup of one template variant, looked up in the document on first use.
///
/// Renders that only update existing instances never query for it.
pub(crate) struct Markup<'a> {
	name: &'a str,
	variant: Option<&'a str>,
	found: RefCell<Option<Option<Handle>>>,
}
impl<'a> Markup<'a> {
	pub(crate) fn new(name: &'a str, variant: Option<&'a str>) -> Self {
		Self {
			name,
			variant,
			found: RefCell::new(None),
		}
	}

	pub(crate) fn get(&self) -> Option<Handle> {
		self.found
			.borrow_mut()
			.get_or_insert_with(|| Registry::markup(self.name, self.variant))
			.clone()
	}
}

/// Registers `recipe` for the template `name` in the process-wide [`Registry`].
pub fn register_template(name: &str, recipe: Recipe) {
	Registry::with(|registry| registry.register(name, recipe));
}

/// Display text of a field value: strings verbatim, `null` as nothing, everything else as JSON.
pub fn text_of(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		Value::Null => String::new(),
		value => value.to_string(),
	}
}
