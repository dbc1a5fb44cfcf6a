//! A month-view date picker built from page templates.
//!
//! The page provides the widget and day markup:
//!
//! ```html
//! <template data-part="calendar-widget">
//! 	<div class="calendar">
//! 		<header>
//! 			<button type="button" data-part="prev">‹</button>
//! 			<span data-part="month-year"></span>
//! 			<button type="button" data-part="next">›</button>
//! 			<button type="button" data-part="today">Today</button>
//! 		</header>
//! 		<div data-part="weekdays"></div>
//! 		<div data-part="days"><slot name="days"></slot></div>
//! 	</div>
//! </template>
//!
//! <template data-name="calendar-day"><button type="button"></button></template>
//! ```
//!
//! Day buttons carry `data-day` (the ISO date) and the flags `data-other`, `data-today`,
//! `data-selected` and `data-pending` for styling.

use crate::{query, text_of, Handle, Listener, Recipe, Registry, RenderStats};
use chrono::{Datelike, Days, Months};
use core::{cell::RefCell, fmt, ops::Deref};
use hashbrown::HashSet;
use serde_json::{json, Value};
use std::rc::{Rc, Weak};
use tracing::{debug, error, instrument, trace, warn};
use wasm_bindgen::JsValue;

pub use chrono::NaiveDate;

/// The part holding the widget `<template>`.
pub const WIDGET_TEMPLATE: &str = "calendar-widget";

/// The registered template each day cell is rendered through.
pub const DAY_TEMPLATE: &str = "calendar-day";

const DAYS_SLOT: &str = "days";
const GRID_CELLS: usize = 42;

/// Parses the `YYYY-MM-DD` date at the start of `text`, ignoring anything after it (such as a time).
pub fn parse_day(text: &str) -> Option<NaiveDate> {
	NaiveDate::parse_from_str(text.get(..10)?, "%Y-%m-%d").ok()
}

/// The current local date.
#[allow(clippy::cast_possible_wrap)]
pub fn today() -> NaiveDate {
	let now = js_sys::Date::new_0();
	NaiveDate::from_ymd_opt(now.get_full_year() as i32, now.get_month() + 1, now.get_date()).unwrap_or_default()
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn to_js(day: NaiveDate) -> js_sys::Date {
	js_sys::Date::new_with_year_month_day(day.year() as u32, day.month0() as i32, day.day() as i32)
}

/// The first of the month `day` falls in.
fn first_of_month(day: NaiveDate) -> NaiveDate {
	day.with_day(1).unwrap_or(day)
}

/// The first of the month `delta` months after (or before, if negative) the one starting at `first`.
fn add_months(first: NaiveDate, delta: i32) -> Option<NaiveDate> {
	let months = Months::new(delta.unsigned_abs());
	if delta < 0 {
		first.checked_sub_months(months)
	} else {
		first.checked_add_months(months)
	}
}

/// The 42 days shown for the month starting at `first`, beginning with the Monday on or before it.
fn month_grid(first: NaiveDate) -> Vec<NaiveDate> {
	match first.checked_sub_days(Days::new(u64::from(first.weekday().num_days_from_monday()))) {
		Some(start) => start.iter_days().take(GRID_CELLS).collect(),
		None => Vec::new(),
	}
}

struct State {
	selected: NaiveDate,
	/// First of the shown month.
	view: NaiveDate,
	pending: HashSet<NaiveDate>,
	widget: Option<Handle>,
}

/// A [`Handle`] decorated with a date picker rendered into its first element.
///
/// Dereferences to the host handle. Selecting a day (by click or [`Calendar::select`]) dispatches a
/// `change` `CustomEvent` on the host whose `detail` is the ISO date string.
///
/// The widget's controls only act while a clone of the [`Calendar`] is alive.
#[derive(Clone)]
pub struct Calendar {
	host: Handle,
	state: Rc<RefCell<State>>,
}

impl Deref for Calendar {
	type Target = Handle;

	fn deref(&self) -> &Handle {
		&self.host
	}
}

impl fmt::Debug for Calendar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("Calendar")
			.field("host", &self.host)
			.field("selected", &state.selected)
			.field("view", &state.view)
			.field("pending", &state.pending.len())
			.finish()
	}
}

impl Calendar {
	/// Mounts the widget into `host`, showing (and selecting) today.
	///
	/// Without the widget markup in the document, the calendar still tracks its value but shows nothing.
	#[instrument]
	pub fn new(host: Handle) -> Self {
		if Registry::with(|registry| registry.lookup(DAY_TEMPLATE)).is_none() {
			Registry::with(|registry| registry.register(DAY_TEMPLATE, day_recipe()));
		}

		let today = today();
		let calendar = Self {
			host,
			state: Rc::new(RefCell::new(State {
				selected: today,
				view: first_of_month(today),
				pending: HashSet::new(),
				widget: None,
			})),
		};
		let widget = calendar.mount();
		calendar.state.borrow_mut().widget = widget;
		calendar.render();
		calendar
	}

	fn mount(&self) -> Option<Handle> {
		let host = match self.host.element() {
			Some(host) => host,
			None => {
				debug!("Calendar host is empty; not mounting.");
				return None;
			}
		};
		let widget = query(WIDGET_TEMPLATE).render()?;
		fill_weekdays(&widget.part("weekdays"));

		let weak = Rc::downgrade(&self.state);
		let host_handle = self.host.clone();
		let with_calendar = move |f: fn(&Calendar)| {
			let (state, host) = (weak.clone(), host_handle.clone());
			Listener::new(move |_| {
				if let Some(state) = Weak::upgrade(&state) {
					f(&Calendar { host: host.clone(), state });
				}
			})
		};
		widget.part("prev").on("click", &with_calendar(|calendar| {
			calendar.navigate(-1);
		}));
		widget.part("next").on("click", &with_calendar(|calendar| {
			calendar.navigate(1);
		}));
		widget.part("today").on("click", &with_calendar(Calendar::go_today));

		let weak = Rc::downgrade(&self.state);
		let host_handle = self.host.clone();
		widget.part("days").delegate("click", "button[data-day]", move |button, _| {
			let state = match Weak::upgrade(&weak) {
				Some(state) => state,
				None => return,
			};
			match button.data_get("day").as_deref().and_then(parse_day) {
				Some(day) => Calendar { host: host_handle.clone(), state }.select(day),
				None => error!("Day button without a valid `data-day`."),
			}
		});

		widget.append_to(host);
		Some(widget)
	}

	/// Selects `value` and shows its month.
	pub fn calendar(&self, value: NaiveDate) -> RenderStats {
		{
			let mut state = self.state.borrow_mut();
			state.selected = value;
			state.view = first_of_month(value);
		}
		self.render()
	}

	/// The selected date.
	pub fn value(&self) -> NaiveDate {
		self.state.borrow().selected
	}

	/// Marks exactly `dates` as having pending bookings.
	pub fn calendar_pending(&self, dates: impl IntoIterator<Item = NaiveDate>) -> RenderStats {
		self.state.borrow_mut().pending = dates.into_iter().collect();
		self.render()
	}

	/// Shows the month `delta` months away from the current one.
	///
	/// Steps past the supported date range are ignored.
	pub fn navigate(&self, delta: i32) -> RenderStats {
		{
			let mut state = self.state.borrow_mut();
			match add_months(state.view, delta) {
				Some(view) => state.view = view,
				None => {
					warn!("Can't move {} months from {}.", delta, state.view);
					return RenderStats::default();
				}
			}
		}
		self.render()
	}

	/// Shows the current month and selects today.
	pub fn go_today(&self) {
		let today = today();
		self.state.borrow_mut().view = first_of_month(today);
		self.select(today);
	}

	/// Selects `day` without changing the shown month, then announces it with a `change` event.
	#[instrument]
	pub fn select(&self, day: NaiveDate) {
		self.state.borrow_mut().selected = day;
		self.render();

		let host = match self.host.element() {
			Some(host) => host,
			None => return,
		};
		let init = web_sys::CustomEventInit::new();
		init.set_detail(&JsValue::from_str(&day.to_string()));
		match web_sys::CustomEvent::new_with_event_init_dict("change", &init) {
			Ok(event) => {
				if let Err(error) = host.dispatch_event(&event) {
					error!("Failed to dispatch calendar change: {:?}", error);
				}
			}
			Err(error) => error!("Failed to create calendar change event: {:?}", error),
		}
	}

	fn render(&self) -> RenderStats {
		let (widget, days, view) = {
			let state = self.state.borrow();
			let widget = match &state.widget {
				Some(widget) => widget.clone(),
				None => return RenderStats::default(),
			};
			let today = today();
			let view = state.view;
			let days: Vec<Value> = month_grid(view)
				.into_iter()
				.map(|day| {
					json!({
						"dateStr": day.to_string(),
						"day": day.day(),
						"other": day.month() != view.month(),
						"today": day == today,
						"selected": day == state.selected,
						"pending": state.pending.contains(&day),
					})
				})
				.collect();
			(widget, days, view)
		};

		widget.part("month-year").set_text(&month_label(view));
		let stats = widget.render_from_template(DAYS_SLOT, DAY_TEMPLATE, &Value::Array(days));
		trace!(?stats, "Rendered calendar month {}.", view.format("%Y-%m"));
		stats
	}
}

fn day_recipe() -> Recipe {
	Recipe::new()
		.key("dateStr")
		.field("day", |cell, day| {
			cell.set_text(&text_of(day));
		})
		.field("dateStr", |cell, date| {
			cell.set_data("day", date.clone());
		})
		.field("other", |cell, other| {
			cell.set_data("other", other.clone());
		})
		.field("today", |cell, today| {
			cell.set_data("today", today.clone());
		})
		.field("selected", |cell, selected| {
			cell.set_data("selected", selected.clone());
		})
		.field("pending", |cell, pending| {
			cell.set_data("pending", pending.clone());
		})
}

fn date_format(options: &[(&str, &str)]) -> js_sys::Intl::DateTimeFormat {
	let object = js_sys::Object::new();
	for (key, value) in options {
		if let Err(error) = js_sys::Reflect::set(&object, &JsValue::from_str(key), &JsValue::from_str(value)) {
			error!("Failed to set date format option {:?}: {:?}", key, error);
		}
	}
	js_sys::Intl::DateTimeFormat::new(&Registry::with(Registry::locales), &object)
}

fn format_date(format: &js_sys::Intl::DateTimeFormat, day: NaiveDate) -> String {
	match format.format().call1(&JsValue::UNDEFINED, &to_js(day)) {
		Ok(text) => text.as_string().unwrap_or_default(),
		Err(error) => {
			error!("Failed to format {}: {:?}", day, error);
			day.to_string()
		}
	}
}

fn month_label(first: NaiveDate) -> String {
	format_date(&date_format(&[("month", "long"), ("year", "numeric")]), first)
}

fn fill_weekdays(weekdays: &Handle) {
	let (container, document) = match (weekdays.element(), query::document()) {
		(Some(container), Some(document)) => (container, document),
		_ => return debug!("No weekday row to fill."),
	};
	container.set_text_content(None);

	let format = date_format(&[("weekday", "short")]);
	// 2024-01-01 was a Monday.
	let week = NaiveDate::from_ymd_opt(2024, 1, 1).into_iter().flat_map(|monday| monday.iter_days().take(7));
	for day in week {
		let label = match document.create_element("span") {
			Ok(label) => label,
			Err(error) => return error!("Failed to create weekday label: {:?}", error),
		};
		label.set_text_content(Some(&format_date(&format, day)));
		if let Err(error) = container.append_child(&label) {
			error!("Failed to append weekday label: {:?}", error);
		}
	}
}
