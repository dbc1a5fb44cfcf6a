#![doc(html_root_url = "https://docs.rs/parts-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

//! Template parts over live [`web_sys`] DOM.
//!
//! Named *parts* are found through [`query`], wrapped in a batched [`Handle`], and `<template>`s are
//! rendered into instances whose `<slot>`s can then be filled (and refilled) from plain records via
//! [`Handle::render_from_template`]. Refills are reconciled by key against the slot's live nodes, and
//! only changed fields are written through the [`Recipe`] registered for the template.

pub use serde_json;

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod actions;
pub mod calendar;
mod form;
mod handle;
mod listeners;
pub mod markup;
mod query;
mod reconcile;
mod registry;
mod scratch;
mod slot;
pub mod toast;

pub use handle::Handle;
pub use listeners::Listener;
pub use query::{query, query_in, select};
pub use reconcile::RenderStats;
pub use registry::{register_template, text_of, Recipe, Registry};

/// A plain string-keyed record, as handed to render calls and produced by [`Handle::submit`].
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Fails fast on a broken calling contract.
///
/// Debug builds panic with the full message, release builds throw it into JavaScript.
#[track_caller]
pub(crate) fn contract_violation(message: &str) -> ! {
	if cfg!(debug_assertions) {
		panic!("parts-dom: {}", message)
	} else {
		wasm_bindgen::throw_str(message)
	}
}

/// Like [`contract_violation`] in debug builds. Release builds only log the message, so the caller
/// can refuse the call and keep its own state consistent.
#[track_caller]
pub(crate) fn recoverable_contract_violation(message: &str) {
	if cfg!(debug_assertions) {
		contract_violation(message)
	}
	tracing::error!("{}", message);
}
