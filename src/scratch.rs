use hashbrown::HashMap;
use std::collections::VecDeque;

/// A lookup table whose allocation survives between renders.
///
/// The table is cleared before each borrow rather than after, so nothing left behind by an
/// aborted render (a panicking recipe, say) can leak into the next one.
pub(crate) struct ScratchTable<K, V>(HashMap<K, VecDeque<V>>);
impl<K: Eq + core::hash::Hash, V> ScratchTable<K, V> {
	pub(crate) fn new() -> Self {
		Self(HashMap::new())
	}

	pub(crate) fn temp(&mut self) -> &mut HashMap<K, VecDeque<V>> {
		self.0.clear();
		&mut self.0
	}

	/// Retrieves the table's capacity without clearing it first.
	pub(crate) fn capacity(&self) -> usize {
		self.0.capacity()
	}
}
