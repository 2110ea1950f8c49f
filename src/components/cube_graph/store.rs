//! Single-owner observable state with partial updates, subscriptions and a
//! bounded transition history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use log::error;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// A state that can absorb a partial update, replacing only the fields the
/// patch carries.
pub trait Merge {
	type Patch;

	fn merge(&mut self, patch: Self::Patch);
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transition<S> {
	pub timestamp: DateTime<Utc>,
	pub from: S,
	pub to: S,
}

/// Handle returned by [`ObservableStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping the handle makes the listener impossible to remove"]
pub struct Subscription(u64);

type Listener<S> = Box<dyn FnMut(&S, &S) -> anyhow::Result<()>>;

pub struct ObservableStore<S> {
	state: S,
	listeners: Vec<(Subscription, Listener<S>)>,
	next_subscription: u64,
	history: VecDeque<Transition<S>>,
	capacity: usize,
}

impl<S: Clone + Merge> ObservableStore<S> {
	pub fn new(initial: S) -> Self {
		Self::with_capacity(initial, DEFAULT_HISTORY_CAPACITY)
	}

	pub fn with_capacity(initial: S, capacity: usize) -> Self {
		Self {
			state: initial,
			listeners: Vec::new(),
			next_subscription: 0,
			history: VecDeque::with_capacity(capacity),
			capacity,
		}
	}

	/// A copy of the current state.
	pub fn get_state(&self) -> S {
		self.state.clone()
	}

	pub fn state(&self) -> &S {
		&self.state
	}

	/// Merge `patch`, record the transition, then notify every listener in
	/// registration order with `(new, old)`. A listener returning `Err` is
	/// logged and the rest still run.
	pub fn set_state(&mut self, patch: S::Patch) {
		let old = self.state.clone();
		self.state.merge(patch);

		self.history.push_back(Transition {
			timestamp: Utc::now(),
			from: old.clone(),
			to: self.state.clone(),
		});
		while self.history.len() > self.capacity {
			self.history.pop_front();
		}

		for (subscription, listener) in &mut self.listeners {
			if let Err(err) = listener(&self.state, &old) {
				error!("Store subscriber {} failed: {err:#}", subscription.0);
			}
		}
	}

	pub fn subscribe<F>(&mut self, listener: F) -> Subscription
	where
		F: FnMut(&S, &S) -> anyhow::Result<()> + 'static,
	{
		let subscription = Subscription(self.next_subscription);
		self.next_subscription += 1;
		self.listeners.push((subscription, Box::new(listener)));
		subscription
	}

	/// Remove exactly the listener behind `subscription`. Returns whether it
	/// was still registered.
	pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
		let before = self.listeners.len();
		self.listeners.retain(|(s, _)| *s != subscription);
		self.listeners.len() != before
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}

	/// Recorded transitions, oldest first.
	pub fn history(&self) -> Vec<Transition<S>> {
		self.history.iter().cloned().collect()
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use anyhow::bail;
	use pretty_assertions::assert_eq;
	use proptest::prelude::*;

	use super::*;

	#[derive(Clone, Debug, Default, PartialEq)]
	struct Counter {
		count: i32,
		label: String,
	}

	#[derive(Default)]
	struct CounterPatch {
		count: Option<i32>,
		label: Option<String>,
	}

	impl Merge for Counter {
		type Patch = CounterPatch;

		fn merge(&mut self, patch: CounterPatch) {
			if let Some(count) = patch.count {
				self.count = count;
			}
			if let Some(label) = patch.label {
				self.label = label;
			}
		}
	}

	fn count(n: i32) -> CounterPatch {
		CounterPatch {
			count: Some(n),
			..Default::default()
		}
	}

	#[test]
	fn patch_replaces_only_given_fields() {
		let mut store = ObservableStore::new(Counter {
			count: 1,
			label: "keep".into(),
		});
		store.set_state(count(2));
		assert_eq!(store.get_state(), Counter {
			count: 2,
			label: "keep".into()
		});
	}

	#[test]
	fn listeners_run_in_order_with_new_and_old() {
		let mut store = ObservableStore::new(Counter::default());
		let seen = Rc::new(RefCell::new(Vec::new()));
		for tag in ["a", "b"] {
			let seen = Rc::clone(&seen);
			let _ = store.subscribe(move |new: &Counter, old: &Counter| {
				seen.borrow_mut().push((tag, new.count, old.count));
				Ok(())
			});
		}
		store.set_state(count(7));
		assert_eq!(*seen.borrow(), vec![("a", 7, 0), ("b", 7, 0)]);
	}

	#[test]
	fn failing_listener_is_isolated() {
		let mut store = ObservableStore::new(Counter::default());
		let reached = Rc::new(RefCell::new(0));
		let _ = store.subscribe(|_: &Counter, _: &Counter| bail!("boom"));
		let tail = Rc::clone(&reached);
		let _ = store.subscribe(move |new: &Counter, _: &Counter| {
			*tail.borrow_mut() = new.count;
			Ok(())
		});
		store.set_state(count(3));
		assert_eq!(*reached.borrow(), 3);
		assert_eq!(store.state().count, 3);
	}

	#[test]
	fn unsubscribe_removes_exactly_one_listener() {
		let mut store = ObservableStore::new(Counter::default());
		let calls = Rc::new(RefCell::new(Vec::new()));
		let subs: Vec<_> = (0..3)
			.map(|i| {
				let calls = Rc::clone(&calls);
				store.subscribe(move |_: &Counter, _: &Counter| {
					calls.borrow_mut().push(i);
					Ok(())
				})
			})
			.collect();

		assert!(store.unsubscribe(subs[1]));
		assert!(!store.unsubscribe(subs[1]));
		store.set_state(count(1));
		assert_eq!(*calls.borrow(), vec![0, 2]);
		assert_eq!(store.listener_count(), 2);
	}

	#[test]
	fn history_records_from_and_to() {
		let mut store = ObservableStore::with_capacity(Counter::default(), 2);
		for n in 1..=3 {
			store.set_state(count(n));
		}
		let history: Vec<_> = store
			.history()
			.into_iter()
			.map(|t| (t.from.count, t.to.count))
			.collect();
		assert_eq!(history, vec![(1, 2), (2, 3)]);
		let h = store.history();
		assert!(h[0].timestamp <= h[1].timestamp);
	}

	proptest! {
		#[test]
		fn history_never_exceeds_capacity(
			capacity in 0usize..8,
			updates in prop::collection::vec(any::<i32>(), 0..40)
		) {
			let mut store = ObservableStore::with_capacity(Counter::default(), capacity);
			for &n in &updates {
				store.set_state(count(n));
			}
			let history = store.history();
			prop_assert_eq!(history.len(), updates.len().min(capacity));
			if let Some(last) = history.last() {
				prop_assert_eq!(&last.to, store.state());
			}
		}
	}
}
