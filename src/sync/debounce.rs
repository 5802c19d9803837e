//! Trailing-edge debounce over an injectable timer source.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

pub type TimerId = i32;

/// Something that can run a callback after a delay, and forget it again.
pub trait TimerHost {
	fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> TimerId;
	fn clear_timeout(&self, id: TimerId);
}

/// Runs the most recently scheduled action once `delay_ms` pass without
/// another call. Each call cancels the pending timer and starts a new one.
pub struct Debouncer {
	host: Rc<dyn TimerHost>,
	delay_ms: u32,
	pending: Rc<Cell<Option<TimerId>>>,
}

impl Debouncer {
	pub fn new(host: Rc<dyn TimerHost>, delay_ms: u32) -> Self {
		Self {
			host,
			delay_ms,
			pending: Rc::new(Cell::new(None)),
		}
	}

	pub fn call(&self, action: impl FnOnce() + 'static) {
		self.cancel();
		let pending = self.pending.clone();
		let id = self.host.set_timeout(
			self.delay_ms,
			Box::new(move || {
				pending.set(None);
				action();
			}),
		);
		self.pending.set(Some(id));
	}

	pub fn cancel(&self) {
		if let Some(id) = self.pending.take() {
			self.host.clear_timeout(id);
		}
	}

	pub fn is_pending(&self) -> bool {
		self.pending.get().is_some()
	}
}

/// Values held for scheduled timers. An entry goes when its timer is
/// cleared, or on the next insert once its callback has finished.
struct TimerSlots<C> {
	entries: RefCell<HashMap<TimerId, (C, Rc<Cell<bool>>)>>,
}

impl<C> Default for TimerSlots<C> {
	fn default() -> Self {
		Self {
			entries: RefCell::new(HashMap::new()),
		}
	}
}

impl<C> TimerSlots<C> {
	fn insert(&self, id: TimerId, value: C, finished: Rc<Cell<bool>>) {
		let mut entries = self.entries.borrow_mut();
		entries.retain(|_, (_, done)| !done.get());
		entries.insert(id, (value, finished));
	}

	fn remove(&self, id: TimerId) -> Option<C> {
		self.entries.borrow_mut().remove(&id).map(|(value, _)| value)
	}

	#[cfg(test)]
	fn len(&self) -> usize {
		self.entries.borrow().len()
	}
}

/// `window.setTimeout` backed timers. Callbacks are owned here, so a
/// cleared timer frees its closure straight away. A timer must not clear
/// itself from inside its own callback.
#[derive(Default)]
pub struct BrowserTimers {
	slots: TimerSlots<Closure<dyn FnMut()>>,
}

impl TimerHost for BrowserTimers {
	fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> TimerId {
		let Some(window) = web_sys::window() else {
			log::error!("no window, dropping timer");
			return -1;
		};
		let finished = Rc::new(Cell::new(false));
		let done = finished.clone();
		let mut callback = Some(callback);
		let closure = Closure::<dyn FnMut()>::new(move || {
			if let Some(callback) = callback.take() {
				callback();
			}
			done.set(true);
		});
		match window.set_timeout_with_callback_and_timeout_and_arguments_0(
			closure.as_ref().unchecked_ref(),
			delay_ms as i32,
		) {
			Ok(id) => {
				self.slots.insert(id, closure, finished);
				id
			}
			Err(e) => {
				log::error!("setTimeout failed: {e:?}");
				-1
			}
		}
	}

	fn clear_timeout(&self, id: TimerId) {
		if let Some(window) = web_sys::window() {
			window.clear_timeout_with_handle(id);
		}
		self.slots.remove(id);
	}
}
