//! Deterministic stand-ins for browser timers and the HTTP backend.

use std::cell::{Cell, RefCell};

use crate::error::EditorError;
use crate::network::{LayoutRequest, NetworkJson};
use crate::sync::{Backend, LayoutCallback, TimerHost, TimerId};

type Pending = (TimerId, u64, Box<dyn FnOnce()>);

/// Timers driven by [`ManualTimers::advance`] instead of a clock.
#[derive(Default)]
pub struct ManualTimers {
	now: Cell<u64>,
	next_id: Cell<TimerId>,
	pending: RefCell<Vec<Pending>>,
}

impl ManualTimers {
	pub fn advance(&self, ms: u64) {
		let target = self.now.get() + ms;
		loop {
			let due = {
				let mut pending = self.pending.borrow_mut();
				let next = pending
					.iter()
					.enumerate()
					.filter(|(_, (_, at, _))| *at <= target)
					.min_by_key(|(_, (_, at, _))| *at)
					.map(|(i, _)| i);
				next.map(|i| pending.remove(i))
			};
			let Some((_, at, callback)) = due else {
				break;
			};
			self.now.set(at);
			callback();
		}
		self.now.set(target);
	}

	pub fn pending(&self) -> usize {
		self.pending.borrow().len()
	}
}

impl TimerHost for ManualTimers {
	fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> TimerId {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		self.pending
			.borrow_mut()
			.push((id, self.now.get() + delay_ms as u64, callback));
		id
	}

	fn clear_timeout(&self, id: TimerId) {
		self.pending.borrow_mut().retain(|(pid, _, _)| *pid != id);
	}
}

/// Records saves and holds layout requests until the test answers them.
#[derive(Default)]
pub struct RecordingBackend {
	pub saves: RefCell<Vec<NetworkJson>>,
	pub layouts: RefCell<Vec<(LayoutRequest, LayoutCallback)>>,
}

impl RecordingBackend {
	pub fn save_count(&self) -> usize {
		self.saves.borrow().len()
	}

	pub fn answer_layout(&self, result: Result<NetworkJson, EditorError>) {
		let (_, done) = self.layouts.borrow_mut().remove(0);
		done(result);
	}
}

impl Backend for RecordingBackend {
	fn save(&self, network: NetworkJson) {
		self.saves.borrow_mut().push(network);
	}

	fn request_layout(&self, request: LayoutRequest, done: LayoutCallback) {
		self.layouts.borrow_mut().push((request, done));
	}
}
