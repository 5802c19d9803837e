use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::network::Node;

use super::form::NodeFormValues;

/// Signals raised by the editor for the surrounding page.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
	NodeListChanged(Vec<Node>),
	FormChanged(Option<NodeFormValues>),
	/// A node picked from an external list should be centred and highlighted.
	NodeFocused(String),
	LayoutPending(bool),
	LayoutFailed(String),
}

/// Signals the surrounding page sends into the editor.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundSignal {
	/// A complete network as a JSON string.
	NetworkReplaced(String),
	/// Flat key/value form payload tagged by its `operation` key.
	SettingsChanged(Vec<(String, String)>),
	NodeSelected(String),
	NodeDeleteRequested(String),
}

type Handler<T> = Rc<dyn Fn(&T)>;

/// Single-threaded publish/subscribe channel.
pub struct EventBus<T> {
	handlers: Rc<RefCell<Vec<(usize, Handler<T>)>>>,
	next_id: Rc<Cell<usize>>,
}

impl<T> Clone for EventBus<T> {
	fn clone(&self) -> Self {
		Self {
			handlers: self.handlers.clone(),
			next_id: self.next_id.clone(),
		}
	}
}

impl<T> Default for EventBus<T> {
	fn default() -> Self {
		Self {
			handlers: Rc::new(RefCell::new(Vec::new())),
			next_id: Rc::new(Cell::new(0)),
		}
	}
}

impl<T> EventBus<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&self, handler: impl Fn(&T) + 'static) -> usize {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		self.handlers.borrow_mut().push((id, Rc::new(handler)));
		id
	}

	pub fn unsubscribe(&self, id: usize) {
		self.handlers.borrow_mut().retain(|(hid, _)| *hid != id);
	}

	pub fn publish(&self, event: &T) {
		// handlers may subscribe or publish while we iterate
		let handlers: Vec<Handler<T>> = self
			.handlers
			.borrow()
			.iter()
			.map(|(_, h)| h.clone())
			.collect();
		for handler in handlers {
			handler(event);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn handlers_can_publish_reentrantly() {
		let bus: EventBus<u32> = EventBus::new();
		let seen = Rc::new(RefCell::new(Vec::new()));

		let inner = bus.clone();
		bus.subscribe(move |n| {
			if *n == 1 {
				inner.publish(&2);
			}
		});
		let sink = seen.clone();
		bus.subscribe(move |n| sink.borrow_mut().push(*n));

		bus.publish(&1);
		assert_eq!(*seen.borrow(), vec![2, 1]);
	}

	#[test]
	fn unsubscribed_handlers_stop_receiving() {
		let bus: EventBus<u32> = EventBus::new();
		let count = Rc::new(Cell::new(0));
		let sink = count.clone();
		let id = bus.subscribe(move |_| sink.set(sink.get() + 1));
		bus.publish(&0);
		bus.unsubscribe(id);
		bus.publish(&0);
		assert_eq!(count.get(), 1);
	}
}
