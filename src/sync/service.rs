use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use log::{debug, error, info, warn};

use super::backend::Backend;
use super::bus::{EventBus, InboundSignal, Outbound};
use super::debounce::{Debouncer, TimerHost};
use super::form::{NodeForm, NodeFormValues};
use super::settings::{MetadataUpdate, NetworkSettings, SettingsUpdate};
use crate::error::{EditorError, Rejected};
use crate::network::{Edge, LayoutRequest, Network, NetworkChange, NetworkJson, Node, SubscriptionId};

/// Owns the live [`Network`] and keeps the node list, the properties panel
/// and the backend in step with it.
///
/// Every mutation publishes the full node list straight away; saving waits
/// until the network has been quiet for the debounce window and is skipped
/// while the document is locked.
#[derive(Clone)]
pub struct NetworkService {
	network: Rc<RefCell<Network>>,
	form: Rc<RefCell<NodeForm>>,
	bus: EventBus<Outbound>,
	saver: Rc<Debouncer>,
	backend: Rc<dyn Backend>,
	snapshot: Rc<RefCell<Option<NetworkJson>>>,
	layout_pending: Rc<Cell<bool>>,
	/// Model changes not yet published. Filled while the network is mutably
	/// borrowed and drained once that borrow is gone.
	changes: Rc<RefCell<VecDeque<NetworkChange>>>,
}

impl NetworkService {
	pub fn new(
		network: Network,
		backend: Rc<dyn Backend>,
		timers: Rc<dyn TimerHost>,
		save_debounce_ms: u32,
	) -> Self {
		let service = Self {
			network: Rc::new(RefCell::new(network)),
			form: Rc::new(RefCell::new(NodeForm::default())),
			bus: EventBus::new(),
			saver: Rc::new(Debouncer::new(timers, save_debounce_ms)),
			backend,
			snapshot: Rc::new(RefCell::new(None)),
			layout_pending: Rc::new(Cell::new(false)),
			changes: Rc::new(RefCell::new(VecDeque::new())),
		};

		let changes = service.changes.clone();
		service
			.network
			.borrow_mut()
			.subscribe(move |_, change| changes.borrow_mut().push_back(change.clone()));
		service
	}

	/// Run `edit` against the network, then publish what it changed.
	fn mutate<R>(&self, edit: impl FnOnce(&mut Network) -> R) -> R {
		let result = edit(&mut self.network.borrow_mut());
		self.flush();
		result
	}

	/// Publish queued changes: node list first, then the form, then a
	/// debounced save. Subscribers may call back into the service.
	fn flush(&self) {
		loop {
			let Some(change) = self.changes.borrow_mut().pop_front() else {
				break;
			};
			let (nodes, form) = {
				let network = self.network.borrow();
				let refreshed = self.form.borrow_mut().refresh(&network, &change);
				let form = refreshed.then(|| self.form.borrow().displayed().cloned());
				(network.nodes().to_vec(), form)
			};
			self.bus.publish(&Outbound::NodeListChanged(nodes));
			if let Some(values) = form {
				self.bus.publish(&Outbound::FormChanged(values));
			}

			let (network, backend) = (Rc::downgrade(&self.network), self.backend.clone());
			self.saver.call(move || persist(&network, backend.as_ref()));
		}
	}

	pub fn network(&self) -> Ref<'_, Network> {
		self.network.borrow()
	}

	pub fn bus(&self) -> &EventBus<Outbound> {
		&self.bus
	}

	/// Listen to model changes. Listeners run inside the mutation and must
	/// only read the network they are handed.
	pub fn subscribe(&self, listener: impl Fn(&Network, &NetworkChange) + 'static) -> SubscriptionId {
		self.network.borrow_mut().subscribe(listener)
	}

	pub fn unsubscribe(&self, id: SubscriptionId) {
		self.network.borrow_mut().unsubscribe(id);
	}

	pub fn nodes(&self) -> Vec<Node> {
		self.network.borrow().nodes().to_vec()
	}

	#[cfg(test)]
	pub fn save_pending(&self) -> bool {
		self.saver.is_pending()
	}

	/// A default node at `(x, y)`.
	pub fn add_node_at(&self, x: f64, y: f64) -> Result<Node, Rejected> {
		self.mutate(|network| {
			let count = network.node_count();
			network.add_node(x, y, count, None).cloned()
		})
	}

	pub fn add_node(&self, x: f64, y: f64, props: Node) -> Result<Node, Rejected> {
		self.mutate(|network| {
			let count = network.node_count();
			network.add_node(x, y, count, Some(props)).cloned()
		})
	}

	/// Link two nodes under a fresh edge id.
	pub fn connect(&self, a: &str, b: &str) -> Result<Edge, Rejected> {
		self.add_edge(Edge::new(uuid::Uuid::new_v4().to_string(), a, b))
	}

	pub fn add_edge(&self, edge: Edge) -> Result<Edge, Rejected> {
		self.mutate(|network| network.add_edge(edge).cloned())
	}

	pub fn remove_node(&self, uuid: &str) -> Option<Node> {
		self.mutate(|network| network.remove_node(uuid))
	}

	pub fn remove_edge(&self, edge_id: &str) -> Option<Edge> {
		self.mutate(|network| network.remove_edge(edge_id))
	}

	pub fn move_node(&self, uuid: &str, x: f64, y: f64) -> Result<Node, Rejected> {
		self.mutate(|network| network.set_node_position(uuid, x, y).cloned())
	}

	pub fn edit_node_details(&self, props: Node) -> Result<Node, Rejected> {
		self.mutate(|network| network.edit_node_details(props).cloned())
	}

	/// Point the properties panel at `uuid`, or empty it.
	pub fn show_in_form(&self, uuid: Option<&str>) {
		{
			let network = self.network.borrow();
			self.form
				.borrow_mut()
				.show(uuid.and_then(|id| network.get_node_by_id(id)));
		}
		self.bus.publish(&Outbound::FormChanged(self.form_values()));
	}

	pub fn form_values(&self) -> Option<NodeFormValues> {
		self.form.borrow().displayed().cloned()
	}

	/// Write the panel's values back, rounded, to the node they describe.
	pub fn submit_form(&self, values: &NodeFormValues) -> Result<Node, Rejected> {
		self.edit_node_details(values.to_node())
	}

	/// Reset the attributes `settings` randomise on every node, as one change.
	pub fn apply_settings(&self, settings: &NetworkSettings) {
		if settings.is_noop() {
			return;
		}
		self.mutate(|network| network.update_all_nodes(|node| settings.apply(node)));
	}

	pub fn update_metadata(&self, update: &MetadataUpdate) {
		self.mutate(|network| {
			let next = update.apply(network.metadata());
			network.set_metadata(next);
		});
	}

	/// Replace the whole network. Returns false when `json` lacks `nodes` or
	/// `_doc_metadata`.
	pub fn load_json(&self, json: &NetworkJson) -> bool {
		let loaded = self.mutate(|network| network.load_from_json(json));
		if loaded {
			let network = self.network.borrow();
			info!(
				"loaded network {:?}: {} nodes, {} edges",
				network.metadata().name,
				network.node_count(),
				network.edges().len()
			);
		}
		loaded
	}

	pub fn load_json_str(&self, raw: &str) -> Result<bool, EditorError> {
		let json: NetworkJson = raw.parse()?;
		Ok(self.load_json(&json))
	}

	pub fn handle_inbound(&self, signal: InboundSignal) -> Result<(), EditorError> {
		match signal {
			InboundSignal::NetworkReplaced(raw) => {
				if !self.load_json_str(&raw)? {
					warn!("replacement network has no nodes or _doc_metadata");
				}
			}
			InboundSignal::SettingsChanged(form) => match SettingsUpdate::from_form(&form)? {
				SettingsUpdate::Details(settings) => self.apply_settings(&settings),
				SettingsUpdate::Metadata(update) => self.update_metadata(&update),
			},
			InboundSignal::NodeSelected(uuid) => {
				if self.network.borrow().get_node_by_id(&uuid).is_none() {
					warn!("selected node {uuid} is not in the network");
					return Ok(());
				}
				self.show_in_form(Some(&uuid));
				self.bus.publish(&Outbound::NodeFocused(uuid));
			}
			InboundSignal::NodeDeleteRequested(uuid) => {
				if self.remove_node(&uuid).is_none() {
					warn!("cannot delete unknown node {uuid}");
				}
			}
		}
		Ok(())
	}

	pub fn layout_pending(&self) -> bool {
		self.layout_pending.get()
	}

	/// Ask the layout service to arrange the network. The answer, in
	/// normalised coordinates, is scaled to `width` x `height` and replaces
	/// the network; the current state is kept for [`Self::undo_layout`].
	pub fn request_layout(&self, layout: &str, width: f64, height: f64) {
		if self.layout_pending.get() {
			warn!("layout already in progress");
			return;
		}
		self.layout_pending.set(true);
		self.bus.publish(&Outbound::LayoutPending(true));

		let request = LayoutRequest {
			layout: layout.to_owned(),
			network: self.network.borrow().to_json(),
		};
		let snapshot = request.network.clone();
		let service = self.clone();
		self.backend.request_layout(
			request,
			Box::new(move |result| service.finish_layout(result, snapshot, width, height)),
		);
	}

	fn finish_layout(
		&self,
		result: Result<NetworkJson, EditorError>,
		snapshot: NetworkJson,
		width: f64,
		height: f64,
	) {
		self.layout_pending.set(false);
		self.bus.publish(&Outbound::LayoutPending(false));
		match result {
			Ok(mut json) => {
				json.rescale(width, height);
				// in place before the reload so listeners already see it
				let previous = self.snapshot.replace(Some(snapshot));
				if !self.load_json(&json) {
					self.snapshot.replace(previous);
					warn!("layout response has no nodes or _doc_metadata");
				}
			}
			Err(e) => {
				error!("layout request failed: {e}");
				self.bus.publish(&Outbound::LayoutFailed(e.to_string()));
			}
		}
	}

	pub fn can_undo_layout(&self) -> bool {
		self.snapshot.borrow().is_some()
	}

	/// Restore the network from before the last layout.
	pub fn undo_layout(&self) -> bool {
		let Some(snapshot) = self.snapshot.borrow_mut().take() else {
			return false;
		};
		self.load_json(&snapshot)
	}
}

fn persist(network: &Weak<RefCell<Network>>, backend: &dyn Backend) {
	let Some(network) = network.upgrade() else {
		return;
	};
	let Ok(network) = network.try_borrow() else {
		warn!("network busy when save was due, skipping");
		return;
	};
	if network.metadata().locked {
		debug!("document is locked, not saving");
		return;
	}
	backend.save(network.to_json());
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::test_support::{ManualTimers, RecordingBackend};

	struct Harness {
		service: NetworkService,
		timers: Rc<ManualTimers>,
		backend: Rc<RecordingBackend>,
		events: Rc<RefCell<Vec<Outbound>>>,
	}

	fn harness(network: Network) -> Harness {
		let timers = Rc::new(ManualTimers::default());
		let backend = Rc::new(RecordingBackend::default());
		let service = NetworkService::new(network, backend.clone(), timers.clone(), 1000);
		let events = Rc::new(RefCell::new(Vec::new()));
		let sink = events.clone();
		service.bus().subscribe(move |e| sink.borrow_mut().push(e.clone()));
		Harness {
			service,
			timers,
			backend,
			events,
		}
	}

	fn two_nodes() -> Network {
		let mut network = Network::new();
		network.add_node(0.0, 0.0, 0, Some(Node::new("a", "a", 0.0, 0.0))).unwrap();
		network.add_node(5.0, 5.0, 1, Some(Node::new("b", "b", 0.0, 0.0))).unwrap();
		network
	}

	fn locked(mut network: Network) -> Network {
		let mut meta = network.metadata().clone();
		meta.locked = true;
		network.set_metadata(meta);
		network
	}

	fn layout_answer(x: f64, y: f64) -> NetworkJson {
		let mut laid_out = two_nodes();
		laid_out.set_node_position("a", x, y).unwrap();
		laid_out.to_json()
	}

	#[test]
	fn save_waits_for_quiet_period() {
		let h = harness(two_nodes());
		for step in 1..=4 {
			h.service.move_node("a", step as f64, 0.0).unwrap();
			h.timers.advance(500);
		}
		assert_eq!(h.backend.save_count(), 0);

		h.timers.advance(500);
		assert_eq!(h.backend.save_count(), 1);
		let saved = &h.backend.saves.borrow()[0];
		assert_eq!(saved.nodes.as_ref().unwrap()["a"].x_pos, 4.0);
	}

	#[test]
	fn locked_document_never_saves() {
		let h = harness(locked(two_nodes()));
		h.service.add_node_at(1.0, 1.0).unwrap();
		h.service.connect("a", "b").unwrap();
		h.service.move_node("b", 9.0, 9.0).unwrap();
		h.timers.advance(10_000);
		h.service.remove_node("a");
		h.timers.advance(10_000);
		assert_eq!(h.backend.save_count(), 0);
	}

	#[test]
	fn locking_before_the_timer_fires_cancels_the_save() {
		let h = harness(two_nodes());
		h.service.move_node("a", 3.0, 3.0).unwrap();
		h.service
			.handle_inbound(InboundSignal::SettingsChanged(vec![
				("operation".into(), "update-network-metadata".into()),
				("locked".into(), "on".into()),
			]))
			.unwrap();
		h.timers.advance(2000);
		assert!(h.service.network().metadata().locked);
		assert_eq!(h.backend.save_count(), 0);
	}

	#[test]
	fn node_list_is_published_per_mutation() {
		let h = harness(two_nodes());
		h.service.remove_node("b");
		assert_eq!(
			*h.events.borrow(),
			vec![Outbound::NodeListChanged(vec![Node::new("a", "a", 0.0, 0.0)])]
		);
		assert!(h.service.save_pending());
	}

	#[test]
	fn list_subscribers_may_call_back_into_the_service() {
		let h = harness(two_nodes());
		let (inner, answered) = (h.service.clone(), Rc::new(Cell::new(false)));
		let seen = answered.clone();
		h.service.bus().subscribe(move |event| {
			if let Outbound::NodeListChanged(nodes) = event {
				if !seen.replace(true) {
					inner
						.handle_inbound(InboundSignal::NodeSelected(nodes[0].uuid.clone()))
						.unwrap();
				}
			}
		});

		h.service.add_node_at(5.0, 5.0).unwrap();
		assert!(answered.get());
		assert_eq!(h.service.form_values().unwrap().uuid, "a");
		assert!(h.events.borrow().contains(&Outbound::NodeFocused("a".into())));
	}

	#[test]
	fn deleting_from_a_list_subscriber_publishes_both_changes() {
		let h = harness(two_nodes());
		let inner = h.service.clone();
		h.service.bus().subscribe(move |event| {
			if let Outbound::NodeListChanged(nodes) = event {
				if nodes.iter().any(|n| n.uuid == "b") && nodes.len() == 3 {
					inner.remove_node("b");
				}
			}
		});

		h.service.add_node_at(1.0, 1.0).unwrap();
		let lists: Vec<usize> = h
			.events
			.borrow()
			.iter()
			.filter_map(|e| match e {
				Outbound::NodeListChanged(nodes) => Some(nodes.len()),
				_ => None,
			})
			.collect();
		assert_eq!(lists, vec![3, 2]);
		assert!(h.service.network().get_node_by_id("b").is_none());
	}

	#[test]
	fn dragging_only_updates_the_displayed_node() {
		let h = harness(two_nodes());
		h.service.show_in_form(Some("b"));

		h.service.move_node("a", 10.0, 10.0).unwrap();
		let shown = h.service.form_values().unwrap();
		assert_eq!((shown.x_pos, shown.y_pos), (5.0, 5.0));

		h.service.move_node("b", 10.0, 10.0).unwrap();
		let shown = h.service.form_values().unwrap();
		assert_eq!((shown.x_pos, shown.y_pos), (10.0, 10.0));
		assert!(
			h.events
				.borrow()
				.contains(&Outbound::FormChanged(Some(shown.clone())))
		);
	}

	#[test]
	fn form_submission_is_rounded() {
		let h = harness(two_nodes());
		h.service.show_in_form(Some("a"));
		let mut values = h.service.form_values().unwrap();
		values.vulnerability = 0.333333333;
		values.x_pos = 1.23456;
		let node = h.service.submit_form(&values).unwrap();
		assert_eq!(node.vulnerability, 0.333333);
		assert_eq!(node.x_pos, 1.23);
		assert_eq!(h.service.form_values().unwrap().vulnerability, 0.333333);
	}

	#[test]
	fn settings_apply_as_one_batch() {
		let h = harness(two_nodes());
		h.service.edit_node_details(Node {
			vulnerability: 0.9,
			entry_node: true,
			..Node::new("a", "a", 0.0, 0.0)
		})
		.unwrap();
		h.events.borrow_mut().clear();

		h.service.apply_settings(&NetworkSettings {
			randomise_vulnerabilities: true,
			vulnerability_lower_bound: 0.05,
			randomise_entry_nodes: true,
			..Default::default()
		});

		assert_eq!(h.events.borrow().len(), 1);
		assert!(
			h.service
				.nodes()
				.iter()
				.all(|n| n.vulnerability == 0.05 && !n.entry_node)
		);
		h.timers.advance(1000);
		assert_eq!(h.backend.save_count(), 1);
	}

	#[test]
	fn noop_settings_do_not_notify() {
		let h = harness(two_nodes());
		h.service.apply_settings(&NetworkSettings::default());
		assert!(h.events.borrow().is_empty());
	}

	#[test]
	fn layout_rescales_and_can_be_undone() {
		let h = harness(two_nodes());
		h.service.request_layout("spring", 800.0, 600.0);
		assert!(h.service.layout_pending());
		assert_eq!(h.backend.layouts.borrow()[0].0.layout, "spring");

		h.backend.answer_layout(Ok(layout_answer(0.5, 0.5)));
		assert!(!h.service.layout_pending());
		let a = h.service.network().get_node_by_id("a").cloned().unwrap();
		assert_eq!((a.x_pos, a.y_pos), (400.0, 300.0));
		assert!(h.service.can_undo_layout());

		assert!(h.service.undo_layout());
		let a = h.service.network().get_node_by_id("a").cloned().unwrap();
		assert_eq!((a.x_pos, a.y_pos), (0.0, 0.0));
		assert!(!h.service.can_undo_layout());
	}

	#[test]
	fn failed_layout_releases_controls() {
		let h = harness(two_nodes());
		h.service.request_layout("spring", 100.0, 100.0);
		h.backend
			.answer_layout(Err(EditorError::Transport("connection reset".into())));

		let events = h.events.borrow();
		assert!(events.contains(&Outbound::LayoutPending(false)));
		assert!(matches!(events.last(), Some(Outbound::LayoutFailed(_))));
		drop(events);

		assert!(!h.service.layout_pending());
		assert_eq!(h.service.nodes().len(), 2);
		h.service.request_layout("spring", 100.0, 100.0);
		assert_eq!(h.backend.layouts.borrow().len(), 1);
	}

	#[test]
	fn second_layout_request_is_ignored_while_pending() {
		let h = harness(two_nodes());
		h.service.request_layout("spring", 1.0, 1.0);
		h.service.request_layout("circular", 1.0, 1.0);
		assert_eq!(h.backend.layouts.borrow().len(), 1);
	}

	#[test]
	fn malformed_replacement_fails_loudly() {
		let h = harness(two_nodes());
		let err = h
			.service
			.handle_inbound(InboundSignal::NetworkReplaced("{not json".into()))
			.unwrap_err();
		assert!(matches!(err, EditorError::Parse(_)));
		assert_eq!(h.service.nodes().len(), 2);
	}

	#[test]
	fn replacement_network_is_loaded() {
		let h = harness(two_nodes());
		let mut other = Network::new();
		other.add_node(0.0, 0.0, 0, Some(Node::new("z", "z", 0.0, 0.0))).unwrap();
		let raw = other.to_json().to_json_string().unwrap();
		h.service
			.handle_inbound(InboundSignal::NetworkReplaced(raw))
			.unwrap();
		let ids: Vec<_> = h.service.nodes().into_iter().map(|n| n.uuid).collect();
		assert_eq!(ids, vec!["z".to_owned()]);
	}

	#[test]
	fn delete_from_list_cascades() {
		let h = harness(two_nodes());
		h.service.connect("a", "b").unwrap();
		h.service
			.handle_inbound(InboundSignal::NodeDeleteRequested("a".into()))
			.unwrap();
		assert_eq!(h.service.nodes().len(), 1);
		assert!(h.service.network().edges().is_empty());
	}

	#[test]
	fn select_from_list_focuses_and_fills_the_form() {
		let h = harness(two_nodes());
		h.service
			.handle_inbound(InboundSignal::NodeSelected("b".into()))
			.unwrap();
		assert_eq!(h.service.form_values().unwrap().uuid, "b");
		assert!(
			h.events
				.borrow()
				.contains(&Outbound::NodeFocused("b".into()))
		);
	}
}
