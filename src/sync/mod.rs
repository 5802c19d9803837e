//! Keeps everything outside the graph model consistent with it.

mod backend;
mod bus;
mod debounce;
mod dom_bridge;
mod form;
mod service;
mod settings;

pub use backend::HttpBackend;
#[cfg(test)]
pub use backend::{Backend, LayoutCallback};
pub use bus::Outbound;
pub use debounce::BrowserTimers;
#[cfg(test)]
pub use debounce::{TimerHost, TimerId};
pub use dom_bridge::DomBridge;
pub use form::NodeFormValues;
pub use service::NetworkService;
