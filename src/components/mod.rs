pub mod network_canvas;
mod network_editor;
mod node_properties;

pub use network_editor::NetworkEditor;
