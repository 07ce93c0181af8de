pub mod bundle;
pub mod document;
pub mod event;
pub mod handler;
pub mod history;
pub mod node;
pub mod reconcile;
pub mod value;

#[cfg(test)]
mod test;

pub use document::DocumentHandler;
pub use handler::Handler;
pub use history::{AuxKind, History, Merge, Position};
pub use node::{LocalState, Node};
pub use reconcile::{index_label, reconcile};
pub use value::{BoundValue, Shared, shared};
