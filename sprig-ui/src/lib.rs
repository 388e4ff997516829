//! Lazily materialized component trees.
//!
//! A tree is described as plain data ([`ComponentDescriptor`]) and turned
//! into live nodes of a [`Host`] only when something needs them: markup,
//! the node itself, or attachment to a parent that is already live.

pub mod component;
pub mod config;
pub mod document;
pub mod error;
pub mod host;

// Re-export key types
pub use component::{
    Accessor, Binding, Child, ChildKey, Component, ComponentDescriptor, ElementClass, Listener,
    Pattern, Phase, Resolved, Target, RENDERED, RERENDERED,
};
pub use config::Settings;
pub use document::Document;
pub use error::{BindingError, Error, HostError, Result};
pub use host::{
    ElementImpl, ElementOptions, ElementRegistry, Event, Host, HostHandler, ListenerOptions,
    MemoryElement, MemoryHost, NodeId,
};
