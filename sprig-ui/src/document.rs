use crate::component::{Component, ComponentState};
use crate::config::Settings;
use crate::host::{Host, NodeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Weak;

/// A host together with the bookkeeping that spans a whole tree.
///
/// Components are materialized against a `Document`: it hands out the host,
/// supplies [`Settings`] and keeps the node → component side table, so raw
/// nodes coming back from the host can be mapped to their owner without the
/// node holding on to it.
pub struct Document<H: Host> {
    host: H,
    settings: Settings,
    owners: HashMap<NodeId, Weak<RefCell<ComponentState>>>,
}

impl<H: Host> Document<H> {
    pub fn new(host: H) -> Self {
        Self::with_settings(host, Settings::default())
    }

    pub fn with_settings(host: H, settings: Settings) -> Self {
        Self {
            host,
            settings,
            owners: HashMap::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Component that owns `node`, if it is still alive.
    pub fn component_for(&self, node: NodeId) -> Option<Component> {
        self.owners
            .get(&node)
            .and_then(Weak::upgrade)
            .map(Component::from_state)
    }

    pub(crate) fn claim(&mut self, node: NodeId, owner: &Component) {
        self.owners.insert(node, owner.downgrade());
    }

    pub(crate) fn release(&mut self, node: NodeId) {
        self.owners.remove(&node);
    }

    /// Drop side table entries whose components are gone.
    pub fn prune(&mut self) -> usize {
        let before = self.owners.len();
        self.owners.retain(|_, owner| owner.strong_count() > 0);
        before - self.owners.len()
    }
}

impl<H: Host + Default> Default for Document<H> {
    fn default() -> Self {
        Self::new(H::default())
    }
}
