use super::{Child, ChildKey, Component};
use crate::document::Document;
use crate::error::Result;
use crate::host::{Host, NodeId};
use std::rc::Weak;

/// Where a component gets attached.
#[derive(Debug, Clone, Copy)]
pub enum Target<'t> {
    /// A raw host node, e.g. a mount point that no component owns.
    Node(NodeId),
    Component(&'t Component),
}

impl From<NodeId> for Target<'_> {
    fn from(node: NodeId) -> Self {
        Target::Node(node)
    }
}

impl<'t> From<&'t Component> for Target<'t> {
    fn from(component: &'t Component) -> Self {
        Target::Component(component)
    }
}

impl Component {
    /// Attach under `target` with the given child key.
    ///
    /// A raw node target materializes the component and appends it right
    /// away. A component target records the child under `key`, replacing
    /// any previous entry; the node is only built and appended now if the
    /// parent is already live, otherwise it waits for the parent's render.
    pub async fn attach_to<'t, H: Host>(
        &self,
        doc: &mut Document<H>,
        target: impl Into<Target<'t>>,
        key: impl Into<ChildKey>,
    ) -> Result<Component> {
        let target = target.into();
        let key = key.into();
        self.resolve_name(&key, &doc.settings().fallback_name);

        let parent_node = match target {
            Target::Node(node) => Some(node),
            Target::Component(parent) => {
                parent.insert_child(key, self.clone());
                parent.node()
            }
        };

        if let Some(parent_node) = parent_node {
            let node = self.prepare_node(doc, false).await?;
            doc.host_mut().append_child(parent_node, node);
        }
        Ok(self.clone())
    }

    /// Take the component out of its parent's child map and its node out of
    /// whatever node holds it. The component keeps its own node.
    pub fn detach<H: Host>(&self, doc: &mut Document<H>) {
        if let Some(parent) = self.parent() {
            parent.0.borrow_mut().children.retain(|_, child| match child {
                Child::Component(component) => !component.ptr_eq(self),
                Child::Descriptor(_) => true,
            });
        }

        if let Some(node) = self.node() {
            if let Some(holder) = doc.host().parent_node(node) {
                doc.host_mut().remove_child(holder, node);
            }
        }

        self.0.borrow_mut().parent = Weak::new();
    }
}
