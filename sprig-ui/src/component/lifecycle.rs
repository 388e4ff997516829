use super::{ChildKey, Component, ElementClass, Hook, Phase};
use crate::config::Settings;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::host::{Event, Host, HostHandler, NodeId};
use futures::future::{FutureExt, LocalBoxFuture};
use serde_json::Value;
use std::rc::Rc;

/// Dispatched on the node once its first materialization has rendered.
pub const RENDERED: &str = "rendered";
/// Dispatched on the node after a forced re-render.
pub const RERENDERED: &str = "rerendered";

#[derive(Clone, Copy)]
enum Stage {
    Pre,
    Post,
}

impl Component {
    /// Materialize the component into a node of `doc`'s host.
    ///
    /// Without `rerender` this is a no-op once a node exists. With it, the
    /// node keeps its identity and attributes but loses every child node;
    /// the children are then appended again from the current child map.
    pub async fn prepare<H: Host>(&self, doc: &mut Document<H>, rerender: bool) -> Result<()> {
        self.prepare_node(doc, rerender).await.map(|_| ())
    }

    /// Force a destructive re-render.
    pub async fn rerender<H: Host>(&self, doc: &mut Document<H>) -> Result<()> {
        self.prepare(doc, true).await
    }

    /// The node, materializing first if needed.
    pub async fn to_node<H: Host>(&self, doc: &mut Document<H>) -> Result<NodeId> {
        self.prepare_node(doc, false).await
    }

    /// Host markup of the materialized node.
    pub async fn to_html<H: Host>(&self, doc: &mut Document<H>) -> Result<String> {
        let node = self.prepare_node(doc, false).await?;
        Ok(doc.host().outer_html(node))
    }

    // Boxed so that children can be prepared recursively.
    pub(crate) fn prepare_node<'a, H>(
        &'a self,
        doc: &'a mut Document<H>,
        rerender: bool,
    ) -> LocalBoxFuture<'a, Result<NodeId>>
    where
        H: Host + 'a,
    {
        async move {
            let (phase, existing) = {
                let state = self.0.borrow();
                (state.phase, state.node)
            };

            if phase == Phase::Materializing {
                return Err(Error::MaterializationInProgress {
                    name: self.name().to_string(),
                });
            }
            if let (Some(node), false) = (existing, rerender) {
                return Ok(node);
            }

            let first = existing.is_none();
            self.0.borrow_mut().phase = Phase::Materializing;
            tracing::debug!(name = %self.name(), first, "materializing component");

            match self.materialize(doc, existing).await {
                Ok(node) => {
                    self.0.borrow_mut().phase = Phase::Materialized;
                    Ok(node)
                }
                Err(err) => {
                    tracing::warn!(name = %self.name(), first, error = %err, "materialization aborted");
                    self.abort(doc);
                    Err(err)
                }
            }
        }
        .boxed_local()
    }

    async fn materialize<H: Host>(
        &self,
        doc: &mut Document<H>,
        existing: Option<NodeId>,
    ) -> Result<NodeId> {
        let first = existing.is_none();
        let run_hooks = first || doc.settings().rerun_hooks_on_rerender;

        if let Some(node) = existing {
            purge(doc.host_mut(), node);
        }
        if run_hooks {
            self.run_hooks(Stage::Pre);
        }

        let (node, children) = self.render(doc, existing).await?;

        for (key, child) in children {
            let child_node = child.prepare_node(doc, false).await?;
            tracing::trace!(parent = %self.name(), child = %key, "appending child");
            doc.host_mut().append_child(node, child_node);
        }

        if run_hooks {
            self.run_hooks(Stage::Post);
        }
        Ok(node)
    }

    async fn render<H: Host>(
        &self,
        doc: &mut Document<H>,
        existing: Option<NodeId>,
    ) -> Result<(NodeId, Vec<(ChildKey, Component)>)> {
        let node = match existing {
            Some(node) => node,
            None => {
                let node = self.create_element(doc).await?;
                self.assign_props(doc.host_mut(), node);
                self.install_bindings();
                self.attach_listeners(doc.host_mut(), node);
                self.0.borrow_mut().node = Some(node);
                node
            }
        };

        let children = self.normalize_children(doc.settings());
        doc.claim(node, self);

        let event = if existing.is_some() { RERENDERED } else { RENDERED };
        doc.host_mut().dispatch_event(node, event);
        Ok((node, children))
    }

    async fn create_element<H: Host>(&self, doc: &mut Document<H>) -> Result<NodeId> {
        let (tag, class, options) = {
            let state = self.0.borrow();
            let tag = element_tag(&state.name, state.element_class.is_some(), doc.settings());
            (tag, state.element_class.clone(), state.element_options.clone())
        };

        if let Some(class) = class {
            if !doc.host().is_element_type_registered(&tag) {
                let element = match class {
                    ElementClass::Resolved(element) => element,
                    ElementClass::Named(identifier) => {
                        let element = doc
                            .host_mut()
                            .resolve_element(&identifier)
                            .await
                            .map_err(|source| Error::Creation {
                                tag: tag.clone(),
                                source,
                            })?;
                        self.0.borrow_mut().element_class =
                            Some(ElementClass::Resolved(element.clone()));
                        element
                    }
                };

                doc.host_mut()
                    .register_element_type(&tag, &element, &options)
                    .map_err(|source| Error::Registration {
                        tag: tag.clone(),
                        source,
                    })?;
            }
        }

        doc.host_mut()
            .create_node(&tag)
            .map_err(|source| Error::Creation { tag, source })
    }

    fn assign_props<H: Host>(&self, host: &mut H, node: NodeId) {
        let state = self.0.borrow();
        for (key, value) in &state.props {
            match (key.as_str(), value) {
                ("style", Value::Object(style)) => host.merge_style(node, style),
                _ => host.set_property(node, key, value),
            }
        }
        for (key, value) in &state.data {
            host.set_data(node, key, value);
        }
    }

    fn install_bindings(&self) {
        let mut state = self.0.borrow_mut();
        state.bindings_installed = !state.bindings.is_empty();
    }

    fn attach_listeners<H: Host>(&self, host: &mut H, node: NodeId) {
        let listeners: Vec<_> = self
            .0
            .borrow()
            .listeners
            .iter()
            .map(|(event, listener)| (event.clone(), listener.clone()))
            .collect();

        for (event, listener) in listeners {
            let receiver = self.downgrade();
            let handler = listener.handler;
            let bound: HostHandler = Rc::new(move |event: &Event| {
                if let Some(state) = receiver.upgrade() {
                    handler(&Component::from_state(state), event);
                }
            });
            host.add_event_listener(node, &event, bound, listener.options);
        }
    }

    fn normalize_children(&self, settings: &Settings) -> Vec<(ChildKey, Component)> {
        let children = self.wrap_children();
        for (key, child) in &children {
            child.0.borrow_mut().parent = self.downgrade();
            child.resolve_name(key, &settings.fallback_name);
        }
        children
    }

    fn run_hooks(&self, stage: Stage) {
        let hooks: Vec<Hook> = {
            let state = self.0.borrow();
            let hooks = match stage {
                Stage::Pre => &state.pre_render,
                Stage::Post => &state.post_render,
            };
            hooks.values().cloned().collect()
        };
        for hook in hooks {
            hook(self);
        }
    }

    fn abort<H: Host>(&self, doc: &mut Document<H>) {
        let node = {
            let mut state = self.0.borrow_mut();
            state.phase = Phase::Unmaterialized;
            state.bindings_installed = false;
            state.node.take()
        };
        let Some(node) = node else {
            return;
        };
        let host = doc.host_mut();
        if let Some(parent) = host.parent_node(node) {
            host.remove_child(parent, node);
        }
        doc.release(node);
        doc.host_mut().discard_node(node);
    }
}

/// Tag requested from the host for a component named `name`.
pub(crate) fn element_tag(name: &str, has_class: bool, settings: &Settings) -> String {
    let mut tag = name.to_lowercase();
    if has_class && !tag.contains('-') {
        tag.push_str(&settings.custom_element_suffix);
    }
    tag
}

fn purge<H: Host>(host: &mut H, node: NodeId) {
    while let Some(child) = host.first_child(node) {
        host.remove_child(node, child);
    }
}
