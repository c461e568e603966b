// ABOUTME: DOM convenience helpers with host capability selection done once up front.
// ABOUTME: Class tokens, node removal, scroll position, subtree construction, and change observation.

//! The helper surface.
//!
//! [`Dom::detect`] inspects a document's host capabilities a single time and
//! keeps the chosen class editor and observation strategy; every later call
//! goes straight to that choice.
//!
//! ```
//! use digests_dom::{Document, Dom};
//!
//! let mut doc = Document::new();
//! let dom = Dom::detect(&doc);
//! let item = dom.create(&mut doc, "<li class=\"item\">x</li>", &[0usize.into()]).unwrap().unwrap();
//! dom.add_class(&mut doc, item, "active selected").unwrap();
//! assert!(dom.has_class(&doc, item, "selected").unwrap());
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ego_tree::NodeId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classes::{ClassEditor, ATTRIBUTE, TOKEN_LIST};
use crate::dom::Document;
use crate::error::{DomError, Result};
use crate::observe::{EventKind, MutationRecord, Observation, ObserverOptions};
use crate::options::HostCapabilities;
use crate::path::PathStep;

/// How `Dom::observe` watches for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveStrategy {
    /// Subtree mutation observer, one callback per qualifying batch.
    MutationObserver,
    /// Legacy insertion/removal listeners on the node itself.
    Events,
    /// Nothing available; observing is a no-op.
    Unsupported,
}

impl ObserveStrategy {
    fn select(caps: &HostCapabilities) -> Self {
        if caps.mutation_observer {
            ObserveStrategy::MutationObserver
        } else if caps.event_listeners {
            ObserveStrategy::Events
        } else {
            ObserveStrategy::Unsupported
        }
    }
}

/// True if any record in the batch inserted or removed nodes.
fn batch_changes_nodes(records: &[MutationRecord]) -> bool {
    records.iter().any(MutationRecord::changes_nodes)
}

/// Scroll offsets reconciled across window and document element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub top: f64,
    pub left: f64,
}

/// DOM helpers bound to one capability profile.
#[derive(Clone, Copy)]
pub struct Dom {
    classes: &'static dyn ClassEditor,
    observe: ObserveStrategy,
    has_class_list: bool,
}

impl fmt::Debug for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dom")
            .field("classes", &self.classes.name())
            .field("observe", &self.observe)
            .field("has_class_list", &self.has_class_list)
            .finish()
    }
}

impl Dom {
    /// Selects strategies from the document's host capabilities.
    pub fn detect(doc: &Document) -> Self {
        Self::for_capabilities(doc.capabilities())
    }

    pub fn for_capabilities(caps: &HostCapabilities) -> Self {
        let classes: &'static dyn ClassEditor = if caps.class_list {
            &TOKEN_LIST
        } else {
            &ATTRIBUTE
        };
        let observe = ObserveStrategy::select(caps);
        debug!(
            class_editor = classes.name(),
            observe = ?observe,
            "selected DOM helper strategies"
        );
        Self {
            classes,
            observe,
            has_class_list: caps.class_list,
        }
    }

    /// Whether class operations go through the structured token list.
    pub fn has_class_list(&self) -> bool {
        self.has_class_list
    }

    pub fn observe_strategy(&self) -> ObserveStrategy {
        self.observe
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    /// True if `class_name` is one of the element's class tokens.
    pub fn has_class(&self, doc: &Document, elm: NodeId, class_name: &str) -> Result<bool> {
        self.classes.contains(doc, elm, class_name)
    }

    /// Adds one or more space-separated tokens.
    pub fn add_class(&self, doc: &mut Document, elm: NodeId, class_name: &str) -> Result<()> {
        let tokens: Vec<&str> = class_name.split_ascii_whitespace().collect();
        if tokens.is_empty() {
            // Let the editor decide how blank input is treated.
            return self.classes.add(doc, elm, class_name);
        }
        for token in tokens {
            self.classes.add(doc, elm, token)?;
        }
        Ok(())
    }

    /// Removes one or more space-separated tokens.
    pub fn remove_class(&self, doc: &mut Document, elm: NodeId, class_name: &str) -> Result<()> {
        let tokens: Vec<&str> = class_name.split_ascii_whitespace().collect();
        if tokens.is_empty() {
            return self.classes.remove(doc, elm, class_name);
        }
        for token in tokens {
            self.classes.remove(doc, elm, token)?;
        }
        Ok(())
    }

    /// Flips a token and returns whether it is present afterwards.
    pub fn toggle_class(&self, doc: &mut Document, elm: NodeId, class_name: &str) -> Result<bool> {
        self.classes.toggle(doc, elm, class_name)
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Detaches `elm` from its parent.
    pub fn remove(&self, doc: &mut Document, elm: NodeId) -> Result<()> {
        doc.detach(elm)
    }

    /// Current scroll offsets, read fresh on every call.
    pub fn scroll_position(&self, doc: &Document) -> ScrollPosition {
        let m = doc.scroll_metrics();
        ScrollPosition {
            top: m.page_y_offset.max(m.scroll_top) - m.client_top,
            left: m.page_x_offset.max(m.scroll_left) - m.client_left,
        }
    }

    /// Parses `html` into a detached `<div>` container.
    ///
    /// Each call allocates a fresh container in the document's arena; it is
    /// not reclaimed, even when only a descendant is returned.
    ///
    /// With an empty path the container is returned. Otherwise each step but
    /// the last descends into the matched child's children collection, and
    /// the last step returns the matched child itself (`None` if it does not
    /// exist). A non-final step that matches nothing is a
    /// [`DomError::PathLookup`].
    pub fn create(&self, doc: &mut Document, html: &str, path: &[PathStep]) -> Result<Option<NodeId>> {
        let container = doc.create_element("div");
        doc.append_html(container, html)?;

        let Some((last, steps)) = path.split_last() else {
            return Ok(Some(container));
        };

        let mut level = container;
        for (depth, step) in steps.iter().enumerate() {
            level = doc
                .child_element(level, step)?
                .ok_or_else(|| DomError::PathLookup {
                    depth,
                    step: step.to_string(),
                })?;
        }
        doc.child_element(level, last)
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Calls `callback` when nodes are added or removed under `elm`.
    ///
    /// With mutation observers the whole subtree is watched and the callback
    /// runs at most once per delivered batch. With legacy events only
    /// changes to `elm`'s own children are seen, one call per node. If the
    /// host has neither, nothing is installed and
    /// [`Observation::Unsupported`] is returned.
    pub fn observe<F>(&self, doc: &mut Document, elm: NodeId, callback: F) -> Result<Observation>
    where
        F: FnMut() + 'static,
    {
        let observation = match self.observe {
            ObserveStrategy::MutationObserver => {
                let mut callback = callback;
                let id = doc.observe_mutations(
                    elm,
                    ObserverOptions::subtree_child_list(),
                    move |records: &[MutationRecord]| {
                        if batch_changes_nodes(records) {
                            callback();
                        }
                    },
                )?;
                Observation::Observer(id)
            }
            ObserveStrategy::Events => {
                let shared = Rc::new(RefCell::new(callback));
                let on_insert = Rc::clone(&shared);
                let inserted = doc.add_listener(elm, EventKind::NodeInserted, move |_| {
                    let mut callback = on_insert.borrow_mut();
                    (*callback)();
                })?;
                let on_remove = Rc::clone(&shared);
                let removed = match doc.add_listener(elm, EventKind::NodeRemoved, move |_| {
                    let mut callback = on_remove.borrow_mut();
                    (*callback)();
                }) {
                    Ok(id) => id,
                    Err(err) => {
                        doc.remove_listener(inserted);
                        return Err(err);
                    }
                };
                Observation::Listeners { inserted, removed }
            }
            ObserveStrategy::Unsupported => Observation::Unsupported,
        };
        debug!(?elm, ?observation, "installed change observation");
        Ok(observation)
    }

    /// Stops an observation. Returns false if nothing was installed.
    pub fn unobserve(&self, doc: &mut Document, observation: Observation) -> bool {
        let removed = match observation {
            Observation::Observer(id) => doc.disconnect_observer(id),
            Observation::Listeners { inserted, removed } => {
                // Both must go; do not short-circuit.
                let a = doc.remove_listener(inserted);
                let b = doc.remove_listener(removed);
                a || b
            }
            Observation::Unsupported => false,
        };
        debug!(?observation, removed, "tore down change observation");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ScrollMetrics;
    use crate::path::path;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn legacy() -> HostCapabilities {
        HostCapabilities {
            class_list: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_strategy_selection() {
        let modern = Dom::for_capabilities(&HostCapabilities::default());
        assert!(modern.has_class_list());
        assert_eq!(modern.observe_strategy(), ObserveStrategy::MutationObserver);

        let events_only = Dom::for_capabilities(&HostCapabilities {
            mutation_observer: false,
            ..Default::default()
        });
        assert_eq!(events_only.observe_strategy(), ObserveStrategy::Events);

        let bare = Dom::for_capabilities(&HostCapabilities::minimal());
        assert!(!bare.has_class_list());
        assert_eq!(bare.observe_strategy(), ObserveStrategy::Unsupported);
    }

    #[test]
    #[traced_test]
    fn test_detect_logs_selection() {
        let doc = Document::builder().class_list(false).build();
        let _ = Dom::detect(&doc);
        assert!(logs_contain("selected DOM helper strategies"));
        assert!(logs_contain("attribute"));
    }

    #[test]
    fn test_add_class_splits_in_both_paths() {
        for caps in [HostCapabilities::default(), legacy()] {
            let mut doc = Document::builder().capabilities(caps).build();
            let dom = Dom::detect(&doc);
            let el = doc.create_element("div");
            dom.add_class(&mut doc, el, "a  b").unwrap();
            assert!(dom.has_class(&doc, el, "a").unwrap());
            assert!(dom.has_class(&doc, el, "b").unwrap());
            assert_eq!(doc.attribute(el, "class").unwrap(), Some("a b"));
        }
    }

    #[test]
    fn test_blank_class_name_by_path() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        let modern = Dom::detect(&doc);
        assert!(matches!(
            modern.add_class(&mut doc, el, "  "),
            Err(DomError::InvalidToken(_))
        ));

        let old = Dom::for_capabilities(&legacy());
        old.add_class(&mut doc, el, "  ").unwrap();
        assert_eq!(doc.attribute(el, "class").unwrap(), None);
    }

    #[test]
    fn test_remove_class_multiple_tokens() {
        let mut doc = Document::new();
        let dom = Dom::detect(&doc);
        let el = doc.create_element("div");
        dom.add_class(&mut doc, el, "a b c").unwrap();
        dom.remove_class(&mut doc, el, "a c").unwrap();
        assert_eq!(doc.attribute(el, "class").unwrap(), Some("b"));
    }

    #[test]
    fn test_scroll_position_takes_larger_offset() {
        let doc = Document::builder()
            .scroll(ScrollMetrics {
                page_x_offset: 0.0,
                page_y_offset: 120.0,
                scroll_left: 15.0,
                scroll_top: 80.0,
                client_left: 2.0,
                client_top: 0.0,
            })
            .build();
        let dom = Dom::detect(&doc);
        assert_eq!(
            dom.scroll_position(&doc),
            ScrollPosition {
                top: 120.0,
                left: 13.0
            }
        );
    }

    #[test]
    fn test_create_without_path_returns_container() {
        let mut doc = Document::new();
        let dom = Dom::detect(&doc);
        let container = dom.create(&mut doc, "<p>a</p><p>b</p>", &[]).unwrap().unwrap();
        assert_eq!(doc.tag_name(container).unwrap(), "div");
        assert_eq!(doc.parent(container).unwrap(), None);
        assert_eq!(doc.inner_html(container).unwrap(), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_create_named_path() {
        let mut doc = Document::new();
        let dom = Dom::detect(&doc);
        let html = r#"<nav id="menu"><a name="home">h</a><a name="about">a</a></nav>"#;
        let about = dom
            .create(&mut doc, html, &path(["menu", "about"]))
            .unwrap()
            .unwrap();
        assert_eq!(doc.text_content(about).unwrap(), "a");
    }

    #[test]
    fn test_create_missing_final_step_is_none() {
        let mut doc = Document::new();
        let dom = Dom::detect(&doc);
        let found = dom.create(&mut doc, "<ul><li>x</li></ul>", &path([0usize, 3])).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_create_missing_inner_step_fails() {
        let mut doc = Document::new();
        let dom = Dom::detect(&doc);
        let err = dom
            .create(&mut doc, "<ul><li>x</li></ul>", &path(["0", "nope", "0"]))
            .unwrap_err();
        assert_eq!(
            err,
            DomError::PathLookup {
                depth: 1,
                step: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_batch_predicate_scans_every_record() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let child = doc.create_element("p");

        let attribute_only = [MutationRecord::attribute(body, "class")];
        assert!(!batch_changes_nodes(&attribute_only));

        let mixed = [
            MutationRecord::attribute(body, "class"),
            MutationRecord::child_list(body, vec![child], Vec::new()),
        ];
        assert!(batch_changes_nodes(&mixed));
        assert!(!batch_changes_nodes(&[]));
    }

    #[test]
    fn test_observe_unsupported_is_silent() {
        let mut doc = Document::builder()
            .capabilities(HostCapabilities::minimal())
            .build();
        let dom = Dom::detect(&doc);
        let body = doc.body().unwrap();
        let observation = dom.observe(&mut doc, body, || panic!("never called")).unwrap();
        assert_eq!(observation, Observation::Unsupported);
        assert!(!observation.is_active());
        doc.append_html(body, "<p>x</p>").unwrap();
        assert_eq!(doc.deliver_mutations(), 0);
        assert!(!dom.unobserve(&mut doc, observation));
    }

    #[test]
    fn test_observe_missing_node_fails() {
        let mut doc = Document::new();
        let dom = Dom::detect(&doc);
        let mut other = Document::new();
        for _ in 0..8 {
            other.create_element("pad");
        }
        let stale = other.create_element("late");
        assert!(dom.observe(&mut doc, stale, || {}).unwrap_err().is_not_found());
    }
}
