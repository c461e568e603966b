// ABOUTME: Main library entry point for the digests DOM helpers.
// ABOUTME: Re-exports the public API: Document, Dom, DomError, HostCapabilities, PathStep, Observation.

//! Digests DOM - cross-host DOM convenience helpers.
//!
//! This crate provides a small helper surface over an in-process HTML
//! document: class token editing, node removal, scroll position reading,
//! HTML-to-subtree construction, and change observation. Each helper picks
//! its implementation once from the host's capability profile, falling back
//! to older techniques when the preferred capability is missing.
//!
//! # Example
//!
//! ```
//! use digests_dom::{path, Document, Dom};
//!
//! let mut doc = Document::new();
//! let dom = Dom::detect(&doc);
//!
//! let list = dom.create(&mut doc, "<ul><li>one</li></ul>", &path([0usize])).unwrap().unwrap();
//! let body = doc.body().unwrap();
//! doc.append_child(body, list).unwrap();
//!
//! assert!(dom.toggle_class(&mut doc, list, "open").unwrap());
//! assert_eq!(dom.scroll_position(&doc).top, 0.0);
//! ```

pub mod classes;
pub mod dom;
pub mod error;
pub mod helpers;
pub mod observe;
pub mod options;
pub mod path;

pub use crate::classes::{AttributeEditor, ClassEditor, ClassList, TokenListEditor};
pub use crate::dom::{Document, Element, Node};
pub use crate::error::{DomError, Result};
pub use crate::helpers::{Dom, ObserveStrategy, ScrollPosition};
pub use crate::observe::{
    EventKind, ListenerId, MutationEvent, MutationKind, MutationRecord, Observation, ObserverId,
    ObserverOptions,
};
pub use crate::options::{DocumentBuilder, HostCapabilities, ScrollMetrics};
pub use crate::path::{path, PathStep};
pub use ego_tree::NodeId;
