// ABOUTME: Host configuration for documents: capability flags, scroll metrics, and DocumentBuilder.
// ABOUTME: DocumentBuilder provides a fluent API for constructing Document instances with custom hosts.

use serde::{Deserialize, Serialize};

use crate::dom::Document;

/// Capabilities the host environment offers to the helpers.
///
/// Every flag defaults to `true`, which models a current browser. Older hosts
/// are described by switching individual flags off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostCapabilities {
    /// Elements expose a structured class token list.
    pub class_list: bool,
    /// Batched mutation notifications can be registered.
    pub mutation_observer: bool,
    /// Per-node insertion/removal event listeners can be registered.
    pub event_listeners: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            class_list: true,
            mutation_observer: true,
            event_listeners: true,
        }
    }
}

impl HostCapabilities {
    /// A host with none of the optional capabilities.
    pub fn minimal() -> Self {
        Self {
            class_list: false,
            mutation_observer: false,
            event_listeners: false,
        }
    }

    /// Loads a capability profile from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Scroll offsets as reported by the host window and document element.
///
/// Hosts disagree on which of the two carries the real offset, so both are
/// kept and reconciled by `Dom::scroll_position`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollMetrics {
    pub page_x_offset: f64,
    pub page_y_offset: f64,
    pub scroll_left: f64,
    pub scroll_top: f64,
    pub client_left: f64,
    pub client_top: f64,
}

/// Builder for constructing Document instances with custom host settings.
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    capabilities: HostCapabilities,
    scroll: ScrollMetrics,
    html: Option<String>,
}

impl DocumentBuilder {
    /// Create a new DocumentBuilder with default host settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole capability profile.
    pub fn capabilities(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Enable or disable the structured class token list.
    pub fn class_list(mut self, enabled: bool) -> Self {
        self.capabilities.class_list = enabled;
        self
    }

    /// Enable or disable batched mutation notifications.
    pub fn mutation_observer(mut self, enabled: bool) -> Self {
        self.capabilities.mutation_observer = enabled;
        self
    }

    /// Enable or disable legacy insertion/removal events.
    pub fn event_listeners(mut self, enabled: bool) -> Self {
        self.capabilities.event_listeners = enabled;
        self
    }

    /// Set the initial scroll metrics.
    pub fn scroll(mut self, scroll: ScrollMetrics) -> Self {
        self.scroll = scroll;
        self
    }

    /// Seed the document from an HTML page instead of an empty skeleton.
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Build the Document with the configured host.
    pub fn build(self) -> Document {
        let mut doc = match self.html {
            Some(ref html) => Document::parse(html),
            None => Document::new(),
        };
        doc.set_capabilities(self.capabilities);
        doc.set_scroll_metrics(self.scroll);
        doc
    }
}
