// ABOUTME: Node values stored in the document arena.
// ABOUTME: Elements keep a lower-cased tag name and attributes in source order.

/// A single node in the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    /// Returns the element data if this node is an element.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    /// Text and comments cannot hold children.
    pub fn can_have_children(&self) -> bool {
        matches!(self, Node::Document | Node::Element(_))
    }
}

/// Element data: tag name plus attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    /// Builds an element from a tag name and attribute pairs.
    pub fn with_attrs<'a, I>(name: &str, attrs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut el = Self::new(name);
        for (key, value) in attrs {
            el.set_attr(key, value);
        }
        el
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.attrs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an attribute, returning the previous value.
    pub fn set_attr(&mut self, name: &str, value: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value.to_string())),
            None => {
                self.attrs.push((name, value.to_string()));
                None
            }
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        let pos = self.attrs.iter().position(|(k, _)| *k == name)?;
        Some(self.attrs.remove(pos).1)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether a named lookup on a children collection would pick this element.
    pub fn matches_name(&self, key: &str) -> bool {
        self.attr("id") == Some(key) || self.attr("name") == Some(key)
    }
}
