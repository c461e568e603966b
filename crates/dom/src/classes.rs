// ABOUTME: Class-attribute editing strategies: structured token list and legacy raw-attribute editing.
// ABOUTME: Also holds the process-wide cache of compiled class-token patterns used by the legacy path.

//! Class token editing.
//!
//! Two [`ClassEditor`] implementations cover the host capability matrix:
//! - [`TokenListEditor`] treats the `class` attribute as an ordered set of
//!   unique tokens. Invalid tokens and bad handles are errors.
//! - [`AttributeEditor`] edits the raw attribute string. Missing elements or
//!   a missing `class` attribute make reads return `false` and writes no-ops.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use ego_tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::Document;
use crate::error::{DomError, Result};

/// Edits the class tokens of an element.
pub trait ClassEditor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn contains(&self, doc: &Document, elm: NodeId, token: &str) -> Result<bool>;

    fn add(&self, doc: &mut Document, elm: NodeId, token: &str) -> Result<()>;

    fn remove(&self, doc: &mut Document, elm: NodeId, token: &str) -> Result<()>;

    /// Flips a token and returns whether it is present afterwards.
    fn toggle(&self, doc: &mut Document, elm: NodeId, token: &str) -> Result<bool> {
        if self.contains(doc, elm, token)? {
            self.remove(doc, elm, token)?;
            Ok(false)
        } else {
            self.add(doc, elm, token)?;
            Ok(true)
        }
    }
}

// ----------------------------------------------------------------------------
// Token list
// ----------------------------------------------------------------------------

/// Ordered, duplicate-free class tokens parsed from an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassList {
    tokens: Vec<String>,
}

impl ClassList {
    pub fn parse(value: &str) -> Self {
        let mut list = Self::default();
        for token in value.split_ascii_whitespace() {
            if !list.contains(token) {
                list.tokens.push(token.to_string());
            }
        }
        list
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Returns true if the token was added.
    pub fn add(&mut self, token: &str) -> bool {
        if self.contains(token) {
            return false;
        }
        self.tokens.push(token.to_string());
        true
    }

    /// Returns true if the token was present.
    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|t| t != token);
        self.tokens.len() != before
    }

    pub fn toggle(&mut self, token: &str) -> bool {
        if self.remove(token) {
            false
        } else {
            self.tokens.push(token.to_string());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Space-separated serialization.
    pub fn value(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Rejects tokens a structured token list would refuse.
fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() || token.chars().any(|c| c.is_ascii_whitespace()) {
        return Err(DomError::invalid_token(token));
    }
    Ok(())
}

/// Structured class token list editing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenListEditor;

impl TokenListEditor {
    fn read(doc: &Document, elm: NodeId) -> Result<(ClassList, bool)> {
        let attr = doc.attribute(elm, "class")?;
        Ok((ClassList::parse(attr.unwrap_or_default()), attr.is_some()))
    }

    /// Writes the list back unless that would create an empty attribute.
    fn write(doc: &mut Document, elm: NodeId, list: &ClassList, had_attr: bool) -> Result<()> {
        if list.is_empty() && !had_attr {
            return Ok(());
        }
        doc.set_attribute(elm, "class", &list.value())
    }
}

impl ClassEditor for TokenListEditor {
    fn name(&self) -> &'static str {
        "token-list"
    }

    fn contains(&self, doc: &Document, elm: NodeId, token: &str) -> Result<bool> {
        validate_token(token)?;
        Ok(Self::read(doc, elm)?.0.contains(token))
    }

    fn add(&self, doc: &mut Document, elm: NodeId, token: &str) -> Result<()> {
        validate_token(token)?;
        let (mut list, had_attr) = Self::read(doc, elm)?;
        list.add(token);
        Self::write(doc, elm, &list, had_attr)
    }

    fn remove(&self, doc: &mut Document, elm: NodeId, token: &str) -> Result<()> {
        validate_token(token)?;
        let (mut list, had_attr) = Self::read(doc, elm)?;
        list.remove(token);
        Self::write(doc, elm, &list, had_attr)
    }

    fn toggle(&self, doc: &mut Document, elm: NodeId, token: &str) -> Result<bool> {
        validate_token(token)?;
        let (mut list, had_attr) = Self::read(doc, elm)?;
        let present = list.toggle(token);
        Self::write(doc, elm, &list, had_attr)?;
        Ok(present)
    }
}

// ----------------------------------------------------------------------------
// Raw attribute
// ----------------------------------------------------------------------------

static TOKEN_PATTERNS: Lazy<RwLock<HashMap<String, Option<Regex>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Separators between class tokens. Matches `split_ascii_whitespace`, so
/// U+000B and non-ASCII spaces stay part of a token.
const TOKEN_SEPARATORS: &str = r"[\t\n\x0C\r ]";

/// Gets or compiles the `(^|sep)token(sep|$)` pattern for a class token.
///
/// The token is escaped, so regex metacharacters in class names match
/// literally.
pub fn token_pattern(token: &str) -> Option<Regex> {
    {
        let cache = TOKEN_PATTERNS.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(token) {
            return cached.clone();
        }
    }

    let compiled = Regex::new(&format!(
        "(^|{sep}){}({sep}|$)",
        regex::escape(token),
        sep = TOKEN_SEPARATORS
    ))
    .ok();
    let mut cache = TOKEN_PATTERNS.write().unwrap_or_else(PoisonError::into_inner);
    cache
        .entry(token.to_string())
        .or_insert(compiled)
        .clone()
}

/// Edits the raw `class` attribute string.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeEditor;

impl AttributeEditor {
    /// Empty or whitespace-containing input never names a single token.
    fn is_token(token: &str) -> bool {
        !token.is_empty() && !token.chars().any(|c| c.is_ascii_whitespace())
    }

    /// Current attribute value, or `None` when the sentinel path applies.
    fn class_value(doc: &Document, elm: NodeId) -> Option<&str> {
        doc.element(elm).ok()?.attr("class")
    }
}

impl ClassEditor for AttributeEditor {
    fn name(&self) -> &'static str {
        "attribute"
    }

    fn contains(&self, doc: &Document, elm: NodeId, token: &str) -> Result<bool> {
        if !Self::is_token(token) {
            return Ok(false);
        }
        let Some(value) = Self::class_value(doc, elm).filter(|v| !v.is_empty()) else {
            return Ok(false);
        };
        Ok(token_pattern(token).is_some_and(|re| re.is_match(value)))
    }

    fn add(&self, doc: &mut Document, elm: NodeId, token: &str) -> Result<()> {
        if !Self::is_token(token) || doc.element(elm).is_err() {
            return Ok(());
        }
        if self.contains(doc, elm, token)? {
            return Ok(());
        }
        let current = Self::class_value(doc, elm).unwrap_or_default();
        let updated = if current.is_empty() {
            token.to_string()
        } else {
            format!("{} {}", current, token)
        };
        doc.set_attribute(elm, "class", &updated)
    }

    fn remove(&self, doc: &mut Document, elm: NodeId, token: &str) -> Result<()> {
        if !self.contains(doc, elm, token)? {
            return Ok(());
        }
        let Some(current) = Self::class_value(doc, elm) else {
            return Ok(());
        };
        // Filtering tokens handles every position and repeated occurrences.
        let updated = current
            .split_ascii_whitespace()
            .filter(|t| *t != token)
            .collect::<Vec<_>>()
            .join(" ");
        doc.set_attribute(elm, "class", &updated)
    }

    fn toggle(&self, doc: &mut Document, elm: NodeId, token: &str) -> Result<bool> {
        if !Self::is_token(token) {
            return Ok(false);
        }
        if self.contains(doc, elm, token)? {
            self.remove(doc, elm, token)?;
            Ok(false)
        } else {
            self.add(doc, elm, token)?;
            Ok(true)
        }
    }
}

/// Shared editor instances selected by `Dom::detect`.
pub static TOKEN_LIST: TokenListEditor = TokenListEditor;
pub static ATTRIBUTE: AttributeEditor = AttributeEditor;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element_with_class(doc: &mut Document, class: Option<&str>) -> NodeId {
        let el = doc.create_element("div");
        if let Some(class) = class {
            doc.set_attribute(el, "class", class).unwrap();
        }
        el
    }

    fn class_of(doc: &Document, el: NodeId) -> Option<String> {
        doc.attribute(el, "class").unwrap().map(str::to_string)
    }

    #[test]
    fn test_class_list_dedupes_and_normalizes() {
        let list = ClassList::parse("  a b\ta  c ");
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(list.value(), "a b c");
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_class_list_toggle() {
        let mut list = ClassList::parse("a");
        assert!(list.toggle("b"));
        assert!(!list.toggle("a"));
        assert_eq!(list.value(), "b");
    }

    #[test]
    fn test_token_list_rejects_bad_tokens() {
        let mut doc = Document::new();
        let el = element_with_class(&mut doc, None);
        assert_eq!(
            TOKEN_LIST.add(&mut doc, el, ""),
            Err(DomError::InvalidToken(String::new()))
        );
        assert_eq!(
            TOKEN_LIST.contains(&doc, el, "a b"),
            Err(DomError::InvalidToken("a b".to_string()))
        );
    }

    #[test]
    fn test_token_list_errors_on_text_node() {
        let mut doc = Document::new();
        let text = doc.create_text("x");
        assert_eq!(
            TOKEN_LIST.contains(&doc, text, "a"),
            Err(DomError::NotAnElement(text))
        );
    }

    #[test]
    fn test_token_list_remove_without_attribute_creates_nothing() {
        let mut doc = Document::new();
        let el = element_with_class(&mut doc, None);
        TOKEN_LIST.remove(&mut doc, el, "a").unwrap();
        assert_eq!(class_of(&doc, el), None);
    }

    #[test]
    fn test_token_list_rewrites_normalized() {
        let mut doc = Document::new();
        let el = element_with_class(&mut doc, Some(" a  a b "));
        TOKEN_LIST.add(&mut doc, el, "c").unwrap();
        assert_eq!(class_of(&doc, el).as_deref(), Some("a b c"));
        assert!(!TOKEN_LIST.toggle(&mut doc, el, "a").unwrap());
        assert_eq!(class_of(&doc, el).as_deref(), Some("b c"));
    }

    #[test]
    fn test_attribute_contains_uses_word_boundaries() {
        let mut doc = Document::new();
        let el = element_with_class(&mut doc, Some("btn btn-primary"));
        assert!(ATTRIBUTE.contains(&doc, el, "btn").unwrap());
        assert!(ATTRIBUTE.contains(&doc, el, "btn-primary").unwrap());
        assert!(!ATTRIBUTE.contains(&doc, el, "primary").unwrap());
    }

    #[test]
    fn test_attribute_contains_escapes_metacharacters() {
        let mut doc = Document::new();
        let el = element_with_class(&mut doc, Some("w-1/2 axb"));
        assert!(ATTRIBUTE.contains(&doc, el, "w-1/2").unwrap());
        assert!(!ATTRIBUTE.contains(&doc, el, "a.b").unwrap());
    }

    #[test]
    fn test_attribute_sentinels() {
        let mut doc = Document::new();
        let bare = element_with_class(&mut doc, None);
        let text = doc.create_text("x");
        assert!(!ATTRIBUTE.contains(&doc, bare, "a").unwrap());
        assert!(!ATTRIBUTE.contains(&doc, text, "a").unwrap());
        ATTRIBUTE.add(&mut doc, text, "a").unwrap();
        ATTRIBUTE.remove(&mut doc, bare, "a").unwrap();
        assert_eq!(class_of(&doc, bare), None);
    }

    #[test]
    fn test_attribute_add_appends_once() {
        let mut doc = Document::new();
        let el = element_with_class(&mut doc, None);
        ATTRIBUTE.add(&mut doc, el, "a").unwrap();
        ATTRIBUTE.add(&mut doc, el, "b").unwrap();
        ATTRIBUTE.add(&mut doc, el, "a").unwrap();
        assert_eq!(class_of(&doc, el).as_deref(), Some("a b"));
    }

    #[test]
    fn test_attribute_remove_every_position() {
        let mut doc = Document::new();
        for (before, token, after) in [
            ("a b c", "a", "b c"),
            ("a b c", "b", "a c"),
            ("a b c", "c", "a b"),
            ("b b", "b", ""),
            ("a  b\tc", "b", "a c"),
        ] {
            let el = element_with_class(&mut doc, Some(before));
            ATTRIBUTE.remove(&mut doc, el, token).unwrap();
            assert_eq!(class_of(&doc, el).as_deref(), Some(after), "removing {token:?} from {before:?}");
        }
    }

    #[test]
    fn test_attribute_remove_absent_token_keeps_value() {
        let mut doc = Document::new();
        let el = element_with_class(&mut doc, Some("a  b"));
        ATTRIBUTE.remove(&mut doc, el, "z").unwrap();
        assert_eq!(class_of(&doc, el).as_deref(), Some("a  b"));
    }

    #[test]
    fn test_attribute_toggle_composes() {
        let mut doc = Document::new();
        let el = element_with_class(&mut doc, Some("a"));
        assert!(ATTRIBUTE.toggle(&mut doc, el, "b").unwrap());
        assert!(!ATTRIBUTE.toggle(&mut doc, el, "a").unwrap());
        assert_eq!(class_of(&doc, el).as_deref(), Some("b"));
    }

    #[test]
    fn test_token_pattern_is_cached() {
        let first = token_pattern("cached-token").unwrap();
        let second = token_pattern("cached-token").unwrap();
        assert_eq!(first.as_str(), second.as_str());
        assert!(first.is_match("x cached-token y"));
    }

    #[test]
    fn test_attribute_separators_match_token_splitting() {
        let mut doc = Document::new();
        for value in ["a\u{0b}b", "a\u{a0}b"] {
            let el = element_with_class(&mut doc, Some(value));
            assert!(!ATTRIBUTE.contains(&doc, el, "a").unwrap(), "{value:?}");
            assert_eq!(
                ATTRIBUTE.contains(&doc, el, "a").unwrap(),
                TOKEN_LIST.contains(&doc, el, "a").unwrap()
            );

            ATTRIBUTE.add(&mut doc, el, "a").unwrap();
            assert!(ATTRIBUTE.contains(&doc, el, "a").unwrap());
            ATTRIBUTE.remove(&mut doc, el, "a").unwrap();
            assert!(!ATTRIBUTE.contains(&doc, el, "a").unwrap());
            assert_eq!(class_of(&doc, el).as_deref(), Some(value));
        }
    }

    #[test]
    fn test_attribute_ignores_multi_token_input() {
        let mut doc = Document::new();
        let el = element_with_class(&mut doc, Some("a b"));
        assert!(!ATTRIBUTE.contains(&doc, el, "a b").unwrap());

        let state = ATTRIBUTE.toggle(&mut doc, el, "a b").unwrap();
        assert_eq!(state, ATTRIBUTE.contains(&doc, el, "a b").unwrap());
        assert!(!state);

        ATTRIBUTE.remove(&mut doc, el, "a b").unwrap();
        ATTRIBUTE.add(&mut doc, el, "c d").unwrap();
        assert_eq!(class_of(&doc, el).as_deref(), Some("a b"));
    }
}
