// ABOUTME: HTML parsing into the document arena.
// ABOUTME: Parses with scraper and copies element, text, and comment nodes into detached subtrees.

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::Html;

use super::node::{Element, Node};

/// Parses an HTML fragment and returns the top-level nodes as detached subtrees.
pub(crate) fn fragment_into(tree: &mut Tree<Node>, html: &str) -> Vec<NodeId> {
    let parsed = Html::parse_fragment(html);
    // Fragments parse under a synthetic <html> wrapper.
    parsed
        .root_element()
        .children()
        .filter_map(|child| import(tree, child))
        .collect()
}

/// Parses a whole page and returns its top-level nodes as detached subtrees.
pub(crate) fn document_into(tree: &mut Tree<Node>, html: &str) -> Vec<NodeId> {
    let parsed = Html::parse_document(html);
    parsed
        .tree
        .root()
        .children()
        .filter_map(|child| import(tree, child))
        .collect()
}

/// Copies one scraper node and its descendants. Doctypes and processing
/// instructions are dropped.
fn import(tree: &mut Tree<Node>, source: NodeRef<scraper::Node>) -> Option<NodeId> {
    let value = match source.value() {
        scraper::Node::Element(el) => Node::Element(Element::with_attrs(el.name(), el.attrs())),
        scraper::Node::Text(text) => Node::Text(String::from(&**text)),
        scraper::Node::Comment(comment) => Node::Comment(String::from(&**comment)),
        _ => return None,
    };

    let id = tree.orphan(value).id();
    for child in source.children() {
        if let Some(child_id) = import(tree, child) {
            if let Some(mut node) = tree.get_mut(id) {
                node.append_id(child_id);
            }
        }
    }
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tree: &Tree<Node>, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| tree.get(*id))
            .map(|n| match n.value() {
                Node::Element(el) => el.name().to_string(),
                Node::Text(t) => format!("#text:{}", t),
                Node::Comment(c) => format!("#comment:{}", c),
                Node::Document => "#document".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_fragment_keeps_top_level_order() {
        let mut tree = Tree::new(Node::Document);
        let ids = fragment_into(&mut tree, "<p>a</p>text<!--c--><span>b</span>");
        assert_eq!(
            names(&tree, &ids),
            vec!["p", "#text:text", "#comment:c", "span"]
        );
    }

    #[test]
    fn test_fragment_nodes_are_detached() {
        let mut tree = Tree::new(Node::Document);
        let ids = fragment_into(&mut tree, "<div><b>x</b></div>");
        assert_eq!(ids.len(), 1);
        let div = tree.get(ids[0]).unwrap();
        assert!(div.parent().is_none());
        assert_eq!(div.children().count(), 1);
    }

    #[test]
    fn test_attributes_are_copied() {
        let mut tree = Tree::new(Node::Document);
        let ids = fragment_into(&mut tree, r#"<a href="/x" class="btn big">go</a>"#);
        let a = tree.get(ids[0]).unwrap();
        let el = a.value().as_element().unwrap();
        assert_eq!(el.attr("href"), Some("/x"));
        assert_eq!(el.attr("class"), Some("btn big"));
    }

    #[test]
    fn test_document_drops_doctype() {
        let mut tree = Tree::new(Node::Document);
        let ids = document_into(&mut tree, "<!DOCTYPE html><html><body></body></html>");
        assert_eq!(names(&tree, &ids), vec!["html"]);
    }
}
