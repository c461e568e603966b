// ABOUTME: HTML serialization of arena subtrees.
// ABOUTME: Produces outer/inner HTML with minimal escaping and void-element handling.

use ego_tree::NodeRef;

use super::node::Node;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Serializes a node and its descendants.
pub(crate) fn outer_html(node: NodeRef<Node>) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

/// Serializes only the descendants of a node.
pub(crate) fn inner_html(node: NodeRef<Node>) -> String {
    let mut out = String::new();
    for child in node.children() {
        write_node(child, &mut out);
    }
    out
}

fn write_node(node: NodeRef<Node>, out: &mut String) {
    match node.value() {
        Node::Document => {
            for child in node.children() {
                write_node(child, out);
            }
        }
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::Element(el) => {
            out.push('<');
            out.push_str(el.name());
            for (key, value) in el.attrs() {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&el.name()) {
                return;
            }
            for child in node.children() {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(el.name());
            out.push('>');
        }
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}
