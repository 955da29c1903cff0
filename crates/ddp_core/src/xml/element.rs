//! Minimal element tree with a deterministic pretty printer.

use std::fmt::Write;

const INDENT: &str = "  ";

/// An XML element with attributes, text and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Leaf element holding `text`.
    pub fn leaf(name: impl Into<String>, text: impl ToString) -> Self {
        Self::new(name).text(text)
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    pub fn text(mut self, text: impl ToString) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render as a document with an XML declaration.
    pub fn to_document(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" ?>\n");
        self.write_to(&mut out, 0);
        out
    }

    fn write_to(&self, out: &mut String, depth: usize) {
        let pad = INDENT.repeat(depth);
        let _ = write!(out, "{}<{}", pad, self.name);
        for (key, value) in &self.attrs {
            let _ = write!(out, " {}=\"{}\"", key, escape_xml(value));
        }

        match (&self.text, self.children.is_empty()) {
            (None, true) => out.push_str("/>\n"),
            (Some(text), true) => {
                let _ = writeln!(out, ">{}</{}>", escape_xml(text), self.name);
            }
            (text, false) => {
                out.push_str(">\n");
                if let Some(text) = text {
                    let _ = writeln!(out, "{}{}{}", pad, INDENT, escape_xml(text));
                }
                for child in &self.children {
                    child.write_to(out, depth + 1);
                }
                let _ = writeln!(out, "{}</{}>", pad, self.name);
            }
        }
    }
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
