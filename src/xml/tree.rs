//! Owned element tree.
//!
//! Each [`Element`] owns its children outright; there are no parent links and
//! no shared nodes, so a parsed file is a plain value that can be mutated in
//! place and dropped when the next file replaces it.

/// A single XML element: name, attributes in source order, ordered child
/// elements and optional text content.
///
/// Text that follows the element's end tag, before the next sibling or the
/// parent's end tag, is kept as `tail` so it stays in position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: Option<String>,
    pub tail: Option<String>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style attribute setter, mostly useful for tests and fixtures.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing the value in place if it already exists.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Direct children with the given element name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> + 'a {
        self.children.iter_mut().filter(move |child| child.name == name)
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Number of elements in this subtree, including `self`.
    pub fn element_count(&self) -> usize {
        1 + self.children.iter().map(Element::element_count).sum::<usize>()
    }
}

/// `<?xml ...?>` declaration as read from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for Declaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: None,
            standalone: None,
        }
    }
}

/// A parsed markup file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub declaration: Option<Declaration>,
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            declaration: None,
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_attribute_replaces_in_place() {
        let mut element = Element::new("image")
            .with_attribute("name", "scanlines")
            .with_attribute("extra", "true");
        element.set_attribute("name", "borders");

        assert_eq!(element.attribute("name"), Some("borders"));
        assert_eq!(element.attributes[0].0, "name");
        assert_eq!(element.attributes.len(), 2);
    }

    #[test]
    fn children_named_filters_direct_children_only() {
        let view = Element::new("view")
            .with_child(Element::new("image"))
            .with_child(Element::new("text").with_child(Element::new("image")))
            .with_child(Element::new("image"));

        assert_eq!(view.children_named("image").count(), 2);
        assert_eq!(view.element_count(), 5);
    }
}
