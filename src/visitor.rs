use crate::ir::{ComposeNode, ElementNode, HatchNode, TemplateNode, TextNode};

/// Single traversal mechanism for node trees.
///
/// Rules:
/// 1. Traversal is depth-first, children in document order.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers call the matching `walk_*` function to keep descending
///    unless pruning is intended.
pub trait TemplateVisitor {
    fn visit_children(&mut self, children: &mut Vec<TemplateNode>) {
        walk_children(self, children);
    }

    fn visit_node(&mut self, node: &mut TemplateNode) {
        walk_node(self, node);
    }

    fn visit_element(&mut self, element: &mut ElementNode) {
        walk_element(self, element);
    }

    fn visit_text(&mut self, _text: &mut TextNode) {
        // Leaf
    }

    fn visit_hatch(&mut self, hatch: &mut HatchNode) {
        walk_hatch(self, hatch);
    }

    fn visit_compose(&mut self, compose: &mut ComposeNode) {
        walk_compose(self, compose);
    }
}

pub fn walk_children<V: TemplateVisitor + ?Sized>(
    visitor: &mut V,
    children: &mut Vec<TemplateNode>,
) {
    for node in children {
        visitor.visit_node(node);
    }
}

pub fn walk_node<V: TemplateVisitor + ?Sized>(visitor: &mut V, node: &mut TemplateNode) {
    match node {
        TemplateNode::Element(el) => visitor.visit_element(el),
        TemplateNode::Text(t) => visitor.visit_text(t),
        TemplateNode::Hatch(h) => visitor.visit_hatch(h),
        TemplateNode::Compose(c) => visitor.visit_compose(c),
    }
}

pub fn walk_element<V: TemplateVisitor + ?Sized>(visitor: &mut V, element: &mut ElementNode) {
    visitor.visit_children(&mut element.children);
}

pub fn walk_hatch<V: TemplateVisitor + ?Sized>(visitor: &mut V, hatch: &mut HatchNode) {
    visitor.visit_element(&mut hatch.element);
}

/// Override content is caller-owned and is not walked; only `element` is.
pub fn walk_compose<V: TemplateVisitor + ?Sized>(visitor: &mut V, compose: &mut ComposeNode) {
    if let Some(element) = compose.element.as_deref_mut() {
        visitor.visit_node(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TagCollector(Vec<String>);

    impl TemplateVisitor for TagCollector {
        fn visit_element(&mut self, element: &mut ElementNode) {
            self.0.push(element.tag.clone());
            walk_element(self, element);
        }
    }

    #[test]
    fn test_depth_first_document_order() {
        let mut nodes = vec![
            ElementNode::new("div")
                .with_child(ElementNode::new("h1").with_text("Title"))
                .with_child(ElementNode::new("p"))
                .into(),
            TemplateNode::Hatch(HatchNode {
                sock: "footer".to_string(),
                element: ElementNode::new("footer").with_child(ElementNode::new("a")),
            }),
        ];

        let mut collector = TagCollector(Vec::new());
        collector.visit_children(&mut nodes);
        assert_eq!(collector.0, vec!["div", "h1", "p", "footer", "a"]);
    }
}
