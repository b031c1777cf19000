/// Source line range covered by one top-level node (inner attribute or
/// item), attributes included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLines {
    pub start: usize,
    pub end: usize,
}

/// Where each inner attribute and top-level item sat before any rewriting,
/// so comments can be put back next to the same node.
#[derive(Debug, Clone)]
pub struct SourceMap {
    name: String,
    attrs: Vec<ItemLines>,
    items: Vec<ItemLines>,
}

/// The top-level node a comment group is printed above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Index into the file's inner attributes.
    Attr(usize),
    /// Index into the file's items.
    Item(usize),
    /// Past the last node.
    End,
}

impl SourceMap {
    pub fn new(name: impl Into<String>) -> Self {
        SourceMap {
            name: name.into(),
            attrs: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn push_attr(&mut self, lines: ItemLines) {
        self.attrs.push(lines);
    }

    pub(crate) fn push_item(&mut self, lines: ItemLines) {
        self.items.push(lines);
    }

    /// First node, in source order, that ends at or after `line`: the node a
    /// comment starting on `line` sits above (or inside).
    pub fn anchor(&self, line: usize) -> Anchor {
        if let Some(idx) = self.attrs.iter().position(|a| a.end >= line) {
            return Anchor::Attr(idx);
        }
        match self.items.iter().position(|item| item.end >= line) {
            Some(idx) => Anchor::Item(idx),
            None => Anchor::End,
        }
    }
}
