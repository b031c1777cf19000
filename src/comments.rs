use tree_sitter::{Node, Parser, TreeCursor};

use crate::error::Error;

/// Prefix of the column-1 header directives understood by rustc's test
/// harness (`//@ edition: 2021`, `//@ compile-flags: ...`).
pub const DEFAULT_DIRECTIVE_PREFIX: &str = "//@";

/// A single ordinary (non-doc) comment as it appeared in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Literal text including the `//` or `/* */` markers.
    pub text: String,
    /// Byte offset of the first `/`.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    /// Line of the last character; differs from `line` only for block comments.
    pub end_line: usize,
}

/// Adjacent comments with nothing but whitespace, and no blank line,
/// between them. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentGroup {
    pub comments: Vec<Comment>,
}

impl CommentGroup {
    pub fn start_line(&self) -> usize {
        self.comments.first().map_or(0, |c| c.line)
    }
}

/// Decides which comments are directives and may survive a rewrite.
#[derive(Debug, Clone)]
pub struct DirectiveFilter {
    prefixes: Vec<String>,
}

impl Default for DirectiveFilter {
    fn default() -> Self {
        DirectiveFilter::new([DEFAULT_DIRECTIVE_PREFIX])
    }
}

impl DirectiveFilter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DirectiveFilter {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// A directive starts at column 1 and begins with a known prefix.
    pub fn is_directive(&self, comment: &Comment) -> bool {
        comment.column == 1
            && self
                .prefixes
                .iter()
                .any(|prefix| comment.text.starts_with(prefix.as_str()))
    }
}

/// Drop every comment that is not a directive.
///
/// Probe insertion moves code around, so an ordinary comment can end up
/// somewhere it no longer makes sense (or no longer parses). Column-1
/// directives are line-oriented and can be re-emitted above the item they
/// belonged to. Groups left with no comments are removed entirely.
pub fn trim_comments(groups: Vec<CommentGroup>, filter: &DirectiveFilter) -> Vec<CommentGroup> {
    groups
        .into_iter()
        .filter_map(|group| {
            let comments: Vec<Comment> = group
                .comments
                .into_iter()
                .filter(|c| filter.is_directive(c))
                .collect();
            (!comments.is_empty()).then_some(CommentGroup { comments })
        })
        .collect()
}

/// Collect the ordinary comments of `source`, grouped.
///
/// syn drops ordinary comments, so they are read from a tree-sitter parse of
/// the same text. Doc comments are skipped: syn keeps them as `#[doc]`
/// attributes and the printer emits them with their item.
pub fn scan_comments(name: &str, source: &str) -> Result<Vec<CommentGroup>, Error> {
    let scan_error = |reason: String| Error::CommentScan {
        file: name.to_string(),
        reason,
    };

    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_rust::LANGUAGE.into())
        .map_err(|e| scan_error(e.to_string()))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| scan_error("tree-sitter returned no tree".to_string()))?;

    let mut nodes = Vec::new();
    collect_comment_nodes(&mut tree.walk(), &mut nodes);

    let mut groups: Vec<CommentGroup> = Vec::new();
    for node in nodes {
        let text = source[node.start_byte()..node.end_byte()].trim_end_matches(['\n', '\r']);
        if is_doc_line(text) || is_doc_block(text) {
            continue;
        }
        let start = node.start_position();
        let end = node.end_position();
        // A line comment may own its newline, ending at column 0 of the next row.
        let end_line = if end.column == 0 && end.row > start.row {
            end.row
        } else {
            end.row + 1
        };
        push_comment(
            &mut groups,
            source,
            Comment {
                text: text.to_string(),
                offset: node.start_byte(),
                line: start.row + 1,
                column: start.column + 1,
                end_line,
            },
        );
    }

    Ok(groups)
}

/// Comments are extras and can hang off any node; walk the whole tree in
/// document order.
fn collect_comment_nodes<'t>(cursor: &mut TreeCursor<'t>, out: &mut Vec<Node<'t>>) {
    loop {
        let node = cursor.node();
        if matches!(node.kind(), "line_comment" | "block_comment") {
            out.push(node);
        } else if cursor.goto_first_child() {
            collect_comment_nodes(cursor, out);
            cursor.goto_parent();
        }
        if !cursor.goto_next_sibling() {
            break;
        }
    }
}

fn push_comment(groups: &mut Vec<CommentGroup>, source: &str, comment: Comment) {
    if let Some(group) = groups.last_mut()
        && let Some(prev) = group.comments.last()
        && comment.line <= prev.end_line + 1
        && source[prev.offset + prev.text.len()..comment.offset]
            .trim()
            .is_empty()
    {
        group.comments.push(comment);
        return;
    }
    groups.push(CommentGroup {
        comments: vec![comment],
    });
}

fn is_doc_line(text: &str) -> bool {
    (text.starts_with("///") && !text.starts_with("////")) || text.starts_with("//!")
}

fn is_doc_block(text: &str) -> bool {
    (text.starts_with("/**") && !text.starts_with("/***") && text != "/**/")
        || text.starts_with("/*!")
}
