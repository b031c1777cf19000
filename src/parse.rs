use syn::spanned::Spanned;

use crate::comments::{CommentGroup, scan_comments};
use crate::error::Error;
use crate::position::{ItemLines, SourceMap};

/// Everything the later stages need from one source file.
pub struct ParsedFile {
    pub syntax: syn::File,
    pub comments: Vec<CommentGroup>,
    pub map: SourceMap,
}

/// Parse `source` (named `name` in diagnostics) into a syntax tree, its
/// ordinary comments, and a source map.
pub fn parse_source(name: &str, source: &str) -> Result<ParsedFile, Error> {
    let syntax = syn::parse_file(source).map_err(|err| {
        let start = err.span().start();
        Error::Parse {
            file: name.to_string(),
            line: start.line,
            column: start.column + 1,
            message: err.to_string(),
        }
    })?;

    let mut map = SourceMap::new(name);
    for attr in &syntax.attrs {
        let span = attr.span();
        map.push_attr(ItemLines {
            start: span.start().line,
            end: span.end().line,
        });
    }
    for item in &syntax.items {
        let span = item.span();
        map.push_item(ItemLines {
            start: span.start().line,
            end: span.end().line,
        });
    }

    let comments = scan_comments(name, source)?;
    tracing::debug!(
        file = name,
        items = syntax.items.len(),
        comment_groups = comments.len(),
        "parsed source"
    );

    Ok(ParsedFile {
        syntax,
        comments,
        map,
    })
}
