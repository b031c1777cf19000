use std::io::Write;

use crate::comments::{CommentGroup, DirectiveFilter, trim_comments};
use crate::error::Error;
use crate::parse::parse_source;
use crate::position::SourceMap;
use crate::print::{print_file, write_file};
use crate::rewrite::{Block, ProbeConfig, instrument_file};

/// Knobs for one run. `Default` matches the CLI defaults.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub probes: ProbeConfig,
    pub directives: DirectiveFilter,
}

/// Result of instrumenting one source buffer.
pub struct Output {
    pub source: String,
    /// One record per instrumented function body.
    pub blocks: Vec<Block>,
}

/// The rewritten tree plus what the printer needs to render it.
struct Rewritten {
    syntax: syn::File,
    comments: Vec<CommentGroup>,
    map: SourceMap,
    blocks: Vec<Block>,
}

fn rewrite(name: &str, source: &str, options: &Options) -> Result<Rewritten, Error> {
    let parsed = parse_source(name, source)?;

    let scanned = parsed.comments.len();
    let comments = trim_comments(parsed.comments, &options.directives);
    tracing::debug!(
        file = name,
        scanned,
        kept = comments.len(),
        "filtered comment groups"
    );

    let instrumented = instrument_file(parsed.syntax, &options.probes)?;
    Ok(Rewritten {
        syntax: instrumented.syntax,
        comments,
        map: parsed.map,
        blocks: instrumented.blocks,
    })
}

/// Parse, filter comments, instrument, and print one source buffer.
///
/// `name` only labels diagnostics; nothing is read from disk. Any error
/// aborts the run and no partial output is produced.
pub fn instrument_source(name: &str, source: &str, options: &Options) -> Result<Output, Error> {
    let rewritten = rewrite(name, source, options)?;
    let source = print_file(&rewritten.syntax, &rewritten.comments, &rewritten.map)?;
    Ok(Output {
        source,
        blocks: rewritten.blocks,
    })
}

/// Like [`instrument_source`], but writes the result to `out` in one write.
/// `out` is untouched when any stage fails.
pub fn instrument_to<W: Write>(
    out: &mut W,
    name: &str,
    source: &str,
    options: &Options,
) -> Result<Vec<Block>, Error> {
    let rewritten = rewrite(name, source, options)?;
    write_file(out, &rewritten.syntax, &rewritten.comments, &rewritten.map)?;
    Ok(rewritten.blocks)
}
