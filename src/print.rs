use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use crate::comments::CommentGroup;
use crate::error::Error;
use crate::position::{Anchor, SourceMap};

/// Render `syntax` as formatted source, re-attaching the retained comment
/// groups above the inner attribute or top-level item each originally
/// preceded.
///
/// Probe statements have no source position; prettyplease lays them out
/// from the tree alone, so they pick up the indentation of their siblings.
pub fn print_file(
    syntax: &syn::File,
    comments: &[CommentGroup],
    map: &SourceMap,
) -> Result<String, Error> {
    let mut before_attr: Vec<Vec<&CommentGroup>> = vec![Vec::new(); syntax.attrs.len()];
    let mut before_item: Vec<Vec<&CommentGroup>> = vec![Vec::new(); syntax.items.len()];
    let mut trailing: Vec<&CommentGroup> = Vec::new();
    for group in comments {
        let slot = match map.anchor(group.start_line()) {
            Anchor::Attr(idx) => before_attr.get_mut(idx),
            Anchor::Item(idx) => before_item.get_mut(idx),
            Anchor::End => None,
        };
        match slot {
            Some(slot) => slot.push(group),
            None => trailing.push(group),
        }
    }

    let mut out = String::new();
    if let Some(shebang) = &syntax.shebang {
        out.push_str(shebang);
        out.push('\n');
    }

    for (idx, attr) in syntax.attrs.iter().enumerate() {
        for group in &before_attr[idx] {
            push_group(&mut out, group);
        }
        let single = syn::File {
            shebang: None,
            attrs: vec![attr.clone()],
            items: Vec::new(),
        };
        out.push_str(&unparse(&single, map)?);
    }

    for (idx, item) in syntax.items.iter().enumerate() {
        if !out.is_empty() {
            out.push('\n');
        }
        for group in &before_item[idx] {
            push_group(&mut out, group);
        }
        let single = syn::File {
            shebang: None,
            attrs: Vec::new(),
            items: vec![item.clone()],
        };
        out.push_str(&unparse(&single, map)?);
    }

    if !trailing.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        for group in trailing {
            push_group(&mut out, group);
        }
    }

    if let Err(err) = syn::parse_file(&out) {
        return Err(Error::Print {
            file: map.name().to_string(),
            reason: format!("output does not reparse: {err}"),
        });
    }

    Ok(out)
}

/// Render and write the whole file to `out` in a single write. Nothing is
/// written when rendering fails.
pub fn write_file<W: Write>(
    out: &mut W,
    syntax: &syn::File,
    comments: &[CommentGroup],
    map: &SourceMap,
) -> Result<(), Error> {
    let text = print_file(syntax, comments, map)?;
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn push_group(out: &mut String, group: &CommentGroup) {
    for comment in &group.comments {
        out.push_str(&comment.text);
        out.push('\n');
    }
}

/// prettyplease panics on nodes it has no rendering for (e.g. a verbatim
/// item whose tokens are not an item); surface that as a print error.
///
/// The panic hook is silenced for the call so the formatter's panic message
/// does not reach stderr ahead of the diagnostic.
fn unparse(file: &syn::File, map: &SourceMap) -> Result<String, Error> {
    // The hook is process-global; concurrent swaps would leave it silenced.
    static HOOK_SWAP: Mutex<()> = Mutex::new(());
    let _guard = HOOK_SWAP.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let rendered = panic::catch_unwind(AssertUnwindSafe(|| prettyplease::unparse(file)));
    panic::set_hook(hook);

    rendered.map_err(|payload| {
        let reason = payload
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| "formatter panicked".to_string());
        Error::Print {
            file: map.name().to_string(),
            reason,
        }
    })
}

#[cfg(test)]
mod tests {
    use quote::quote;

    use super::*;
    use crate::comments::{DirectiveFilter, trim_comments};
    use crate::parse::parse_source;

    fn round_trip(source: &str, filter: &DirectiveFilter) -> String {
        let parsed = parse_source("test.rs", source).unwrap();
        let comments = trim_comments(parsed.comments, filter);
        print_file(&parsed.syntax, &comments, &parsed.map).unwrap()
    }

    #[test]
    fn ordinary_comments_are_dropped() {
        let source = "// explains F\nfn F() {}\n";
        let result = round_trip(source, &DirectiveFilter::default());
        assert!(!result.contains("explains"), "Got:\n{result}");
        assert!(result.contains("fn F() {}"), "Got:\n{result}");
    }

    #[test]
    fn directive_stays_above_its_item() {
        let source = r#"fn first() {}

//pragma:keep
fn second() {
    work();
}
"#;
        let result = round_trip(source, &DirectiveFilter::new(["//pragma:"]));
        let first = result.find("fn first").unwrap();
        let directive = result.find("//pragma:keep\n").expect("directive kept verbatim");
        let second = result.find("fn second").unwrap();
        assert!(first < directive && directive < second, "Got:\n{result}");
        assert!(
            result.lines().any(|l| l == "//pragma:keep"),
            "directive printed at column 1. Got:\n{result}"
        );
    }

    #[test]
    fn doc_comments_survive_with_their_item() {
        let source = "/// Adds things.\nfn add() {}\n";
        let result = round_trip(source, &DirectiveFilter::default());
        assert!(result.contains("/// Adds things."), "Got:\n{result}");
    }

    #[test]
    fn trailing_directives_are_kept_at_the_end() {
        let source = "fn f() {}\n\n//@ end-of-file\n";
        let result = round_trip(source, &DirectiveFilter::default());
        assert!(result.trim_end().ends_with("//@ end-of-file"), "Got:\n{result}");
    }

    #[test]
    fn inner_attributes_are_printed_first() {
        let source = "#![allow(dead_code)]\n//@ check-pass\nfn f() {}\n";
        let result = round_trip(source, &DirectiveFilter::default());
        let attr = result.find("#![allow(dead_code)]").unwrap();
        let directive = result.find("//@ check-pass").unwrap();
        let item = result.find("fn f()").unwrap();
        assert!(attr < directive && directive < item, "Got:\n{result}");
    }

    #[test]
    fn directive_above_inner_attributes_stays_first() {
        let source = r#"//@ edition: 2021
#![allow(dead_code)]
//@ check-pass
#![feature(never_type)]
fn f() {
    a();
}
"#;
        let result = round_trip(source, &DirectiveFilter::default());
        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(
            &lines[..4],
            &[
                "//@ edition: 2021",
                "#![allow(dead_code)]",
                "//@ check-pass",
                "#![feature(never_type)]",
            ],
            "Got:\n{result}"
        );
    }

    #[test]
    fn items_are_separated_by_blank_lines() {
        let result = round_trip("fn a() {}\nfn b() {}\n", &DirectiveFilter::default());
        assert!(result.contains("fn a() {}\n\nfn b() {}"), "Got:\n{result}");
    }

    #[test]
    fn unrenderable_node_is_a_print_error() {
        let syntax = syn::File {
            shebang: None,
            attrs: Vec::new(),
            items: vec![syn::Item::Verbatim(quote!(= = =))],
        };
        let map = SourceMap::new("bad.rs");
        let err = print_file(&syntax, &[], &map).err().expect("should fail");
        assert!(matches!(err, Error::Print { .. }), "got {err:?}");
        assert!(err.to_string().contains("bad.rs"), "got: {err}");
    }

    #[test]
    fn write_file_emits_everything() {
        let parsed = parse_source("test.rs", "fn f() { a(); }\n").unwrap();
        let mut sink = Vec::new();
        write_file(&mut sink, &parsed.syntax, &[], &parsed.map).unwrap();
        let text = String::from_utf8(sink).unwrap();
        assert!(text.contains("fn f()"), "Got:\n{text}");
    }
}
