use quote::quote;
use syn::fold::Fold;

use crate::error::Error;

/// Names of the marker functions the probes call. They are emitted as-is and
/// never resolved; a companion runtime is expected to provide them.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub enter_fn: String,
    pub exit_fn: String,
    /// Leave `const fn` bodies alone (a probe call is not const-callable).
    pub skip_const: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            enter_fn: "on_enter".to_string(),
            exit_fn: "on_exit".to_string(),
            skip_const: false,
        }
    }
}

/// Bookkeeping for one instrumented body: the unit a future basic-block
/// coverage counter would hang off. Not used when printing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub function: String,
    pub start_line: usize,
    pub end_line: usize,
    pub num_stmts: usize,
}

/// Result of instrumenting a syntax tree.
pub struct Instrumented {
    pub syntax: syn::File,
    pub blocks: Vec<Block>,
}

/// Rebuild `file` so that every function with a non-empty body starts with
/// an entry probe and ends with an exit probe.
///
/// Free functions are labelled by bare name (e.g. "walk"), impl methods by
/// "Type::method", trait default methods by "Trait::method".
pub fn instrument_file(file: syn::File, config: &ProbeConfig) -> Result<Instrumented, Error> {
    let mut instrumenter = Instrumenter::new(config)?;
    let syntax = instrumenter.fold_file(file);
    tracing::debug!(functions = instrumenter.blocks.len(), "instrumented");
    Ok(Instrumented {
        syntax,
        blocks: instrumenter.blocks,
    })
}

fn parse_probe_path(name: &str) -> Result<syn::Path, Error> {
    syn::parse_str(name).map_err(|source| Error::InvalidProbe {
        name: name.to_string(),
        source,
    })
}

#[derive(Clone, Copy)]
enum ProbeKind {
    Enter,
    Exit,
}

impl ProbeKind {
    fn as_str(self) -> &'static str {
        match self {
            ProbeKind::Enter => "enter",
            ProbeKind::Exit => "exit",
        }
    }
}

struct Instrumenter {
    enter_fn: syn::Path,
    exit_fn: syn::Path,
    skip_const: bool,
    current_impl: Option<String>,
    current_trait: Option<String>,
    blocks: Vec<Block>,
}

impl Instrumenter {
    fn new(config: &ProbeConfig) -> Result<Self, Error> {
        Ok(Instrumenter {
            enter_fn: parse_probe_path(&config.enter_fn)?,
            exit_fn: parse_probe_path(&config.exit_fn)?,
            skip_const: config.skip_const,
            current_impl: None,
            current_trait: None,
            blocks: Vec::new(),
        })
    }

    fn probe(&self, kind: ProbeKind, label: &str) -> syn::Stmt {
        let func = match kind {
            ProbeKind::Enter => &self.enter_fn,
            ProbeKind::Exit => &self.exit_fn,
        };
        let text = format!("{} {label}", kind.as_str());
        syn::parse_quote! {
            #func(#text);
        }
    }

    /// Bracket `block` with probes. Empty bodies come back unchanged.
    ///
    /// A trailing value expression has to stay last. For unit functions, and
    /// for a trailing `return`, it is turned into a statement so the exit
    /// probe can follow it (unreachable after a `return`); otherwise the exit
    /// probe goes just before it.
    fn instrument_block(
        &mut self,
        block: syn::Block,
        sig: &syn::Signature,
        label: &str,
    ) -> syn::Block {
        if block.stmts.is_empty() || (self.skip_const && sig.constness.is_some()) {
            return block;
        }

        let syn::Block {
            brace_token,
            mut stmts,
        } = block;
        self.blocks.push(Block {
            function: label.to_string(),
            start_line: brace_token.span.open().start().line,
            end_line: brace_token.span.close().end().line,
            num_stmts: stmts.len(),
        });

        let tail = match stmts.pop() {
            Some(syn::Stmt::Expr(expr, None))
                if returns_unit(&sig.output) || matches!(expr, syn::Expr::Return(_)) =>
            {
                stmts.push(syn::Stmt::Expr(expr, Some(Default::default())));
                None
            }
            Some(tail @ syn::Stmt::Expr(_, None)) => Some(tail),
            Some(stmt) => {
                stmts.push(stmt);
                None
            }
            None => None,
        };

        let mut body = Vec::with_capacity(stmts.len() + 3);
        body.push(self.probe(ProbeKind::Enter, label));
        body.extend(stmts);
        body.push(self.probe(ProbeKind::Exit, label));
        body.extend(tail);

        syn::Block {
            brace_token,
            stmts: body,
        }
    }

    /// Functions nested in a body are labelled by bare name, so the
    /// enclosing impl/trait context is hidden while the body is folded.
    fn enter_body(&mut self) -> (Option<String>, Option<String>) {
        (self.current_impl.take(), self.current_trait.take())
    }

    fn leave_body(&mut self, saved: (Option<String>, Option<String>)) {
        (self.current_impl, self.current_trait) = saved;
    }
}

fn returns_unit(output: &syn::ReturnType) -> bool {
    match output {
        syn::ReturnType::Default => true,
        syn::ReturnType::Type(_, ty) => matches!(&**ty, syn::Type::Tuple(t) if t.elems.is_empty()),
    }
}

impl Fold for Instrumenter {
    fn fold_item_fn(&mut self, node: syn::ItemFn) -> syn::ItemFn {
        let saved = self.enter_body();
        let mut node = syn::fold::fold_item_fn(self, node);
        self.leave_body(saved);

        let name = node.sig.ident.to_string();
        let block = self.instrument_block(*node.block, &node.sig, &name);
        node.block = Box::new(block);
        node
    }

    fn fold_item_impl(&mut self, node: syn::ItemImpl) -> syn::ItemImpl {
        let prev = self.current_impl.replace(type_ident(&node.self_ty));
        let node = syn::fold::fold_item_impl(self, node);
        self.current_impl = prev;
        node
    }

    fn fold_impl_item_fn(&mut self, node: syn::ImplItemFn) -> syn::ImplItemFn {
        let method = node.sig.ident.to_string();
        let qualified = match &self.current_impl {
            Some(ty) => format!("{ty}::{method}"),
            None => method,
        };

        let saved = self.enter_body();
        let mut node = syn::fold::fold_impl_item_fn(self, node);
        self.leave_body(saved);

        node.block = self.instrument_block(node.block, &node.sig, &qualified);
        node
    }

    fn fold_item_trait(&mut self, node: syn::ItemTrait) -> syn::ItemTrait {
        let prev = self.current_trait.replace(node.ident.to_string());
        let node = syn::fold::fold_item_trait(self, node);
        self.current_trait = prev;
        node
    }

    fn fold_trait_item_fn(&mut self, node: syn::TraitItemFn) -> syn::TraitItemFn {
        let method = node.sig.ident.to_string();
        let qualified = match &self.current_trait {
            Some(trait_name) => format!("{trait_name}::{method}"),
            None => method,
        };

        let saved = self.enter_body();
        let mut node = syn::fold::fold_trait_item_fn(self, node);
        self.leave_body(saved);

        if let Some(block) = node.default.take() {
            node.default = Some(self.instrument_block(block, &node.sig, &qualified));
        }
        node
    }
}

/// Extract the type name from a `syn::Type` for qualified method names.
fn type_ident(ty: &syn::Type) -> String {
    match ty {
        syn::Type::Path(tp) => tp
            .path
            .segments
            .last()
            .map(|seg| seg.ident.to_string())
            .unwrap_or_else(|| quote!(#ty).to_string()),
        _ => quote!(#ty).to_string(),
    }
}
