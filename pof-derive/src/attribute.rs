// TODO: nice error messages instead of panics, see: https://stackoverflow.com/a/54394014/2867076

use proc_macro2::TokenStream;
use syn::{AttrStyle, Attribute, Meta};
use synstructure::BindingInfo;

/// A parsed `#[pof(index = N, codec = "..", skip)]` attribute for one field.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// Explicit property index, if given.
    pub index: Option<i32>,
    /// Path to a stateless codec overriding this field's encode/decode.
    pub codec: Option<syn::Path>,
    /// Field is excluded from the wire: written as the family default,
    /// read back via `Default::default()`.
    pub skip: bool,
}

/// A parsed struct-level `#[pof(version = N)]` attribute.
#[derive(Debug, Default)]
pub struct StructAttrs {
    /// Minimum version id this attribute set requires, if given.
    pub version: Option<i32>,
}

fn pof_meta_lists(attrs: &[Attribute]) -> impl Iterator<Item = &syn::MetaList> {
    attrs.iter().filter_map(|attr| {
        if attr.style != AttrStyle::Outer {
            return None;
        }
        match &attr.meta {
            Meta::List(ml) if ml.path.is_ident("pof") => Some(ml),
            _ => None,
        }
    })
}

fn each_item(tokens: TokenStream) -> Vec<TokenStream> {
    use proc_macro2::TokenTree;
    let mut items = Vec::new();
    let mut current = Vec::new();
    for tt in tokens {
        if let TokenTree::Punct(p) = &tt {
            if p.as_char() == ',' {
                items.push(TokenStream::from_iter(current.drain(..)));
                continue;
            }
        }
        current.push(tt);
    }
    if !current.is_empty() {
        items.push(TokenStream::from_iter(current));
    }
    items
}

impl FieldAttrs {
    /// Parses the `#[pof(..)]` attributes on one struct field.
    pub fn parse(attrs: &[Attribute]) -> Self {
        let mut out = Self::default();
        for ml in pof_meta_lists(attrs) {
            for item in each_item(ml.tokens.clone()) {
                let parsed: syn::Result<syn::Meta> = syn::parse2(item.clone());
                match parsed {
                    Ok(Meta::NameValue(nv)) if nv.path.is_ident("index") => {
                        out.index = Some(eval_int(&nv.value));
                    }
                    Ok(Meta::NameValue(nv)) if nv.path.is_ident("codec") => {
                        out.codec = Some(eval_path(&nv.value));
                    }
                    Ok(Meta::Path(p)) if p.is_ident("skip") => {
                        out.skip = true;
                    }
                    _ => panic!("unknown #[pof(..)] field attribute: {item}"),
                }
            }
        }
        out
    }

    /// Parses the `#[pof(..)]` attributes on one enum/struct binding.
    pub fn parse_binding(binding: &BindingInfo<'_>) -> Self {
        Self::parse(&binding.ast().attrs)
    }
}

impl StructAttrs {
    /// Parses the struct/enum-level `#[pof(..)]` attributes.
    pub fn parse(attrs: &[Attribute]) -> Self {
        let mut out = Self::default();
        for ml in pof_meta_lists(attrs) {
            for item in each_item(ml.tokens.clone()) {
                let parsed: syn::Result<syn::Meta> = syn::parse2(item.clone());
                match parsed {
                    Ok(Meta::NameValue(nv)) if nv.path.is_ident("version") => {
                        out.version = Some(eval_int(&nv.value));
                    }
                    _ => panic!("unknown #[pof(..)] container attribute: {item}"),
                }
            }
        }
        out
    }
}

fn eval_int(expr: &syn::Expr) -> i32 {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Int(i),
            ..
        }) => i.base10_parse().expect("integer literal"),
        syn::Expr::Unary(syn::ExprUnary {
            op: syn::UnOp::Neg(_),
            expr,
            ..
        }) => -eval_int(expr),
        _ => panic!("expected an integer literal in #[pof(..)]"),
    }
}

fn eval_path(expr: &syn::Expr) -> syn::Path {
    match expr {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(s),
            ..
        }) => s.parse().expect("valid path in #[pof(codec = \"..\")]"),
        syn::Expr::Path(p) => p.path.clone(),
        _ => panic!("expected a string or path in #[pof(codec = ..)]"),
    }
}

/// Mangles a Rust field identifier into the wire-visible attribute name used
/// to build a stable `(version_id, index, name)` ordering for auto-indexing
/// and diagnostics. Rust field names are already valid POF attribute names;
/// mangling here only strips a leading `r#` from raw identifiers.
pub fn mangle_name(ident: &syn::Ident) -> String {
    let raw = ident.to_string();
    raw.strip_prefix("r#").map(str::to_owned).unwrap_or(raw)
}

/// Parses `#[pof(skip)]` for a binding, used by the codegen modules to
/// decide whether a field participates in the wire at all.
pub fn should_skip_field_binding(binding: &BindingInfo<'_>) -> bool {
    FieldAttrs::parse_binding(binding).skip
}
