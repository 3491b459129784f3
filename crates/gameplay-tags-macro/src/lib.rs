use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{braced, token, Ident, LitStr, Result, Token, Visibility};

use proc_macro_crate::{crate_name, FoundCrate};

/// Parsed attributes for a node.
#[derive(Clone, Default)]
struct NodeAttrs {
    /// `#[description = "..."]`, or the node's doc comment
    description: Option<String>,
    /// `#[hide_in_editor]`
    hide_in_editor: bool,
}

struct Node {
    name: Ident,
    attrs: NodeAttrs,
    children: Vec<Node>,
}

struct TagsInput {
    vis: Visibility,
    root: Ident,
    nodes: Vec<Node>,
}

impl Parse for TagsInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let vis: Visibility = input.parse()?;
        input.parse::<Token![mod]>()?;
        let root: Ident = input.parse()?;
        let content;
        braced!(content in input);
        let nodes = parse_nodes(&content)?;
        Ok(Self { vis, root, nodes })
    }
}

fn parse_nodes(input: ParseStream) -> Result<Vec<Node>> {
    let mut nodes: Vec<Node> = Vec::new();
    while !input.is_empty() {
        let attrs = parse_all_attrs(input)?;
        let name: Ident = input.parse()?;
        validate_label(&name)?;

        if nodes.iter().any(|n| n.name == name) {
            return Err(syn::Error::new(
                name.span(),
                format!("tag '{name}' is declared twice at this level"),
            ));
        }

        // Children or semicolon
        let children = if input.peek(token::Brace) {
            let content;
            braced!(content in input);
            parse_nodes(&content)?
        } else {
            input.parse::<Token![;]>()?;
            Vec::new()
        };

        nodes.push(Node {
            name,
            attrs,
            children,
        });
    }
    Ok(nodes)
}

/// Parse all attributes into NodeAttrs.
///
/// Handles:
/// - `#[description = "..."]`
/// - `/// doc comment` (used as description when no explicit one is given)
/// - `#[hide_in_editor]`
fn parse_all_attrs(input: ParseStream) -> Result<NodeAttrs> {
    let mut result = NodeAttrs::default();
    let mut doc_lines: Vec<String> = Vec::new();

    while input.peek(Token![#]) {
        input.parse::<Token![#]>()?;
        let content;
        syn::bracketed!(content in input);

        let key: Ident = content.parse()?;

        if key == "description" {
            content.parse::<Token![=]>()?;
            let value: LitStr = content.parse()?;
            result.description = Some(value.value());
        } else if key == "doc" {
            content.parse::<Token![=]>()?;
            let value: LitStr = content.parse()?;
            doc_lines.push(value.value().trim().to_string());
        } else if key == "hide_in_editor" {
            result.hide_in_editor = true;
        } else {
            return Err(syn::Error::new(
                key.span(),
                format!("unknown tag attribute '{key}' (expected description, doc or hide_in_editor)"),
            ));
        }
    }

    if result.description.is_none() && !doc_lines.is_empty() {
        result.description = Some(doc_lines.join(" "));
    }

    Ok(result)
}

/// Labels follow `[A-Za-z0-9_]+`; identifiers may contain more than that.
fn validate_label(name: &Ident) -> Result<()> {
    let label = name.to_string();
    let label = label.strip_prefix("r#").unwrap_or(&label);
    match label
        .bytes()
        .position(|b| !(b.is_ascii_alphanumeric() || b == b'_'))
    {
        Some(pos) => Err(syn::Error::new(
            name.span(),
            format!("invalid tag label '{label}': unexpected character at position {pos}"),
        )),
        None => Ok(()),
    }
}

// =============================================================================
// Tree analysis (runs at macro expansion time)
// =============================================================================

/// Flattened node in declaration order (parents before children).
struct FlatNode {
    name: String,
    description: String,
    hide_in_editor: bool,
}

fn flatten_nodes(nodes: &[Node], prefix: &str, out: &mut Vec<FlatNode>) {
    for node in nodes {
        let name = join(prefix, &node.name);
        out.push(FlatNode {
            name: name.clone(),
            description: node.attrs.description.clone().unwrap_or_default(),
            hide_in_editor: node.attrs.hide_in_editor,
        });
        flatten_nodes(&node.children, &name, out);
    }
}

fn join(prefix: &str, name: &Ident) -> String {
    let label = name.to_string();
    let label = label.strip_prefix("r#").unwrap_or(&label).to_string();
    if prefix.is_empty() {
        label
    } else {
        format!("{prefix}.{label}")
    }
}

// =============================================================================
// Crate path resolution
// =============================================================================

fn tags_crate_path() -> TokenStream2 {
    match crate_name("gameplay-tags") {
        Ok(FoundCrate::Itself) => {
            quote!(::gameplay_tags)
        }
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::gameplay_tags),
    }
}

// =============================================================================
// Code generation
// =============================================================================

/// Recursively generate one module per tag.
///
/// ```ignore
/// gameplay_tags! {
///     pub mod Tags {
///         Movement { Idle; Running; }
///         Combat { Idle; }      // same label as Movement.Idle, no conflict
///     }
/// }
///
/// // Generates:
/// #[allow(non_snake_case)]
/// pub mod Tags {
///     pub const NAMES: &[&str] = &["Movement", "Movement.Idle", ...];
///     pub fn declarations() -> Vec<TagDeclaration> { ... }
///
///     pub mod Movement {
///         pub const NAME: &str = "Movement";
///         pub const DESCRIPTION: &str = "";
///         pub const LEVEL: usize = 1;
///
///         pub mod Idle { pub const NAME: &str = "Movement.Idle"; ... }
///         pub mod Running { ... }
///     }
///     pub mod Combat { ... }
/// }
///
/// // Usage:
/// registry.request_tag(Tags::Movement::Idle::NAME)
/// ```
fn generate_tags_recursive(nodes: &[Node], prefix: &str, level: usize) -> Vec<TokenStream2> {
    let mut output = Vec::new();

    for node in nodes {
        let node_ident = &node.name;
        let name = join(prefix, &node.name);
        let name_lit = LitStr::new(&name, Span::call_site());
        let description = node.attrs.description.clone().unwrap_or_default();
        let description_lit = LitStr::new(&description, Span::call_site());
        let hide_in_editor = node.attrs.hide_in_editor;
        let doc = if description.is_empty() {
            format!("Tag `{name}`.")
        } else {
            format!("Tag `{name}`: {description}")
        };

        let children_output = generate_tags_recursive(&node.children, &name, level + 1);

        output.push(quote! {
            #[doc = #doc]
            #[allow(non_snake_case)]
            pub mod #node_ident {
                /// Full dot-separated name.
                pub const NAME: &'static str = #name_lit;

                pub const DESCRIPTION: &'static str = #description_lit;

                /// Number of labels in the name (1 = top-level).
                pub const LEVEL: usize = #level;

                pub const HIDE_IN_EDITOR: bool = #hide_in_editor;

                #(#children_output)*
            }
        });
    }

    output
}

/// One `TagDeclaration` constructor per flattened node.
fn generate_declarations(flat: &[FlatNode], tags_crate: &TokenStream2) -> Vec<TokenStream2> {
    flat.iter()
        .map(|node| {
            let name = LitStr::new(&node.name, Span::call_site());
            let description = LitStr::new(&node.description, Span::call_site());
            let flags = if node.hide_in_editor {
                quote!(#tags_crate::TagFlags::HIDE_IN_EDITOR)
            } else {
                quote!(#tags_crate::TagFlags::empty())
            };
            quote! {
                #tags_crate::TagDeclaration::new(#name, #description, #flags)
            }
        })
        .collect()
}

fn expand(input: TagsInput, tags_crate: &TokenStream2) -> TokenStream2 {
    // 1. Flatten tree
    let mut flat = Vec::new();
    flatten_nodes(&input.nodes, "", &mut flat);

    let node_count = flat.len();
    let names: Vec<LitStr> = flat
        .iter()
        .map(|n| LitStr::new(&n.name, Span::call_site()))
        .collect();

    // 2. Generate tag modules
    let tags = generate_tags_recursive(&input.nodes, "", 1);

    // 3. Generate declaration list
    let declarations = generate_declarations(&flat, tags_crate);

    // 4. Assemble
    let vis = input.vis;
    let root = input.root;

    quote! {
        #[allow(non_snake_case, non_camel_case_types)]
        #vis mod #root {
            /// Total number of declared tags.
            pub const NODE_COUNT: usize = #node_count;

            /// Every declared name, parents before children.
            pub const NAMES: &'static [&'static str] = &[#(#names),*];

            /// Declarations to feed into a registry builder.
            pub fn declarations() -> ::std::vec::Vec<#tags_crate::TagDeclaration> {
                ::std::vec![#(#declarations),*]
            }

            #(#tags)*
        }
    }
}

// =============================================================================
// Entry point
// =============================================================================

/// Declare a gameplay tag hierarchy.
///
/// ```ignore
/// gameplay_tags! {
///     pub mod Tags {
///         #[description = "Negative effects"]
///         Status {
///             Debuff { Slow; #[hide_in_editor] Stun; }
///         }
///     }
/// }
///
/// let registry = TagRegistry::from_declarations(Tags::declarations())?;
/// let slow = registry.request_tag(Tags::Status::Debuff::Slow::NAME);
/// ```
#[proc_macro]
pub fn gameplay_tags(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as TagsInput);
    let tags_crate = tags_crate_path();
    expand(input, &tags_crate).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(tokens: TokenStream2) -> Result<TagsInput> {
        syn::parse2(tokens)
    }

    fn expand_str(tokens: TokenStream2) -> String {
        expand(parse(tokens).unwrap(), &quote!(::gameplay_tags)).to_string()
    }

    #[test]
    fn same_label_under_different_parents() {
        let code = expand_str(quote! {
            pub mod Tags {
                Combat { Attack; }
                Movement { Attack; }
            }
        });

        assert!(code.contains("pub mod Combat"));
        assert!(code.contains("pub mod Movement"));
        assert!(code.contains("\"Combat.Attack\""));
        assert!(code.contains("\"Movement.Attack\""));
        assert!(!code.contains("pub use"));
    }

    #[test]
    fn flattens_parents_before_children() {
        let input = parse(quote! {
            pub mod Tags {
                A { X { Y; } }
                B { X { Y; } }
            }
        })
        .unwrap();

        let mut flat = Vec::new();
        flatten_nodes(&input.nodes, "", &mut flat);
        let names: Vec<&str> = flat.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["A", "A.X", "A.X.Y", "B", "B.X", "B.X.Y"]);
    }

    #[test]
    fn attributes_become_description_and_flags() {
        let input = parse(quote! {
            pub mod Tags {
                #[description = "Negative effects"]
                Debuff {
                    /// Cannot act
                    #[hide_in_editor]
                    Stun;
                }
            }
        })
        .unwrap();

        let mut flat = Vec::new();
        flatten_nodes(&input.nodes, "", &mut flat);
        assert_eq!(flat[0].description, "Negative effects");
        assert!(!flat[0].hide_in_editor);
        assert_eq!(flat[1].description, "Cannot act");
        assert!(flat[1].hide_in_editor);

        let code = expand(input, &quote!(::gameplay_tags)).to_string();
        assert!(code.contains("HIDE_IN_EDITOR"));
        assert!(code.contains("\"Negative effects\""));
    }

    #[test]
    fn rejects_unknown_attribute() {
        let err = parse(quote! {
            pub mod Tags {
                #[colour = "red"]
                Fire;
            }
        });
        assert!(err.is_err());
    }

    #[test]
    fn rejects_non_ascii_label() {
        let err = parse(quote! {
            pub mod Tags { Café; }
        });
        assert!(err.is_err());
    }

    #[test]
    fn rejects_duplicate_sibling() {
        let err = parse(quote! {
            pub mod Tags { A; A { B; } }
        });
        assert!(err.is_err());
    }
}
