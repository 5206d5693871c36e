use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

use crate::attribute::{mangle_name, FieldAttrs, StructAttrs};
use crate::plan::plan_fields;

fn encode_variant(variant: &synstructure::VariantInfo, start: i32) -> TokenStream2 {
    let plan = plan_fields(variant, start);
    let stmts = variant
        .bindings()
        .iter()
        .zip(plan.iter())
        .map(|(binding, p)| {
            let Some(index) = p.index else {
                return quote! {};
            };
            if let Some(codec) = &p.attrs.codec {
                quote! {
                    ::pof::reflect::FieldCodec::encode(&#codec, #binding, writer, #index)?;
                }
            } else {
                quote! {
                    writer.write_property(#index, #binding)?;
                }
            }
        });
    quote! { #(#stmts)* }
}

fn metadata_for(variant: &synstructure::VariantInfo, start: i32) -> Vec<TokenStream2> {
    let plan = plan_fields(variant, start);
    variant
        .bindings()
        .iter()
        .zip(plan.iter())
        .filter_map(|(binding, p)| {
            let index = p.index?;
            let name = match &binding.ast().ident {
                Some(ident) => mangle_name(ident),
                None => index.to_string(),
            };
            let explicit = p.attrs.index.is_some();
            Some(quote! {
                ::pof::reflect::AttributeMeta {
                    name: #name,
                    index: #index,
                    explicit_index: #explicit,
                }
            })
        })
        .collect()
}

/// Derives `pof::reflect::PofEncodeFields` (property-indexed write)
/// and `pof::reflect::Reflected` (metadata) for the given `struct` or
/// `enum`.
pub fn serialize_derive(mut s: synstructure::Structure) -> TokenStream2 {
    s.bind_with(|_| synstructure::BindStyle::Ref)
        .add_bounds(synstructure::AddBounds::None)
        .underscore_const(true);

    for variant in s.variants() {
        for binding in variant.bindings() {
            let attrs = FieldAttrs::parse_binding(binding);
            let ty = &binding.ast().ty;
            if attrs.skip {
                continue;
            }
            if attrs.codec.is_none() {
                s.add_where_predicate(syn::parse_quote! { #ty: ::pof::reflect::PofEncode });
            }
        }
    }

    let version_id = StructAttrs::parse(&s.ast().attrs).version.unwrap_or(0);
    let is_enum = matches!(s.ast().data, syn::Data::Enum(_));
    let metadata_start = if is_enum { 1 } else { 0 };
    let metadata: Vec<_> = s
        .variants()
        .iter()
        .flat_map(|v| metadata_for(v, metadata_start))
        .collect();

    let encode_impl = match s.ast().data {
        syn::Data::Struct(_) => {
            assert_eq!(s.variants().len(), 1, "structs must have one variant");
            let variant = &s.variants()[0];
            let pat = variant.pat();
            let body = encode_variant(variant, 0);
            s.gen_impl(quote! {
                gen impl ::pof::reflect::PofEncodeFields for @Self {
                    fn pof_encode_fields(&self, writer: &mut ::pof::user_type::UserTypeWriter<'_, '_>) -> ::pof::error::Result<()> {
                        match self {
                            #pat => { #body }
                        }
                        ::core::result::Result::Ok(())
                    }

                    fn version_id() -> i32 {
                        #version_id
                    }
                }
            })
        }
        syn::Data::Enum(_) => {
            assert!(!s.variants().is_empty(), "got invalid empty enum");
            let arms = s.variants().iter().enumerate().map(|(i, variant)| {
                let pat = variant.pat();
                let tag = i as i32;
                let body = encode_variant(variant, 1);
                quote! {
                    #pat => {
                        writer.write_property(0, &#tag)?;
                        #body
                    }
                }
            });
            s.gen_impl(quote! {
                gen impl ::pof::reflect::PofEncodeFields for @Self {
                    fn pof_encode_fields(&self, writer: &mut ::pof::user_type::UserTypeWriter<'_, '_>) -> ::pof::error::Result<()> {
                        match self {
                            #(#arms)*
                        }
                        ::core::result::Result::Ok(())
                    }

                    fn version_id() -> i32 {
                        #version_id
                    }
                }
            })
        }
        syn::Data::Union(_) => panic!("cannot derive PofSerialize for a union"),
    };

    let reflected_impl = s.gen_impl(quote! {
        gen impl ::pof::reflect::Reflected for @Self {
            fn metadata() -> &'static [::pof::reflect::AttributeMeta] {
                &[#(#metadata),*]
            }
        }
    });

    quote! {
        #encode_impl
        #reflected_impl
    }
}
