use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};

use crate::plan::plan_fields;

fn decode_variant(variant: &synstructure::VariantInfo, start: i32) -> (TokenStream2, TokenStream2) {
    let plan = plan_fields(variant, start);
    let locals: Vec<syn::Ident> = (0..variant.bindings().len())
        .map(|i| format_ident!("__pof_field_{}", i))
        .collect();

    let mut reads: Vec<(i32, TokenStream2)> = Vec::new();
    let mut defaults = Vec::new();
    for (i, (binding, p)) in variant.bindings().iter().zip(plan.iter()).enumerate() {
        let local = &locals[i];
        let ty = &binding.ast().ty;
        match p.index {
            None => {
                defaults.push(quote! {
                    let #local: #ty = ::core::default::Default::default();
                });
            }
            Some(index) => {
                let read = if let Some(codec) = &p.attrs.codec {
                    quote! {
                        let #local: #ty = ::pof::reflect::FieldCodec::decode(&#codec, reader, #index)?;
                    }
                } else {
                    quote! {
                        let #local: #ty = reader.read_property(#index)?;
                    }
                };
                reads.push((index, read));
            }
        }
    }
    reads.sort_by_key(|(index, _)| *index);

    let read_stmts = reads.iter().map(|(_, stmt)| stmt);
    let setup = quote! {
        #(#defaults)*
        #(#read_stmts)*
    };

    let construct = variant.construct(|_, i| {
        let local = &locals[i];
        quote! { #local }
    });

    (setup, construct)
}

/// Derives `pof::reflect::PofDecodeFields` for the given `struct` or
/// `enum`.
pub fn deserialize_derive(mut s: synstructure::Structure) -> TokenStream2 {
    s.add_bounds(synstructure::AddBounds::None)
        .underscore_const(true);

    for variant in s.variants() {
        for binding in variant.bindings() {
            let ty = &binding.ast().ty;
            let field_attrs = crate::attribute::FieldAttrs::parse(&binding.ast().attrs);
            if field_attrs.skip {
                s.add_where_predicate(syn::parse_quote! { #ty: ::core::default::Default });
            } else if field_attrs.codec.is_none() {
                s.add_where_predicate(syn::parse_quote! { #ty: ::pof::reflect::PofDecode });
            }
        }
    }

    let body = match s.ast().data {
        syn::Data::Struct(_) => {
            assert_eq!(s.variants().len(), 1, "structs must have one variant");
            let (setup, construct) = decode_variant(&s.variants()[0], 0);
            quote! {
                #setup
                ::core::result::Result::Ok(#construct)
            }
        }
        syn::Data::Enum(_) => {
            assert!(!s.variants().is_empty(), "got invalid empty enum");
            let arms = s.variants().iter().enumerate().map(|(i, variant)| {
                let tag = i as i32;
                let (setup, construct) = decode_variant(variant, 1);
                quote! {
                    #tag => {
                        #setup
                        #construct
                    }
                }
            });
            quote! {
                let __pof_tag: i32 = reader.read_property(0)?;
                ::core::result::Result::Ok(match __pof_tag {
                    #(#arms)*
                    _ => return ::core::result::Result::Err(::pof::error::Error::malformed("unknown enum discriminant")),
                })
            }
        }
        syn::Data::Union(_) => panic!("cannot derive PofDeserialize for a union"),
    };

    s.gen_impl(quote! {
        gen impl ::pof::reflect::PofDecodeFields for @Self {
            fn pof_decode_fields(reader: &mut ::pof::user_type::UserTypeReader<'_, '_>) -> ::pof::error::Result<Self> {
                #body
            }
        }
    })
}
