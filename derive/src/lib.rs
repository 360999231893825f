// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Derive macros for `eqv-verifier`.
//!
//! `#[derive(Verifiable)]` exposes a struct's state to the verification engine as an ordered
//! list of field descriptors (name, declaring level, getter, setter) plus a direct field
//! installation routine, so the engine never needs language-level reflection.
//!
//! `#[derive(Example)]` lets a record be used as the type of a field in another verified type:
//! its example values are assembled from the examples of its own fields.
//!
//! # Attributes
//!
//! Container attributes:
//!
//! * `#[verify(extensible)]` marks the type as open to subtypes (enables the subclass checks).
//! * `#[verify(constructor = "Self::new")]` names a constructor taking every field, in
//!   declaration order, and returning `Self`.
//! * `#[verify(try_constructor = "Self::try_new")]` is the same for constructors returning
//!   `Result<Self, E>` with `E: Display`.
//!
//! Field attributes:
//!
//! * `#[verify(flatten)]` inlines the fields of a nested `Verifiable` type, attributed to that
//!   type's level.
//! * `#[verify(prefab)]` resolves example values for the field only through registered prefab
//!   values (for field types without an `Example` implementation).

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used
)]

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, ExprPath, Fields, GenericArgument, Ident, Index, LitStr, Member,
    PathArguments, Type, parse_macro_input,
};

/// Derive `Verifiable` for a struct with named or unnamed fields.
#[proc_macro_derive(Verifiable, attributes(verify))]
pub fn derive_verifiable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_verifiable(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derive `Example` for a struct which also implements `Verifiable` and `Clone`.
#[proc_macro_derive(Example, attributes(verify))]
pub fn derive_example(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_example(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Path to the verifier crate as seen by the crate being compiled.
fn krate() -> TokenStream2 {
    match crate_name("eqv-verifier") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        // `Itself` covers the verifier's unit tests (via `extern crate self as eqv_verifier`)
        // and its integration tests, which link the library under its default name.
        Ok(FoundCrate::Itself) | Err(_) => quote!(::eqv_verifier),
    }
}

enum Constructor {
    Infallible(ExprPath),
    Fallible(ExprPath),
}

#[derive(Default)]
struct ContainerOptions {
    extensible: bool,
    constructor: Option<Constructor>,
}

#[derive(Default)]
struct FieldOptions {
    flatten: bool,
    prefab: bool,
}

fn container_options(input: &DeriveInput) -> syn::Result<ContainerOptions> {
    let mut options = ContainerOptions::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("verify")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("extensible") {
                options.extensible = true;
                Ok(())
            } else if meta.path.is_ident("constructor") {
                let path: LitStr = meta.value()?.parse()?;
                options.constructor = Some(Constructor::Infallible(path.parse()?));
                Ok(())
            } else if meta.path.is_ident("try_constructor") {
                let path: LitStr = meta.value()?.parse()?;
                options.constructor = Some(Constructor::Fallible(path.parse()?));
                Ok(())
            } else {
                Err(meta.error("unsupported container attribute for `verify`"))
            }
        })?;
    }
    Ok(options)
}

fn field_options(field: &syn::Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("verify")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("flatten") {
                options.flatten = true;
                Ok(())
            } else if meta.path.is_ident("prefab") {
                options.prefab = true;
                Ok(())
            } else {
                Err(meta.error("unsupported field attribute for `verify`"))
            }
        })?;
    }
    if options.flatten && options.prefab {
        return Err(syn::Error::new_spanned(
            field,
            "`flatten` and `prefab` cannot be combined",
        ));
    }
    Ok(options)
}

/// The `T` of an `Option<T>` field, if the field is syntactically an option.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let last = path.path.segments.last()?;
    if last.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    match (args.args.len(), args.args.first()) {
        (1, Some(GenericArgument::Type(inner))) => Some(inner),
        _ => None,
    }
}

struct ParsedField<'a> {
    member: Member,
    label: String,
    ty: &'a Type,
    options: FieldOptions,
}

fn parse_fields(input: &DeriveInput) -> syn::Result<Vec<ParsedField<'_>>> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "generic types are not supported by derive(Verifiable); implement the trait by hand",
        ));
    }
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "derive(Verifiable) supports structs only",
        ));
    };
    let fields = match &data.fields {
        Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
        Fields::Unnamed(unnamed) => unnamed.unnamed.iter().collect::<Vec<_>>(),
        Fields::Unit => Vec::new(),
    };
    fields
        .into_iter()
        .enumerate()
        .map(|(idx, field)| {
            let (member, label) = match &field.ident {
                Some(ident) => (Member::Named(ident.clone()), ident.to_string()),
                None => (Member::Unnamed(Index::from(idx)), idx.to_string()),
            };
            Ok(ParsedField {
                member,
                label,
                ty: &field.ty,
                options: field_options(field)?,
            })
        })
        .collect()
}

fn expand_verifiable(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let krate = krate();
    let name = &input.ident;
    let level = name.to_string();
    let options = container_options(input)?;
    let fields = parse_fields(input)?;

    let kind = if options.extensible {
        quote!(#krate::TypeKind::Extensible)
    } else {
        quote!(#krate::TypeKind::Final)
    };

    let flattened = fields.iter().filter(|f| f.options.flatten).map(|f| {
        let member = &f.member;
        let ty = f.ty;
        quote! {
            fields.extend(
                <#ty as #krate::Verifiable>::fields()
                    .into_iter()
                    .map(|field| field.lift(|s: &Self| &s.#member, |s: &mut Self| &mut s.#member)),
            );
        }
    });

    let own = fields.iter().filter(|f| !f.options.flatten).map(|f| {
        let member = &f.member;
        let label = &f.label;
        let ty = f.ty;
        let ctor = if f.options.prefab {
            quote!(prefab)
        } else {
            quote!(new)
        };
        let nullable = option_inner(ty).map(|inner| {
            quote! {
                .nullable(#krate::Value::new(::std::option::Option::<#inner>::None))
            }
        });
        quote! {
            fields.push(
                #krate::FieldDescriptor::#ctor::<#ty>(
                    #level,
                    #label,
                    |s: &Self| &s.#member,
                    |s: &mut Self| &mut s.#member,
                )
                #nullable
            );
        }
    });

    let inits = fields.iter().map(|f| {
        let member = &f.member;
        let label = &f.label;
        let ty = f.ty;
        if f.options.flatten {
            quote!(#member: #krate::inject_nested::<#ty>(values)?)
        } else {
            quote!(#member: values.cloned::<#ty>(&#krate::FieldKey::new(#level, #label))?)
        }
    });

    let construct = match &options.constructor {
        None => None,
        Some(constructor) => Some(expand_construct(&krate, &level, &fields, constructor)?),
    };

    Ok(quote! {
        impl #krate::Verifiable for #name {
            fn type_info() -> #krate::TypeInfo {
                #krate::TypeInfo::new(#level, #kind)
            }

            fn fields() -> ::std::vec::Vec<#krate::FieldDescriptor<Self>> {
                let mut fields = ::std::vec::Vec::new();
                #(#flattened)*
                #(#own)*
                fields
            }

            #[allow(unused_variables)]
            fn inject(
                values: &#krate::FieldValues,
                _fields: &[#krate::FieldDescriptor<Self>],
            ) -> ::std::option::Option<::std::result::Result<Self, #krate::VerifyError>> {
                let build = || -> ::std::result::Result<Self, #krate::VerifyError> {
                    ::std::result::Result::Ok(Self { #(#inits),* })
                };
                ::std::option::Option::Some(build())
            }

            #construct
        }
    })
}

fn expand_construct(
    krate: &TokenStream2,
    level: &str,
    fields: &[ParsedField<'_>],
    constructor: &Constructor,
) -> syn::Result<TokenStream2> {
    if let Some(field) = fields.iter().find(|f| f.options.flatten) {
        return Err(syn::Error::new_spanned(
            field.ty,
            "a `verify(constructor)` cannot be combined with flattened fields",
        ));
    }
    let args: Vec<Ident> = (0..fields.len()).map(|i| format_ident!("arg{i}")).collect();
    let bindings = fields.iter().zip(&args).map(|(f, arg)| {
        let label = &f.label;
        let ty = f.ty;
        quote! {
            let #arg = values
                .cloned::<#ty>(&#krate::FieldKey::new(#level, #label))
                .map_err(|err| err.to_string())?;
        }
    });
    let call = match constructor {
        Constructor::Infallible(path) => quote!(::std::result::Result::Ok(#path(#(#args),*))),
        Constructor::Fallible(path) => quote!(#path(#(#args),*).map_err(|err| err.to_string())),
    };
    Ok(quote! {
        #[allow(unused_variables)]
        fn construct(
            values: &#krate::FieldValues,
        ) -> ::std::option::Option<::std::result::Result<Self, ::std::string::String>> {
            let build = || -> ::std::result::Result<Self, ::std::string::String> {
                #(#bindings)*
                #call
            };
            ::std::option::Option::Some(build())
        }
    })
}

fn expand_example(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let krate = krate();
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "generic types are not supported by derive(Example); implement the trait by hand",
        ));
    }
    Ok(quote! {
        impl #krate::Example for #name {
            fn examples(
                factory: &mut #krate::ValueFactory,
            ) -> ::std::result::Result<#krate::ExampleValues<Self>, #krate::VerifyError> {
                factory.record_examples::<Self>()
            }
        }
    })
}
