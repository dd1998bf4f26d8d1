//! Procedural macros for the couchlayer project.
//!
//! This crate provides `#[derive(Record)]`, which generates the `Record` implementation of a
//! struct with named fields: its database name, identity accessors and field descriptor list.
//!
//! ```ignore
//! #[derive(Debug, Default, Record)]
//! #[record(database = "users")]
//! pub struct User {
//!     pub id: String,
//!     #[record(rename = "first_name")]
//!     pub firstname: String,
//!     #[record(skip)]
//!     pub cached: Option<String>,
//! }
//! ```
//!
//! Attributes:
//!
//! - `#[record(database = "...")]` on the struct is required.
//! - `#[record(id)]` marks the identity field, which must be a `String`. Without it the first
//!   declared field is the identity.
//! - `#[record(rename = "...")]` stores a field under another key.
//! - `#[record(skip)]` keeps a field out of the document.

#[allow(unused_extern_crates)]
extern crate self as couchlayer_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DataStruct, DeriveInput, Fields, Ident, LitStr, parse_macro_input, spanned::Spanned};

#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_record(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct FieldOptions {
    ident: Ident,
    id: bool,
    rename: Option<LitStr>,
    skip: bool,
}

fn expand_record(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let database = database_name(input)?;

    let named = match &input.data {
        Data::Struct(DataStruct { fields: Fields::Named(named), .. }) => &named.named,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Record can only be derived for structs with named fields",
            ));
        }
    };

    let mut fields = Vec::with_capacity(named.len());
    for field in named {
        fields.push(field_options(field)?);
    }

    let identity = identity_field(&input.ident, &fields)?;

    let descriptors = fields
        .iter()
        .filter(|field| !field.skip && field.ident != *identity)
        .map(|field| {
            let ident = &field.ident;
            let key = field
                .rename
                .as_ref()
                .map(LitStr::value)
                .unwrap_or_else(|| ident.to_string());

            quote! {
                .field(
                    #key,
                    |record: &Self| &record.#ident,
                    |record: &mut Self| &mut record.#ident,
                )
            }
        });

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::couchlayer::record::Record for #ident #ty_generics #where_clause {
            fn database_name() -> &'static str {
                #database
            }

            fn identity(&self) -> &str {
                &self.#identity
            }

            fn set_identity(&mut self, identity: ::std::string::String) {
                self.#identity = identity;
            }

            fn fields() -> ::couchlayer::field::Fields<Self> {
                ::couchlayer::field::Fields::builder()
                    #(#descriptors)*
                    .build()
            }
        }
    })
}

fn database_name(input: &DeriveInput) -> syn::Result<LitStr> {
    let mut database = None;

    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("database") {
                database = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("expected `database = \"...\"`"))
            }
        })?;
    }

    match database {
        Some(name) if name.value().is_empty() => {
            Err(syn::Error::new_spanned(name, "database name must not be empty"))
        }
        Some(name) => Ok(name),
        None => Err(syn::Error::new_spanned(
            &input.ident,
            "missing #[record(database = \"...\")] attribute",
        )),
    }
}

fn field_options(field: &syn::Field) -> syn::Result<FieldOptions> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
    let mut options = FieldOptions { ident, id: false, rename: None, skip: false };

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                options.id = true;
            } else if meta.path.is_ident("skip") {
                options.skip = true;
            } else if meta.path.is_ident("rename") {
                options.rename = Some(meta.value()?.parse::<LitStr>()?);
            } else {
                return Err(meta.error("expected `id`, `skip` or `rename = \"...\"`"));
            }
            Ok(())
        })?;
    }

    if options.id && (options.skip || options.rename.is_some()) {
        return Err(syn::Error::new(
            field.span(),
            "the identity field is stored as `_id` and cannot be skipped or renamed",
        ));
    }

    Ok(options)
}

fn identity_field<'a>(container: &Ident, fields: &'a [FieldOptions]) -> syn::Result<&'a Ident> {
    let mut marked = fields.iter().filter(|field| field.id);

    match (marked.next(), marked.next()) {
        (Some(field), None) => Ok(&field.ident),
        (Some(_), Some(second)) => Err(syn::Error::new_spanned(
            &second.ident,
            "only one field can be marked #[record(id)]",
        )),
        (None, _) => fields
            .first()
            .filter(|field| !field.skip)
            .map(|field| &field.ident)
            .ok_or_else(|| {
                syn::Error::new_spanned(container, "Record needs an identity field")
            }),
    }
}
