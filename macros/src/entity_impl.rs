use proc_macro2::TokenStream;
use quote::quote;
use syn::{parse2, spanned::Spanned, Data, DeriveInput, Field, Fields, LitStr, Result};

use crate::syn_utils::attrs_named;

pub fn derive_entity(input: TokenStream) -> Result<TokenStream> {
    let input: DeriveInput = parse2(input)?;
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => bail!(input.ident.span(), "`Entity` requires a struct with named fields"),
        },
        _ => bail!(input.ident.span(), "`Entity` can only be derived for structs"),
    };

    let mut entries = Vec::new();
    for field in fields {
        let args = FieldArgs::from_field(field)?;
        if args.skip {
            continue;
        }
        let Some(ident) = &field.ident else {
            bail!(field.span(), "unnamed field")
        };
        let name = match args.rename {
            Some(name) => name.value(),
            None => ident.to_string().trim_start_matches("r#").to_string(),
        };
        entries.push((name, ident));
    }

    let m = quote!(::sigmut_model);
    let ident = &input.ident;
    let (impl_g, type_g, where_clause) = input.generics.split_for_impl();

    let schema_fields = entries.iter().map(|(name, ident)| {
        quote! {
            .field(
                #name,
                |e: &Self| #m::ToValue::to_value(&e.#ident),
                |e: &mut Self, v: #m::Value| {
                    e.#ident = #m::FromValue::from_value(v)?;
                    ::std::result::Result::Ok(())
                },
            )
        }
    });
    let object_members = entries.iter().map(|(name, ident)| {
        quote!(.with(#name, #m::ToValue::to_value(&self.#ident)))
    });

    Ok(quote! {
        #[automatically_derived]
        impl #impl_g #m::Entity for #ident #type_g #where_clause {
            fn schema(&self) -> #m::Schema<Self> {
                #m::Schema::new() #(#schema_fields)*
            }
        }
        #[automatically_derived]
        impl #impl_g #m::ToValue for #ident #type_g #where_clause {
            fn to_value(&self) -> #m::Value {
                #m::Value::Object(#m::Object::new() #(#object_members)*)
            }
        }
    })
}

#[derive(Default)]
struct FieldArgs {
    rename: Option<LitStr>,
    skip: bool,
}

impl FieldArgs {
    fn from_field(field: &Field) -> Result<Self> {
        let mut args = Self::default();
        for attr in attrs_named(&field.attrs, "entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    args.rename = Some(meta.value()?.parse()?);
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    args.skip = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `rename` or `skip`"))
                }
            })?;
        }
        Ok(args)
    }
}
