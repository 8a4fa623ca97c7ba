//! # Accessor Derive
//!
//! Derive macros generating getters and setters for configuration structs.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Attribute, Data, DeriveInput, Field, Fields, LitBool, parse_macro_input, punctuated::Punctuated,
    spanned::Spanned, token::Comma,
};

/// Derive to generate `.set_<field>(&mut self, value: Ty) -> &mut Self` and
/// `const .with_<field>(mut self, value: Ty) -> Self` for each **named** field.
///
/// - Skipping a field: `#[setters(skip)]`
/// - Accepting `impl Into<Ty>`: `#[setters(into)]`. The `with_` builder is
///   not `const` for such fields, since the replaced value may need dropping.
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use utils_accessors_derive::Setters;
///
/// #[derive(Setters)]
/// struct Job {
///     #[setters(into)]
///     output: PathBuf,
///     retries: u32,
///     #[setters(skip)]
///     _id: u64,
/// }
///
/// let mut job = Job { output: PathBuf::new(), retries: 0, _id: 7 };
/// job.set_output("disc.iso").set_retries(1);
/// let job = job.with_retries(3);
/// assert_eq!(job.output, PathBuf::from("disc.iso"));
/// assert_eq!(job.retries, 3);
/// ```
///
/// Unknown options are rejected:
///
/// ```compile_fail
/// use utils_accessors_derive::Setters;
///
/// #[derive(Setters)]
/// struct Typo {
///     #[setters(inot)]
///     path: u32,
/// }
/// ```
#[proc_macro_derive(Setters, attributes(setters))]
pub fn derive_generate_setters(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let fields = match named_fields(&input, "Setters") {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };

    let mut methods = Vec::new();
    for field in fields {
        let Some(fname) = &field.ident else { continue };
        let opts = match FieldOptions::parse(&field.attrs, "setters") {
            Ok(opts) => opts,
            Err(e) => return e.to_compile_error().into(),
        };
        if opts.skip {
            continue;
        }

        let ty = &field.ty;
        let set_name = format_ident!("set_{}", fname);
        let with_name = format_ident!("with_{}", fname);

        if opts.into {
            methods.push(quote! {
                #[inline]
                pub fn #set_name(&mut self, value: impl ::core::convert::Into<#ty>) -> &mut Self {
                    self.#fname = value.into();
                    self
                }

                #[inline]
                #[must_use]
                pub fn #with_name(mut self, value: impl ::core::convert::Into<#ty>) -> Self {
                    self.#fname = value.into();
                    self
                }
            });
        } else {
            methods.push(quote! {
                #[inline]
                pub fn #set_name(&mut self, value: #ty) -> &mut Self {
                    self.#fname = value;
                    self
                }

                #[inline]
                #[must_use]
                pub const fn #with_name(mut self, value: #ty) -> Self {
                    self.#fname = value;
                    self
                }
            });
        }
    }

    expand(&input, &methods)
}

/// Derive to generate a `.<field>(&self)` getter for each **named** field.
///
/// Getters return `&Ty` unless the field is marked `#[getters(copy)]`, in
/// which case they return `Ty` by value. `#[getters(skip)]` omits the field.
///
/// # Example
///
/// ```
/// use utils_accessors_derive::Getters;
///
/// #[derive(Getters)]
/// struct Limits {
///     name: String,
///     #[getters(copy)]
///     minimum: usize,
/// }
///
/// let l = Limits { name: "disc".into(), minimum: 42 };
/// assert_eq!(l.name(), "disc");
/// assert_eq!(l.minimum(), 42);
/// ```
///
/// Unknown options are rejected:
///
/// ```compile_fail
/// use utils_accessors_derive::Getters;
///
/// #[derive(Getters)]
/// struct Typo {
///     #[getters(cpy)]
///     minimum: usize,
/// }
/// ```
#[proc_macro_derive(Getters, attributes(getters))]
pub fn derive_generate_getters(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let fields = match named_fields(&input, "Getters") {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };

    let mut methods = Vec::new();
    for field in fields {
        let Some(fname) = &field.ident else { continue };
        let opts = match FieldOptions::parse(&field.attrs, "getters") {
            Ok(opts) => opts,
            Err(e) => return e.to_compile_error().into(),
        };
        if opts.skip {
            continue;
        }

        let ty = &field.ty;
        if opts.copy {
            methods.push(quote! {
                #[inline]
                #[must_use]
                pub const fn #fname(&self) -> #ty {
                    self.#fname
                }
            });
        } else {
            methods.push(quote! {
                #[inline]
                #[must_use]
                pub const fn #fname(&self) -> &#ty {
                    &self.#fname
                }
            });
        }
    }

    expand(&input, &methods)
}

fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> syn::Result<&'a Punctuated<Field, Comma>> {
    let ident = &input.ident;
    match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(n) => Ok(&n.named),
            Fields::Unnamed(u) => Err(syn::Error::new(
                u.span(),
                format!("{derive} only supports named fields"),
            )),
            Fields::Unit => Err(syn::Error::new(
                ident.span(),
                format!("{derive} does not apply to unit structs"),
            )),
        },
        _ => Err(syn::Error::new(
            ident.span(),
            format!("{derive} can only be derived for structs"),
        )),
    }
}

fn expand(input: &DeriveInput, methods: &[TokenStream2]) -> TokenStream {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics #ident #ty_generics #where_clause {
            #(#methods)*
        }
    };

    TokenStream::from(expanded)
}

#[derive(Default)]
struct FieldOptions {
    skip: bool,
    into: bool,
    copy: bool,
}

impl FieldOptions {
    /// Reads `#[<attr>(skip)]`, `#[<attr>(into)]` and `#[<attr>(copy)]`,
    /// each also accepted as `name = true|false`.
    ///
    /// Any other option is a compile error spanned at the option.
    fn parse(attrs: &[Attribute], attr_name: &str) -> syn::Result<Self> {
        let mut opts = Self::default();
        for attr in attrs {
            if !attr.path().is_ident(attr_name) {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                let flag = if meta.path.is_ident("skip") {
                    &mut opts.skip
                } else if meta.path.is_ident("into") {
                    &mut opts.into
                } else if meta.path.is_ident("copy") {
                    &mut opts.copy
                } else {
                    return Err(meta.error("unsupported accessor option"));
                };

                if meta.input.is_empty() || meta.input.peek(Comma) {
                    *flag = true;
                } else {
                    *flag = meta.value()?.parse::<LitBool>()?.value;
                }
                Ok(())
            })?;
        }
        Ok(opts)
    }
}
