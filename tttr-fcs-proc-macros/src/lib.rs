extern crate proc_macro;
use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream, Result};
use syn::{bracketed, parse_macro_input, token, Expr, Ident, Token, Type};

struct PTUTagRead {
    optional: bool,
    header: Ident,
    ty: Type,
    key: Expr,
}

impl Parse for PTUTagRead {
    fn parse(input: ParseStream) -> Result<Self> {
        let content;
        let mut header: Ident = input.parse()?;
        let optional = header == "optional";
        if optional {
            header = input.parse()?;
        }
        let _paren: token::Bracket = bracketed!(content in input);
        let key: Expr = content.parse()?;
        input.parse::<Token![as]>()?;
        let ty: Type = input.parse()?;

        Ok(PTUTagRead {
            optional,
            header,
            ty,
            key,
        })
    }
}

// example use
// read_ptu_tag!(header[SOME_VALUE] as Int8);           -> value, or early return if missing
// read_ptu_tag!(optional header[SOME_VALUE] as Int8);  -> Option of the value
//
// Both forms return early with `Error::WrongTagType` when the tag holds another variant.
#[proc_macro]
pub fn read_ptu_tag(input: TokenStream) -> TokenStream {
    let PTUTagRead {
        optional,
        header,
        ty,
        key,
    } = parse_macro_input!(input as PTUTagRead);

    let output = if optional {
        quote! {
            match #header.get(#key) {
                None => None,
                Some(PTUTag::#ty(x)) => Some(x.clone()),
                Some(_) => return Err(Error::WrongTagType(String::from(#key))),
            }
        }
    } else {
        quote! {
            match #header.get(#key) {
                None => return Err(Error::MissingTag(String::from(#key))),
                Some(PTUTag::#ty(x)) => x.clone(),
                Some(_) => return Err(Error::WrongTagType(String::from(#key))),
            }
        }
    };
    TokenStream::from(output)
}
