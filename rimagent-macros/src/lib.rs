use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, AttributeArgs, FnArg, ItemFn, Lit, Meta, NestedMeta, Pat, ReturnType, Type,
};
use proc_macro_crate::{crate_name, FoundCrate};

/// Resolve host crate path (equivalent to `$crate`)
fn host_crate() -> proc_macro2::TokenStream {
    match crate_name("rimagent") {
        // integration tests and demos share the manifest but are separate crates
        Ok(FoundCrate::Itself) => match std::env::var("CARGO_CRATE_NAME") {
            Ok(name) if name == "rimagent" => quote!(crate),
            _ => quote!(::rimagent),
        },
        Ok(FoundCrate::Name(name)) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::rimagent),
    }
}

/// Turn a free function into a registrable tool.
///
/// The function's arguments become the tool's declared parameter list, in
/// order, so positional arguments from an `[ACTION]: name(a, b)` call bind onto
/// them. Arguments are read from the string-keyed parameter map and coerced to
/// the declared type; `Option<T>` arguments are optional. A function returning
/// `Result<T, E>` reports `Err` as a tool execution error.
///
/// ```ignore
/// #[rimagent::tool(
///     name = "roll_dice",
///     description = "Roll a d20 against a difficulty",
///     params(difficulty = "Target number, default 10")
/// )]
/// fn roll_dice(difficulty: Option<u32>) -> String { /* ... */ }
///
/// registry.register_tool(RollDiceTool);
/// ```
#[proc_macro_attribute]
pub fn tool(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as AttributeArgs);
    let input_fn = parse_macro_input!(item as ItemFn);

    let mut name_override = None;
    let mut description = None;
    let mut params_meta = Vec::<(String, String)>::new();

    for nested in args {
        match nested {
            NestedMeta::Meta(Meta::NameValue(nv)) => {
                if let Some(ident) = nv.path.get_ident() {
                    if let Lit::Str(s) = nv.lit {
                        match ident.to_string().as_str() {
                            "name" => name_override = Some(s.value()),
                            "description" => description = Some(s.value()),
                            _ => {}
                        }
                    }
                }
            }
            NestedMeta::Meta(Meta::List(list)) if list.path.is_ident("params") => {
                for nm in list.nested {
                    if let NestedMeta::Meta(Meta::NameValue(nv)) = nm {
                        if let (Some(ident), Lit::Str(s)) = (nv.path.get_ident(), &nv.lit) {
                            params_meta.push((ident.to_string(), s.value()));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let description = match description {
        Some(d) => d,
        None => {
            return syn::Error::new_spanned(
                &input_fn.sig.ident,
                "tool requires `description = \"...\"`",
            )
            .to_compile_error()
            .into();
        }
    };

    let fn_ident = input_fn.sig.ident.clone();
    let fn_name = fn_ident.to_string();
    let tool_name = name_override.unwrap_or(fn_name.clone());

    let mut fields = Vec::new();
    let mut param_names = Vec::new();

    for arg in &input_fn.sig.inputs {
        match arg {
            FnArg::Typed(pt) => {
                if let Pat::Ident(pi) = &*pt.pat {
                    fields.push((pi.ident.clone(), (*pt.ty).clone()));
                    param_names.push(pi.ident.to_string());
                } else {
                    return syn::Error::new_spanned(&pt.pat, "only simple identifiers are supported")
                        .to_compile_error()
                        .into();
                }
            }
            FnArg::Receiver(_) => {
                return syn::Error::new_spanned(arg, "methods with self are not supported")
                    .to_compile_error()
                    .into();
            }
        }
    }

    for (k, _) in &params_meta {
        if !param_names.contains(k) {
            return syn::Error::new_spanned(
                &input_fn.sig.ident,
                format!("param '{}' not found in function signature", k),
            )
            .to_compile_error()
            .into();
        }
    }

    let tool_struct_ident =
        syn::Ident::new(&format!("{}Tool", pascal_case(&fn_name)), fn_ident.span());

    let host = host_crate();

    let args_entries = fields.iter().map(|(ident, ty)| {
        let desc = params_meta
            .iter()
            .find(|(k, _)| k == &ident.to_string())
            .map(|(_, v)| v.clone())
            .unwrap_or_default();

        if desc.is_empty() {
            return syn::Error::new_spanned(
                ident,
                format!("missing description for param '{}'", ident),
            )
            .to_compile_error();
        }

        let arg_type = infer_json_type(ty);
        let required = !is_option(ty);
        let name_lit = syn::LitStr::new(&ident.to_string(), ident.span());
        let desc_lit = syn::LitStr::new(&desc, ident.span());

        quote! {
            #host::tools::schema::ArgSchema {
                name: #name_lit.into(),
                arg_type: #arg_type.into(),
                description: #desc_lit.into(),
                required: #required,
            }
        }
    });

    let bindings = fields.iter().map(|(ident, ty)| {
        let name_lit = syn::LitStr::new(&ident.to_string(), ident.span());
        quote!(let #ident: #ty = params.get_as(#name_lit)?;)
    });
    let call_args = fields.iter().map(|(id, _)| quote!(#id));

    let call = if input_fn.sig.asyncness.is_some() {
        quote!(#fn_ident(#(#call_args),*).await)
    } else {
        quote!(#fn_ident(#(#call_args),*))
    };

    let convert = if returns_result(&input_fn.sig.output) {
        quote! {
            match output {
                Ok(value) => #host::serde_json::to_value(value)
                    .map_err(#host::tools::error::ToolError::from),
                Err(err) => Err(#host::tools::error::ToolError::ExecutionError {
                    name: #tool_name.into(),
                    reason: err.to_string(),
                }),
            }
        }
    } else {
        quote! {
            #host::serde_json::to_value(output).map_err(#host::tools::error::ToolError::from)
        }
    };

    let expanded = quote! {
        #input_fn

        #[derive(Debug, Default, Clone, Copy)]
        pub struct #tool_struct_ident;

        #[#host::async_trait::async_trait]
        impl #host::tools::traits::Tool for #tool_struct_ident {
            fn name(&self) -> &str { #tool_name }
            fn description(&self) -> &str { #description }
            fn params(&self) -> Vec<#host::tools::schema::ArgSchema> {
                vec![#(#args_entries),*]
            }
            async fn execute(
                &self,
                params: #host::tools::params::ToolParams,
            ) -> ::std::result::Result<#host::serde_json::Value, #host::tools::error::ToolError> {
                #(#bindings)*
                let output = #call;
                #convert
            }
        }
    };

    TokenStream::from(expanded)
}

fn pascal_case(s: &str) -> String {
    s.split('_')
        .map(|p| {
            let mut c = p.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join("")
}

fn last_segment(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

fn is_option(ty: &Type) -> bool {
    last_segment(ty).as_deref() == Some("Option")
}

fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Type(_, ty) => last_segment(ty).as_deref() == Some("Result"),
        ReturnType::Default => false,
    }
}

fn infer_json_type(ty: &Type) -> &'static str {
    let Some(ident) = last_segment(ty) else {
        return "object";
    };
    match ident.as_str() {
        "String" | "str" => "string",
        "bool" => "boolean",
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "usize" | "isize" => {
            "integer"
        }
        "f32" | "f64" => "number",
        "Vec" => "array",
        "Option" => option_inner(ty).map(infer_json_type).unwrap_or("object"),
        _ => "object",
    }
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(p) = ty else {
        return None;
    };
    let segment = p.path.segments.last()?;
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}
