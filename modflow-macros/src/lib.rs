use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

mod module_meta;
use module_meta::parse_module_args;

/// Attaches a `ModuleDescriptor` to a module struct.
///
/// ```ignore
/// #[derive(Default, ModuleType)]
/// #[module(accept(SIGNAL), produce = "SIGNAL", expose = "gain", finalize, register = "Gain")]
/// pub struct Gain { /* ... */ }
/// ```
#[proc_macro_derive(ModuleType, attributes(module))]
pub fn derive_module_type(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let args = match parse_module_args(&input) {
        Ok(args) => args,
        Err(e) => return e.write_errors().into(),
    };

    let struct_name = &args.ident;
    let (impl_generics, ty_generics, where_clause) = args.generics.split_for_impl();

    let accepts = args.accept.iter().map(|path| {
        quote! { .accept(&#path) }
    });

    let produce = args.produce.as_ref().map(|path| {
        quote! { .produce(&#path) }
    });

    let expose = args.expose.as_ref().map(|label| {
        quote! { .expose(#label) }
    });

    let finalize = if args.finalize.is_present() {
        Some(quote! { .finalize() })
    } else {
        None
    };

    let registration = args.register.as_ref().map(|type_name| {
        let factory_fn_name = syn::Ident::new(
            &format!("__modflow_registration_{}", struct_name.to_string().to_lowercase()),
            struct_name.span(),
        );

        quote! {
            #[doc(hidden)]
            #[allow(non_snake_case)]
            fn #factory_fn_name() -> ::modflow::registry::ModuleRegistration {
                ::modflow::registry::ModuleRegistration::of::<#struct_name>(#type_name)
            }

            ::modflow::inventory::submit! {
                ::modflow::registry::ModuleRegistrationWrapper(#factory_fn_name)
            }
        }
    });

    let expanded = quote! {
        const _: () = {
            impl #impl_generics ::modflow::registry::ModuleType for #struct_name #ty_generics #where_clause {
                fn descriptor() -> ::modflow::registry::ModuleDescriptor {
                    ::modflow::registry::ModuleDescriptor::new()
                        #(#accepts)*
                        #produce
                        #expose
                        #finalize
                }
            }

            #registration
        };
    };

    TokenStream::from(expanded)
}
