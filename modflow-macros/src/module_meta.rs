use darling::util::{Flag, PathList};
use darling::FromDeriveInput;
use syn::DeriveInput;

/// Parsed attributes from #[module(...)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(module), supports(struct_any))]
pub struct ModuleArgs {
    pub ident: syn::Ident,
    pub generics: syn::Generics,

    /// Interfaces accepted as input, e.g. `accept(SIGNAL, SPECTRUM)`
    #[darling(default)]
    pub accept: PathList,

    /// Interface produced as output, e.g. `produce = "SIGNAL"`
    #[darling(default)]
    pub produce: Option<syn::Path>,

    /// Default exposure label used when the pipeline document is silent
    #[darling(default)]
    pub expose: Option<String>,

    #[darling(default)]
    pub finalize: Flag,

    /// Type name under which the module is submitted to the inventory
    #[darling(default)]
    pub register: Option<String>,
}

pub fn parse_module_args(input: &DeriveInput) -> darling::Result<ModuleArgs> {
    let args = ModuleArgs::from_derive_input(input)?;

    if let Some(label) = &args.expose {
        if label.is_empty() {
            return Err(darling::Error::custom("expose label must not be empty"));
        }
    }
    if args.register.is_some() && !args.finalize.is_present() {
        return Err(darling::Error::custom(
            "only finalized module types can be registered",
        ));
    }
    if args.register.is_some() && !args.generics.params.is_empty() {
        return Err(darling::Error::custom(
            "generic module types cannot be registered",
        ));
    }

    Ok(args)
}
