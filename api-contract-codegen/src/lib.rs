use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use quote::quote_spanned;
use syn::{punctuated::Punctuated, Expr, Lit, Token};

/// Turns `fn name(scenario: &Scenario) -> Result<(), Error>` into a test that
/// runs inside a scenario session.
///
/// ```ignore
/// #[contract_test("register_successful", configure)]
/// fn register_successful(scenario: &Scenario) -> Result<(), Error> { ... }
/// ```
///
/// The first argument names the scenario; it is also the file name of its
/// report and of its playback recording. The optional second argument is a
/// `fn(&mut HarnessConfiguration)` applied after the environment is read.
#[proc_macro_attribute]
pub fn contract_test(attrs: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    let args = syn::parse_macro_input!(attrs with Punctuated::<Expr, Token![,]>::parse_terminated);

    if args.is_empty() || args.len() > 2 {
        return quote! {
            compile_error!("A scenario name and an optional configuration function should be passed to the macro");
        }
        .into();
    }

    let scenario_name = match &args[0] {
        Expr::Lit(syn::ExprLit {
            lit: Lit::Str(parsed_scenario_name),
            ..
        }) => {
            let scenario_name = parsed_scenario_name.value();
            if let Err(stream) = validate_scenario_name(&scenario_name, parsed_scenario_name.span())
            {
                return stream.into();
            }
            scenario_name
        }
        _ => {
            return quote! {
                compile_error!("The first argument should be a string literal!");
            }
            .into();
        }
    };

    let configure = match args.iter().nth(1) {
        Some(Expr::Path(function_path)) => quote! {
            #function_path(&mut __contract_configuration);
        },
        Some(_) => {
            return quote! {
                compile_error!("The second argument should be a configuration function!");
            }
            .into();
        }
        None => quote! {},
    };

    if input.sig.inputs.len() != 1 {
        return quote_spanned! {input.sig.ident.span()=>
            compile_error!("A contract test should take the scenario as its only argument!");
        }
        .into();
    }

    let attrs = &input.attrs;
    let vis = &input.vis;
    let test_name = &input.sig.ident;
    let mut body = input.clone();
    body.attrs.clear();
    body.vis = syn::Visibility::Inherited;
    body.sig.ident = syn::Ident::new("__contract_body", Span::call_site());

    let output = quote! {
        #[test]
        #(#attrs)*
        #vis fn #test_name() -> ::std::result::Result<(), ::api_contract::Error> {
            #body

            let mut __contract_configuration = ::api_contract::HarnessConfiguration::load()?;
            #configure
            let __contract_scenario =
                ::api_contract::Scenario::begin(#scenario_name, __contract_configuration)?;

            let __contract_result = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {
                __contract_body(&__contract_scenario)
            }));
            let __contract_report = __contract_scenario.finish();

            match __contract_result {
                Err(e) => ::std::panic::resume_unwind(e),
                Ok(Err(e)) => Err(e),
                Ok(Ok(())) => __contract_report.map(|_| ()),
            }
        }
    };

    TokenStream::from(output)
}

fn validate_scenario_name(name: &str, span: Span) -> Result<(), proc_macro2::TokenStream> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if !valid {
        return Err(quote_spanned! {span=>
            compile_error!("The scenario name may only contain letters, digits, `_` and `-`!");
        });
    }

    Ok(())
}
