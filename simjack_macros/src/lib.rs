use proc_macro::TokenStream;
use quote::ToTokens;
use syn::{parse_macro_input, parse_quote, Ident, ImplItemFn, Stmt};

/// This macro is added before a step method of the round engine (`Table`) in
/// its impl block. It makes the step first check that the round is exactly in
/// the phase named in the attribute.
///
/// For example, `#[allowed_phase(Bet)]` makes a method return
/// `SimError::WrongPhase` unless `self.phase` is `RoundPhase::Bet`. The method
/// must return `Result<_, SimError>`.
#[proc_macro_attribute]
pub fn allowed_phase(attr: TokenStream, item: TokenStream) -> TokenStream {
    let phase = parse_macro_input!(attr as Ident);
    let mut method = parse_macro_input!(item as ImplItemFn);
    let operation = method.sig.ident.to_string();

    let guard: Stmt = parse_quote! {
        if self.phase != crate::table::RoundPhase::#phase {
            return Err(crate::SimError::WrongPhase {
                operation: #operation,
                expected: crate::table::RoundPhase::#phase,
                actual: self.phase,
            });
        }
    };
    method.block.stmts.insert(0, guard);
    method.into_token_stream().into()
}
