// Diagnostics substrate shared by every reader, writer and dispatch layer:
// structured error codes, diagnostics with lazily captured arguments, the
// process-local environment stack, and source-span highlighting.

pub mod codes;
mod diagnostic;
mod env;
pub mod source;

pub use codes::{common, json, msgpack, rw, serde, DiagnosticDetail, DiagnosticGroup, ErrorCode};
pub use diagnostic::{format_diagnostic, Arg, Diagnostic, FileContext, Highlight};
pub use env::{
    is_initialized, pop_env, push_env, shut_down, start_up, with_env, DiagConsumer, Env,
    InitAction, ScopedEnv, ScopedReader, ScopedWriter, SharedConsumer, TracingConsumer,
};
pub use source::{format_highlight, Location, SourceSpan};

/// Build a `Diagnostic` from an error code plus any `Into<Arg>` values,
/// append it to the current env, and produce `Err` of the code.
///
/// ```ignore
/// return fail!(json::EXPECT_COMMA, self.highlight(span));
/// ```
#[macro_export]
macro_rules! fail {
    ($code:expr $(, $arg:expr)* $(,)?) => {{
        let mut __diag = $crate::Diagnostic::new($code);
        $( __diag.push($crate::Arg::from($arg)); )*
        $crate::record_fail(__diag)
    }};
}

/// A failed operation. The value carries only the error code; the full
/// `Diagnostic` with captured arguments and highlights was already appended
/// to the current `Env` when the failure was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{code}")]
pub struct Error {
    pub code: ErrorCode,
}

pub type Result<T = ()> = std::result::Result<T, Error>;

/// Record a diagnostic on the current env and return the matching failure.
pub fn record_fail<T>(diag: Diagnostic) -> Result<T> {
    let code = diag.code;
    with_env(|env| {
        if !env.expect_fail {
            tracing::warn!(category = code.category, id = code.id, "diagnostic recorded");
        }
        env.diagnostics.push(diag);
    });
    Err(Error { code })
}

/// Amend the most recent diagnostic in place. No-op when there is none.
pub fn amend_last_diag(f: impl FnOnce(&mut Diagnostic)) {
    with_env(|env| {
        if let Some(diag) = env.diagnostics.last_mut() {
            f(diag);
        }
    })
}

/// Failure for control flow that should be unreachable. Trips a debug
/// assertion, then degrades to a recorded `common::UNREACHABLE`.
pub fn no_entry<T>() -> Result<T> {
    debug_assert!(false, "entered unreachable diagnostic path");
    fail!(common::UNREACHABLE)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fail_records_one_diagnostic() {
        let _env = ScopedEnv::new();
        let before = with_env(|env| env.diagnostics.len());

        let result: Result<()> = fail!(common::NOT_INITIALIZED, "ctx");
        assert_eq!(
            result.unwrap_err(),
            Error {
                code: common::NOT_INITIALIZED
            }
        );
        let after = with_env(|env| env.diagnostics.len());
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_amend_last_diag() {
        let _env = ScopedEnv::new();
        let _: Result<()> = fail!(common::PLACE_HOLD_ERROR);
        amend_last_diag(|diag| diag.push(Arg::from("amended")));

        with_env(|env| {
            let diag = env.diagnostics.last().unwrap();
            assert_eq!(diag.args.len(), 1);
        });
    }
}
