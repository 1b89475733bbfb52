use crate::codes;
use crate::diagnostic::{format_diagnostic, Diagnostic};
use std::cell::RefCell;
use std::sync::{Arc, Mutex};

/// A scope's worth of diagnostic state. Environments stack per thread:
/// `push_env` isolates diagnostics for a nested computation, `pop_env`
/// flushes and discards them.
pub struct Env {
    pub diagnostics: Vec<Diagnostic>,
    pub consumer: Option<Box<dyn DiagConsumer>>,
    /// Readers registered for the duration of a de/serialize call, LIFO.
    pub reader_names: Vec<&'static str>,
    /// Writers registered for the duration of a de/serialize call, LIFO.
    pub writer_names: Vec<&'static str>,
    /// Mutes the record-time warning when a failure is anticipated.
    pub expect_fail: bool,
}

impl Env {
    fn new() -> Self {
        Env {
            diagnostics: Vec::new(),
            consumer: None,
            reader_names: Vec::new(),
            writer_names: Vec::new(),
            expect_fail: false,
        }
    }

    /// Drain accumulated diagnostics to the consumer, in append order.
    pub fn flush_diags(&mut self) {
        if self.diagnostics.is_empty() {
            return;
        }
        if let Some(consumer) = self.consumer.as_mut() {
            for diag in &self.diagnostics {
                consumer.handle_diagnostic(diag);
            }
            consumer.on_post_flush();
        }
        self.diagnostics.clear();
    }
}

impl Drop for Env {
    fn drop(&mut self) {
        self.flush_diags();
    }
}

/// Receives diagnostics on flush.
pub trait DiagConsumer {
    fn handle_diagnostic(&mut self, diag: &Diagnostic);
    fn on_post_flush(&mut self) {}
}

/// Default console consumer, emitting through `tracing`.
pub struct TracingConsumer;

impl DiagConsumer for TracingConsumer {
    fn handle_diagnostic(&mut self, diag: &Diagnostic) {
        tracing::error!("{}", format_diagnostic(diag));
    }
}

/// Test consumer collecting formatted diagnostics behind a shared handle.
#[derive(Clone, Default)]
pub struct SharedConsumer(pub Arc<Mutex<Vec<String>>>);

impl DiagConsumer for SharedConsumer {
    fn handle_diagnostic(&mut self, diag: &Diagnostic) {
        self.0
            .lock()
            .expect("shared consumer poisoned")
            .push(format_diagnostic(diag));
    }
}

thread_local! {
    static ENVS: RefCell<Vec<Env>> = RefCell::new(Vec::new());
    static INITIALIZED: RefCell<bool> = RefCell::new(false);
}

/// Run `f` against the current (top) env. An env is bootstrapped on demand
/// so diagnostics are never silently dropped before `start_up`.
pub fn with_env<R>(f: impl FnOnce(&mut Env) -> R) -> R {
    ENVS.with(|envs| {
        let mut envs = envs.borrow_mut();
        if envs.is_empty() {
            envs.push(Env::new());
        }
        let top = envs.last_mut().expect("env stack empty after bootstrap");
        f(top)
    })
}

pub fn push_env() {
    ENVS.with(|envs| envs.borrow_mut().push(Env::new()));
}

pub fn pop_env() {
    ENVS.with(|envs| {
        envs.borrow_mut().pop();
    });
}

fn env_depth() -> usize {
    ENVS.with(|envs| envs.borrow().len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitAction {
    Minimal,
    SetAsConsole,
}

/// Register the built-in diagnostic groups and push the bottom env.
pub fn start_up(action: InitAction) {
    codes::register_builtin_groups();
    push_env();
    INITIALIZED.with(|flag| *flag.borrow_mut() = true);

    if action == InitAction::SetAsConsole {
        with_env(|env| env.consumer = Some(Box::new(TracingConsumer)));
    }
    tracing::debug!(?action, "diagnostics environment started");
}

/// Pop every env (flushing each) and clear the group table.
pub fn shut_down() {
    while env_depth() > 0 {
        pop_env();
    }
    codes::clear_groups();
    INITIALIZED.with(|flag| *flag.borrow_mut() = false);
    tracing::debug!("diagnostics environment shut down");
}

pub fn is_initialized() -> bool {
    INITIALIZED.with(|flag| *flag.borrow())
}

/// Pushes an env on construction, pops it (flushing) on drop.
pub struct ScopedEnv {
    _private: (),
}

impl ScopedEnv {
    pub fn new() -> Self {
        push_env();
        ScopedEnv { _private: () }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        pop_env();
    }
}

/// Registers a reader on the current env's reader stack for a call scope.
pub struct ScopedReader {
    _private: (),
}

impl ScopedReader {
    pub fn new(name: &'static str) -> Self {
        with_env(|env| env.reader_names.push(name));
        ScopedReader { _private: () }
    }
}

impl Drop for ScopedReader {
    fn drop(&mut self) {
        with_env(|env| {
            env.reader_names.pop();
        });
    }
}

/// Registers a writer on the current env's writer stack for a call scope.
pub struct ScopedWriter {
    _private: (),
}

impl ScopedWriter {
    pub fn new(name: &'static str) -> Self {
        with_env(|env| env.writer_names.push(name));
        ScopedWriter { _private: () }
    }
}

impl Drop for ScopedWriter {
    fn drop(&mut self) {
        with_env(|env| {
            env.writer_names.pop();
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codes::common;

    #[test]
    fn test_scoped_env_isolates_diagnostics() {
        let _outer = ScopedEnv::new();
        with_env(|env| env.diagnostics.push(Diagnostic::new(common::UNREACHABLE)));

        {
            let _inner = ScopedEnv::new();
            with_env(|env| assert_eq!(env.diagnostics.len(), 0));
            with_env(|env| {
                env.diagnostics
                    .push(Diagnostic::new(common::PLACE_HOLD_ERROR))
            });
        }

        with_env(|env| {
            assert_eq!(env.diagnostics.len(), 1);
            assert_eq!(env.diagnostics[0].code, common::UNREACHABLE);
        });
    }

    #[test]
    fn test_flush_to_consumer_on_pop() {
        codes::register_builtin_groups();
        let collected = SharedConsumer::default();

        {
            let _env = ScopedEnv::new();
            with_env(|env| env.consumer = Some(Box::new(collected.clone())));
            with_env(|env| {
                env.diagnostics
                    .push(Diagnostic::new(common::NOT_INITIALIZED))
            });
        }

        let lines = collected.0.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Environment not initialized"));
    }

    #[test]
    fn test_scoped_reader_writer_stacks() {
        let _env = ScopedEnv::new();
        {
            let _reader = ScopedReader::new("JsonReader");
            let _writer = ScopedWriter::new("PropertyWriter");
            with_env(|env| {
                assert_eq!(env.reader_names, vec!["JsonReader"]);
                assert_eq!(env.writer_names, vec!["PropertyWriter"]);
            });
        }
        with_env(|env| {
            assert!(env.reader_names.is_empty());
            assert!(env.writer_names.is_empty());
        });
    }
}
