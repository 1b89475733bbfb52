use crate::codes::{find_detail, ErrorCode};
use crate::source::Location;
use itertools::Itertools;
use std::fmt::Write;

/// A diagnostic argument, captured at fail time. Highlights render as
/// trailing blocks rather than inline substitutions.
#[derive(Debug, Clone)]
pub enum Arg {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Highlight(Highlight),
}

impl Arg {
    fn render(&self) -> String {
        match self {
            Arg::Str(s) => s.clone(),
            Arg::Int(v) => v.to_string(),
            Arg::UInt(v) => v.to_string(),
            Arg::Float(v) => v.to_string(),
            Arg::Highlight(_) => String::new(),
        }
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Str(v.to_owned())
    }
}
impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Str(v)
    }
}
impl From<char> for Arg {
    fn from(v: char) -> Self {
        Arg::Str(v.to_string())
    }
}
impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Arg::Str(v.to_string())
    }
}
impl From<i32> for Arg {
    fn from(v: i32) -> Self {
        Arg::Int(v as i64)
    }
}
impl From<i64> for Arg {
    fn from(v: i64) -> Self {
        Arg::Int(v)
    }
}
impl From<u32> for Arg {
    fn from(v: u32) -> Self {
        Arg::UInt(v as u64)
    }
}
impl From<u64> for Arg {
    fn from(v: u64) -> Self {
        Arg::UInt(v)
    }
}
impl From<usize> for Arg {
    fn from(v: usize) -> Self {
        Arg::UInt(v as u64)
    }
}
impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Arg::Float(v)
    }
}
impl From<Highlight> for Arg {
    fn from(v: Highlight) -> Self {
        Arg::Highlight(v)
    }
}

/// A rendered source span attached to a diagnostic. `formatted` owns the
/// rendered text; the optional file context names where the span came from.
#[derive(Debug, Clone)]
pub struct Highlight {
    /// Which component produced the highlight, e.g. `JsonReader`.
    pub owner: String,
    pub formatted: String,
    pub file_context: Option<FileContext>,
}

impl Highlight {
    pub fn new(owner: &str, formatted: String) -> Self {
        Highlight {
            owner: owner.to_owned(),
            formatted,
            file_context: None,
        }
    }

    pub fn with_file_context(mut self, file_path: String, loc: Location) -> Self {
        self.file_context = Some(FileContext { file_path, loc });
        self
    }
}

#[derive(Debug, Clone)]
pub struct FileContext {
    pub file_path: String,
    pub loc: Location,
}

/// An error code plus its ordered, lazily captured arguments.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub args: Vec<Arg>,
}

impl Diagnostic {
    pub fn new(code: ErrorCode) -> Self {
        Diagnostic {
            code,
            args: Vec::new(),
        }
    }

    pub fn push(&mut self, arg: Arg) {
        self.args.push(arg);
    }

    pub fn highlights(&self) -> impl Iterator<Item = &Highlight> {
        self.args.iter().filter_map(|arg| match arg {
            Arg::Highlight(h) => Some(h),
            _ => None,
        })
    }
}

/// Render a diagnostic: `category:id`, the registered format string with
/// `{0},{1},…` substituted from non-highlight arguments, then one block per
/// attached highlight.
pub fn format_diagnostic(diag: &Diagnostic) -> String {
    let mut out = String::new();

    let rendered: Vec<String> = diag
        .args
        .iter()
        .filter(|arg| !matches!(arg, Arg::Highlight(_)))
        .map(Arg::render)
        .collect();

    match find_detail(diag.code) {
        Some(msg) => {
            let mut body = msg.to_owned();
            for (ix, arg) in rendered.iter().enumerate() {
                body = body.replace(&format!("{{{}}}", ix), arg);
            }
            let _ = write!(&mut out, "[{}] {}", diag.code, body);
        }
        None => {
            // Unregistered code. Emit the raw arguments so nothing is lost.
            let _ = write!(
                &mut out,
                "[{}] unknown diagnostic ({})",
                diag.code,
                rendered.iter().join(", ")
            );
        }
    }

    for highlight in diag.highlights() {
        let _ = write!(&mut out, "\n{}:", highlight.owner);
        if let Some(ctx) = &highlight.file_context {
            let _ = write!(
                &mut out,
                " {}:{}:{}",
                ctx.file_path, ctx.loc.line, ctx.loc.column
            );
        }
        if !highlight.formatted.is_empty() {
            let _ = write!(&mut out, "\n{}", highlight.formatted);
        }
    }

    out
}
