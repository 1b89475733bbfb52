use serde::Deserialize;

/// Longest accepted object key, in characters. Keys become interned names;
/// the cap keeps the intern table bounded against hostile documents.
pub const DEFAULT_MAX_KEY_LEN: usize = 1024;

/// Smallest configurable key cap.
pub const MIN_MAX_KEY_LEN: usize = 256;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub max_key_len: usize,
    /// File path echoed in diagnostics; `<in-memory>` when unset.
    pub diag_file_path: Option<String>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            max_key_len: DEFAULT_MAX_KEY_LEN,
            diag_file_path: None,
        }
    }
}

impl ReaderConfig {
    /// Clamp fields into their supported ranges.
    pub fn normalized(mut self) -> Self {
        self.max_key_len = self.max_key_len.max(MIN_MAX_KEY_LEN);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum WriteStyle {
    /// Multi-line, two-space indent.
    Default,
    /// No inter-token whitespace at all.
    Compact,
    /// Single line, one space after `:` and `,`.
    Condensed,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WriteConfig {
    pub style: WriteStyle,
}

impl Default for WriteConfig {
    fn default() -> Self {
        WriteConfig {
            style: WriteStyle::Default,
        }
    }
}
