use crate::config::{WriteConfig, WriteStyle};
use diag::{fail, json, rw, Result};
use pipe::{Entry, Name, Writer};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WState {
    Root { written: bool },
    Object { at_value: bool, count: usize },
    Array { count: usize },
}

/// Structural JSON emitter. Maintains a parse-state stack isomorphic to the
/// reader's; the chosen style is purely cosmetic and never changes the
/// entry stream a later reader produces.
pub struct JsonWriter {
    out: String,
    states: Vec<WState>,
    config: WriteConfig,
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonWriter {
    pub fn new() -> Self {
        Self::with_config(WriteConfig::default())
    }

    pub fn with_config(config: WriteConfig) -> Self {
        JsonWriter {
            out: String::new(),
            states: vec![WState::Root { written: false }],
            config,
        }
    }

    /// Yield the document written so far, resetting the writer.
    pub fn take_output(&mut self) -> String {
        self.states.clear();
        self.states.push(WState::Root { written: false });
        std::mem::take(&mut self.out)
    }

    pub fn nesting(&self) -> usize {
        self.states.len() - 1
    }

    fn top(&self) -> WState {
        *self.states.last().expect("write state stack never empty")
    }

    fn indent(&self, depth: usize) -> String {
        "  ".repeat(depth)
    }

    /// Separator before the next item (key in objects, value in arrays).
    fn item_prefix(&mut self, count: usize) {
        match self.config.style {
            WriteStyle::Default => {
                if count > 0 {
                    self.out.push(',');
                }
                self.out.push('\n');
                let indent = self.indent(self.nesting());
                self.out.push_str(&indent);
            }
            WriteStyle::Compact => {
                if count > 0 {
                    self.out.push(',');
                }
            }
            WriteStyle::Condensed => {
                if count > 0 {
                    self.out.push_str(", ");
                }
            }
        }
    }

    fn key_suffix(&mut self) {
        match self.config.style {
            WriteStyle::Compact => self.out.push(':'),
            _ => self.out.push_str(": "),
        }
    }

    /// Position the writer for a value, refusing values at key position.
    fn begin_value(&mut self) -> Result<()> {
        match self.top() {
            WState::Root { written: true } => fail!(rw::ALREADY_ENDED),
            WState::Root { written: false } => Ok(()),
            WState::Object { at_value: false, .. } => fail!(json::KEY_MUST_BE_STRING),
            WState::Object { at_value: true, .. } => Ok(()),
            WState::Array { count } => {
                self.item_prefix(count);
                Ok(())
            }
        }
    }

    /// Bookkeeping after one complete value at the current position.
    fn end_value(&mut self) {
        match self.states.last_mut().expect("write state stack never empty") {
            WState::Root { written } => *written = true,
            WState::Object { at_value, count } => {
                debug_assert!(*at_value);
                *at_value = false;
                *count += 1;
            }
            WState::Array { count } => *count += 1,
        }
    }

    fn write_scalar(&mut self, text: &str) -> Result<()> {
        self.begin_value()?;
        self.out.push_str(text);
        self.end_value();
        Ok(())
    }

    /// Write a string-shaped token: a key when the top object awaits one,
    /// a plain string value otherwise.
    fn write_string_shaped(&mut self, s: &str) -> Result<()> {
        match self.top() {
            WState::Object { at_value: false, count } => {
                self.item_prefix(count);
                write_escaped(&mut self.out, s);
                self.key_suffix();
                match self.states.last_mut().expect("write state stack never empty") {
                    WState::Object { at_value, .. } => *at_value = true,
                    _ => unreachable!("top checked as object"),
                }
                Ok(())
            }
            _ => {
                self.begin_value()?;
                write_escaped(&mut self.out, s);
                self.end_value();
                Ok(())
            }
        }
    }

    fn open_container(&mut self, open: char, state: WState) -> Result<()> {
        self.begin_value()?;
        self.out.push(open);
        self.states.push(state);
        Ok(())
    }

    fn close_container(&mut self, close: char, count: usize) {
        if self.config.style == WriteStyle::Default && count > 0 {
            self.out.push('\n');
            let indent = self.indent(self.nesting() - 1);
            self.out.push_str(&indent);
        }
        self.out.push(close);
        self.states.pop();
        self.end_value();
    }

    fn write_object_root(&mut self) -> Result<()> {
        self.open_container(
            '{',
            WState::Object {
                at_value: false,
                count: 0,
            },
        )
    }

    fn write_object_end(&mut self) -> Result<()> {
        match self.top() {
            WState::Object { at_value: false, count } => {
                self.close_container('}', count);
                Ok(())
            }
            _ => diag::no_entry(),
        }
    }

    fn write_array_shaped_root(&mut self) -> Result<()> {
        self.open_container('[', WState::Array { count: 0 })
    }

    fn write_array_shaped_end(&mut self) -> Result<()> {
        match self.top() {
            WState::Array { count } => {
                self.close_container(']', count);
                Ok(())
            }
            _ => diag::no_entry(),
        }
    }

    fn write_double_value(&mut self, v: f64) -> Result<()> {
        // JSON has no rendering for non-finite numbers.
        let text = if v.is_finite() {
            v.to_string()
        } else {
            "null".to_owned()
        };
        self.write_scalar(&text)
    }
}

impl Writer for JsonWriter {
    fn peek_write(&mut self, next: Entry) -> Result<bool> {
        let ok = match self.top() {
            WState::Root { written: true } => next == Entry::Ended,
            WState::Root { written: false } => is_value_entry(next),
            WState::Object { at_value: false, .. } => matches!(
                next,
                Entry::Name | Entry::String | Entry::MapEnd | Entry::StructEnd | Entry::ClassEnd
            ),
            WState::Object { at_value: true, .. } => is_value_entry(next),
            WState::Array { .. } => {
                is_value_entry(next) || matches!(next, Entry::ArrayEnd | Entry::SetEnd)
            }
        };
        Ok(ok)
    }

    fn write_nil(&mut self) -> Result<()> {
        self.write_scalar("null")
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_scalar(if v { "true" } else { "false" })
    }

    fn write_name(&mut self, v: &Name) -> Result<()> {
        self.write_string_shaped(v.as_str())
    }

    fn write_string(&mut self, v: &str) -> Result<()> {
        self.write_string_shaped(v)
    }

    fn write_text(&mut self, v: &str) -> Result<()> {
        self.write_string_shaped(v)
    }

    fn write_int8(&mut self, v: i8) -> Result<()> {
        self.write_scalar(&v.to_string())
    }
    fn write_int16(&mut self, v: i16) -> Result<()> {
        self.write_scalar(&v.to_string())
    }
    fn write_int32(&mut self, v: i32) -> Result<()> {
        self.write_scalar(&v.to_string())
    }
    fn write_int64(&mut self, v: i64) -> Result<()> {
        self.write_scalar(&v.to_string())
    }
    fn write_uint8(&mut self, v: u8) -> Result<()> {
        self.write_scalar(&v.to_string())
    }
    fn write_uint16(&mut self, v: u16) -> Result<()> {
        self.write_scalar(&v.to_string())
    }
    fn write_uint32(&mut self, v: u32) -> Result<()> {
        self.write_scalar(&v.to_string())
    }
    fn write_uint64(&mut self, v: u64) -> Result<()> {
        self.write_scalar(&v.to_string())
    }

    fn write_float(&mut self, v: f32) -> Result<()> {
        self.write_double_value(v as f64)
    }

    fn write_double(&mut self, v: f64) -> Result<()> {
        self.write_double_value(v)
    }

    fn write_map_root(&mut self) -> Result<()> {
        self.write_object_root()
    }
    fn write_map_end(&mut self) -> Result<()> {
        self.write_object_end()
    }

    fn write_struct_root(&mut self, _name: &Name) -> Result<()> {
        self.write_object_root()
    }
    fn write_struct_end(&mut self, _name: &Name) -> Result<()> {
        self.write_object_end()
    }

    fn write_array_root(&mut self) -> Result<()> {
        self.write_array_shaped_root()
    }
    fn write_array_end(&mut self) -> Result<()> {
        self.write_array_shaped_end()
    }

    fn write_set_root(&mut self) -> Result<()> {
        self.write_array_shaped_root()
    }
    fn write_set_end(&mut self) -> Result<()> {
        self.write_array_shaped_end()
    }

    fn id(&self) -> &'static str {
        "JsonWriter"
    }
}

fn is_value_entry(entry: Entry) -> bool {
    entry.is_numeric()
        || entry.is_root()
        || matches!(
            entry,
            Entry::Nil | Entry::Bool | Entry::Name | Entry::String | Entry::Text | Entry::Enum
        )
}

fn write_escaped(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::WriteStyle;
    use diag::ScopedEnv;
    use pretty_assertions::assert_eq;

    fn compact() -> JsonWriter {
        JsonWriter::with_config(WriteConfig {
            style: WriteStyle::Compact,
        })
    }

    #[test]
    fn test_compact_object() {
        let _env = ScopedEnv::new();
        let mut w = compact();
        w.write_map_root().unwrap();
        w.write_name(&Name::new("a")).unwrap();
        w.write_int32(1).unwrap();
        w.write_name(&Name::new("b")).unwrap();
        w.write_string("x").unwrap();
        w.write_name(&Name::new("c")).unwrap();
        w.write_bool(true).unwrap();
        w.write_name(&Name::new("d")).unwrap();
        w.write_nil().unwrap();
        w.write_map_end().unwrap();

        assert_eq!(w.take_output(), r#"{"a":1,"b":"x","c":true,"d":null}"#);
    }

    #[test]
    fn test_default_style_indents() {
        let _env = ScopedEnv::new();
        let mut w = JsonWriter::new();
        w.write_map_root().unwrap();
        w.write_name(&Name::new("items")).unwrap();
        w.write_array_root().unwrap();
        w.write_int32(1).unwrap();
        w.write_int32(2).unwrap();
        w.write_array_end().unwrap();
        w.write_map_end().unwrap();

        assert_eq!(
            w.take_output(),
            "{\n  \"items\": [\n    1,\n    2\n  ]\n}"
        );
    }

    #[test]
    fn test_condensed_style() {
        let _env = ScopedEnv::new();
        let mut w = JsonWriter::with_config(WriteConfig {
            style: WriteStyle::Condensed,
        });
        w.write_map_root().unwrap();
        w.write_name(&Name::new("a")).unwrap();
        w.write_int32(1).unwrap();
        w.write_name(&Name::new("b")).unwrap();
        w.write_array_root().unwrap();
        w.write_bool(false).unwrap();
        w.write_nil().unwrap();
        w.write_array_end().unwrap();
        w.write_map_end().unwrap();

        assert_eq!(w.take_output(), r#"{"a": 1, "b": [false, null]}"#);
    }

    #[test]
    fn test_empty_containers_stay_tight() {
        let _env = ScopedEnv::new();
        let mut w = JsonWriter::new();
        w.write_map_root().unwrap();
        w.write_name(&Name::new("o")).unwrap();
        w.write_map_root().unwrap();
        w.write_map_end().unwrap();
        w.write_name(&Name::new("a")).unwrap();
        w.write_array_root().unwrap();
        w.write_array_end().unwrap();
        w.write_map_end().unwrap();

        assert_eq!(w.take_output(), "{\n  \"o\": {},\n  \"a\": []\n}");
    }

    #[test]
    fn test_key_must_be_string() {
        let _env = ScopedEnv::new();
        diag::with_env(|env| env.expect_fail = true);
        let mut w = compact();
        w.write_map_root().unwrap();
        let err = w.write_int32(1).unwrap_err();
        assert_eq!(err.code, diag::json::KEY_MUST_BE_STRING);
    }

    #[test]
    fn test_string_escapes() {
        let _env = ScopedEnv::new();
        let mut w = compact();
        w.write_string("a\"b\\c\nd\u{1}").unwrap();
        assert_eq!(w.take_output(), r#""a\"b\\c\nd\u0001""#);
    }

    #[test]
    fn test_set_emits_array() {
        let _env = ScopedEnv::new();
        let mut w = compact();
        w.write_set_root().unwrap();
        w.write_int32(3).unwrap();
        w.write_int32(5).unwrap();
        w.write_set_end().unwrap();
        assert_eq!(w.take_output(), "[3,5]");
    }

    #[test]
    fn test_peek_write_positions() {
        let _env = ScopedEnv::new();
        let mut w = compact();
        assert!(w.peek_write(Entry::MapRoot).unwrap());
        w.write_map_root().unwrap();
        assert!(w.peek_write(Entry::Name).unwrap());
        assert!(w.peek_write(Entry::MapEnd).unwrap());
        assert!(!w.peek_write(Entry::Int32).unwrap());
        w.write_name(&Name::new("k")).unwrap();
        assert!(w.peek_write(Entry::Int32).unwrap());
        assert!(!w.peek_write(Entry::MapEnd).unwrap());
    }
}
