use crate::{pipe_visit, skip_read, Entry, EnumValue, Name, PutbackReader, Reader, Value, Writer};
use diag::{fail, rw, Result, ScopedEnv};

/// A scripted reader over a fixed list of entries, for exercising the
/// adapters without a concrete document format behind them.
pub enum Fx {
    Val(Value),
    StructRoot(Name),
    StructEnd(Name),
    MapRoot,
    MapEnd,
    ArrayRoot,
    ArrayEnd,
    SetRoot,
    SetEnd,
    Blob(Vec<u8>),
}

impl Fx {
    fn entry(&self) -> Entry {
        match self {
            Fx::Val(v) => v.entry(),
            Fx::StructRoot(_) => Entry::StructRoot,
            Fx::StructEnd(_) => Entry::StructEnd,
            Fx::MapRoot => Entry::MapRoot,
            Fx::MapEnd => Entry::MapEnd,
            Fx::ArrayRoot => Entry::ArrayRoot,
            Fx::ArrayEnd => Entry::ArrayEnd,
            Fx::SetRoot => Entry::SetRoot,
            Fx::SetEnd => Entry::SetEnd,
            Fx::Blob(_) => Entry::Blob,
        }
    }
}

pub struct FixtureReader {
    items: Vec<Fx>,
    pub cursor: usize,
    pub coerce_ok: bool,
}

impl FixtureReader {
    pub fn new(items: Vec<Fx>) -> Self {
        FixtureReader {
            items,
            cursor: 0,
            coerce_ok: false,
        }
    }

    fn next(&mut self, expected: Entry) -> Result<&Fx> {
        match self.items.get(self.cursor) {
            None => fail!(rw::ALREADY_ENDED),
            Some(item) if item.entry() == expected => {
                self.cursor += 1;
                Ok(&self.items[self.cursor - 1])
            }
            Some(item) => fail!(rw::DATA_TYPE_MISMATCH, expected, item.entry()),
        }
    }

    fn next_value(&mut self, expected: Entry) -> Result<Value> {
        match self.next(expected)? {
            Fx::Val(v) => Ok(v.clone()),
            _ => diag::no_entry(),
        }
    }
}

macro_rules! fixture_read {
    ($fn_name:ident, $ret:ty, $entry:expr, $variant:path) => {
        fn $fn_name(&mut self) -> Result<$ret> {
            match self.next_value($entry)? {
                $variant(v) => Ok(v),
                _ => diag::no_entry(),
            }
        }
    };
}

impl Reader for FixtureReader {
    fn peek(&mut self) -> Result<Entry> {
        Ok(self
            .items
            .get(self.cursor)
            .map(Fx::entry)
            .unwrap_or(Entry::Ended))
    }

    fn read_nil(&mut self) -> Result<()> {
        self.next(Entry::Nil).map(|_| ())
    }

    fixture_read!(read_bool, bool, Entry::Bool, Value::Bool);
    fixture_read!(read_name, Name, Entry::Name, Value::Name);
    fixture_read!(read_string, String, Entry::String, Value::String);
    fixture_read!(read_text, String, Entry::Text, Value::Text);
    fixture_read!(read_enum, EnumValue, Entry::Enum, Value::Enum);
    fixture_read!(read_int32, i32, Entry::Int32, Value::Int32);
    fixture_read!(read_int64, i64, Entry::Int64, Value::Int64);
    fixture_read!(read_uint8, u8, Entry::UInt8, Value::UInt8);
    fixture_read!(read_uint64, u64, Entry::UInt64, Value::UInt64);
    fixture_read!(read_double, f64, Entry::Double, Value::Double);

    fn read_struct_root(&mut self) -> Result<Name> {
        match self.next(Entry::StructRoot)? {
            Fx::StructRoot(n) => Ok(n.clone()),
            _ => diag::no_entry(),
        }
    }

    fn read_struct_end(&mut self) -> Result<Name> {
        match self.next(Entry::StructEnd)? {
            Fx::StructEnd(n) => Ok(n.clone()),
            _ => diag::no_entry(),
        }
    }

    fn read_map_root(&mut self) -> Result<()> {
        self.next(Entry::MapRoot).map(|_| ())
    }
    fn read_map_end(&mut self) -> Result<()> {
        self.next(Entry::MapEnd).map(|_| ())
    }
    fn read_array_root(&mut self) -> Result<()> {
        self.next(Entry::ArrayRoot).map(|_| ())
    }
    fn read_array_end(&mut self) -> Result<()> {
        self.next(Entry::ArrayEnd).map(|_| ())
    }
    fn read_set_root(&mut self) -> Result<()> {
        self.next(Entry::SetRoot).map(|_| ())
    }
    fn read_set_end(&mut self) -> Result<()> {
        self.next(Entry::SetEnd).map(|_| ())
    }

    fn read_blob(&mut self) -> Result<Vec<u8>> {
        match self.next(Entry::Blob)? {
            Fx::Blob(b) => Ok(b.clone()),
            _ => diag::no_entry(),
        }
    }

    fn coercion(&mut self, _to_entry: Entry) -> bool {
        self.coerce_ok
    }

    fn id(&self) -> &'static str {
        "FixtureReader"
    }
}

/// Collects forwarded entries; optionally refuses one entry kind.
struct CollectWriter {
    entries: Vec<Entry>,
    reject: Option<Entry>,
}

impl CollectWriter {
    fn new() -> Self {
        CollectWriter {
            entries: Vec::new(),
            reject: None,
        }
    }
}

macro_rules! collect_write {
    ($fn_name:ident, $entry:expr) => {
        fn $fn_name(&mut self) -> Result<()> {
            self.entries.push($entry);
            Ok(())
        }
    };
    ($fn_name:ident, $arg:ty, $entry:expr) => {
        fn $fn_name(&mut self, _v: $arg) -> Result<()> {
            self.entries.push($entry);
            Ok(())
        }
    };
}

impl Writer for CollectWriter {
    fn peek_write(&mut self, next: Entry) -> Result<bool> {
        Ok(Some(next) != self.reject)
    }

    collect_write!(write_nil, Entry::Nil);
    collect_write!(write_bool, bool, Entry::Bool);
    collect_write!(write_name, &Name, Entry::Name);
    collect_write!(write_string, &str, Entry::String);
    collect_write!(write_int32, i32, Entry::Int32);
    collect_write!(write_double, f64, Entry::Double);
    collect_write!(write_struct_root, &Name, Entry::StructRoot);
    collect_write!(write_struct_end, &Name, Entry::StructEnd);
    collect_write!(write_map_root, Entry::MapRoot);
    collect_write!(write_map_end, Entry::MapEnd);
    collect_write!(write_array_root, Entry::ArrayRoot);
    collect_write!(write_array_end, Entry::ArrayEnd);
}

#[test]
fn test_putback_law() {
    let _env = ScopedEnv::new();
    let mut fixture = FixtureReader::new(vec![
        Fx::Val(Value::Bool(true)),
        Fx::Val(Value::Int32(5)),
    ]);
    let mut putback = PutbackReader::new(&mut fixture);

    assert_eq!(putback.read_bool().unwrap(), true);
    putback.putback_value(Value::Bool(true));

    // The re-read yields the same value without touching the underlying
    // reader again.
    assert_eq!(putback.peek().unwrap(), Entry::Bool);
    assert_eq!(putback.read_bool().unwrap(), true);
    assert_eq!(putback.cached_num(), 0);

    assert_eq!(putback.read_int32().unwrap(), 5);
    assert_eq!(fixture.cursor, 2);
}

#[test]
fn test_putback_stack_is_lifo() {
    let _env = ScopedEnv::new();
    let mut fixture = FixtureReader::new(vec![]);
    let mut putback = PutbackReader::new(&mut fixture);

    putback.putback_value(Value::String("first".to_owned()));
    putback.putback_value(Value::Int32(2));

    assert_eq!(putback.read_int32().unwrap(), 2);
    assert_eq!(putback.read_string().unwrap(), "first");
    assert_eq!(putback.peek().unwrap(), Entry::Ended);
}

#[test]
fn test_putback_type_mismatch() {
    let _env = ScopedEnv::new();
    diag::with_env(|env| env.expect_fail = true);
    let mut fixture = FixtureReader::new(vec![]);
    let mut putback = PutbackReader::new(&mut fixture);

    putback.putback_value(Value::Int32(1));
    let err = putback.read_bool().unwrap_err();
    assert_eq!(err.code, rw::DATA_TYPE_MISMATCH);
}

#[test]
fn test_type_only_putback_roots() {
    let _env = ScopedEnv::new();
    diag::with_env(|env| env.expect_fail = true);
    let mut fixture = FixtureReader::new(vec![]);
    let mut putback = PutbackReader::new(&mut fixture);

    putback.putback(Entry::MapRoot);
    assert_eq!(putback.peek().unwrap(), Entry::MapRoot);
    putback.read_map_root().unwrap();

    // A data-type-only scalar cannot be read back as a value.
    putback.putback(Entry::Bool);
    let err = putback.read_bool().unwrap_err();
    assert_eq!(err.code, rw::CANT_USE_PUTBACK_VALUE);
}

#[test]
fn test_structural_reads_forbidden_from_putback() {
    let _env = ScopedEnv::new();
    diag::with_env(|env| env.expect_fail = true);
    let mut fixture = FixtureReader::new(vec![Fx::StructRoot(Name::new("S"))]);
    let mut putback = PutbackReader::new(&mut fixture);

    putback.putback_value(Value::Int32(1));
    let err = putback.read_struct_root().unwrap_err();
    assert_eq!(err.code, rw::CANT_USE_PUTBACK_VALUE);

    // Drained stack forwards again.
    assert_eq!(putback.read_int32().unwrap(), 1);
    assert_eq!(putback.read_struct_root().unwrap(), Name::new("S"));
}

#[test]
fn test_coercion_muted_while_stack_nonempty() {
    let _env = ScopedEnv::new();
    let mut fixture = FixtureReader::new(vec![]);
    fixture.coerce_ok = true;
    let mut putback = PutbackReader::new(&mut fixture);

    assert!(putback.coercion(Entry::Name));
    putback.putback_value(Value::Int32(1));
    assert!(!putback.coercion(Entry::Name));
}

#[test]
fn test_skip_balanced_value() {
    let _env = ScopedEnv::new();
    let mut fixture = FixtureReader::new(vec![
        Fx::ArrayRoot,
        Fx::Val(Value::Int32(1)),
        Fx::MapRoot,
        Fx::Val(Value::Name(Name::new("k"))),
        Fx::Val(Value::Double(2.0)),
        Fx::MapEnd,
        Fx::ArrayEnd,
        Fx::Val(Value::Bool(true)),
    ]);

    skip_read(&mut fixture).unwrap();
    assert_eq!(fixture.peek().unwrap(), Entry::Bool);
}

#[test]
fn test_skip_out_of_range() {
    let _env = ScopedEnv::new();
    diag::with_env(|env| env.expect_fail = true);

    let mut ended = FixtureReader::new(vec![]);
    assert_eq!(
        skip_read(&mut ended).unwrap_err().code,
        rw::SKIP_OUT_OF_RANGE
    );

    // Skipping from just-inside a container end is also out of range.
    let mut at_end = FixtureReader::new(vec![Fx::ArrayEnd]);
    assert_eq!(
        skip_read(&mut at_end).unwrap_err().code,
        rw::SKIP_OUT_OF_RANGE
    );
}

#[test]
fn test_pipe_visit_forwards_everything() {
    let _env = ScopedEnv::new();
    let mut fixture = FixtureReader::new(vec![
        Fx::StructRoot(Name::new("S")),
        Fx::Val(Value::Name(Name::new("a"))),
        Fx::ArrayRoot,
        Fx::Val(Value::Int32(1)),
        Fx::Val(Value::Int32(2)),
        Fx::ArrayEnd,
        Fx::StructEnd(Name::new("S")),
    ]);
    let mut writer = CollectWriter::new();

    pipe_visit(&mut fixture, &mut writer).unwrap();
    assert_eq!(
        writer.entries,
        vec![
            Entry::StructRoot,
            Entry::Name,
            Entry::ArrayRoot,
            Entry::Int32,
            Entry::Int32,
            Entry::ArrayEnd,
            Entry::StructEnd,
        ]
    );
}

#[test]
fn test_pipe_visit_mismatch() {
    let _env = ScopedEnv::new();
    diag::with_env(|env| env.expect_fail = true);
    let mut fixture = FixtureReader::new(vec![Fx::MapRoot, Fx::MapEnd]);
    let mut writer = CollectWriter::new();
    writer.reject = Some(Entry::MapRoot);

    let err = pipe_visit(&mut fixture, &mut writer).unwrap_err();
    assert_eq!(err.code, rw::PIPE_READ_WRITE_MISMATCH);
}

#[test]
fn test_failed_operation_appends_diagnostic() {
    let _env = ScopedEnv::new();
    diag::with_env(|env| env.expect_fail = true);

    let before = diag::with_env(|env| env.diagnostics.len());
    let mut fixture = FixtureReader::new(vec![]);
    fixture.read_bool().unwrap_err();
    let after = diag::with_env(|env| env.diagnostics.len());
    assert_eq!(after, before + 1);
}
