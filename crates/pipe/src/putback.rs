use crate::{DataVariant, Entry, EnumValue, Name, Reader, Value};
use diag::{fail, rw, Diagnostic, Highlight, Result};

/// Wraps any `Reader` with a small LIFO of pre-decoded entries, letting a
/// handler "un-see" values it consumed while deciding how to dispatch.
///
/// Which reads may be satisfied from the stack is fixed policy: scalar
/// kinds carry their payload back; map/array roots and ends are honored as
/// data-type-only slots; struct and set roots/ends and blobs must always
/// come from the underlying reader.
pub struct PutbackReader<'r> {
    pub reader: &'r mut dyn Reader,
    cached: Vec<DataVariant>,
}

macro_rules! cached_read {
    ($fn_name:ident, $ret:ty, $entry:expr, $variant:path) => {
        fn $fn_name(&mut self) -> Result<$ret> {
            if self.cached.is_empty() {
                return self.reader.$fn_name();
            }
            match self.pop_cached($entry)? {
                $variant(v) => Ok(v),
                _ => diag::no_entry(),
            }
        }
    };
}

macro_rules! type_only_read {
    ($fn_name:ident, $entry:expr) => {
        fn $fn_name(&mut self) -> Result<()> {
            match self.cached.pop() {
                None => self.reader.$fn_name(),
                Some(variant) if variant.entry == $entry => Ok(()),
                Some(variant) => fail!(rw::DATA_TYPE_MISMATCH, $entry, variant.entry),
            }
        }
    };
}

macro_rules! forbidden_read {
    ($fn_name:ident, $ret:ty, $entry:expr) => {
        fn $fn_name(&mut self) -> Result<$ret> {
            if !self.cached.is_empty() {
                return fail!(rw::CANT_USE_PUTBACK_VALUE, $entry);
            }
            self.reader.$fn_name()
        }
    };
}

impl<'r> PutbackReader<'r> {
    pub fn new(reader: &'r mut dyn Reader) -> Self {
        PutbackReader {
            reader,
            cached: Vec::new(),
        }
    }

    /// Put back an entry tag alone. Only structural reads will honor it.
    pub fn putback(&mut self, entry: Entry) {
        self.cached.push(DataVariant::type_only(entry));
    }

    /// Put back a value; the matching read will yield it again.
    pub fn putback_value(&mut self, value: Value) {
        self.cached.push(value.into());
    }

    pub fn cached_num(&self) -> usize {
        self.cached.len()
    }

    fn pop_cached(&mut self, expected: Entry) -> Result<Value> {
        let variant = self.cached.pop().expect("putback stack checked non-empty");
        if variant.entry != expected {
            return fail!(rw::DATA_TYPE_MISMATCH, expected, variant.entry);
        }
        match variant.value {
            Some(value) => Ok(value),
            None => fail!(rw::CANT_USE_PUTBACK_VALUE, expected),
        }
    }
}

impl Reader for PutbackReader<'_> {
    fn peek(&mut self) -> Result<Entry> {
        match self.cached.last() {
            Some(variant) => Ok(variant.entry),
            None => self.reader.peek(),
        }
    }

    fn read_nil(&mut self) -> Result<()> {
        if self.cached.is_empty() {
            return self.reader.read_nil();
        }
        match self.pop_cached(Entry::Nil)? {
            Value::Nil => Ok(()),
            _ => diag::no_entry(),
        }
    }

    cached_read!(read_bool, bool, Entry::Bool, Value::Bool);
    cached_read!(read_name, Name, Entry::Name, Value::Name);
    cached_read!(read_string, String, Entry::String, Value::String);
    cached_read!(read_text, String, Entry::Text, Value::Text);
    cached_read!(read_enum, EnumValue, Entry::Enum, Value::Enum);

    cached_read!(read_int8, i8, Entry::Int8, Value::Int8);
    cached_read!(read_int16, i16, Entry::Int16, Value::Int16);
    cached_read!(read_int32, i32, Entry::Int32, Value::Int32);
    cached_read!(read_int64, i64, Entry::Int64, Value::Int64);
    cached_read!(read_uint8, u8, Entry::UInt8, Value::UInt8);
    cached_read!(read_uint16, u16, Entry::UInt16, Value::UInt16);
    cached_read!(read_uint32, u32, Entry::UInt32, Value::UInt32);
    cached_read!(read_uint64, u64, Entry::UInt64, Value::UInt64);
    cached_read!(read_float, f32, Entry::Float, Value::Float);
    cached_read!(read_double, f64, Entry::Double, Value::Double);

    type_only_read!(read_map_root, Entry::MapRoot);
    type_only_read!(read_map_end, Entry::MapEnd);
    type_only_read!(read_array_root, Entry::ArrayRoot);
    type_only_read!(read_array_end, Entry::ArrayEnd);

    forbidden_read!(read_struct_root, Name, Entry::StructRoot);
    forbidden_read!(read_struct_end, Name, Entry::StructEnd);
    forbidden_read!(read_set_root, (), Entry::SetRoot);
    forbidden_read!(read_set_end, (), Entry::SetEnd);
    forbidden_read!(read_blob, Vec<u8>, Entry::Blob);

    fn coercion(&mut self, to_entry: Entry) -> bool {
        if !self.cached.is_empty() {
            return false;
        }
        self.reader.coercion(to_entry)
    }

    fn format_diagnostic(&self, diag: &mut Diagnostic) {
        self.reader.format_diagnostic(diag);
        if !self.cached.is_empty() {
            diag.push(diag::Arg::Highlight(Highlight::new(
                self.id(),
                format!("(putback: {})", self.cached.len()),
            )));
        }
    }

    fn id(&self) -> &'static str {
        "PutbackReader"
    }
}
