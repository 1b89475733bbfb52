use crate::{Entry, EnumValue, Name};
use diag::{fail, rw, Diagnostic, Result};

macro_rules! default_read {
    ($fn_name:ident, $ret:ty, $entry:expr) => {
        fn $fn_name(&mut self) -> Result<$ret> {
            let actual = self.peek().unwrap_or(Entry::None);
            fail!(rw::DATA_TYPE_MISMATCH, $entry, actual)
        }
    };
}

/// A producer of the entry alphabet. Concrete readers override the reads
/// they can satisfy; everything else fails with a type mismatch against the
/// peeked entry.
///
/// `peek` returns the next entry tag without consuming it; every `read_*`
/// consumes exactly one entry and yields its payload.
pub trait Reader {
    fn peek(&mut self) -> Result<Entry>;

    default_read!(read_nil, (), Entry::Nil);
    default_read!(read_bool, bool, Entry::Bool);
    default_read!(read_name, Name, Entry::Name);
    default_read!(read_string, String, Entry::String);
    default_read!(read_text, String, Entry::Text);
    default_read!(read_enum, EnumValue, Entry::Enum);

    default_read!(read_int8, i8, Entry::Int8);
    default_read!(read_int16, i16, Entry::Int16);
    default_read!(read_int32, i32, Entry::Int32);
    default_read!(read_int64, i64, Entry::Int64);
    default_read!(read_uint8, u8, Entry::UInt8);
    default_read!(read_uint16, u16, Entry::UInt16);
    default_read!(read_uint32, u32, Entry::UInt32);
    default_read!(read_uint64, u64, Entry::UInt64);
    default_read!(read_float, f32, Entry::Float);
    default_read!(read_double, f64, Entry::Double);

    default_read!(read_struct_root, Name, Entry::StructRoot);
    default_read!(read_struct_end, Name, Entry::StructEnd);
    default_read!(read_map_root, (), Entry::MapRoot);
    default_read!(read_map_end, (), Entry::MapEnd);
    default_read!(read_array_root, (), Entry::ArrayRoot);
    default_read!(read_array_end, (), Entry::ArrayEnd);
    default_read!(read_set_root, (), Entry::SetRoot);
    default_read!(read_set_end, (), Entry::SetEnd);

    default_read!(read_blob, Vec<u8>, Entry::Blob);

    /// Whether the value about to be read may be re-read as `to_entry`
    /// instead of the peeked entry.
    fn coercion(&mut self, _to_entry: Entry) -> bool {
        false
    }

    /// Append this reader's position highlight to a diagnostic.
    fn format_diagnostic(&self, _diag: &mut Diagnostic) {}

    /// Short identifier used on the env's reader stack and in highlights.
    fn id(&self) -> &'static str {
        "Reader"
    }
}
