use crate::{Entry, EnumValue, Name};
use diag::{fail, rw, Diagnostic, Result};

macro_rules! default_write {
    ($fn_name:ident, $entry:expr) => {
        fn $fn_name(&mut self) -> Result<()> {
            fail!(rw::DATA_TYPE_MISMATCH, $entry, Entry::None)
        }
    };
    ($fn_name:ident, $arg:ty, $entry:expr) => {
        fn $fn_name(&mut self, _v: $arg) -> Result<()> {
            fail!(rw::DATA_TYPE_MISMATCH, $entry, Entry::None)
        }
    };
}

/// A consumer of the entry alphabet, mirror of `Reader`. `peek_write` asks
/// whether the writer can accept `next` at its current position; concrete
/// writers override the writes they support.
pub trait Writer {
    fn peek_write(&mut self, next: Entry) -> Result<bool>;

    default_write!(write_nil, Entry::Nil);
    default_write!(write_bool, bool, Entry::Bool);
    default_write!(write_name, &Name, Entry::Name);
    default_write!(write_string, &str, Entry::String);
    default_write!(write_text, &str, Entry::Text);
    default_write!(write_enum, &EnumValue, Entry::Enum);

    default_write!(write_int8, i8, Entry::Int8);
    default_write!(write_int16, i16, Entry::Int16);
    default_write!(write_int32, i32, Entry::Int32);
    default_write!(write_int64, i64, Entry::Int64);
    default_write!(write_uint8, u8, Entry::UInt8);
    default_write!(write_uint16, u16, Entry::UInt16);
    default_write!(write_uint32, u32, Entry::UInt32);
    default_write!(write_uint64, u64, Entry::UInt64);
    default_write!(write_float, f32, Entry::Float);
    default_write!(write_double, f64, Entry::Double);

    default_write!(write_struct_root, &Name, Entry::StructRoot);
    default_write!(write_struct_end, &Name, Entry::StructEnd);
    default_write!(write_map_root, Entry::MapRoot);
    default_write!(write_map_end, Entry::MapEnd);
    default_write!(write_array_root, Entry::ArrayRoot);
    default_write!(write_array_end, Entry::ArrayEnd);
    default_write!(write_set_root, Entry::SetRoot);
    default_write!(write_set_end, Entry::SetEnd);

    default_write!(write_blob, &[u8], Entry::Blob);

    /// Append this writer's position highlight to a diagnostic.
    fn format_diagnostic(&self, _diag: &mut Diagnostic) {}

    /// Short identifier used on the env's writer stack and in highlights.
    fn id(&self) -> &'static str {
        "Writer"
    }
}
