// Runtime reflection over plain Rust records: a type catalog with typed
// accessors, the `Datum` boundary type, and the property reader/writer pair
// that adapts reflected memory to the entry alphabet.

mod datum;
mod path;
mod reader;
mod types;
mod utils;
mod writer;

pub use datum::{Datum, FieldVariant};
pub use reader::PropertyReader;
pub use writer::PropertyWriter;
pub use types::{
    ArrayType, BlobType, EnumRepr, EnumType, FieldDef, MapType, OptionalType, PropertyKind,
    PropertyType, ScalarItem, SetType, StructBuilder, StructType,
};
pub use utils::{
    find_effective_property_by_index, find_effective_property_by_name, first_effective_property,
    format_property_type_name, format_variant_type_name, is_effective_property,
    is_numeric_property, is_unsigned_property, next_effective_property, property_to_entry,
    try_get_enum_property, try_get_struct, variant_to_entry,
};
