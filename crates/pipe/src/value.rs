use crate::{Entry, Name};

/// An enum payload on the wire: the resolved numeric value plus the entry
/// name and owning enum type where known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub ty: Option<Name>,
    pub name: Option<Name>,
    pub value: i64,
    pub is_unsigned: bool,
}

impl EnumValue {
    pub fn signed(value: i64) -> Self {
        EnumValue {
            ty: None,
            name: None,
            value,
            is_unsigned: false,
        }
    }

    pub fn unsigned(value: u64) -> Self {
        EnumValue {
            ty: None,
            name: None,
            value: value as i64,
            is_unsigned: true,
        }
    }
}

/// A decoded entry payload, as buffered by the putback adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Name(Name),
    String(String),
    Text(String),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Enum(EnumValue),
}

impl Value {
    pub fn entry(&self) -> Entry {
        match self {
            Value::Nil => Entry::Nil,
            Value::Bool(_) => Entry::Bool,
            Value::Name(_) => Entry::Name,
            Value::String(_) => Entry::String,
            Value::Text(_) => Entry::Text,
            Value::Int8(_) => Entry::Int8,
            Value::Int16(_) => Entry::Int16,
            Value::Int32(_) => Entry::Int32,
            Value::Int64(_) => Entry::Int64,
            Value::UInt8(_) => Entry::UInt8,
            Value::UInt16(_) => Entry::UInt16,
            Value::UInt32(_) => Entry::UInt32,
            Value::UInt64(_) => Entry::UInt64,
            Value::Float(_) => Entry::Float,
            Value::Double(_) => Entry::Double,
            Value::Enum(_) => Entry::Enum,
        }
    }
}

/// A putback slot: an entry tag with an optional payload. `value: None` is
/// a data-type-only putback, honored only by structural reads.
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariant {
    pub entry: Entry,
    pub value: Option<Value>,
}

impl DataVariant {
    pub fn type_only(entry: Entry) -> Self {
        DataVariant { entry, value: None }
    }
}

impl From<Value> for DataVariant {
    fn from(value: Value) -> Self {
        DataVariant {
            entry: value.entry(),
            value: Some(value),
        }
    }
}
