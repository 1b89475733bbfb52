use std::fmt;

/// The closed alphabet of typed tokens exchanged between readers and
/// writers. This is the single ABI of the pipeline: every reader produces
/// it and every writer consumes it, whatever the backing representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entry {
    None,
    Nil,
    Bool,
    Name,
    String,
    Text,
    Enum,

    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,

    StructRoot,
    StructEnd,
    ClassRoot,
    ClassEnd,
    MapRoot,
    MapEnd,
    ArrayRoot,
    ArrayEnd,
    SetRoot,
    SetEnd,

    // Host-engine reference kinds. Part of the alphabet for compatibility;
    // this core carries no reader/writer surface for them.
    ObjectReference,
    ClassReference,
    WeakObjectReference,
    LazyObjectReference,
    SoftObjectReference,
    SoftClassReference,
    InterfaceReference,
    Delegate,
    MulticastInlineDelegate,
    MulticastSparseDelegate,
    FieldPath,

    Blob,
    Ended,
}

impl Entry {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Entry::Int8
                | Entry::Int16
                | Entry::Int32
                | Entry::Int64
                | Entry::UInt8
                | Entry::UInt16
                | Entry::UInt32
                | Entry::UInt64
                | Entry::Float
                | Entry::Double
        )
    }

    pub fn is_root(self) -> bool {
        matches!(
            self,
            Entry::StructRoot | Entry::ClassRoot | Entry::MapRoot | Entry::ArrayRoot | Entry::SetRoot
        )
    }

    pub fn is_end(self) -> bool {
        matches!(
            self,
            Entry::StructEnd | Entry::ClassEnd | Entry::MapEnd | Entry::ArrayEnd | Entry::SetEnd
        )
    }

    /// The end entry balancing a root entry.
    pub fn matching_end(self) -> Option<Entry> {
        match self {
            Entry::StructRoot => Some(Entry::StructEnd),
            Entry::ClassRoot => Some(Entry::ClassEnd),
            Entry::MapRoot => Some(Entry::MapEnd),
            Entry::ArrayRoot => Some(Entry::ArrayEnd),
            Entry::SetRoot => Some(Entry::SetEnd),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Entry::None => "None",
            Entry::Nil => "Nil",
            Entry::Bool => "Bool",
            Entry::Name => "Name",
            Entry::String => "String",
            Entry::Text => "Text",
            Entry::Enum => "Enum",
            Entry::Int8 => "Int8",
            Entry::Int16 => "Int16",
            Entry::Int32 => "Int32",
            Entry::Int64 => "Int64",
            Entry::UInt8 => "UInt8",
            Entry::UInt16 => "UInt16",
            Entry::UInt32 => "UInt32",
            Entry::UInt64 => "UInt64",
            Entry::Float => "Float",
            Entry::Double => "Double",
            Entry::StructRoot => "StructRoot",
            Entry::StructEnd => "StructEnd",
            Entry::ClassRoot => "ClassRoot",
            Entry::ClassEnd => "ClassEnd",
            Entry::MapRoot => "MapRoot",
            Entry::MapEnd => "MapEnd",
            Entry::ArrayRoot => "ArrayRoot",
            Entry::ArrayEnd => "ArrayEnd",
            Entry::SetRoot => "SetRoot",
            Entry::SetEnd => "SetEnd",
            Entry::ObjectReference => "ObjectReference",
            Entry::ClassReference => "ClassReference",
            Entry::WeakObjectReference => "WeakObjectReference",
            Entry::LazyObjectReference => "LazyObjectReference",
            Entry::SoftObjectReference => "SoftObjectReference",
            Entry::SoftClassReference => "SoftClassReference",
            Entry::InterfaceReference => "InterfaceReference",
            Entry::Delegate => "Delegate",
            Entry::MulticastInlineDelegate => "MulticastInlineDelegate",
            Entry::MulticastSparseDelegate => "MulticastSparseDelegate",
            Entry::FieldPath => "FieldPath",
            Entry::Blob => "Blob",
            Entry::Ended => "Ended",
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Entry> for diag::Arg {
    fn from(entry: Entry) -> Self {
        diag::Arg::Str(entry.as_str().to_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_entry_classes() {
        assert!(Entry::UInt16.is_numeric());
        assert!(Entry::Double.is_numeric());
        assert!(!Entry::String.is_numeric());

        assert!(Entry::MapRoot.is_root());
        assert!(Entry::SetEnd.is_end());
        assert_eq!(Entry::ArrayRoot.matching_end(), Some(Entry::ArrayEnd));
        assert_eq!(Entry::Bool.matching_end(), None);
    }
}
