//! The runtime type catalog: property types, struct layouts with typed
//! accessors, enum tables, and the ops vtables that let container fields be
//! manipulated behind `dyn Any`.

use diag::{fail, rw, Result};
use pipe::{Name, Value};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Discriminant of `PropertyType`; the dispatch key for field-class
/// handler registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Bool,
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
    Str,
    Name,
    Text,
    Blob,
    Enum,
    Struct,
    Array,
    Map,
    Set,
    Optional,
}

impl PropertyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyKind::Bool => "Bool",
            PropertyKind::Int8 => "Int8",
            PropertyKind::Int16 => "Int16",
            PropertyKind::Int32 => "Int32",
            PropertyKind::Int64 => "Int64",
            PropertyKind::UInt8 => "UInt8",
            PropertyKind::UInt16 => "UInt16",
            PropertyKind::UInt32 => "UInt32",
            PropertyKind::UInt64 => "UInt64",
            PropertyKind::Float => "Float",
            PropertyKind::Double => "Double",
            PropertyKind::Str => "Str",
            PropertyKind::Name => "Name",
            PropertyKind::Text => "Text",
            PropertyKind::Blob => "Blob",
            PropertyKind::Enum => "Enum",
            PropertyKind::Struct => "Struct",
            PropertyKind::Array => "Array",
            PropertyKind::Map => "Map",
            PropertyKind::Set => "Set",
            PropertyKind::Optional => "Optional",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The static type of one reflected field.
#[derive(Clone)]
pub enum PropertyType {
    Bool,
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
    Str,
    Name,
    Text,
    Blob(Arc<BlobType>),
    Enum(Arc<EnumType>),
    Struct(Arc<StructType>),
    Array(Arc<ArrayType>),
    Map(Arc<MapType>),
    Set(Arc<SetType>),
    Optional(Arc<OptionalType>),
}

impl PropertyType {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyType::Bool => PropertyKind::Bool,
            PropertyType::Int8 => PropertyKind::Int8,
            PropertyType::Int16 => PropertyKind::Int16,
            PropertyType::Int32 => PropertyKind::Int32,
            PropertyType::Int64 => PropertyKind::Int64,
            PropertyType::UInt8 => PropertyKind::UInt8,
            PropertyType::UInt16 => PropertyKind::UInt16,
            PropertyType::UInt32 => PropertyKind::UInt32,
            PropertyType::UInt64 => PropertyKind::UInt64,
            PropertyType::Float => PropertyKind::Float,
            PropertyType::Double => PropertyKind::Double,
            PropertyType::Str => PropertyKind::Str,
            PropertyType::Name => PropertyKind::Name,
            PropertyType::Text => PropertyKind::Text,
            PropertyType::Blob(_) => PropertyKind::Blob,
            PropertyType::Enum(_) => PropertyKind::Enum,
            PropertyType::Struct(_) => PropertyKind::Struct,
            PropertyType::Array(_) => PropertyKind::Array,
            PropertyType::Map(_) => PropertyKind::Map,
            PropertyType::Set(_) => PropertyKind::Set,
            PropertyType::Optional(_) => PropertyKind::Optional,
        }
    }
}

impl fmt::Debug for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::format_property_type_name(self))
    }
}

pub(crate) type Accessor =
    Box<dyn (for<'x> Fn(&'x mut dyn Any) -> &'x mut dyn Any) + Send + Sync>;

/// One field of a reflected struct: its name, static type, and the typed
/// accessor captured at registration.
pub struct FieldDef {
    pub name: Name,
    pub ty: PropertyType,
    access: Option<Accessor>,
}

impl FieldDef {
    /// A dispatch-only field with no backing storage, used to route
    /// container inners and optional inners through the handler registry.
    pub fn synthetic(name: Name, ty: PropertyType) -> Arc<FieldDef> {
        Arc::new(FieldDef {
            name,
            ty,
            access: None,
        })
    }

    pub fn access<'p>(&self, parent: &'p mut dyn Any) -> Result<&'p mut dyn Any> {
        match &self.access {
            Some(access) => Ok(access(parent)),
            None => diag::no_entry(),
        }
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish()
    }
}

/// A reflected record type: an ordered field list plus identity.
pub struct StructType {
    pub name: Name,
    pub fields: Vec<Arc<FieldDef>>,
}

impl StructType {
    pub fn builder<T: Any>(name: &str) -> StructBuilder<T> {
        StructBuilder {
            name: Name::new(name),
            fields: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn find_field(&self, name: &Name) -> Option<Arc<FieldDef>> {
        self.fields.iter().find(|f| &f.name == name).cloned()
    }
}

impl fmt::Debug for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

pub struct StructBuilder<T: Any> {
    name: Name,
    fields: Vec<Arc<FieldDef>>,
    _marker: PhantomData<fn(&mut T)>,
}

impl<T: Any> StructBuilder<T> {
    pub fn field<F: Any>(
        mut self,
        name: &str,
        ty: PropertyType,
        access: fn(&mut T) -> &mut F,
    ) -> Self {
        let accessor: Accessor = Box::new(move |parent: &mut dyn Any| {
            let parent = parent
                .downcast_mut::<T>()
                .expect("accessor applied to its owning struct type");
            access(parent) as &mut dyn Any
        });
        self.fields.push(Arc::new(FieldDef {
            name: Name::new(name),
            ty,
            access: Some(accessor),
        }));
        self
    }

    pub fn build(self) -> Arc<StructType> {
        Arc::new(StructType {
            name: self.name,
            fields: self.fields,
        })
    }
}

//	enums

/// Conversion between an enum's underlying integer storage and `i64`.
pub trait EnumRepr: Any + Copy {
    const UNSIGNED: bool;
    fn from_i64(v: i64) -> Self;
    fn to_i64(self) -> i64;
}

macro_rules! enum_repr {
    ($ty:ty, $unsigned:expr) => {
        impl EnumRepr for $ty {
            const UNSIGNED: bool = $unsigned;
            fn from_i64(v: i64) -> Self {
                v as $ty
            }
            fn to_i64(self) -> i64 {
                self as i64
            }
        }
    };
}

enum_repr!(i8, false);
enum_repr!(i16, false);
enum_repr!(i32, false);
enum_repr!(i64, false);
enum_repr!(u8, true);
enum_repr!(u16, true);
enum_repr!(u32, true);
enum_repr!(u64, true);

/// A named enumeration over an integer-backed storage type.
pub struct EnumType {
    pub name: Name,
    pub is_unsigned: bool,
    entries: Vec<(Name, i64)>,
    read: fn(&dyn Any) -> i64,
    write: fn(&mut dyn Any, i64),
}

impl EnumType {
    pub fn of<T: EnumRepr>(name: &str, entries: &[(&str, i64)]) -> Arc<EnumType> {
        Arc::new(EnumType {
            name: Name::new(name),
            is_unsigned: T::UNSIGNED,
            entries: entries
                .iter()
                .map(|(n, v)| (Name::new(n), *v))
                .collect(),
            read: enum_read::<T>,
            write: enum_write::<T>,
        })
    }

    pub fn find_by_name(&self, name: &Name) -> Option<i64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn find_name(&self, value: i64) -> Option<&Name> {
        self.entries
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n)
    }

    pub fn contains_value(&self, value: i64) -> bool {
        self.entries.iter().any(|(_, v)| *v == value)
    }

    pub(crate) fn read_value(&self, storage: &dyn Any) -> i64 {
        (self.read)(storage)
    }

    pub(crate) fn write_value(&self, storage: &mut dyn Any, value: i64) {
        (self.write)(storage, value)
    }
}

impl fmt::Debug for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumType")
            .field("name", &self.name)
            .field("entries", &self.entries)
            .finish()
    }
}

fn enum_read<T: EnumRepr>(storage: &dyn Any) -> i64 {
    storage
        .downcast_ref::<T>()
        .expect("enum storage matches its repr")
        .to_i64()
}

fn enum_write<T: EnumRepr>(storage: &mut dyn Any, value: i64) {
    *storage
        .downcast_mut::<T>()
        .expect("enum storage matches its repr") = T::from_i64(value);
}

//	scalar-like container items

/// Items that can cross the reflection boundary as a `Value`: map keys and
/// set elements.
pub trait ScalarItem: Any + Ord + Clone {
    fn from_value(v: &Value) -> Option<Self>;
    fn to_value(&self) -> Value;
}

macro_rules! scalar_item {
    ($ty:ty, $variant:path) => {
        impl ScalarItem for $ty {
            fn from_value(v: &Value) -> Option<Self> {
                match v {
                    $variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
            fn to_value(&self) -> Value {
                $variant(self.clone())
            }
        }
    };
}

scalar_item!(bool, Value::Bool);
scalar_item!(i8, Value::Int8);
scalar_item!(i16, Value::Int16);
scalar_item!(i32, Value::Int32);
scalar_item!(i64, Value::Int64);
scalar_item!(u8, Value::UInt8);
scalar_item!(u16, Value::UInt16);
scalar_item!(u32, Value::UInt32);
scalar_item!(u64, Value::UInt64);
scalar_item!(String, Value::String);
scalar_item!(Name, Value::Name);

//	container ops vtables

pub struct ArrayType {
    pub inner: PropertyType,
    pub(crate) ops: ListOps,
}

pub(crate) struct ListOps {
    pub len: fn(&dyn Any) -> usize,
    pub push_default: for<'x> fn(&'x mut dyn Any) -> &'x mut dyn Any,
    pub get_mut: for<'x> fn(&'x mut dyn Any, usize) -> &'x mut dyn Any,
}

impl ArrayType {
    /// Catalog entry for a `Vec<T>` field.
    pub fn of<T: Any + Default>(inner: PropertyType) -> Arc<ArrayType> {
        Arc::new(ArrayType {
            inner,
            ops: ListOps {
                len: list_len::<T>,
                push_default: list_push_default::<T>,
                get_mut: list_get_mut::<T>,
            },
        })
    }
}

impl fmt::Debug for ArrayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayType").field("inner", &self.inner).finish()
    }
}

fn list_len<T: Any>(storage: &dyn Any) -> usize {
    storage
        .downcast_ref::<Vec<T>>()
        .expect("array storage matches its item type")
        .len()
}

fn list_push_default<T: Any + Default>(storage: &mut dyn Any) -> &mut dyn Any {
    let list = storage
        .downcast_mut::<Vec<T>>()
        .expect("array storage matches its item type");
    list.push(T::default());
    list.last_mut().expect("push landed") as &mut dyn Any
}

fn list_get_mut<T: Any>(storage: &mut dyn Any, index: usize) -> &mut dyn Any {
    &mut storage
        .downcast_mut::<Vec<T>>()
        .expect("array storage matches its item type")[index]
}

pub struct MapType {
    pub key: PropertyType,
    pub value: PropertyType,
    pub(crate) ops: MapOps,
}

pub(crate) struct MapOps {
    pub len: fn(&dyn Any) -> usize,
    pub insert_default: for<'x> fn(&'x mut dyn Any, &Value) -> Result<&'x mut dyn Any>,
    pub get_mut: for<'x> fn(&'x mut dyn Any, &Value) -> Option<&'x mut dyn Any>,
    pub keys: fn(&dyn Any) -> Vec<Value>,
}

impl MapType {
    /// Catalog entry for a `BTreeMap<K, V>` field. The ordered map keeps
    /// serialization deterministic.
    pub fn of<K: ScalarItem, V: Any + Default>(
        key: PropertyType,
        value: PropertyType,
    ) -> Arc<MapType> {
        Arc::new(MapType {
            key,
            value,
            ops: MapOps {
                len: map_len::<K, V>,
                insert_default: map_insert_default::<K, V>,
                get_mut: map_get_mut::<K, V>,
                keys: map_keys::<K, V>,
            },
        })
    }
}

impl fmt::Debug for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapType")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}

fn map_len<K: ScalarItem, V: Any>(storage: &dyn Any) -> usize {
    storage
        .downcast_ref::<BTreeMap<K, V>>()
        .expect("map storage matches its key and value types")
        .len()
}

fn map_insert_default<'x, K: ScalarItem, V: Any + Default>(
    storage: &'x mut dyn Any,
    key: &Value,
) -> Result<&'x mut dyn Any> {
    let map = storage
        .downcast_mut::<BTreeMap<K, V>>()
        .expect("map storage matches its key and value types");
    let key = match K::from_value(key) {
        Some(key) => key,
        None => return fail!(rw::DATA_TYPE_MISMATCH, key.entry(), pipe::Entry::None),
    };
    Ok(map.entry(key).or_insert_with(V::default) as &mut dyn Any)
}

fn map_get_mut<'x, K: ScalarItem, V: Any>(
    storage: &'x mut dyn Any,
    key: &Value,
) -> Option<&'x mut dyn Any> {
    let map = storage
        .downcast_mut::<BTreeMap<K, V>>()
        .expect("map storage matches its key and value types");
    let key = K::from_value(key)?;
    map.get_mut(&key).map(|v| v as &mut dyn Any)
}

fn map_keys<K: ScalarItem, V: Any>(storage: &dyn Any) -> Vec<Value> {
    storage
        .downcast_ref::<BTreeMap<K, V>>()
        .expect("map storage matches its key and value types")
        .keys()
        .map(ScalarItem::to_value)
        .collect()
}

pub struct SetType {
    pub inner: PropertyType,
    pub(crate) ops: SetOps,
}

pub(crate) struct SetOps {
    pub len: fn(&dyn Any) -> usize,
    pub insert: fn(&mut dyn Any, &Value) -> Result<bool>,
    pub items: fn(&dyn Any) -> Vec<Value>,
}

impl SetType {
    /// Catalog entry for a `BTreeSet<T>` field. Set elements are limited
    /// to scalar-like items.
    pub fn of<T: ScalarItem>(inner: PropertyType) -> Arc<SetType> {
        Arc::new(SetType {
            inner,
            ops: SetOps {
                len: set_len::<T>,
                insert: set_insert::<T>,
                items: set_items::<T>,
            },
        })
    }
}

impl fmt::Debug for SetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetType").field("inner", &self.inner).finish()
    }
}

fn set_len<T: ScalarItem>(storage: &dyn Any) -> usize {
    storage
        .downcast_ref::<BTreeSet<T>>()
        .expect("set storage matches its item type")
        .len()
}

fn set_insert<T: ScalarItem>(storage: &mut dyn Any, value: &Value) -> Result<bool> {
    let set = storage
        .downcast_mut::<BTreeSet<T>>()
        .expect("set storage matches its item type");
    let item = match T::from_value(value) {
        Some(item) => item,
        None => return fail!(rw::DATA_TYPE_MISMATCH, value.entry(), pipe::Entry::None),
    };
    Ok(set.insert(item))
}

fn set_items<T: ScalarItem>(storage: &dyn Any) -> Vec<Value> {
    storage
        .downcast_ref::<BTreeSet<T>>()
        .expect("set storage matches its item type")
        .iter()
        .map(ScalarItem::to_value)
        .collect()
}

pub struct OptionalType {
    pub inner: PropertyType,
    pub(crate) ops: OptOps,
}

pub(crate) struct OptOps {
    pub is_some: fn(&dyn Any) -> bool,
    pub materialize: for<'x> fn(&'x mut dyn Any) -> &'x mut dyn Any,
    pub get_mut: for<'x> fn(&'x mut dyn Any) -> Option<&'x mut dyn Any>,
    pub clear: fn(&mut dyn Any),
}

impl OptionalType {
    /// Catalog entry for an `Option<T>` field.
    pub fn of<T: Any + Default>(inner: PropertyType) -> Arc<OptionalType> {
        Arc::new(OptionalType {
            inner,
            ops: OptOps {
                is_some: opt_is_some::<T>,
                materialize: opt_materialize::<T>,
                get_mut: opt_get_mut::<T>,
                clear: opt_clear::<T>,
            },
        })
    }
}

impl fmt::Debug for OptionalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionalType")
            .field("inner", &self.inner)
            .finish()
    }
}

fn opt_is_some<T: Any>(storage: &dyn Any) -> bool {
    storage
        .downcast_ref::<Option<T>>()
        .expect("optional storage matches its inner type")
        .is_some()
}

fn opt_materialize<T: Any + Default>(storage: &mut dyn Any) -> &mut dyn Any {
    let opt = storage
        .downcast_mut::<Option<T>>()
        .expect("optional storage matches its inner type");
    opt.get_or_insert_with(T::default) as &mut dyn Any
}

fn opt_get_mut<T: Any>(storage: &mut dyn Any) -> Option<&mut dyn Any> {
    storage
        .downcast_mut::<Option<T>>()
        .expect("optional storage matches its inner type")
        .as_mut()
        .map(|v| v as &mut dyn Any)
}

fn opt_clear<T: Any>(storage: &mut dyn Any) {
    *storage
        .downcast_mut::<Option<T>>()
        .expect("optional storage matches its inner type") = None;
}

//	blobs

/// Raw byte storage: a growable `Vec<u8>` or a fixed-capacity array.
pub struct BlobType {
    pub capacity: Option<usize>,
    pub(crate) read: fn(&dyn Any) -> Vec<u8>,
    pub(crate) write: fn(&mut dyn Any, &[u8]) -> Result<()>,
}

impl BlobType {
    pub fn vec() -> Arc<BlobType> {
        Arc::new(BlobType {
            capacity: None,
            read: |storage| {
                storage
                    .downcast_ref::<Vec<u8>>()
                    .expect("blob storage is Vec<u8>")
                    .clone()
            },
            write: |storage, data| {
                *storage
                    .downcast_mut::<Vec<u8>>()
                    .expect("blob storage is Vec<u8>") = data.to_vec();
                Ok(())
            },
        })
    }

    pub fn fixed<const N: usize>() -> Arc<BlobType> {
        Arc::new(BlobType {
            capacity: Some(N),
            read: |storage| {
                storage
                    .downcast_ref::<[u8; N]>()
                    .expect("blob storage is a fixed byte array")
                    .to_vec()
            },
            write: |storage, data| {
                if data.len() > N {
                    return fail!(rw::WRITE_BLOB_OVERRUN, N, data.len());
                }
                let array = storage
                    .downcast_mut::<[u8; N]>()
                    .expect("blob storage is a fixed byte array");
                array[..data.len()].copy_from_slice(data);
                array[data.len()..].fill(0);
                Ok(())
            },
        })
    }
}

impl fmt::Debug for BlobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobType")
            .field("capacity", &self.capacity)
            .finish()
    }
}
