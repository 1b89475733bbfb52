//! The type-descriptor service surface: entry mapping, effective-property
//! iteration and lookup, and type-name formatting for diagnostics.

use crate::{EnumType, FieldDef, FieldVariant, PropertyKind, PropertyType, StructType};
use diag::{fail, rw, Result};
use pipe::{Entry, Name};
use std::sync::Arc;

/// Whether the core can carry this field kind. Every kind the catalog can
/// express is effective; the predicate exists so hosts can extend the
/// catalog ahead of the core.
pub fn is_effective_property(_field: &FieldDef) -> bool {
    true
}

/// Map a field's static type to the entry it expects on the wire.
/// Optionals surface as their inner entry; their `Nil` case is a runtime
/// decision, not a static one.
pub fn property_to_entry(ty: &PropertyType) -> Entry {
    match ty {
        PropertyType::Bool => Entry::Bool,
        PropertyType::Int8 => Entry::Int8,
        PropertyType::Int16 => Entry::Int16,
        PropertyType::Int32 => Entry::Int32,
        PropertyType::Int64 => Entry::Int64,
        PropertyType::UInt8 => Entry::UInt8,
        PropertyType::UInt16 => Entry::UInt16,
        PropertyType::UInt32 => Entry::UInt32,
        PropertyType::UInt64 => Entry::UInt64,
        PropertyType::Float => Entry::Float,
        PropertyType::Double => Entry::Double,
        PropertyType::Str => Entry::String,
        PropertyType::Name => Entry::Name,
        PropertyType::Text => Entry::Text,
        PropertyType::Blob(_) => Entry::Blob,
        PropertyType::Enum(_) => Entry::Enum,
        PropertyType::Struct(_) => Entry::StructRoot,
        PropertyType::Array(_) => Entry::ArrayRoot,
        PropertyType::Map(_) => Entry::MapRoot,
        PropertyType::Set(_) => Entry::SetRoot,
        PropertyType::Optional(opt) => property_to_entry(&opt.inner),
    }
}

pub fn variant_to_entry(variant: &FieldVariant) -> Entry {
    match variant {
        FieldVariant::Property(field) => property_to_entry(&field.ty),
        FieldVariant::Struct(_) => Entry::StructRoot,
    }
}

pub fn first_effective_property(ty: &StructType) -> Option<Arc<FieldDef>> {
    ty.fields.iter().find(|f| is_effective_property(f)).cloned()
}

pub fn next_effective_property(ty: &StructType, after: &Name) -> Option<Arc<FieldDef>> {
    let ix = ty.fields.iter().position(|f| &f.name == after)?;
    ty.fields
        .iter()
        .skip(ix + 1)
        .find(|f| is_effective_property(f))
        .cloned()
}

pub fn find_effective_property_by_name(ty: &StructType, name: &Name) -> Option<Arc<FieldDef>> {
    ty.find_field(name).filter(|f| is_effective_property(f))
}

/// Positional lookup, the index-based rendition of lookup by byte offset.
pub fn find_effective_property_by_index(ty: &StructType, index: usize) -> Result<Arc<FieldDef>> {
    match ty.fields.get(index) {
        Some(field) if is_effective_property(field) => Ok(field.clone()),
        _ => fail!(rw::FIND_PROPERTY_BY_INDEX_FAILED, &ty.name, index),
    }
}

/// The struct type behind a variant: a bare struct or a struct-typed
/// property. Optionals are not looked through; their handler re-dispatches
/// on the inner type.
pub fn try_get_struct(variant: &FieldVariant) -> Option<Arc<StructType>> {
    match variant {
        FieldVariant::Struct(ty) => Some(ty.clone()),
        FieldVariant::Property(field) => match &field.ty {
            PropertyType::Struct(ty) => Some(ty.clone()),
            _ => None,
        },
    }
}

pub fn try_get_enum_property(variant: &FieldVariant) -> Option<Arc<EnumType>> {
    match variant {
        FieldVariant::Property(field) => match &field.ty {
            PropertyType::Enum(ty) => Some(ty.clone()),
            _ => None,
        },
        FieldVariant::Struct(_) => None,
    }
}

pub fn is_unsigned_property(kind: PropertyKind) -> bool {
    matches!(
        kind,
        PropertyKind::UInt8 | PropertyKind::UInt16 | PropertyKind::UInt32 | PropertyKind::UInt64
    )
}

pub fn is_numeric_property(kind: PropertyKind) -> bool {
    matches!(
        kind,
        PropertyKind::Int8
            | PropertyKind::Int16
            | PropertyKind::Int32
            | PropertyKind::Int64
            | PropertyKind::UInt8
            | PropertyKind::UInt16
            | PropertyKind::UInt32
            | PropertyKind::UInt64
            | PropertyKind::Float
            | PropertyKind::Double
    )
}

/// Rust-spelled type name for diagnostics.
pub fn format_property_type_name(ty: &PropertyType) -> String {
    match ty {
        PropertyType::Bool => "bool".to_owned(),
        PropertyType::Int8 => "i8".to_owned(),
        PropertyType::Int16 => "i16".to_owned(),
        PropertyType::Int32 => "i32".to_owned(),
        PropertyType::Int64 => "i64".to_owned(),
        PropertyType::UInt8 => "u8".to_owned(),
        PropertyType::UInt16 => "u16".to_owned(),
        PropertyType::UInt32 => "u32".to_owned(),
        PropertyType::UInt64 => "u64".to_owned(),
        PropertyType::Float => "f32".to_owned(),
        PropertyType::Double => "f64".to_owned(),
        PropertyType::Str => "String".to_owned(),
        PropertyType::Name => "Name".to_owned(),
        PropertyType::Text => "Text".to_owned(),
        PropertyType::Blob(blob) => match blob.capacity {
            Some(n) => format!("[u8; {}]", n),
            None => "Vec<u8>".to_owned(),
        },
        PropertyType::Enum(e) => e.name.as_str().to_owned(),
        PropertyType::Struct(s) => s.name.as_str().to_owned(),
        PropertyType::Array(a) => format!("Vec<{}>", format_property_type_name(&a.inner)),
        PropertyType::Map(m) => format!(
            "BTreeMap<{}, {}>",
            format_property_type_name(&m.key),
            format_property_type_name(&m.value)
        ),
        PropertyType::Set(s) => format!("BTreeSet<{}>", format_property_type_name(&s.inner)),
        PropertyType::Optional(o) => {
            format!("Option<{}>", format_property_type_name(&o.inner))
        }
    }
}

pub fn format_variant_type_name(variant: &FieldVariant) -> String {
    match variant {
        FieldVariant::Property(field) => format_property_type_name(&field.ty),
        FieldVariant::Struct(ty) => ty.name.as_str().to_owned(),
    }
}
