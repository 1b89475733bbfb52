use crate::{FieldDef, PropertyType, StructType};
use pipe::Name;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A field or a bare aggregate type; both normalize into this for handler
/// dispatch and the property stack.
#[derive(Debug, Clone)]
pub enum FieldVariant {
    Property(Arc<FieldDef>),
    Struct(Arc<StructType>),
}

impl FieldVariant {
    pub fn name(&self) -> &Name {
        match self {
            FieldVariant::Property(field) => &field.name,
            FieldVariant::Struct(ty) => &ty.name,
        }
    }

    /// The property type this variant stands for.
    pub fn property_type(&self) -> PropertyType {
        match self {
            FieldVariant::Property(field) => field.ty.clone(),
            FieldVariant::Struct(ty) => PropertyType::Struct(ty.clone()),
        }
    }
}

/// The currency at the reflection boundary: a type descriptor paired with a
/// borrow of the caller-owned storage it describes.
pub struct Datum<'a> {
    pub variant: FieldVariant,
    pub storage: &'a mut dyn Any,
}

impl<'a> fmt::Debug for Datum<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datum")
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

impl<'a> Datum<'a> {
    pub fn new<T: Any>(variant: FieldVariant, storage: &'a mut T) -> Datum<'a> {
        Datum {
            variant,
            storage: storage as &mut dyn Any,
        }
    }

    /// Root datum for a struct instance.
    pub fn from_struct<T: Any>(ty: &Arc<StructType>, value: &'a mut T) -> Datum<'a> {
        Datum {
            variant: FieldVariant::Struct(ty.clone()),
            storage: value as &mut dyn Any,
        }
    }

    /// Reborrow, keeping this datum usable afterwards.
    pub fn reborrow(&mut self) -> Datum<'_> {
        Datum {
            variant: self.variant.clone(),
            storage: &mut *self.storage,
        }
    }
}
