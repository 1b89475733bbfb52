//! `PropertyWriter` adapts the entry alphabet onto reflected memory: struct
//! states alternate field selection and value writes, containers default
//! elements into place, optional slots clear on `Nil` and materialize on
//! anything else.

use crate::path::{enter, PathStep};
use crate::types::{ArrayType, FieldDef, MapType, PropertyType, SetType, StructType};
use crate::utils::{
    find_effective_property_by_name, format_property_type_name, property_to_entry,
};
use crate::{Datum, FieldVariant};
use diag::{fail, rw, Diagnostic, Highlight, Result};
use pipe::{Entry, EnumValue, Name, Value, Writer};
use std::fmt::Write as _;
use std::sync::Arc;

enum WState {
    Root {
        consumed: bool,
    },
    Struct {
        ty: Arc<StructType>,
        cur: Option<Arc<FieldDef>>,
        steps: usize,
    },
    Array {
        ty: Arc<ArrayType>,
        count: usize,
        steps: usize,
    },
    Map {
        ty: Arc<MapType>,
        pending_key: Option<Value>,
        steps: usize,
    },
    Set {
        ty: Arc<SetType>,
        steps: usize,
    },
}

enum Position {
    StructKey(Arc<StructType>),
    MapKey(Arc<MapType>),
    SetItem(Arc<SetType>),
    Value,
}

pub struct PropertyWriter<'a> {
    root: Datum<'a>,
    states: Vec<WState>,
    path: Vec<PathStep>,
}

impl<'a> PropertyWriter<'a> {
    pub fn new(root: Datum<'a>) -> Self {
        PropertyWriter {
            root,
            states: vec![WState::Root { consumed: false }],
            path: Vec::new(),
        }
    }

    /// Count of unclosed container states.
    pub fn nesting(&self) -> usize {
        self.states.len() - 1
    }

    /// Assert the next write slot expects `expected` and expose its
    /// storage. Completion is recorded; the caller writes through the
    /// returned datum directly.
    pub fn write_data_entry(&mut self, expected: Entry) -> Result<Datum<'_>> {
        if !matches!(self.position(), Position::Value) {
            return fail!(rw::INVALID_STATE_NO_EXPECT, self.format_path());
        }
        let (ty, steps) = self.slot_plan(expected)?;
        self.check_slot(&ty, expected)?;

        let full: Vec<PathStep> = self.path.iter().cloned().chain(steps).collect();
        self.complete_value();
        let (_, target) = enter(&mut *self.root.storage, &full)?;
        Ok(Datum {
            variant: FieldVariant::Property(FieldDef::synthetic(Name::none(), ty)),
            storage: target,
        })
    }

    /// Dotted path of the current write position, for diagnostics.
    pub fn format_path(&self) -> String {
        let mut out = String::new();
        for state in &self.states {
            match state {
                WState::Root { .. } => out.push_str(self.root.variant.name().as_str()),
                WState::Struct { cur, .. } => {
                    if let Some(field) = cur {
                        let _ = write!(&mut out, ".{}", field.name);
                    }
                }
                WState::Array { count, .. } => {
                    let _ = write!(&mut out, "[{}]", count);
                }
                WState::Map { pending_key, .. } => {
                    if let Some(key) = pending_key {
                        let _ = write!(&mut out, "[{:?}]", key);
                    }
                }
                WState::Set { .. } => out.push_str("[*]"),
            }
        }
        out
    }

    fn root_ty(&self) -> PropertyType {
        self.root.variant.property_type()
    }

    fn position(&self) -> Position {
        match self.states.last().expect("write state stack never empty") {
            WState::Struct { ty, cur: None, .. } => Position::StructKey(ty.clone()),
            WState::Map {
                ty,
                pending_key: None,
                ..
            } => Position::MapKey(ty.clone()),
            WState::Set { ty, .. } => Position::SetItem(ty.clone()),
            _ => Position::Value,
        }
    }

    /// The type of the next value slot, with the relative path reaching it.
    /// `Nil` writes keep the optional wrapper itself; everything else sees
    /// through it.
    fn slot_plan(&self, entry: Entry) -> Result<(PropertyType, Vec<PathStep>)> {
        let (mut ty, mut steps): (PropertyType, Vec<PathStep>) =
            match self.states.last().expect("write state stack never empty") {
                WState::Root { consumed: true } => return fail!(rw::ALREADY_ENDED),
                WState::Root { consumed: false } => (self.root_ty(), Vec::new()),
                WState::Struct {
                    cur: Some(field), ..
                } => (field.ty.clone(), vec![PathStep::Field(field.clone())]),
                WState::Struct { cur: None, .. } => {
                    return fail!(rw::INVALID_STATE_NO_EXPECT, "struct awaiting field name")
                }
                WState::Array { ty, .. } => {
                    (ty.inner.clone(), vec![PathStep::ArrayPush(ty.clone())])
                }
                WState::Map {
                    ty,
                    pending_key: Some(key),
                    ..
                } => (
                    ty.value.clone(),
                    vec![PathStep::MapInsert(ty.clone(), key.clone())],
                ),
                WState::Map {
                    pending_key: None, ..
                } => return fail!(rw::INVALID_STATE_NO_EXPECT, "map awaiting key"),
                WState::Set { .. } => {
                    return fail!(rw::INVALID_STATE_NO_EXPECT, "set accepts scalar items only")
                }
            };

        if entry != Entry::Nil {
            while let PropertyType::Optional(ot) = &ty {
                let ot = ot.clone();
                steps.push(PathStep::OptionalInner(ot.clone()));
                ty = ot.inner.clone();
            }
        }
        Ok((ty, steps))
    }

    fn check_slot(&self, ty: &PropertyType, expected: Entry) -> Result<()> {
        let actual = property_to_entry(ty);
        if actual != expected {
            return fail!(
                rw::PROPERTY_MISMATCH,
                expected,
                format_property_type_name(ty),
                self.format_path()
            );
        }
        Ok(())
    }

    fn complete_value(&mut self) {
        match self
            .states
            .last_mut()
            .expect("write state stack never empty")
        {
            WState::Root { consumed } => *consumed = true,
            WState::Struct { cur, .. } => *cur = None,
            WState::Array { count, .. } => *count += 1,
            WState::Map { pending_key, .. } => *pending_key = None,
            WState::Set { .. } => {}
        }
    }

    fn select_struct_field(&mut self, name: &Name) -> Result<()> {
        let (ty, cur) = match self.states.last_mut() {
            Some(WState::Struct { ty, cur, .. }) => (ty.clone(), cur),
            _ => return diag::no_entry(),
        };
        match find_effective_property_by_name(&ty, name) {
            Some(field) => {
                *cur = Some(field);
                Ok(())
            }
            None => fail!(rw::CANT_FIND_PROPERTY_BY_NAME, name, &ty.name),
        }
    }

    fn write_scalar_value(&mut self, value: Value) -> Result<()> {
        let expected = value.entry();
        match self.position() {
            Position::StructKey(_) => match value {
                Value::Name(name) => self.select_struct_field(&name),
                Value::String(s) => self.select_struct_field(&Name::new(&s)),
                _ => fail!(rw::DATA_TYPE_MISMATCH, Entry::Name, expected),
            },
            Position::MapKey(map_ty) => {
                let key = coerce_key(&map_ty.key, value);
                match self.states.last_mut() {
                    Some(WState::Map { pending_key, .. }) => {
                        *pending_key = Some(key);
                        Ok(())
                    }
                    _ => diag::no_entry(),
                }
            }
            Position::SetItem(set_ty) => {
                if property_to_entry(&set_ty.inner) != expected {
                    return fail!(
                        rw::PROPERTY_MISMATCH,
                        expected,
                        format_property_type_name(&set_ty.inner),
                        self.format_path()
                    );
                }
                let target = crate::path::resolve(&mut *self.root.storage, &self.path)?;
                (set_ty.ops.insert)(target, &value)?;
                Ok(())
            }
            Position::Value => {
                let (ty, steps) = self.slot_plan(expected)?;
                self.check_slot(&ty, expected)?;
                let full: Vec<PathStep> = self.path.iter().cloned().chain(steps).collect();
                let (_, target) = enter(&mut *self.root.storage, &full)?;
                assign_scalar(&ty, target, value);
                self.complete_value();
                Ok(())
            }
        }
    }

    fn open_container(&mut self, entry: Entry) -> Result<(PropertyType, usize)> {
        if !matches!(self.position(), Position::Value) {
            return fail!(rw::INVALID_STATE_NO_EXPECT, self.format_path());
        }
        let (ty, steps) = self.slot_plan(entry)?;
        self.check_slot(&ty, entry)?;

        let full: Vec<PathStep> = self.path.iter().cloned().chain(steps).collect();
        let (stable, _) = enter(&mut *self.root.storage, &full)?;
        let added = stable.len() - self.path.len();
        self.path = stable;
        Ok((ty, added))
    }

    fn close_container(&mut self, steps: usize) {
        let new_len = self.path.len() - steps;
        self.states.pop();
        self.path.truncate(new_len);
        self.complete_value();
    }
}

impl Writer for PropertyWriter<'_> {
    fn peek_write(&mut self, next: Entry) -> Result<bool> {
        let ok = match self.states.last().expect("write state stack never empty") {
            WState::Root { consumed: true } => next == Entry::Ended,
            WState::Root { consumed: false } => entry_matches_slot(&self.root_ty(), next),
            WState::Struct { cur: None, .. } => {
                matches!(next, Entry::Name | Entry::String | Entry::StructEnd)
            }
            WState::Struct {
                cur: Some(field), ..
            } => entry_matches_slot(&field.ty, next),
            WState::Array { ty, .. } => {
                next == Entry::ArrayEnd || entry_matches_slot(&ty.inner, next)
            }
            WState::Map {
                ty,
                pending_key: None,
                ..
            } => next == Entry::MapEnd || next == property_to_entry(&ty.key) || next == Entry::Name,
            WState::Map {
                ty,
                pending_key: Some(_),
                ..
            } => entry_matches_slot(&ty.value, next),
            WState::Set { ty, .. } => {
                next == Entry::SetEnd || entry_matches_slot(&ty.inner, next)
            }
        };
        Ok(ok)
    }

    fn write_nil(&mut self) -> Result<()> {
        if !matches!(self.position(), Position::Value) {
            return fail!(rw::INVALID_STATE_NO_EXPECT, self.format_path());
        }
        let (ty, steps) = self.slot_plan(Entry::Nil)?;
        match ty {
            PropertyType::Optional(ot) => {
                let full: Vec<PathStep> = self.path.iter().cloned().chain(steps).collect();
                let (_, target) = enter(&mut *self.root.storage, &full)?;
                (ot.ops.clear)(target);
                self.complete_value();
                Ok(())
            }
            other => fail!(
                rw::PROPERTY_MISMATCH,
                Entry::Nil,
                format_property_type_name(&other),
                self.format_path()
            ),
        }
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_scalar_value(Value::Bool(v))
    }
    fn write_name(&mut self, v: &Name) -> Result<()> {
        self.write_scalar_value(Value::Name(v.clone()))
    }
    fn write_string(&mut self, v: &str) -> Result<()> {
        self.write_scalar_value(Value::String(v.to_owned()))
    }
    fn write_text(&mut self, v: &str) -> Result<()> {
        self.write_scalar_value(Value::Text(v.to_owned()))
    }

    fn write_int8(&mut self, v: i8) -> Result<()> {
        self.write_scalar_value(Value::Int8(v))
    }
    fn write_int16(&mut self, v: i16) -> Result<()> {
        self.write_scalar_value(Value::Int16(v))
    }
    fn write_int32(&mut self, v: i32) -> Result<()> {
        self.write_scalar_value(Value::Int32(v))
    }
    fn write_int64(&mut self, v: i64) -> Result<()> {
        self.write_scalar_value(Value::Int64(v))
    }
    fn write_uint8(&mut self, v: u8) -> Result<()> {
        self.write_scalar_value(Value::UInt8(v))
    }
    fn write_uint16(&mut self, v: u16) -> Result<()> {
        self.write_scalar_value(Value::UInt16(v))
    }
    fn write_uint32(&mut self, v: u32) -> Result<()> {
        self.write_scalar_value(Value::UInt32(v))
    }
    fn write_uint64(&mut self, v: u64) -> Result<()> {
        self.write_scalar_value(Value::UInt64(v))
    }
    fn write_float(&mut self, v: f32) -> Result<()> {
        self.write_scalar_value(Value::Float(v))
    }
    fn write_double(&mut self, v: f64) -> Result<()> {
        self.write_scalar_value(Value::Double(v))
    }

    fn write_enum(&mut self, v: &EnumValue) -> Result<()> {
        if !matches!(self.position(), Position::Value) {
            return fail!(rw::INVALID_STATE_NO_EXPECT, self.format_path());
        }
        let (ty, steps) = self.slot_plan(Entry::Enum)?;
        let enum_ty = match ty {
            PropertyType::Enum(et) => et,
            other => {
                return fail!(
                    rw::PROPERTY_MISMATCH,
                    Entry::Enum,
                    format_property_type_name(&other),
                    self.format_path()
                )
            }
        };

        let value = match &v.name {
            Some(name) => match enum_ty.find_by_name(name) {
                Some(value) => value,
                None => return fail!(rw::ENUM_NAME_NOT_FOUND, name, &enum_ty.name),
            },
            None => {
                if v.is_unsigned != enum_ty.is_unsigned {
                    return fail!(
                        rw::ENUM_SIGN_MISMATCH,
                        &enum_ty.name,
                        enum_ty.is_unsigned
                    );
                }
                if !enum_ty.contains_value(v.value) {
                    return fail!(rw::ENUM_VALUE_INVALID, &enum_ty.name, v.value);
                }
                v.value
            }
        };

        let full: Vec<PathStep> = self.path.iter().cloned().chain(steps).collect();
        let (_, target) = enter(&mut *self.root.storage, &full)?;
        enum_ty.write_value(target, value);
        self.complete_value();
        Ok(())
    }

    fn write_blob(&mut self, v: &[u8]) -> Result<()> {
        if !matches!(self.position(), Position::Value) {
            return fail!(rw::INVALID_STATE_NO_EXPECT, self.format_path());
        }
        let (ty, steps) = self.slot_plan(Entry::Blob)?;
        let blob_ty = match ty {
            PropertyType::Blob(bt) => bt,
            other => {
                return fail!(
                    rw::PROPERTY_MISMATCH,
                    Entry::Blob,
                    format_property_type_name(&other),
                    self.format_path()
                )
            }
        };
        let full: Vec<PathStep> = self.path.iter().cloned().chain(steps).collect();
        let (_, target) = enter(&mut *self.root.storage, &full)?;
        (blob_ty.write)(target, v)?;
        self.complete_value();
        Ok(())
    }

    fn write_struct_root(&mut self, name: &Name) -> Result<()> {
        // Peek the slot type for the name check before entering.
        if !matches!(self.position(), Position::Value) {
            return fail!(rw::INVALID_STATE_NO_EXPECT, self.format_path());
        }
        let (ty, _) = self.slot_plan(Entry::StructRoot)?;
        if let PropertyType::Struct(st) = &ty {
            if !name.is_none() && *name != st.name {
                return fail!(rw::STRUCT_NAME_MISMATCH, &st.name, name);
            }
        }

        let (ty, steps) = self.open_container(Entry::StructRoot)?;
        match ty {
            PropertyType::Struct(st) => {
                self.states.push(WState::Struct {
                    ty: st,
                    cur: None,
                    steps,
                });
                Ok(())
            }
            _ => diag::no_entry(),
        }
    }

    fn write_struct_end(&mut self, name: &Name) -> Result<()> {
        match self.states.last() {
            Some(WState::Struct {
                ty,
                cur: None,
                steps,
            }) => {
                if !name.is_none() && name != &ty.name {
                    return fail!(rw::STRUCT_NAME_MISMATCH, &ty.name, name);
                }
                let steps = *steps;
                self.close_container(steps);
                Ok(())
            }
            Some(WState::Struct { cur: Some(_), .. }) => {
                fail!(rw::INVALID_STATE_NO_EXPECT, "struct field awaiting value")
            }
            _ => fail!(rw::DATA_TYPE_MISMATCH, Entry::StructEnd, Entry::None),
        }
    }

    fn write_map_root(&mut self) -> Result<()> {
        let (ty, steps) = self.open_container(Entry::MapRoot)?;
        match ty {
            PropertyType::Map(mt) => {
                self.states.push(WState::Map {
                    ty: mt,
                    pending_key: None,
                    steps,
                });
                Ok(())
            }
            _ => diag::no_entry(),
        }
    }

    fn write_map_end(&mut self) -> Result<()> {
        match self.states.last() {
            Some(WState::Map {
                pending_key: None,
                steps,
                ..
            }) => {
                let steps = *steps;
                self.close_container(steps);
                Ok(())
            }
            Some(WState::Map {
                pending_key: Some(_),
                ..
            }) => fail!(rw::INVALID_STATE_NO_EXPECT, "map key awaiting value"),
            _ => fail!(rw::DATA_TYPE_MISMATCH, Entry::MapEnd, Entry::None),
        }
    }

    fn write_array_root(&mut self) -> Result<()> {
        let (ty, steps) = self.open_container(Entry::ArrayRoot)?;
        match ty {
            PropertyType::Array(at) => {
                self.states.push(WState::Array {
                    ty: at,
                    count: 0,
                    steps,
                });
                Ok(())
            }
            _ => diag::no_entry(),
        }
    }

    fn write_array_end(&mut self) -> Result<()> {
        match self.states.last() {
            Some(WState::Array { steps, .. }) => {
                let steps = *steps;
                self.close_container(steps);
                Ok(())
            }
            _ => fail!(rw::DATA_TYPE_MISMATCH, Entry::ArrayEnd, Entry::None),
        }
    }

    fn write_set_root(&mut self) -> Result<()> {
        let (ty, steps) = self.open_container(Entry::SetRoot)?;
        match ty {
            PropertyType::Set(st) => {
                self.states.push(WState::Set { ty: st, steps });
                Ok(())
            }
            _ => diag::no_entry(),
        }
    }

    fn write_set_end(&mut self) -> Result<()> {
        match self.states.last() {
            Some(WState::Set { steps, .. }) => {
                let steps = *steps;
                self.close_container(steps);
                Ok(())
            }
            _ => fail!(rw::DATA_TYPE_MISMATCH, Entry::SetEnd, Entry::None),
        }
    }

    fn format_diagnostic(&self, diag: &mut Diagnostic) {
        diag.push(diag::Arg::Highlight(Highlight::new(
            self.id(),
            format!("writing '{}'", self.format_path()),
        )));
    }

    fn id(&self) -> &'static str {
        "PropertyWriter"
    }
}

fn entry_matches_slot(ty: &PropertyType, next: Entry) -> bool {
    next == property_to_entry(ty)
        || (matches!(ty, PropertyType::Optional(_)) && next == Entry::Nil)
}

/// Keys arriving as names or strings are converted to the map's key shape.
fn coerce_key(key_ty: &PropertyType, value: Value) -> Value {
    match (key_ty, &value) {
        (PropertyType::Str, Value::Name(name)) => Value::String(name.as_str().to_owned()),
        (PropertyType::Name, Value::String(s)) => Value::Name(Name::new(s)),
        _ => value,
    }
}

fn assign_scalar(ty: &PropertyType, target: &mut dyn std::any::Any, value: Value) {
    // Catalog consistency (accessor type vs declared property type) is a
    // registration-time contract; a mismatch here is a programmer error.
    match (ty, value) {
        (PropertyType::Bool, Value::Bool(v)) => assign::<bool>(target, v),
        (PropertyType::Int8, Value::Int8(v)) => assign::<i8>(target, v),
        (PropertyType::Int16, Value::Int16(v)) => assign::<i16>(target, v),
        (PropertyType::Int32, Value::Int32(v)) => assign::<i32>(target, v),
        (PropertyType::Int64, Value::Int64(v)) => assign::<i64>(target, v),
        (PropertyType::UInt8, Value::UInt8(v)) => assign::<u8>(target, v),
        (PropertyType::UInt16, Value::UInt16(v)) => assign::<u16>(target, v),
        (PropertyType::UInt32, Value::UInt32(v)) => assign::<u32>(target, v),
        (PropertyType::UInt64, Value::UInt64(v)) => assign::<u64>(target, v),
        (PropertyType::Float, Value::Float(v)) => assign::<f32>(target, v),
        (PropertyType::Double, Value::Double(v)) => assign::<f64>(target, v),
        (PropertyType::Str, Value::String(v)) => assign::<String>(target, v),
        (PropertyType::Name, Value::Name(v)) => assign::<Name>(target, v),
        (PropertyType::Text, Value::Text(v)) => assign::<String>(target, v),
        _ => unreachable!("slot type checked against value entry"),
    }
}

fn assign<T: std::any::Any>(target: &mut dyn std::any::Any, value: T) {
    *target
        .downcast_mut::<T>()
        .expect("field storage matches catalog type") = value;
}
