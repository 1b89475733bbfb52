//! `PropertyReader` walks a reflected record and surfaces it as the
//! deterministic entry stream: struct root, name/value pairs in field
//! order, container roots and ends, `Ended` at the root.

use crate::path::{resolve, PathStep};
use crate::types::{ArrayType, MapType, PropertyType, SetType, StructType};
use crate::utils::property_to_entry;
use crate::Datum;
use diag::{fail, rw, Diagnostic, Highlight, Result};
use pipe::{Entry, EnumValue, Name, Reader, Value};
use std::fmt::Write as _;
use std::sync::Arc;

enum RState {
    Root {
        consumed: bool,
    },
    Struct {
        ty: Arc<StructType>,
        index: usize,
        at_value: bool,
        steps: usize,
    },
    Array {
        ty: Arc<ArrayType>,
        len: usize,
        index: usize,
        steps: usize,
    },
    Map {
        ty: Arc<MapType>,
        keys: Vec<Value>,
        index: usize,
        at_value: bool,
        steps: usize,
    },
    Set {
        items: Vec<Value>,
        index: usize,
        steps: usize,
    },
}

/// What the reader is looking at next: a finished position, a key, a
/// buffered set/map item, or a value slot to resolve.
enum Next {
    Fixed(Entry),
    StructName(Name),
    KeyItem(Value),
    SetItem(Value),
    Slot(PropertyType, Vec<PathStep>),
}

pub struct PropertyReader<'a> {
    root: Datum<'a>,
    states: Vec<RState>,
    path: Vec<PathStep>,
}

impl<'a> PropertyReader<'a> {
    pub fn new(root: Datum<'a>) -> Self {
        PropertyReader {
            root,
            states: vec![RState::Root { consumed: false }],
            path: Vec::new(),
        }
    }

    pub fn nesting(&self) -> usize {
        self.states.len() - 1
    }

    pub fn format_path(&self) -> String {
        let mut out = String::new();
        for state in &self.states {
            match state {
                RState::Root { .. } => out.push_str(self.root.variant.name().as_str()),
                RState::Struct { ty, index, .. } => {
                    if let Some(field) = ty.fields.get(*index) {
                        let _ = write!(&mut out, ".{}", field.name);
                    }
                }
                RState::Array { index, .. } => {
                    let _ = write!(&mut out, "[{}]", index);
                }
                RState::Map { keys, index, .. } => {
                    if let Some(key) = keys.get(*index) {
                        let _ = write!(&mut out, "[{:?}]", key);
                    }
                }
                RState::Set { .. } => out.push_str("[*]"),
            }
        }
        out
    }

    fn root_ty(&self) -> PropertyType {
        self.root.variant.property_type()
    }

    /// Classify the next read without consuming anything.
    fn next_plan(&self) -> Next {
        match self.states.last().expect("read state stack never empty") {
            RState::Root { consumed: true } => Next::Fixed(Entry::Ended),
            RState::Root { consumed: false } => Next::Slot(self.root_ty(), Vec::new()),
            RState::Struct {
                ty,
                index,
                at_value,
                ..
            } => {
                if *index >= ty.fields.len() {
                    Next::Fixed(Entry::StructEnd)
                } else if !at_value {
                    Next::StructName(ty.fields[*index].name.clone())
                } else {
                    let field = ty.fields[*index].clone();
                    Next::Slot(field.ty.clone(), vec![PathStep::Field(field)])
                }
            }
            RState::Array {
                ty, len, index, ..
            } => {
                if *index >= *len {
                    Next::Fixed(Entry::ArrayEnd)
                } else {
                    Next::Slot(
                        ty.inner.clone(),
                        vec![PathStep::ArrayItem(ty.clone(), *index)],
                    )
                }
            }
            RState::Map {
                ty,
                keys,
                index,
                at_value,
                ..
            } => {
                if *index >= keys.len() {
                    Next::Fixed(Entry::MapEnd)
                } else if !at_value {
                    Next::KeyItem(keys[*index].clone())
                } else {
                    Next::Slot(
                        ty.value.clone(),
                        vec![PathStep::MapItem(ty.clone(), keys[*index].clone())],
                    )
                }
            }
            RState::Set { items, index, .. } => {
                if *index >= items.len() {
                    Next::Fixed(Entry::SetEnd)
                } else {
                    Next::SetItem(items[*index].clone())
                }
            }
        }
    }

    /// Resolve a value slot to its effective type and stable path,
    /// dereferencing present optionals. An absent optional surfaces `Nil`.
    fn resolve_slot(
        &mut self,
        mut ty: PropertyType,
        mut steps: Vec<PathStep>,
    ) -> Result<(Option<PropertyType>, Vec<PathStep>)> {
        loop {
            match &ty {
                PropertyType::Optional(ot) => {
                    let ot = ot.clone();
                    let full: Vec<PathStep> =
                        self.path.iter().cloned().chain(steps.iter().cloned()).collect();
                    let target = resolve(&mut *self.root.storage, &full)?;
                    if (ot.ops.is_some)(&*target) {
                        steps.push(PathStep::OptionalGet(ot.clone()));
                        ty = ot.inner.clone();
                    } else {
                        return Ok((None, steps));
                    }
                }
                _ => return Ok((Some(ty), steps)),
            }
        }
    }

    fn complete_value(&mut self) {
        match self
            .states
            .last_mut()
            .expect("read state stack never empty")
        {
            RState::Root { consumed } => *consumed = true,
            RState::Struct {
                index, at_value, ..
            } => {
                *index += 1;
                *at_value = false;
            }
            RState::Array { index, .. } => *index += 1,
            RState::Map {
                index, at_value, ..
            } => {
                *index += 1;
                *at_value = false;
            }
            RState::Set { index, .. } => *index += 1,
        }
    }

    fn mark_at_value(&mut self) {
        match self
            .states
            .last_mut()
            .expect("read state stack never empty")
        {
            RState::Struct { at_value, .. } => *at_value = true,
            RState::Map { at_value, .. } => *at_value = true,
            _ => {}
        }
    }

    fn mismatch<T>(&mut self, expected: Entry) -> Result<T> {
        let actual = self.peek().unwrap_or(Entry::None);
        fail!(rw::DATA_TYPE_MISMATCH, expected, actual)
    }

    /// Read one scalar value slot as `expected`.
    fn read_value_slot(&mut self, expected: Entry) -> Result<Value> {
        let (ty, steps) = match self.next_plan() {
            Next::Slot(ty, steps) => (ty, steps),
            Next::KeyItem(value) | Next::SetItem(value) => {
                if value.entry() != expected {
                    return self.mismatch(expected);
                }
                self.mark_at_value_or_complete_item();
                return Ok(value);
            }
            _ => return self.mismatch(expected),
        };

        let (ty, steps) = self.resolve_slot(ty, steps)?;
        let ty = match ty {
            Some(ty) => ty,
            // Absent optional: only a Nil read matches, handled elsewhere.
            None => return self.mismatch(expected),
        };
        if property_to_entry(&ty) != expected {
            return self.mismatch(expected);
        }

        let full: Vec<PathStep> = self.path.iter().cloned().chain(steps).collect();
        let target = resolve(&mut *self.root.storage, &full)?;
        let value = extract_scalar(&ty, target);
        self.complete_value();
        Ok(value)
    }

    /// Keys advance to the value; set items complete outright.
    fn mark_at_value_or_complete_item(&mut self) {
        match self
            .states
            .last_mut()
            .expect("read state stack never empty")
        {
            RState::Set { index, .. } => *index += 1,
            RState::Struct { at_value, .. } | RState::Map { at_value, .. } => *at_value = true,
            _ => {}
        }
    }

    fn open_container(&mut self, expected: Entry) -> Result<(PropertyType, usize)> {
        let (ty, steps) = match self.next_plan() {
            Next::Slot(ty, steps) => (ty, steps),
            _ => return self.mismatch(expected),
        };
        let (ty, steps) = self.resolve_slot(ty, steps)?;
        let ty = match ty {
            Some(ty) => ty,
            None => return self.mismatch(expected),
        };
        if property_to_entry(&ty) != expected {
            return self.mismatch(expected);
        }

        let added = steps.len();
        self.path.extend(steps);
        Ok((ty, added))
    }

    fn close_container(&mut self, steps: usize) {
        let new_len = self.path.len() - steps;
        self.states.pop();
        self.path.truncate(new_len);
        self.complete_value();
    }

    fn resolve_current<'s>(&'s mut self) -> Result<&'s mut dyn std::any::Any> {
        resolve(&mut *self.root.storage, &self.path)
    }
}

impl Reader for PropertyReader<'_> {
    fn peek(&mut self) -> Result<Entry> {
        let plan = self.next_plan();
        match plan {
            Next::Fixed(entry) => Ok(entry),
            Next::StructName(_) => Ok(Entry::Name),
            Next::KeyItem(value) | Next::SetItem(value) => Ok(value.entry()),
            Next::Slot(ty, steps) => {
                let (ty, _) = self.resolve_slot(ty, steps)?;
                Ok(match ty {
                    Some(ty) => property_to_entry(&ty),
                    None => Entry::Nil,
                })
            }
        }
    }

    fn read_nil(&mut self) -> Result<()> {
        let (ty, steps) = match self.next_plan() {
            Next::Slot(ty, steps) => (ty, steps),
            _ => return self.mismatch(Entry::Nil),
        };
        let (resolved, _) = self.resolve_slot(ty, steps)?;
        if resolved.is_some() {
            return self.mismatch(Entry::Nil);
        }
        self.complete_value();
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool> {
        match self.read_value_slot(Entry::Bool)? {
            Value::Bool(v) => Ok(v),
            _ => diag::no_entry(),
        }
    }

    fn read_name(&mut self) -> Result<Name> {
        match self.next_plan() {
            Next::StructName(name) => {
                self.mark_at_value();
                Ok(name)
            }
            _ => match self.read_value_slot(Entry::Name)? {
                Value::Name(v) => Ok(v),
                _ => diag::no_entry(),
            },
        }
    }

    fn read_string(&mut self) -> Result<String> {
        match self.read_value_slot(Entry::String)? {
            Value::String(v) => Ok(v),
            _ => diag::no_entry(),
        }
    }

    fn read_text(&mut self) -> Result<String> {
        match self.read_value_slot(Entry::Text)? {
            Value::Text(v) => Ok(v),
            _ => diag::no_entry(),
        }
    }

    fn read_int8(&mut self) -> Result<i8> {
        match self.read_value_slot(Entry::Int8)? {
            Value::Int8(v) => Ok(v),
            _ => diag::no_entry(),
        }
    }
    fn read_int16(&mut self) -> Result<i16> {
        match self.read_value_slot(Entry::Int16)? {
            Value::Int16(v) => Ok(v),
            _ => diag::no_entry(),
        }
    }
    fn read_int32(&mut self) -> Result<i32> {
        match self.read_value_slot(Entry::Int32)? {
            Value::Int32(v) => Ok(v),
            _ => diag::no_entry(),
        }
    }
    fn read_int64(&mut self) -> Result<i64> {
        match self.read_value_slot(Entry::Int64)? {
            Value::Int64(v) => Ok(v),
            _ => diag::no_entry(),
        }
    }
    fn read_uint8(&mut self) -> Result<u8> {
        match self.read_value_slot(Entry::UInt8)? {
            Value::UInt8(v) => Ok(v),
            _ => diag::no_entry(),
        }
    }
    fn read_uint16(&mut self) -> Result<u16> {
        match self.read_value_slot(Entry::UInt16)? {
            Value::UInt16(v) => Ok(v),
            _ => diag::no_entry(),
        }
    }
    fn read_uint32(&mut self) -> Result<u32> {
        match self.read_value_slot(Entry::UInt32)? {
            Value::UInt32(v) => Ok(v),
            _ => diag::no_entry(),
        }
    }
    fn read_uint64(&mut self) -> Result<u64> {
        match self.read_value_slot(Entry::UInt64)? {
            Value::UInt64(v) => Ok(v),
            _ => diag::no_entry(),
        }
    }
    fn read_float(&mut self) -> Result<f32> {
        match self.read_value_slot(Entry::Float)? {
            Value::Float(v) => Ok(v),
            _ => diag::no_entry(),
        }
    }
    fn read_double(&mut self) -> Result<f64> {
        match self.read_value_slot(Entry::Double)? {
            Value::Double(v) => Ok(v),
            _ => diag::no_entry(),
        }
    }

    fn read_enum(&mut self) -> Result<EnumValue> {
        let (ty, steps) = match self.next_plan() {
            Next::Slot(ty, steps) => (ty, steps),
            _ => return self.mismatch(Entry::Enum),
        };
        let (ty, steps) = self.resolve_slot(ty, steps)?;
        let enum_ty = match ty {
            Some(PropertyType::Enum(et)) => et,
            _ => return self.mismatch(Entry::Enum),
        };

        let full: Vec<PathStep> = self.path.iter().cloned().chain(steps).collect();
        let target = resolve(&mut *self.root.storage, &full)?;
        let value = enum_ty.read_value(&*target);
        self.complete_value();
        Ok(EnumValue {
            ty: Some(enum_ty.name.clone()),
            name: enum_ty.find_name(value).cloned(),
            value,
            is_unsigned: enum_ty.is_unsigned,
        })
    }

    fn read_blob(&mut self) -> Result<Vec<u8>> {
        let (ty, steps) = match self.next_plan() {
            Next::Slot(ty, steps) => (ty, steps),
            _ => return self.mismatch(Entry::Blob),
        };
        let (ty, steps) = self.resolve_slot(ty, steps)?;
        let blob_ty = match ty {
            Some(PropertyType::Blob(bt)) => bt,
            _ => return self.mismatch(Entry::Blob),
        };

        let full: Vec<PathStep> = self.path.iter().cloned().chain(steps).collect();
        let target = resolve(&mut *self.root.storage, &full)?;
        let data = (blob_ty.read)(&*target);
        self.complete_value();
        Ok(data)
    }

    fn read_struct_root(&mut self) -> Result<Name> {
        let (ty, steps) = self.open_container(Entry::StructRoot)?;
        match ty {
            PropertyType::Struct(st) => {
                let name = st.name.clone();
                self.states.push(RState::Struct {
                    ty: st,
                    index: 0,
                    at_value: false,
                    steps,
                });
                Ok(name)
            }
            _ => diag::no_entry(),
        }
    }

    fn read_struct_end(&mut self) -> Result<Name> {
        match self.states.last() {
            Some(RState::Struct {
                ty,
                index,
                at_value: false,
                steps,
            }) if *index >= ty.fields.len() => {
                let name = ty.name.clone();
                let steps = *steps;
                self.close_container(steps);
                Ok(name)
            }
            _ => self.mismatch(Entry::StructEnd),
        }
    }

    fn read_map_root(&mut self) -> Result<()> {
        let (ty, steps) = self.open_container(Entry::MapRoot)?;
        match ty {
            PropertyType::Map(mt) => {
                let keys = {
                    let target = self.resolve_current()?;
                    (mt.ops.keys)(&*target)
                };
                self.states.push(RState::Map {
                    ty: mt,
                    keys,
                    index: 0,
                    at_value: false,
                    steps,
                });
                Ok(())
            }
            _ => diag::no_entry(),
        }
    }

    fn read_map_end(&mut self) -> Result<()> {
        match self.states.last() {
            Some(RState::Map {
                keys,
                index,
                at_value: false,
                steps,
                ..
            }) if *index >= keys.len() => {
                let steps = *steps;
                self.close_container(steps);
                Ok(())
            }
            _ => self.mismatch(Entry::MapEnd),
        }
    }

    fn read_array_root(&mut self) -> Result<()> {
        let (ty, steps) = self.open_container(Entry::ArrayRoot)?;
        match ty {
            PropertyType::Array(at) => {
                let len = {
                    let target = self.resolve_current()?;
                    (at.ops.len)(&*target)
                };
                self.states.push(RState::Array {
                    ty: at,
                    len,
                    index: 0,
                    steps,
                });
                Ok(())
            }
            _ => diag::no_entry(),
        }
    }

    fn read_array_end(&mut self) -> Result<()> {
        match self.states.last() {
            Some(RState::Array {
                len, index, steps, ..
            }) if *index >= *len => {
                let steps = *steps;
                self.close_container(steps);
                Ok(())
            }
            _ => self.mismatch(Entry::ArrayEnd),
        }
    }

    fn read_set_root(&mut self) -> Result<()> {
        let (ty, steps) = self.open_container(Entry::SetRoot)?;
        match ty {
            PropertyType::Set(st) => {
                let items = {
                    let target = self.resolve_current()?;
                    (st.ops.items)(&*target)
                };
                self.states.push(RState::Set {
                    items,
                    index: 0,
                    steps,
                });
                Ok(())
            }
            _ => diag::no_entry(),
        }
    }

    fn read_set_end(&mut self) -> Result<()> {
        match self.states.last() {
            Some(RState::Set {
                items,
                index,
                steps,
            }) if *index >= items.len() => {
                let steps = *steps;
                self.close_container(steps);
                Ok(())
            }
            _ => self.mismatch(Entry::SetEnd),
        }
    }

    fn format_diagnostic(&self, diag: &mut Diagnostic) {
        diag.push(diag::Arg::Highlight(Highlight::new(
            self.id(),
            format!("reading '{}'", self.format_path()),
        )));
    }

    fn id(&self) -> &'static str {
        "PropertyReader"
    }
}

fn extract_scalar(ty: &PropertyType, target: &mut dyn std::any::Any) -> Value {
    match ty {
        PropertyType::Bool => Value::Bool(*get::<bool>(target)),
        PropertyType::Int8 => Value::Int8(*get::<i8>(target)),
        PropertyType::Int16 => Value::Int16(*get::<i16>(target)),
        PropertyType::Int32 => Value::Int32(*get::<i32>(target)),
        PropertyType::Int64 => Value::Int64(*get::<i64>(target)),
        PropertyType::UInt8 => Value::UInt8(*get::<u8>(target)),
        PropertyType::UInt16 => Value::UInt16(*get::<u16>(target)),
        PropertyType::UInt32 => Value::UInt32(*get::<u32>(target)),
        PropertyType::UInt64 => Value::UInt64(*get::<u64>(target)),
        PropertyType::Float => Value::Float(*get::<f32>(target)),
        PropertyType::Double => Value::Double(*get::<f64>(target)),
        PropertyType::Str => Value::String(get::<String>(target).clone()),
        PropertyType::Name => Value::Name(get::<Name>(target).clone()),
        PropertyType::Text => Value::Text(get::<String>(target).clone()),
        _ => unreachable!("scalar extraction checked against slot kind"),
    }
}

fn get<'t, T: std::any::Any>(target: &'t mut dyn std::any::Any) -> &'t T {
    target
        .downcast_ref::<T>()
        .expect("field storage matches catalog type")
}
