//! Serialization: the symmetric registry and handler pack driving a
//! property reader into any structural writer.

use crate::{amend_with_positions, CtxState, PredicateResult, StructKey};
use diag::{fail, rw, serde, Result, ScopedReader, ScopedWriter};
use fxhash::FxHashMap;
use pipe::{Entry, Name, Reader, Writer};
use reflect::{
    find_effective_property_by_name, format_variant_type_name, property_to_entry,
    try_get_enum_property, try_get_struct, Datum, FieldDef, FieldVariant, PropertyKind,
    PropertyType, PropertyReader,
};
use std::sync::Arc;

type HandlerFn = dyn for<'a, 'b> Fn(&'b mut Context<'a>) -> Result<()> + Send + Sync;
type PredicateFn = dyn for<'a, 'b> Fn(&'b Context<'a>) -> PredicateResult + Send + Sync;

#[derive(Clone)]
pub struct Handler(Option<Arc<HandlerFn>>);

impl Handler {
    pub fn new(
        f: impl for<'a, 'b> Fn(&'b mut Context<'a>) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Handler(Some(Arc::new(f)))
    }

    pub fn stale() -> Self {
        Handler(None)
    }

    fn invoke(&self, ctx: &mut Context<'_>) -> Result<()> {
        match &self.0 {
            Some(f) => f(ctx),
            None => fail!(diag::common::STALE_HANDLER),
        }
    }
}

#[derive(Clone)]
pub struct Predicate(Option<Arc<PredicateFn>>);

impl Predicate {
    pub fn new(
        f: impl for<'a, 'b> Fn(&'b Context<'a>) -> PredicateResult + Send + Sync + 'static,
    ) -> Self {
        Predicate(Some(Arc::new(f)))
    }

    fn invoke(&self, ctx: &Context<'_>) -> Result<PredicateResult> {
        match &self.0 {
            Some(f) => Ok(f(ctx)),
            None => fail!(diag::common::STALE_HANDLER),
        }
    }
}

pub struct Context<'a> {
    pub state: CtxState,
    pub serializer: &'a Serializer,
    pub reader: &'a mut dyn Reader,
    pub writer: &'a mut dyn Writer,
    pub properties: &'a mut Vec<FieldVariant>,
}

impl Context<'_> {
    pub fn top_property(&self) -> Result<&FieldVariant> {
        match self.properties.last() {
            Some(variant) => Ok(variant),
            None => diag::no_entry(),
        }
    }
}

pub fn with_property<R>(
    ctx: &mut Context<'_>,
    prop: FieldVariant,
    f: impl FnOnce(&mut Context<'_>) -> Result<R>,
) -> Result<R> {
    ctx.properties.push(prop);
    let result = f(ctx);
    ctx.properties.pop();
    result
}

#[derive(Default)]
pub struct Serializer {
    by_struct: FxHashMap<StructKey, Handler>,
    by_kind: FxHashMap<PropertyKind, Handler>,
    predicated: Vec<(Predicate, Handler)>,
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_struct_handler(&mut self, key: StructKey, handler: Handler) {
        debug_assert!(!self.by_struct.contains_key(&key));
        self.by_struct.insert(key, handler);
    }

    pub fn add_direct_handler(&mut self, kind: PropertyKind, handler: Handler) {
        debug_assert!(!self.by_kind.contains_key(&kind));
        self.by_kind.insert(kind, handler);
    }

    pub fn add_predicated_handler(&mut self, predicate: Predicate, handler: Handler) {
        self.predicated.push((predicate, handler));
    }

    pub fn serialize(&self, ctx: &mut Context<'_>) -> Result<()> {
        match ctx.state {
            CtxState::Uninitialized => fail!(serde::NOT_PREPARED),
            CtxState::Ready => {
                ctx.state = CtxState::InProgress;
                let result = self.serialize_body(ctx);
                ctx.state = CtxState::Ended;
                if result.is_err() {
                    amend_with_positions(ctx.reader, ctx.writer);
                }
                result
            }
            CtxState::InProgress => {
                let result = self.serialize_body(ctx);
                if result.is_err() {
                    amend_with_positions(ctx.reader, ctx.writer);
                }
                result
            }
            CtxState::Ended => diag::no_entry(),
        }
    }

    fn serialize_body(&self, ctx: &mut Context<'_>) -> Result<()> {
        for (predicate, handler) in &self.predicated {
            if predicate.invoke(ctx)? == PredicateResult::Process {
                return handler.invoke(ctx);
            }
        }

        let top = ctx.top_property()?.clone();
        let handler = match &top {
            FieldVariant::Struct(st) => self
                .by_struct
                .get(&StructKey::Exact(st.name.clone()))
                .or_else(|| self.by_struct.get(&StructKey::Any)),
            FieldVariant::Property(field) => self.by_kind.get(&field.ty.kind()),
        };

        match handler {
            Some(handler) => handler.invoke(ctx),
            None => {
                let kind = match &top {
                    FieldVariant::Struct(_) => "Struct".to_owned(),
                    FieldVariant::Property(field) => field.ty.kind().to_string(),
                };
                fail!(serde::NO_MATCHING_HANDLER, top.name(), kind)
            }
        }
    }
}

/// Top-level entry point: walk `datum` through the registry into `writer`.
pub fn serialize_into(
    serializer: &Serializer,
    datum: Datum<'_>,
    writer: &mut dyn Writer,
) -> Result<()> {
    let _stacked_reader = ScopedReader::new("PropertyReader");
    let _stacked_writer = ScopedWriter::new(writer.id());
    tracing::debug!(root = %datum.variant.name(), "serialize");

    let mut properties = vec![datum.variant.clone()];
    let mut reader = PropertyReader::new(datum);
    let mut ctx = Context {
        state: CtxState::Ready,
        serializer,
        reader: &mut reader,
        writer,
        properties: &mut properties,
    };
    serializer.serialize(&mut ctx)
}

/// Serialize a datum to a JSON string with the default handler pack and
/// style, for logs and tests.
pub fn dump_json(datum: Datum<'_>) -> Result<String> {
    let mut serializer = Serializer::new();
    setup_json_serialize_handlers(&mut serializer);

    let mut writer = json::JsonWriter::new();
    serialize_into(&serializer, datum, &mut writer)?;
    Ok(writer.take_output())
}

//	JSON handler pack

fn check_entry(ctx: &mut Context<'_>, expected: Entry) -> Result<()> {
    let next = ctx.reader.peek()?;
    if next != expected {
        return fail!(serde::DATA_ENTRY_MISMATCH, expected, next);
    }
    Ok(())
}

pub fn handler_bool(ctx: &mut Context<'_>) -> Result<()> {
    check_entry(ctx, Entry::Bool)?;
    let v = ctx.reader.read_bool()?;
    ctx.writer.write_bool(v)
}

pub fn handler_name(ctx: &mut Context<'_>) -> Result<()> {
    check_entry(ctx, Entry::Name)?;
    let v = ctx.reader.read_name()?;
    ctx.writer.write_name(&v)
}

pub fn handler_string(ctx: &mut Context<'_>) -> Result<()> {
    check_entry(ctx, Entry::String)?;
    let v = ctx.reader.read_string()?;
    ctx.writer.write_string(&v)
}

pub fn handler_text(ctx: &mut Context<'_>) -> Result<()> {
    check_entry(ctx, Entry::Text)?;
    let v = ctx.reader.read_text()?;
    ctx.writer.write_text(&v)
}

pub fn predicate_is_enum(ctx: &Context<'_>) -> PredicateResult {
    match ctx.properties.last() {
        Some(top) if try_get_enum_property(top).is_some() => PredicateResult::Process,
        _ => PredicateResult::Pass,
    }
}

/// Enum fields serialize as their entry name, falling back to the bare
/// value when the entry is unnamed.
pub fn handler_enum(ctx: &mut Context<'_>) -> Result<()> {
    check_entry(ctx, Entry::Enum)?;
    let value = ctx.reader.read_enum()?;
    match &value.name {
        Some(name) => ctx.writer.write_string(name.as_str()),
        None if value.is_unsigned => ctx.writer.write_uint64(value.value as u64),
        None => ctx.writer.write_int64(value.value),
    }
}

pub fn predicate_is_numeric(ctx: &Context<'_>) -> PredicateResult {
    match ctx.properties.last() {
        Some(FieldVariant::Property(field))
            if reflect::is_numeric_property(field.ty.kind()) =>
        {
            PredicateResult::Process
        }
        _ => PredicateResult::Pass,
    }
}

pub fn handler_numeric(ctx: &mut Context<'_>) -> Result<()> {
    let top = ctx.top_property()?.clone();
    let field = match &top {
        FieldVariant::Property(field) => field.clone(),
        FieldVariant::Struct(_) => {
            return fail!(serde::EXPECT_META_TYPE, format_variant_type_name(&top))
        }
    };
    let kind = field.ty.kind();
    check_entry(ctx, property_to_entry(&field.ty))?;

    match kind {
        PropertyKind::Int8 => {
            let v = ctx.reader.read_int8()?;
            ctx.writer.write_int8(v)
        }
        PropertyKind::Int16 => {
            let v = ctx.reader.read_int16()?;
            ctx.writer.write_int16(v)
        }
        PropertyKind::Int32 => {
            let v = ctx.reader.read_int32()?;
            ctx.writer.write_int32(v)
        }
        PropertyKind::Int64 => {
            let v = ctx.reader.read_int64()?;
            ctx.writer.write_int64(v)
        }
        PropertyKind::UInt8 => {
            let v = ctx.reader.read_uint8()?;
            ctx.writer.write_uint8(v)
        }
        PropertyKind::UInt16 => {
            let v = ctx.reader.read_uint16()?;
            ctx.writer.write_uint16(v)
        }
        PropertyKind::UInt32 => {
            let v = ctx.reader.read_uint32()?;
            ctx.writer.write_uint32(v)
        }
        PropertyKind::UInt64 => {
            let v = ctx.reader.read_uint64()?;
            ctx.writer.write_uint64(v)
        }
        PropertyKind::Float => {
            let v = ctx.reader.read_float()?;
            ctx.writer.write_float(v)
        }
        PropertyKind::Double => {
            let v = ctx.reader.read_double()?;
            ctx.writer.write_double(v)
        }
        _ => diag::no_entry(),
    }
}

pub fn handler_array(ctx: &mut Context<'_>) -> Result<()> {
    let top = ctx.top_property()?.clone();
    let array_ty = match top.property_type() {
        PropertyType::Array(ty) => ty,
        _ => return fail!(serde::EXPECT_META_TYPE, format_variant_type_name(&top)),
    };

    check_entry(ctx, Entry::ArrayRoot)?;
    ctx.reader.read_array_root()?;
    ctx.writer.write_array_root()?;

    loop {
        if ctx.reader.peek()? == Entry::ArrayEnd {
            break;
        }
        let inner = FieldDef::synthetic(Name::new("item"), array_ty.inner.clone());
        with_property(ctx, FieldVariant::Property(inner), |ctx| {
            let serializer = ctx.serializer;
            serializer.serialize(ctx)
        })?;
    }

    ctx.reader.read_array_end()?;
    ctx.writer.write_array_end()
}

/// Sets serialize as JSON arrays.
pub fn handler_set(ctx: &mut Context<'_>) -> Result<()> {
    let top = ctx.top_property()?.clone();
    let set_ty = match top.property_type() {
        PropertyType::Set(ty) => ty,
        _ => return fail!(serde::EXPECT_META_TYPE, format_variant_type_name(&top)),
    };

    check_entry(ctx, Entry::SetRoot)?;
    ctx.reader.read_set_root()?;
    ctx.writer.write_array_root()?;

    loop {
        if ctx.reader.peek()? == Entry::SetEnd {
            break;
        }
        let inner = FieldDef::synthetic(Name::new("item"), set_ty.inner.clone());
        with_property(ctx, FieldVariant::Property(inner), |ctx| {
            let serializer = ctx.serializer;
            serializer.serialize(ctx)
        })?;
    }

    ctx.reader.read_set_end()?;
    ctx.writer.write_array_end()
}

pub fn handler_map(ctx: &mut Context<'_>) -> Result<()> {
    let top = ctx.top_property()?.clone();
    let map_ty = match top.property_type() {
        PropertyType::Map(ty) => ty,
        _ => return fail!(serde::EXPECT_META_TYPE, format_variant_type_name(&top)),
    };

    check_entry(ctx, Entry::MapRoot)?;
    ctx.reader.read_map_root()?;
    ctx.writer.write_map_root()?;

    loop {
        if ctx.reader.peek()? == Entry::MapEnd {
            break;
        }

        match map_ty.key.kind() {
            PropertyKind::Name => {
                let key = ctx.reader.read_name()?;
                ctx.writer.write_name(&key)?;
            }
            PropertyKind::Str => {
                let key = ctx.reader.read_string()?;
                ctx.writer.write_string(&key)?;
            }
            other => {
                return fail!(
                    rw::PROPERTY_MISMATCH,
                    Entry::Name,
                    other.to_string(),
                    format_variant_type_name(&top)
                )
            }
        }

        let value = FieldDef::synthetic(Name::new("value"), map_ty.value.clone());
        with_property(ctx, FieldVariant::Property(value), |ctx| {
            let serializer = ctx.serializer;
            serializer.serialize(ctx)
        })?;
    }

    ctx.reader.read_map_end()?;
    ctx.writer.write_map_end()
}

pub fn handler_struct(ctx: &mut Context<'_>) -> Result<()> {
    let top = ctx.top_property()?.clone();
    let struct_ty = match try_get_struct(&top) {
        Some(ty) => ty,
        None => return fail!(serde::EXPECT_META_TYPE, format_variant_type_name(&top)),
    };

    check_entry(ctx, Entry::StructRoot)?;
    ctx.reader.read_struct_root()?;
    ctx.writer.write_map_root()?;

    loop {
        if ctx.reader.peek()? == Entry::StructEnd {
            break;
        }

        let key = ctx.reader.read_name()?;
        let field = match find_effective_property_by_name(&struct_ty, &key) {
            Some(field) => field,
            None => return fail!(rw::CANT_FIND_PROPERTY_BY_NAME, &key, &struct_ty.name),
        };
        ctx.writer.write_name(&key)?;

        with_property(ctx, FieldVariant::Property(field), |ctx| {
            let serializer = ctx.serializer;
            serializer.serialize(ctx)
        })?;
    }

    ctx.reader.read_struct_end()?;
    ctx.writer.write_map_end()
}

/// Optionals serialize as their value, or `null` when absent.
pub fn handler_optional(ctx: &mut Context<'_>) -> Result<()> {
    let top = ctx.top_property()?.clone();
    let opt_ty = match top.property_type() {
        PropertyType::Optional(ty) => ty,
        _ => return fail!(serde::EXPECT_META_TYPE, format_variant_type_name(&top)),
    };

    if ctx.reader.peek()? == Entry::Nil {
        ctx.reader.read_nil()?;
        return ctx.writer.write_nil();
    }

    let inner = FieldDef::synthetic(top.name().clone(), opt_ty.inner.clone());
    with_property(ctx, FieldVariant::Property(inner), |ctx| {
        let serializer = ctx.serializer;
        serializer.serialize(ctx)
    })
}

/// Register the built-in JSON serialize handlers.
pub fn setup_json_serialize_handlers(serializer: &mut Serializer) {
    serializer.add_direct_handler(PropertyKind::Bool, Handler::new(handler_bool));
    serializer.add_direct_handler(PropertyKind::Name, Handler::new(handler_name));
    serializer.add_direct_handler(PropertyKind::Str, Handler::new(handler_string));
    serializer.add_direct_handler(PropertyKind::Text, Handler::new(handler_text));

    {
        // order significant
        serializer
            .add_predicated_handler(Predicate::new(predicate_is_enum), Handler::new(handler_enum));
        serializer.add_predicated_handler(
            Predicate::new(predicate_is_numeric),
            Handler::new(handler_numeric),
        );
    }

    serializer.add_direct_handler(PropertyKind::Array, Handler::new(handler_array));
    serializer.add_direct_handler(PropertyKind::Set, Handler::new(handler_set));
    serializer.add_direct_handler(PropertyKind::Map, Handler::new(handler_map));
    serializer.add_direct_handler(PropertyKind::Optional, Handler::new(handler_optional));

    serializer.add_struct_handler(StructKey::Any, Handler::new(handler_struct));
    serializer.add_direct_handler(PropertyKind::Struct, Handler::new(handler_struct));
}
