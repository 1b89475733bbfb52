//! Access paths from a root datum down to the slot being read or written.
//! Every operation re-resolves through registered accessors, so the stacks
//! hold no borrows into the reflected record.

use crate::types::{ArrayType, FieldDef, MapType, OptionalType};
use diag::Result;
use pipe::Value;
use std::any::Any;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) enum PathStep {
    /// A named struct field.
    Field(Arc<FieldDef>),
    /// Append a defaulted element and address it. Converted to a stable
    /// `ArrayItem` by `enter`.
    ArrayPush(Arc<ArrayType>),
    ArrayItem(Arc<ArrayType>, usize),
    /// Insert-or-find a defaulted map value. Converted to a stable
    /// `MapItem` by `enter`.
    MapInsert(Arc<MapType>, Value),
    MapItem(Arc<MapType>, Value),
    /// Materialize the optional's inner slot, defaulting an absent value.
    OptionalInner(Arc<OptionalType>),
    /// Address the optional's present inner value.
    OptionalGet(Arc<OptionalType>),
}

/// Walk `steps` from `root`, applying one-time mutations (array pushes, map
/// inserts) as they are encountered. Returns the stable rendition of the
/// path alongside the addressed storage.
pub(crate) fn enter<'s>(
    root: &'s mut dyn Any,
    steps: &[PathStep],
) -> Result<(Vec<PathStep>, &'s mut dyn Any)> {
    let mut stable = Vec::with_capacity(steps.len());
    let mut cur = root;
    for step in steps {
        cur = match step {
            PathStep::Field(field) => {
                stable.push(step.clone());
                field.access(cur)?
            }
            PathStep::ArrayPush(ty) => {
                let index = (ty.ops.len)(&*cur);
                stable.push(PathStep::ArrayItem(ty.clone(), index));
                (ty.ops.push_default)(cur)
            }
            PathStep::ArrayItem(ty, index) => {
                stable.push(step.clone());
                (ty.ops.get_mut)(cur, *index)
            }
            PathStep::MapInsert(ty, key) => {
                stable.push(PathStep::MapItem(ty.clone(), key.clone()));
                (ty.ops.insert_default)(cur, key)?
            }
            PathStep::MapItem(ty, key) => {
                stable.push(step.clone());
                match (ty.ops.get_mut)(cur, key) {
                    Some(slot) => slot,
                    None => return diag::no_entry(),
                }
            }
            PathStep::OptionalInner(ty) => {
                stable.push(step.clone());
                (ty.ops.materialize)(cur)
            }
            PathStep::OptionalGet(ty) => {
                stable.push(step.clone());
                match (ty.ops.get_mut)(cur) {
                    Some(slot) => slot,
                    None => return diag::no_entry(),
                }
            }
        };
    }
    Ok((stable, cur))
}

/// Walk a stable path without structural mutation beyond idempotent
/// optional materialization.
pub(crate) fn resolve<'s>(root: &'s mut dyn Any, steps: &[PathStep]) -> Result<&'s mut dyn Any> {
    let (_, target) = enter(root, steps)?;
    Ok(target)
}
