pub mod async_impl;
pub mod buffer;
pub mod error;
pub mod sync_impl;
pub mod telemetry;
pub mod validation;

use async_impl::async_unit::AsyncUnitRef;
use sync_impl::unit::{UnitRef, shape_of};
use validation::StageShape;

/// A slot in an async workflow: either a blocking unit or an awaitable one.
#[derive(Clone)]
pub enum Stage {
    Sync(UnitRef),
    Async(AsyncUnitRef),
}

impl Stage {
    pub fn name(&self) -> &str {
        match self {
            Stage::Sync(unit) => unit.name(),
            Stage::Async(unit) => unit.name(),
        }
    }

    pub fn input_count(&self) -> usize {
        match self {
            Stage::Sync(unit) => unit.input_count(),
            Stage::Async(unit) => unit.input_count(),
        }
    }

    pub fn output_count(&self) -> usize {
        match self {
            Stage::Sync(unit) => unit.output_count(),
            Stage::Async(unit) => unit.output_count(),
        }
    }

    pub(crate) fn shape(&self) -> StageShape<'_> {
        match self {
            Stage::Sync(unit) => shape_of(unit.as_ref()),
            Stage::Async(unit) => StageShape {
                name: unit.name(),
                input_count: unit.input_count(),
                output_count: unit.output_count(),
            },
        }
    }
}

impl From<UnitRef> for Stage {
    fn from(unit: UnitRef) -> Self {
        Stage::Sync(unit)
    }
}

impl From<AsyncUnitRef> for Stage {
    fn from(unit: AsyncUnitRef) -> Self {
        Stage::Async(unit)
    }
}
