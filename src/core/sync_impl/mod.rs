//! Synchronous implementation of the unitflow engine.
//!
//! This module contains the synchronous types for building and executing
//! chains of units:
//! - [`Unit`](unit::Unit) for defining a single fixed-size processing stage
//! - [`Workflow`](workflow::Workflow) for chaining units over shared scratch buffers
//! - [`WorkflowBuilder`](workflow::WorkflowBuilder) for fluent construction

pub mod unit;
pub mod workflow;

use std::any::Any;

/// A helper trait that just provides the `as_any` method.
/// Lets callers downcast a shared unit back to its concrete type for inspection.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_any_downcasts_through_trait_object() {
        let value: Box<dyn AsAny> = Box::new(7u32);
        assert_eq!(value.as_ref().as_any().downcast_ref::<u32>(), Some(&7));
        assert!(value.as_ref().as_any().downcast_ref::<i64>().is_none());
    }
}
