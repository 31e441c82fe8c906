use crate::core::sync_impl::AsAny;
use crate::core::validation::StageShape;
use std::sync::Arc;

/// A shared handle to a unit. Workflows hold shares, never the unit itself.
pub type UnitRef = Arc<dyn Unit>;

/// Defines one processing stage of a workflow.
///
/// A unit consumes exactly [`input_count`](Unit::input_count) floats and
/// produces exactly [`output_count`](Unit::output_count) floats. Both sizes are
/// fixed for the lifetime of the unit; to change them, replace the unit.
pub trait Unit: AsAny + Send + Sync + 'static {
    /// Human-readable name used in logs, traces and validation messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Number of floats consumed.
    fn input_count(&self) -> usize;

    /// Number of floats produced.
    fn output_count(&self) -> usize;

    /// Compute the output for `input`.
    ///
    /// The workflow guarantees `input.len() == self.input_count()` and
    /// `output.len() == self.output_count()`.
    fn execute(&self, input: &[f32], output: &mut [f32]);
}

pub(crate) fn shape_of(unit: &dyn Unit) -> StageShape<'_> {
    StageShape {
        name: unit.name(),
        input_count: unit.input_count(),
        output_count: unit.output_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Negate(usize);

    impl Unit for Negate {
        fn input_count(&self) -> usize {
            self.0
        }

        fn output_count(&self) -> usize {
            self.0
        }

        fn execute(&self, input: &[f32], output: &mut [f32]) {
            for (o, i) in output.iter_mut().zip(input) {
                *o = -i;
            }
        }
    }

    #[test]
    fn test_default_name_is_type_name() {
        let unit = Negate(2);
        assert!(unit.name().ends_with("Negate"));
    }

    #[test]
    fn test_shape_of() {
        let unit: UnitRef = Arc::new(Negate(3));
        let shape = shape_of(unit.as_ref());
        assert_eq!(shape.input_count, 3);
        assert_eq!(shape.output_count, 3);
    }

    #[test]
    fn test_downcast_shared_unit() {
        let unit: UnitRef = Arc::new(Negate(5));
        let concrete = unit.as_ref().as_any().downcast_ref::<Negate>();
        assert_eq!(concrete.map(|n| n.0), Some(5));
    }

    #[test]
    fn test_execute() {
        let unit = Negate(2);
        let mut out = [0.0; 2];
        unit.execute(&[1.0, -2.0], &mut out);
        assert_eq!(out, [-1.0, 2.0]);
    }
}
