use crate::core::sync_impl::AsAny;
use async_trait::async_trait;
use std::sync::Arc;

/// A shared handle to an async unit.
pub type AsyncUnitRef = Arc<dyn AsyncUnit>;

/// An asynchronous processing stage.
///
/// Similar to [`Unit`](crate::core::sync_impl::unit::Unit) but with an awaitable
/// execute, for stages whose work happens off the CPU thread (a device queue,
/// a remote worker). Async units can be mixed with sync units in an
/// [`AsyncWorkflow`](crate::core::async_impl::async_workflow::AsyncWorkflow).
#[async_trait]
pub trait AsyncUnit: AsAny + Send + Sync + 'static {
    /// Human-readable name used in logs, traces and validation messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Number of floats consumed.
    fn input_count(&self) -> usize;

    /// Number of floats produced.
    fn output_count(&self) -> usize;

    /// Compute the output for `input`. Slice lengths match the declared counts.
    async fn execute(&self, input: &[f32], output: &mut [f32]);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offset {
        size: usize,
        by: f32,
    }

    #[async_trait]
    impl AsyncUnit for Offset {
        fn input_count(&self) -> usize {
            self.size
        }

        fn output_count(&self) -> usize {
            self.size
        }

        async fn execute(&self, input: &[f32], output: &mut [f32]) {
            tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
            for (o, i) in output.iter_mut().zip(input) {
                *o = i + self.by;
            }
        }
    }

    #[tokio::test]
    async fn test_async_unit_execute() {
        let unit: AsyncUnitRef = Arc::new(Offset { size: 3, by: 0.5 });
        let mut out = [0.0; 3];
        unit.execute(&[1.0, 2.0, 3.0], &mut out).await;
        assert_eq!(out, [1.5, 2.5, 3.5]);
        assert!(unit.name().ends_with("Offset"));
    }
}
