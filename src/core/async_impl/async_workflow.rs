use crate::core::Stage;
use crate::core::buffer::Scratch;
use crate::core::error::{Result, WorkflowError};
use crate::core::sync_impl::workflow::{DEFAULT_WORKFLOW_NAME, Workflow};
use crate::core::telemetry::{Telemetry, TraceEntry};
use crate::core::validation::{self, StageShape, ValidationResult};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// An ordered chain of sync and async stages.
///
/// Async stages are awaited in place. Sync stages run on tokio's blocking pool
/// with the scratch buffers moved in and handed back, so a slow unit never
/// stalls the executor. Execution must happen inside a tokio runtime.
#[derive(Clone)]
pub struct AsyncWorkflow {
    id: Uuid,
    name: String,
    stages: Vec<Stage>,
    max_concurrency: usize,
}

impl Default for AsyncWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Workflow> for AsyncWorkflow {
    fn from(workflow: Workflow) -> Self {
        let mut converted = AsyncWorkflow::with_name(workflow.name());
        converted.id = workflow.id();
        converted.stages = workflow.units().cloned().map(Stage::Sync).collect();
        converted
    }
}

impl AsyncWorkflow {
    pub fn new() -> Self {
        Self::with_name(DEFAULT_WORKFLOW_NAME)
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        AsyncWorkflow {
            id: Uuid::new_v4(),
            name: name.into(),
            stages: Vec::new(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Caps how many inputs [`execute_batch`](AsyncWorkflow::execute_batch) runs at once.
    pub fn with_concurrency(self, max_concurrency: usize) -> Self {
        assert!(
            max_concurrency > 0,
            "Max concurrency must be greater than 0"
        );
        AsyncWorkflow {
            max_concurrency,
            ..self
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn add_stage(&mut self, stage: impl Into<Stage>) {
        let stage = stage.into();
        log::debug!(
            "[{}] Appending stage {} at index {}",
            self.name,
            stage.name(),
            self.stages.len()
        );
        self.stages.push(stage);
    }

    pub fn insert_stage(&mut self, index: usize, stage: impl Into<Stage>) -> Result<()> {
        if index > self.stages.len() {
            return Err(WorkflowError::IndexOutOfRange {
                index,
                len: self.stages.len(),
            });
        }
        let stage = stage.into();
        log::debug!(
            "[{}] Inserting stage {} at index {}",
            self.name,
            stage.name(),
            index
        );
        self.stages.insert(index, stage);
        Ok(())
    }

    pub fn remove_stage(&mut self, index: usize) -> Result<Stage> {
        if index >= self.stages.len() {
            return Err(WorkflowError::IndexOutOfRange {
                index,
                len: self.stages.len(),
            });
        }
        let stage = self.stages.remove(index);
        log::debug!(
            "[{}] Removed stage {} from index {}",
            self.name,
            stage.name(),
            index
        );
        Ok(stage)
    }

    pub fn clear(&mut self) {
        self.stages.clear();
    }

    pub fn get_stage(&self, index: usize) -> Result<Stage> {
        self.stages
            .get(index)
            .cloned()
            .ok_or(WorkflowError::IndexOutOfRange {
                index,
                len: self.stages.len(),
            })
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stages(&self) -> std::slice::Iter<'_, Stage> {
        self.stages.iter()
    }

    pub fn input_count(&self) -> usize {
        self.stages.first().map_or(0, Stage::input_count)
    }

    pub fn output_count(&self) -> usize {
        self.stages.last().map_or(0, Stage::output_count)
    }

    pub fn max_unit_size(&self) -> usize {
        validation::max_stage_size(self.shapes())
    }

    pub fn validate(&self) -> ValidationResult {
        validation::validate_chain(self.shapes())
    }

    fn shapes(&self) -> impl Iterator<Item = StageShape<'_>> {
        self.stages.iter().map(Stage::shape)
    }

    pub async fn execute(&self, input: &[f32]) -> Result<Vec<f32>> {
        self.execute_with_telemetry(input, None).await
    }

    /// Runs the chain and records one trace entry per stage.
    pub async fn execute_with_telemetry(
        &self,
        input: &[f32],
        telemetry: Option<&dyn Telemetry>,
    ) -> Result<Vec<f32>> {
        if input.len() != self.input_count() {
            return Err(WorkflowError::InputSizeMismatch {
                expected: self.input_count(),
                actual: input.len(),
            });
        }
        if self.stages.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(mismatch) = validation::first_chain_mismatch(self.shapes()) {
            return Err(mismatch);
        }

        let length = self.max_unit_size();
        let mut scratch = Scratch::new(length).ok_or(WorkflowError::AllocationFailed { length })?;
        scratch.ping[..input.len()].copy_from_slice(input);

        for (index, stage) in self.stages.iter().enumerate() {
            let (n_in, n_out) = (stage.input_count(), stage.output_count());
            let started = Instant::now();

            scratch = match stage {
                Stage::Async(unit) => {
                    let Scratch { ping, pong } = &mut scratch;
                    unit.execute(&ping[..n_in], &mut pong[..n_out]).await;
                    scratch
                }
                Stage::Sync(unit) => {
                    let unit = Arc::clone(unit);
                    let mut moved = scratch;
                    tokio::task::spawn_blocking(move || {
                        unit.execute(&moved.ping[..n_in], &mut moved.pong[..n_out]);
                        moved
                    })
                    .await
                    .map_err(|join_error| {
                        log::error!(
                            "[{}] Unit {} ({}) panicked: {:?}",
                            self.name,
                            index,
                            stage.name(),
                            join_error
                        );
                        WorkflowError::UnitPanicked {
                            index,
                            name: stage.name().to_string(),
                        }
                    })?
                }
            };

            if let Some(t) = telemetry {
                t.record(TraceEntry {
                    timestamp: TraceEntry::now_secs(),
                    workflow_id: self.id.to_string(),
                    unit_index: index,
                    unit_name: stage.name().to_string(),
                    input_count: n_in,
                    output_count: n_out,
                    elapsed_micros: started.elapsed().as_micros() as u64,
                });
            }
            scratch.swap();
        }

        Ok(scratch.ping[..self.output_count()].to_vec())
    }

    /// Runs every input through the chain, at most `max_concurrency` at a time.
    /// Results come back in input order.
    pub async fn execute_batch(&self, inputs: &[Vec<f32>]) -> Vec<Result<Vec<f32>>> {
        log::debug!(
            "[{}] Executing batch of {} inputs (concurrency {})",
            self.name,
            inputs.len(),
            self.max_concurrency
        );
        stream::iter(inputs)
            .map(|input| self.execute(input))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::async_impl::async_unit::{AsyncUnit, AsyncUnitRef};
    use crate::core::sync_impl::unit::{Unit, UnitRef};
    use crate::core::telemetry::MemoryTelemetry;
    use async_trait::async_trait;

    struct Double(usize);

    impl Unit for Double {
        fn input_count(&self) -> usize {
            self.0
        }

        fn output_count(&self) -> usize {
            self.0
        }

        fn execute(&self, input: &[f32], output: &mut [f32]) {
            for (o, i) in output.iter_mut().zip(input) {
                *o = i * 2.0;
            }
        }
    }

    struct Widen {
        input: usize,
        output: usize,
    }

    #[async_trait]
    impl AsyncUnit for Widen {
        fn input_count(&self) -> usize {
            self.input
        }

        fn output_count(&self) -> usize {
            self.output
        }

        async fn execute(&self, input: &[f32], output: &mut [f32]) {
            tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
            for (j, o) in output.iter_mut().enumerate() {
                *o = input[j % input.len()];
            }
        }
    }

    struct Explode;

    impl Unit for Explode {
        fn name(&self) -> &str {
            "explode"
        }

        fn input_count(&self) -> usize {
            2
        }

        fn output_count(&self) -> usize {
            2
        }

        fn execute(&self, _input: &[f32], _output: &mut [f32]) {
            panic!("boom");
        }
    }

    fn double(size: usize) -> UnitRef {
        Arc::new(Double(size))
    }

    fn widen(input: usize, output: usize) -> AsyncUnitRef {
        Arc::new(Widen { input, output })
    }

    #[tokio::test]
    async fn test_mixed_stages() {
        let mut workflow = AsyncWorkflow::new();
        workflow.add_stage(double(2));
        workflow.add_stage(widen(2, 6));
        workflow.add_stage(double(6));

        assert_eq!(workflow.stage_count(), 3);
        assert_eq!(workflow.max_unit_size(), 6);
        let output = workflow.execute(&[1.0, 2.0]).await.unwrap();
        assert_eq!(output, vec![4.0, 8.0, 4.0, 8.0, 4.0, 8.0]);
    }

    #[tokio::test]
    async fn test_matches_sync_execution() {
        let mut sync = Workflow::new();
        sync.add_unit(double(3));
        sync.add_unit(double(3));
        let input = [0.5, -1.0, 4.0];
        let expected = sync.execute(&input).unwrap();

        let converted = AsyncWorkflow::from(sync.clone());
        assert_eq!(converted.id(), sync.id());
        assert_eq!(converted.execute(&input).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_empty_and_mismatched() {
        let workflow = AsyncWorkflow::new();
        assert_eq!(workflow.max_unit_size(), 0);
        assert_eq!(workflow.execute(&[]).await, Ok(vec![]));
        assert!(workflow.get_stage(0).is_err());

        let mut broken = AsyncWorkflow::new();
        broken.add_stage(widen(2, 4));
        broken.add_stage(double(3));
        assert_eq!(
            broken.execute(&[1.0, 1.0]).await,
            Err(WorkflowError::ChainMismatch {
                index: 0,
                produced: 4,
                expected: 3
            })
        );
        assert!(!broken.validate().is_safe());
        assert_eq!(
            broken.execute(&[1.0]).await,
            Err(WorkflowError::InputSizeMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[tokio::test]
    async fn test_panicking_unit_is_reported() {
        let mut workflow = AsyncWorkflow::new();
        workflow.add_stage(double(2));
        workflow.add_stage(Arc::new(Explode) as UnitRef);
        assert_eq!(
            workflow.execute(&[1.0, 2.0]).await,
            Err(WorkflowError::UnitPanicked {
                index: 1,
                name: "explode".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_allocation_failure_is_reported() {
        let huge = usize::MAX / 8;
        let mut workflow = AsyncWorkflow::new();
        workflow.add_stage(widen(4, huge));
        workflow.add_stage(widen(huge, 1));
        assert!(workflow.validate().is_safe());
        assert_eq!(
            workflow.execute(&[0.0; 4]).await,
            Err(WorkflowError::AllocationFailed { length: huge })
        );

        // A broken chain is refused before any scratch is requested
        workflow.remove_stage(1).unwrap();
        workflow.add_stage(widen(3, 1));
        assert_eq!(
            workflow.execute(&[0.0; 4]).await,
            Err(WorkflowError::ChainMismatch {
                index: 0,
                produced: huge,
                expected: 3
            })
        );
    }

    #[tokio::test]
    async fn test_insert_remove_stages() {
        let mut workflow = AsyncWorkflow::new();
        workflow.add_stage(double(4));
        workflow.insert_stage(0, widen(2, 4)).unwrap();
        assert_eq!(workflow.input_count(), 2);
        assert_eq!(workflow.output_count(), 4);
        assert!(workflow.insert_stage(5, double(4)).is_err());

        let removed = workflow.remove_stage(0).unwrap();
        assert!(matches!(removed, Stage::Async(_)));
        assert_eq!(workflow.stage_count(), 1);
        workflow.clear();
        assert_eq!(workflow.stage_count(), 0);
    }

    #[tokio::test]
    async fn test_execute_batch_preserves_order() {
        let mut workflow = AsyncWorkflow::new().with_concurrency(2);
        workflow.add_stage(widen(1, 2));
        workflow.add_stage(double(2));

        let inputs: Vec<Vec<f32>> = (0..5).map(|v| vec![v as f32]).collect();
        let results = workflow.execute_batch(&inputs).await;
        assert_eq!(results.len(), 5);
        for (v, result) in results.into_iter().enumerate() {
            let expected = (v * 2) as f32;
            assert_eq!(result.unwrap(), vec![expected, expected]);
        }
    }

    #[tokio::test]
    async fn test_execute_with_telemetry() {
        let mut workflow = AsyncWorkflow::with_name("traced");
        workflow.add_stage(widen(1, 3));
        workflow.add_stage(double(3));
        let telemetry = MemoryTelemetry::new();
        workflow
            .execute_with_telemetry(&[1.0], Some(&telemetry))
            .await
            .unwrap();

        let traces = telemetry.get_traces();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].output_count, 3);
        assert_eq!(traces[1].unit_index, 1);
    }

    #[test]
    #[should_panic(expected = "Max concurrency must be greater than 0")]
    fn test_zero_concurrency_panics() {
        let _ = AsyncWorkflow::new().with_concurrency(0);
    }
}
