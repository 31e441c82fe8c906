use crate::core::buffer::Scratch;
use crate::core::error::{Result, WorkflowError};
use crate::core::sync_impl::unit::{UnitRef, shape_of};
use crate::core::telemetry::{Telemetry, TraceEntry};
use crate::core::validation::{self, StageShape, ValidationResult};
use serde_json::{Value, json};
use std::time::Instant;
use uuid::Uuid;

pub(crate) const DEFAULT_WORKFLOW_NAME: &str = "workflow";

/// An ordered chain of shared units.
///
/// Each unit's output becomes the next unit's input. Execution runs over two
/// aligned scratch buffers sized by [`max_unit_size`](Workflow::max_unit_size),
/// so no stage allocates on its own.
///
/// Cloning a workflow shares its units; the clone keeps the same id.
#[derive(Clone)]
pub struct Workflow {
    id: Uuid,
    name: String,
    units: Vec<UnitRef>,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("units", &self.units.iter().map(|u| u.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Workflow {
    /// Creates an empty workflow.
    pub fn new() -> Self {
        Self::with_name(DEFAULT_WORKFLOW_NAME)
    }

    /// Creates an empty workflow with a name used in logs and traces.
    pub fn with_name(name: impl Into<String>) -> Self {
        Workflow {
            id: Uuid::new_v4(),
            name: name.into(),
            units: Vec::new(),
        }
    }

    pub fn builder() -> WorkflowBuilder {
        WorkflowBuilder::default()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a unit to the end of the chain.
    pub fn add_unit(&mut self, unit: UnitRef) {
        log::debug!(
            "[{}] Appending unit {} ({} -> {}) at index {}",
            self.name,
            unit.name(),
            unit.input_count(),
            unit.output_count(),
            self.units.len()
        );
        self.units.push(unit);
    }

    /// Inserts a unit before position `index`, shifting later units right.
    /// `index == unit_count()` appends.
    pub fn insert_unit(&mut self, index: usize, unit: UnitRef) -> Result<()> {
        if index > self.units.len() {
            return Err(WorkflowError::IndexOutOfRange {
                index,
                len: self.units.len(),
            });
        }
        log::debug!("[{}] Inserting unit {} at index {}", self.name, unit.name(), index);
        self.units.insert(index, unit);
        Ok(())
    }

    /// Removes the unit at `index` and hands back the workflow's share of it.
    pub fn remove_unit(&mut self, index: usize) -> Result<UnitRef> {
        if index >= self.units.len() {
            return Err(WorkflowError::IndexOutOfRange {
                index,
                len: self.units.len(),
            });
        }
        let unit = self.units.remove(index);
        log::debug!("[{}] Removed unit {} from index {}", self.name, unit.name(), index);
        Ok(unit)
    }

    /// Drops every unit share held by this workflow.
    pub fn clear(&mut self) {
        self.units.clear();
    }

    /// Returns a share of the unit at `index`.
    pub fn get_unit(&self, index: usize) -> Result<UnitRef> {
        self.units
            .get(index)
            .cloned()
            .ok_or(WorkflowError::IndexOutOfRange {
                index,
                len: self.units.len(),
            })
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn units(&self) -> std::slice::Iter<'_, UnitRef> {
        self.units.iter()
    }

    /// Number of floats the whole chain consumes.
    pub fn input_count(&self) -> usize {
        self.units.first().map_or(0, |u| u.input_count())
    }

    /// Number of floats the whole chain produces.
    pub fn output_count(&self) -> usize {
        self.units.last().map_or(0, |u| u.output_count())
    }

    /// Largest vector a single scratch buffer must hold to run the chain:
    /// the first unit's input or any unit's output, whichever is bigger.
    ///
    /// Performs no validation; malformed chains still get a size.
    pub fn max_unit_size(&self) -> usize {
        validation::max_stage_size(self.shapes())
    }

    /// Checks that every unit has positive sizes and adjacent sizes agree.
    pub fn validate(&self) -> ValidationResult {
        validation::validate_chain(self.shapes())
    }

    fn shapes(&self) -> impl Iterator<Item = StageShape<'_>> {
        self.units.iter().map(|u| shape_of(u.as_ref()))
    }

    /// Allocates scratch buffers large enough for this workflow.
    ///
    /// Hold on to the result and pass it to [`execute_with`](Workflow::execute_with)
    /// to run repeatedly without allocating.
    pub fn scratch(&self) -> Result<Scratch> {
        let length = self.max_unit_size();
        Scratch::new(length).ok_or(WorkflowError::AllocationFailed { length })
    }

    /// Runs the chain on `input` and returns the last unit's output.
    pub fn execute(&self, input: &[f32]) -> Result<Vec<f32>> {
        self.execute_with_telemetry(input, None)
    }

    /// Runs the chain and records one trace entry per unit.
    pub fn execute_with_telemetry(
        &self,
        input: &[f32],
        telemetry: Option<&dyn Telemetry>,
    ) -> Result<Vec<f32>> {
        self.check_runnable(input)?;
        let mut scratch = self.scratch()?;
        let mut output = vec![0.0; self.output_count()];
        self.run(&mut scratch, input, &mut output, telemetry)?;
        Ok(output)
    }

    /// Runs the chain using caller-owned scratch buffers, writing into `output`.
    pub fn execute_with(
        &self,
        scratch: &mut Scratch,
        input: &[f32],
        output: &mut [f32],
    ) -> Result<()> {
        self.run(scratch, input, output, None)
    }

    /// Input length and chain shape, checked before any scratch is allocated.
    fn check_runnable(&self, input: &[f32]) -> Result<()> {
        if input.len() != self.input_count() {
            return Err(WorkflowError::InputSizeMismatch {
                expected: self.input_count(),
                actual: input.len(),
            });
        }
        match validation::first_chain_mismatch(self.shapes()) {
            Some(mismatch) => Err(mismatch),
            None => Ok(()),
        }
    }

    fn run(
        &self,
        scratch: &mut Scratch,
        input: &[f32],
        output: &mut [f32],
        telemetry: Option<&dyn Telemetry>,
    ) -> Result<()> {
        self.check_runnable(input)?;
        if output.len() != self.output_count() {
            return Err(WorkflowError::OutputSizeMismatch {
                expected: self.output_count(),
                actual: output.len(),
            });
        }
        if self.units.is_empty() {
            return Ok(());
        }
        let required = self.max_unit_size();
        if scratch.capacity() < required {
            return Err(WorkflowError::ScratchTooSmall {
                required,
                capacity: scratch.capacity(),
            });
        }

        let Scratch { ping, pong } = scratch;
        let (mut src, mut dst) = (ping, pong);
        src[..input.len()].copy_from_slice(input);

        for (index, unit) in self.units.iter().enumerate() {
            let (n_in, n_out) = (unit.input_count(), unit.output_count());
            let started = Instant::now();
            unit.execute(&src[..n_in], &mut dst[..n_out]);

            if let Some(t) = telemetry {
                t.record(TraceEntry {
                    timestamp: TraceEntry::now_secs(),
                    workflow_id: self.id.to_string(),
                    unit_index: index,
                    unit_name: unit.name().to_string(),
                    input_count: n_in,
                    output_count: n_out,
                    elapsed_micros: started.elapsed().as_micros() as u64,
                });
            }
            std::mem::swap(&mut src, &mut dst);
        }

        output.copy_from_slice(&src[..output.len()]);
        log::debug!(
            "[{}] Executed {} units ({} -> {})",
            self.name,
            self.units.len(),
            input.len(),
            output.len()
        );
        Ok(())
    }

    /// A JSON summary of the chain's structure.
    pub fn describe(&self) -> Value {
        let units: Vec<Value> = self
            .units
            .iter()
            .enumerate()
            .map(|(index, unit)| {
                json!({
                    "index": index,
                    "name": unit.name(),
                    "input_count": unit.input_count(),
                    "output_count": unit.output_count(),
                })
            })
            .collect();
        json!({
            "id": self.id.to_string(),
            "name": self.name,
            "input_count": self.input_count(),
            "output_count": self.output_count(),
            "max_unit_size": self.max_unit_size(),
            "units": units,
        })
    }
}

/// Builder for creating workflows.
#[derive(Default)]
pub struct WorkflowBuilder {
    name: Option<String>,
    units: Vec<UnitRef>,
    strict: bool,
}

impl WorkflowBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unit(mut self, unit: UnitRef) -> Self {
        self.units.push(unit);
        self
    }

    pub fn units(mut self, units: impl IntoIterator<Item = UnitRef>) -> Self {
        self.units.extend(units);
        self
    }

    /// Reject chains whose adjacent sizes disagree when building.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn build(self) -> Result<Workflow> {
        let mut workflow =
            Workflow::with_name(self.name.unwrap_or_else(|| DEFAULT_WORKFLOW_NAME.to_string()));
        workflow.units = self.units;

        if self.strict {
            if let Some(mismatch) = validation::first_chain_mismatch(workflow.shapes()) {
                return Err(mismatch);
            }
        } else if !workflow.validate().is_safe() {
            log::warn!(
                "[{}] Built a workflow whose chain does not validate; execution will fail.",
                workflow.name
            );
        }
        Ok(workflow)
    }
}
