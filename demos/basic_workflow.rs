//! A complete example showing how to build and run a unit chain with unitflow.
//!
//! This example demonstrates:
//! - Creating custom units
//! - Sharing one unit between two workflows
//! - Validating a chain before running it
//! - Sizing and reusing scratch buffers across runs

use std::sync::Arc;
use unitflow::prelude::*;

// ============================================================================
// Step 1: Define units
// ============================================================================

/// Spreads each input value over `factor` neighbouring outputs.
struct Upsample {
    inputs: usize,
    factor: usize,
}

impl Unit for Upsample {
    fn name(&self) -> &str {
        "upsample"
    }

    fn input_count(&self) -> usize {
        self.inputs
    }

    fn output_count(&self) -> usize {
        self.inputs * self.factor
    }

    fn execute(&self, input: &[f32], output: &mut [f32]) {
        for (chunk, value) in output.chunks_mut(self.factor).zip(input) {
            chunk.fill(*value);
        }
    }
}

/// Averages each window of `window` inputs into one output.
struct AveragePool {
    outputs: usize,
    window: usize,
}

impl Unit for AveragePool {
    fn name(&self) -> &str {
        "average_pool"
    }

    fn input_count(&self) -> usize {
        self.outputs * self.window
    }

    fn output_count(&self) -> usize {
        self.outputs
    }

    fn execute(&self, input: &[f32], output: &mut [f32]) {
        for (o, window) in output.iter_mut().zip(input.chunks(self.window)) {
            *o = window.iter().sum::<f32>() / self.window as f32;
        }
    }
}

fn main() -> Result<(), WorkflowError> {
    // ========================================================================
    // Step 2: Build the chain
    // ========================================================================

    let upsample: UnitRef = Arc::new(Upsample {
        inputs: 4,
        factor: 3,
    });
    let pool: UnitRef = Arc::new(AveragePool {
        outputs: 6,
        window: 2,
    });

    let workflow = Workflow::builder()
        .name("resample")
        .unit(upsample.clone())
        .unit(pool)
        .strict(true)
        .build()?;

    let validation = workflow.validate();
    validation.log_summary();
    println!(
        "Workflow '{}' has {} units, needs scratch of {} floats",
        workflow.name(),
        workflow.unit_count(),
        workflow.max_unit_size()
    );
    println!("{}", workflow.describe());

    // ========================================================================
    // Step 3: Run it repeatedly over one scratch allocation
    // ========================================================================

    let mut scratch = workflow.scratch()?;
    let mut output = vec![0.0; workflow.output_count()];
    for signal in [[1.0, 2.0, 3.0, 4.0], [0.0, 10.0, 0.0, 10.0]] {
        workflow.execute_with(&mut scratch, &signal, &mut output)?;
        println!("{:?} -> {:?}", signal, output);
    }

    // ========================================================================
    // Step 4: Share the upsampler with a second workflow
    // ========================================================================

    let mut preview = Workflow::with_name("preview");
    preview.add_unit(upsample);
    println!(
        "Preview output: {:?}",
        preview.execute(&[1.0, 0.0, 1.0, 0.0])?
    );

    Ok(())
}
