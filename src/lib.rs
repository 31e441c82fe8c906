//! # Unitflow
//!
//! A data-flow execution engine for chains of fixed-size numeric processing
//! stages ("units"), built to sit underneath signal and neural-network
//! pipelines.
//!
//! ## Features
//!
//! - **Shared Units**: Workflows hold `Arc` shares of units, so one unit can sit in many chains
//! - **One Scratch Region**: A chain runs over two 64-byte aligned buffers sized once, not per stage
//! - **Chain Validation**: Adjacent size mismatches are reported before they corrupt a run
//! - **Sync & Async Support**: Blocking units and awaitable units can be mixed in one chain
//! - **Pick-and-choose Philosophy**: Serde support for traces is feature-gated behind `telemetry`
//!
//! ## Quick Start
//!
//! ```rust
//! use unitflow::prelude::*;
//! use std::sync::Arc;
//!
//! // Define a unit
//! struct Scale {
//!     size: usize,
//!     factor: f32,
//! }
//!
//! impl Unit for Scale {
//!     fn input_count(&self) -> usize {
//!         self.size
//!     }
//!
//!     fn output_count(&self) -> usize {
//!         self.size
//!     }
//!
//!     fn execute(&self, input: &[f32], output: &mut [f32]) {
//!         for (o, i) in output.iter_mut().zip(input) {
//!             *o = i * self.factor;
//!         }
//!     }
//! }
//!
//! // Chain and run it
//! let mut workflow = Workflow::new();
//! workflow.add_unit(Arc::new(Scale { size: 3, factor: 2.0 }));
//! workflow.add_unit(Arc::new(Scale { size: 3, factor: 0.5 }));
//! assert_eq!(workflow.max_unit_size(), 3);
//! assert_eq!(workflow.execute(&[1.0, 2.0, 3.0]).unwrap(), vec![1.0, 2.0, 3.0]);
//! ```
//!
//! ## Module Organization
//!
//! - [`buffer`]: Aligned buffer allocation and ping-pong scratch space
//! - [`prelude`]: Commonly used types and traits (import with `use unitflow::prelude::*`)
//! - [`sync_prelude`]: Only synchronous types (import with `use unitflow::sync_prelude::*`)
//! - [`async_prelude`]: Only asynchronous types (import with `use unitflow::async_prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

// Core types
pub use crate::core::Stage;
pub use crate::core::buffer;
pub use crate::core::buffer::{AlignedBuffer, BUFFER_ALIGNMENT, Scratch, allocate_float_buffer};
pub use crate::core::error::{Result, WorkflowError};
pub use crate::core::telemetry::{MemoryTelemetry, Telemetry, TraceEntry};
pub use crate::core::validation::{StageShape, ValidationIssue, ValidationResult};

// Synchronous implementations
pub use crate::core::sync_impl::AsAny;
pub use crate::core::sync_impl::unit::{Unit, UnitRef};
pub use crate::core::sync_impl::workflow::{Workflow, WorkflowBuilder};

// Asynchronous implementations
pub use crate::core::async_impl::async_unit::{AsyncUnit, AsyncUnitRef};
pub use crate::core::async_impl::async_workflow::AsyncWorkflow;

// ============================================================================
// Prelude Modules - Convenient Bulk Imports
// ============================================================================

/// The main prelude: imports everything you need for both sync and async workflows.
///
/// # Example
/// ```rust
/// use unitflow::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        // Core
        AlignedBuffer,
        AsAny,
        // Async
        AsyncUnit,
        AsyncUnitRef,
        AsyncWorkflow,
        Scratch,
        Stage,
        // Sync
        Unit,
        UnitRef,
        ValidationResult,
        Workflow,
        WorkflowBuilder,
        WorkflowError,
        allocate_float_buffer,
    };
}

/// Prelude for synchronous-only workflows.
///
/// # Example
/// ```rust
/// use unitflow::sync_prelude::*;
/// ```
pub mod sync_prelude {
    pub use super::{
        AlignedBuffer, AsAny, Scratch, Unit, UnitRef, ValidationResult, Workflow,
        WorkflowBuilder, WorkflowError, allocate_float_buffer,
    };
}

/// Prelude for asynchronous-only workflows.
///
/// # Example
/// ```rust
/// use unitflow::async_prelude::*;
/// ```
pub mod async_prelude {
    pub use super::{
        AsAny, AsyncUnit, AsyncUnitRef, AsyncWorkflow, Stage, Unit, UnitRef, ValidationResult,
        WorkflowError,
    };
}

// ============================================================================
// Re-export commonly used external types for convenience
// ============================================================================

pub use serde_json::Value as JsonValue;

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
