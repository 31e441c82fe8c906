//! Asynchronous implementation of the unitflow engine.
//!
//! This module contains the asynchronous types for executing chains that mix
//! blocking and awaitable stages:
//! - [`AsyncUnit`](async_unit::AsyncUnit) for stages that await (remote devices, I/O)
//! - [`AsyncWorkflow`](async_workflow::AsyncWorkflow) for orchestrating mixed sync/async stages,
//!   including bounded-concurrency batch execution

pub mod async_unit;
pub mod async_workflow;
