//! # lib-flow
//!
//! Trace processing flows for seisflow.
//!
//! A flow is an ordered list of processing steps. Each step implements
//! [`TraceStep`] and moves through a fixed lifecycle:
//!
//! 1. **Configure**: receives the input trace layout, builds its filters and
//!    returns the output layout
//! 2. **Process**: transforms traces in place, concurrently if requested
//! 3. **Teardown**: releases everything built during configuration
//!
//! Steps are created by name through a [`StepRegistry`] from JSON
//! parameters. The built-in steps wrap the `lib-dsp` designature filter,
//! resampler and convolution engine.

pub mod error;
pub mod step;
pub mod steps;
pub mod registry;
pub mod flow;

pub use error::{FlowError, FlowResult};
pub use step::{StepSession, StepState, TraceStep};
pub use registry::{StepFactory, StepRegistry};
pub use flow::{Flow, FlowSummary};
