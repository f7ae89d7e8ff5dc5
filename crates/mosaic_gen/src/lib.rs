//! # mosaic_gen
//!
//! Stack-composition planning and entry-point generation for Mosaic.
//!
//! [`CompositionPlan`] resolves a deployment manifest against tile
//! manifests, wires `$(instance.output)` bindings to stack exports and
//! fixes a producer-before-consumer order. [`EntryPointGenerator`]
//! mechanically emits the source of a program performing that
//! composition.

pub mod codegen;
pub mod error;
pub mod plan;
pub mod renderer;

pub use codegen::EntryPointGenerator;
pub use error::{GenError, GenResult};
pub use plan::{CompositionPlan, PlannedInput, PlannedInstance, PlannedValue};
pub use renderer::Renderer;
