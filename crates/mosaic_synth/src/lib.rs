//! # mosaic_synth
//!
//! Resource declaration and template synthesis core for Mosaic.
//!
//! A [`Stack`] collects inert cloud-resource declarations and outputs;
//! an [`App`] renders its stacks to static deployment templates that a
//! provisioning engine consumes. Synthesis is a one-shot, synchronous
//! expansion with no runtime behavior.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mosaic_synth::{App, Environment, Resource, Stack, Value};
//!
//! let mut stack = Stack::new("Net", Environment::from_env());
//! stack.add_resource(
//!     "BaseVpc",
//!     Resource::new("AWS::EC2::VPC").prop("CidrBlock", "10.0.0.0/16"),
//! ).unwrap();
//! stack.export("vpcId", Value::r#ref("BaseVpc")).unwrap();
//!
//! let mut app = App::new();
//! app.add_stack(stack).unwrap();
//! app.synth(std::path::Path::new("mosaic.out")).unwrap();
//! ```

pub mod app;
pub mod error;
pub mod resource;
pub mod stack;
pub mod template;
pub mod value;

pub use app::{default_out_dir, App, StackArtifact, SynthManifest};
pub use error::{SynthError, SynthResult};
pub use resource::Resource;
pub use stack::{Environment, Output, Stack, ENV_DEFAULT_ACCOUNT, ENV_DEFAULT_REGION};
pub use template::Template;
pub use value::{tag, PseudoParam, Value};
