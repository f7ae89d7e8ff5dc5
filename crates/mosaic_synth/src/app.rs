//! App-level synthesis: a set of stacks rendered to an output directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::{SynthError, SynthResult};
use crate::stack::Stack;
use crate::template::Template;

/// An ordered collection of stacks forming one deployment.
#[derive(Debug, Default)]
pub struct App {
    stacks: Vec<Stack>,
}

/// Index entry describing one synthesized stack.
#[derive(Debug, Clone, Serialize)]
pub struct StackArtifact {
    pub stack_name: String,
    pub template_file: String,
    pub account: Option<String>,
    pub region: Option<String>,
}

/// Index of a synthesis run, written beside the templates.
#[derive(Debug, Clone, Serialize)]
pub struct SynthManifest {
    pub artifacts: Vec<StackArtifact>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stack. Stack names are unique within an app.
    pub fn add_stack(&mut self, stack: Stack) -> SynthResult<&mut Stack> {
        if self.stacks.iter().any(|s| s.name() == stack.name()) {
            return Err(SynthError::DuplicateStack(stack.name().to_string()));
        }
        self.stacks.push(stack);
        let index = self.stacks.len() - 1;
        Ok(&mut self.stacks[index])
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name() == name)
    }

    pub fn stack_mut(&mut self, name: &str) -> Option<&mut Stack> {
        self.stacks.iter_mut().find(|s| s.name() == name)
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    /// Render every stack to a template, checking export uniqueness
    /// across the whole app.
    pub fn render(&self) -> SynthResult<Vec<Template>> {
        let mut seen_exports = HashSet::new();
        for stack in &self.stacks {
            for (_, output) in stack.outputs() {
                if let Some(export) = &output.export {
                    if !seen_exports.insert(export.clone()) {
                        return Err(SynthError::DuplicateExport(export.clone()));
                    }
                }
            }
        }

        self.stacks.iter().map(Stack::to_template).collect()
    }

    /// Synthesize all stacks into `out_dir`: one `<stack>.template.json`
    /// per stack plus a `manifest.json` index.
    pub fn synth(&self, out_dir: &Path) -> SynthResult<SynthManifest> {
        let templates = self.render()?;

        fs::create_dir_all(out_dir)?;

        let mut artifacts = Vec::new();
        for (stack, template) in self.stacks.iter().zip(&templates) {
            let file_name = format!("{}.template.json", stack.name());
            let path = out_dir.join(&file_name);
            fs::write(&path, template.to_json_pretty()?)?;
            info!(stack = stack.name(), file = %path.display(), "synthesized template");

            artifacts.push(StackArtifact {
                stack_name: stack.name().to_string(),
                template_file: file_name,
                account: stack.env().account.clone(),
                region: stack.env().region.clone(),
            });
        }

        let manifest = SynthManifest { artifacts };
        let manifest_path = out_dir.join("manifest.json");
        fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

        Ok(manifest)
    }
}

/// Default output directory for synthesized templates.
pub fn default_out_dir() -> PathBuf {
    PathBuf::from("mosaic.out")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use crate::stack::Environment;
    use crate::value::Value;

    fn stack_with_vpc(name: &str) -> Stack {
        let mut stack = Stack::new(name, Environment::default());
        stack
            .add_resource("BaseVpc", Resource::new("AWS::EC2::VPC"))
            .unwrap();
        stack
    }

    #[test]
    fn test_duplicate_stack_rejected() {
        let mut app = App::new();
        app.add_stack(stack_with_vpc("Net")).unwrap();
        assert!(matches!(
            app.add_stack(stack_with_vpc("Net")),
            Err(SynthError::DuplicateStack(_))
        ));
    }

    #[test]
    fn test_duplicate_export_across_stacks_rejected() {
        let mut app = App::new();

        let mut first = stack_with_vpc("Net");
        first.export("vpcId", Value::r#ref("BaseVpc")).unwrap();
        app.add_stack(first).unwrap();

        let mut second = stack_with_vpc("Net2");
        second
            .export_as("vpcId", "Net:vpcId", Value::r#ref("BaseVpc"))
            .unwrap();
        app.add_stack(second).unwrap();

        assert!(matches!(
            app.render(),
            Err(SynthError::DuplicateExport(_))
        ));
    }

    #[test]
    fn test_synth_writes_templates_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new();
        app.add_stack(stack_with_vpc("Net")).unwrap();

        let manifest = app.synth(dir.path()).unwrap();
        assert_eq!(manifest.artifacts.len(), 1);
        assert!(dir.path().join("Net.template.json").exists());
        assert!(dir.path().join("manifest.json").exists());
    }
}
