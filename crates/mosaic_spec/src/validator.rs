//! Structural validation for tile and deployment manifests.

use std::collections::{HashMap, HashSet};

use crate::models::{DeploymentManifest, InputType, TileInstance, TileManifest};

/// Validation result with details.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Validator for manifests.
pub struct SpecValidator;

impl SpecValidator {
    /// Validate a tile manifest in isolation.
    pub fn validate_tile(manifest: &TileManifest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if manifest.name().is_empty() {
            result.add_error("Tile name cannot be empty");
        }
        if manifest.version().is_empty() {
            result.add_error("Tile version cannot be empty");
        }
        if manifest.metadata.category.is_none() {
            result.add_warning(format!(
                "Tile '{}' has no category; it will not show up in category listings",
                manifest.name()
            ));
        }

        if manifest.spec.outputs.is_empty() {
            result.add_error(format!(
                "Tile '{}' declares no outputs",
                manifest.name()
            ));
        }

        let mut seen = HashSet::new();
        for input in &manifest.spec.inputs {
            if !seen.insert(input.name.as_str()) {
                result.add_error(format!(
                    "Tile '{}' declares duplicate input '{}'",
                    manifest.name(),
                    input.name
                ));
            }
            if input.require && input.default_value.is_some() {
                result.add_warning(format!(
                    "Required input '{}' on tile '{}' carries a default value",
                    input.name,
                    manifest.name()
                ));
            }
            if input.input_type == InputType::Secret && input.default_value.is_some() {
                result.add_warning(format!(
                    "Secret input '{}' on tile '{}' has a literal default",
                    input.name,
                    manifest.name()
                ));
            }
        }

        let mut seen = HashSet::new();
        for output in &manifest.spec.outputs {
            if !seen.insert(output.name.as_str()) {
                result.add_error(format!(
                    "Tile '{}' declares duplicate output '{}'",
                    manifest.name(),
                    output.name
                ));
            }
        }

        result
    }

    /// Warn when a newer tile version drops outputs an older one had.
    ///
    /// Output names are a compatibility contract: downstream tiles wire
    /// against them by name.
    pub fn validate_compatibility(
        older: &TileManifest,
        newer: &TileManifest,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();
        for output in &older.spec.outputs {
            if newer.output(&output.name).is_none() {
                result.add_warning(format!(
                    "Tile '{}' {} drops output '{}' declared by {}",
                    newer.name(),
                    newer.version(),
                    output.name,
                    older.version()
                ));
            }
        }
        result
    }

    /// Validate a deployment against the resolved manifests of its
    /// tile instances (instance name -> tile manifest).
    pub fn validate_deployment(
        deployment: &DeploymentManifest,
        resolved: &HashMap<String, TileManifest>,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();
        let order = deployment.instance_order();

        for (instance_name, instance) in &deployment.spec.template.tiles {
            let Some(manifest) = resolved.get(instance_name) else {
                result.add_error(format!(
                    "No tile resolved for instance '{}' ({} {})",
                    instance_name, instance.tile_reference, instance.tile_version
                ));
                continue;
            };

            Self::validate_instance(instance_name, instance, manifest, resolved, &mut result);
        }

        Self::validate_depends_on(deployment, &order, &mut result);

        result
    }

    fn validate_instance(
        instance_name: &str,
        instance: &TileInstance,
        manifest: &TileManifest,
        resolved: &HashMap<String, TileManifest>,
        result: &mut ValidationResult,
    ) {
        // Every required input must be bound or carry a default.
        for input in manifest.required_inputs() {
            let bound = instance.binding(&input.name).is_some();
            if !bound && input.default_value.is_none() && input.default_values.is_none() {
                result.add_error(format!(
                    "Instance '{}' is missing required input '{}'",
                    instance_name, input.name
                ));
            }
        }

        for binding in &instance.inputs {
            let Some(declared) = manifest.input(&binding.name) else {
                result.add_error(format!(
                    "Instance '{}' binds undeclared input '{}'",
                    instance_name, binding.name
                ));
                continue;
            };

            if binding.input_value.is_none() && binding.input_values.is_none() {
                result.add_error(format!(
                    "Binding '{}' on instance '{}' carries no value",
                    binding.name, instance_name
                ));
                continue;
            }

            if let Some(reference) = binding.output_ref() {
                if reference.instance == instance_name {
                    result.add_error(format!(
                        "Instance '{}' references its own output '{}'",
                        instance_name, reference.output
                    ));
                } else if let Some(producer) = resolved.get(&reference.instance) {
                    if producer.output(&reference.output).is_none() {
                        result.add_error(format!(
                            "Instance '{}' references output '{}' not declared by '{}'",
                            instance_name, reference.output, reference.instance
                        ));
                    }
                } else {
                    result.add_error(format!(
                        "Instance '{}' references unknown instance '{}'",
                        instance_name, reference.instance
                    ));
                }
                continue;
            }

            Self::validate_literal(instance_name, declared, binding, result);
        }
    }

    fn validate_literal(
        instance_name: &str,
        declared: &crate::models::TileInput,
        binding: &crate::models::InputBinding,
        result: &mut ValidationResult,
    ) {
        match declared.input_type {
            InputType::Number => {
                if let Some(value) = &binding.input_value {
                    if value.parse::<f64>().is_err() {
                        result.add_error(format!(
                            "Input '{}' on instance '{}' expects a number, got '{}'",
                            binding.name, instance_name, value
                        ));
                    }
                }
            }
            InputType::Boolean => {
                if let Some(value) = &binding.input_value {
                    if value != "true" && value != "false" {
                        result.add_error(format!(
                            "Input '{}' on instance '{}' expects true/false, got '{}'",
                            binding.name, instance_name, value
                        ));
                    }
                }
            }
            InputType::StringList => {
                if binding.input_values.is_none() {
                    result.add_error(format!(
                        "Input '{}' on instance '{}' expects a value list",
                        binding.name, instance_name
                    ));
                }
            }
            InputType::Construct => {
                result.add_error(format!(
                    "Input '{}' on instance '{}' expects an output reference",
                    binding.name, instance_name
                ));
            }
            InputType::String | InputType::Secret => {}
        }
    }

    fn validate_depends_on(
        deployment: &DeploymentManifest,
        order: &[&str],
        result: &mut ValidationResult,
    ) {
        for (instance_name, instance) in &deployment.spec.template.tiles {
            for dependency in &instance.depends_on {
                if dependency == instance_name {
                    result.add_error(format!(
                        "Instance '{}' cannot depend on itself",
                        instance_name
                    ));
                    continue;
                }
                if !order.contains(&dependency.as_str()) {
                    result.add_error(format!(
                        "Instance '{}' depends on unknown instance '{}'",
                        instance_name, dependency
                    ));
                    continue;
                }
                // Direct two-instance cycle; longer cycles surface at
                // plan construction.
                if let Some(other) = deployment.instance(dependency) {
                    if other.depends_on.iter().any(|d| d == instance_name) {
                        result.add_error(format!(
                            "Circular dependency between '{}' and '{}'",
                            instance_name, dependency
                        ));
                    }
                }
            }
        }
    }
}
