//! Text-block rendering for generated sources.

use std::collections::HashMap;

use regex::Regex;

/// `{{variable}}` substitution over template text blocks.
///
/// Unknown variables are left in place so a half-rendered block is
/// visible in the output instead of silently vanishing.
pub struct Renderer {
    variable_pattern: Regex,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            // Match {{variable_name}} pattern
            variable_pattern: Regex::new(r"\{\{([a-zA-Z_][a-zA-Z0-9_]*)\}\}").unwrap(),
        }
    }

    /// Render content by replacing variables.
    pub fn render(&self, content: &str, variables: &HashMap<String, String>) -> String {
        self.variable_pattern
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                variables
                    .get(var_name)
                    .cloned()
                    .unwrap_or_else(|| format!("{{{{{}}}}}", var_name))
            })
            .to_string()
    }

    /// Convert to snake_case.
    pub fn to_snake_case(&self, s: &str) -> String {
        let mut result = String::new();
        for (i, c) in s.chars().enumerate() {
            if c.is_uppercase() && i > 0 {
                result.push('_');
            }
            result.push(c.to_lowercase().next().unwrap_or(c));
        }
        result.replace(['-', ' '], "_")
    }

    /// Convert to PascalCase.
    pub fn to_pascal_case(&self, s: &str) -> String {
        s.split(['-', '_', ' '])
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let renderer = Renderer::new();
        let mut vars = HashMap::new();
        vars.insert("deployment".to_string(), "eks-simple".to_string());

        let rendered = renderer.render("// Composed for {{deployment}}", &vars);
        assert_eq!(rendered, "// Composed for eks-simple");
    }

    #[test]
    fn test_unknown_variable_left_in_place() {
        let renderer = Renderer::new();
        let rendered = renderer.render("{{missing}}", &HashMap::new());
        assert_eq!(rendered, "{{missing}}");
    }

    #[test]
    fn test_case_conversions() {
        let renderer = Renderer::new();
        assert_eq!(renderer.to_snake_case("NetworkStack"), "network_stack");
        assert_eq!(renderer.to_snake_case("eks-spot"), "eks_spot");
        assert_eq!(renderer.to_pascal_case("eks-spot"), "EksSpot");
        assert_eq!(renderer.to_pascal_case("network"), "Network");
    }
}
