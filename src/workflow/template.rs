//! Workflow templates: named, ordered step definitions with dependency edges.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::WorkflowError;

const BUILTIN_TEMPLATES: &str = include_str!("templates.yaml");

/// One step of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    #[serde(alias = "step_id")]
    pub id: String,
    #[serde(alias = "step_name")]
    pub name: String,
    /// Agent that owns the step's action.
    pub agent: String,
    pub action: String,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver_role: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl WorkflowStep {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        agent: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            agent: agent.into(),
            action: action.into(),
            requires_approval: false,
            approver_role: None,
            depends_on: Vec::new(),
        }
    }

    pub fn after(mut self, step_id: impl Into<String>) -> Self {
        self.depends_on.push(step_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<WorkflowStep>,
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    templates: Vec<WorkflowTemplate>,
}

impl WorkflowTemplate {
    pub fn new(name: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            steps,
        }
    }

    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Check the structural rules every registered template must satisfy.
    ///
    /// Dependencies may only point at steps declared earlier, which keeps the
    /// step graph acyclic and lets readiness be evaluated in one ordered pass.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let invalid = |reason: String| WorkflowError::InvalidTemplate {
            template: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("template name is empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(invalid("template has no steps".to_string()));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return Err(invalid("step with an empty id".to_string()));
            }
            for dep in &step.depends_on {
                if !seen.contains(dep.as_str()) {
                    return Err(invalid(format!(
                        "step '{}' depends on '{}', which is not declared before it",
                        step.id, dep
                    )));
                }
            }
            match (step.requires_approval, step.approver_role.as_deref()) {
                (true, None) | (true, Some("")) => {
                    return Err(invalid(format!(
                        "approval step '{}' names no approver role",
                        step.id
                    )));
                }
                (false, Some(_)) => {
                    return Err(invalid(format!(
                        "step '{}' names an approver role but has no approval gate",
                        step.id
                    )));
                }
                _ => {}
            }
            if !seen.insert(step.id.as_str()) {
                return Err(invalid(format!("duplicate step id '{}'", step.id)));
            }
        }
        Ok(())
    }
}

/// Parse a `templates:` YAML document. Templates are not validated here.
pub fn parse_templates(yaml: &str) -> Result<Vec<WorkflowTemplate>, WorkflowError> {
    let file: TemplateFile = serde_yaml::from_str(yaml)?;
    Ok(file.templates)
}

/// Templates shipped with the crate.
pub fn builtin_templates() -> Result<Vec<WorkflowTemplate>, WorkflowError> {
    parse_templates(BUILTIN_TEMPLATES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_are_valid() {
        let templates = builtin_templates().unwrap();
        let names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["student_intervention", "academic_remediation"]);
        for template in &templates {
            template.validate().unwrap();
        }

        let intervention = &templates[0];
        assert_eq!(intervention.steps.len(), 4);
        let gate = intervention.step("hod_approval").unwrap();
        assert!(gate.requires_approval);
        assert_eq!(gate.approver_role.as_deref(), Some("HOD"));
        assert_eq!(gate.depends_on, vec!["generate_letters".to_string()]);
    }

    #[test]
    fn test_validation_rejects_bad_graphs() {
        let forward = WorkflowTemplate::new(
            "forward",
            vec![
                WorkflowStep::new("a", "A", "academic", "x").after("b"),
                WorkflowStep::new("b", "B", "academic", "x"),
            ],
        );
        assert!(matches!(
            forward.validate(),
            Err(WorkflowError::InvalidTemplate { .. })
        ));

        let duplicate = WorkflowTemplate::new(
            "duplicate",
            vec![
                WorkflowStep::new("a", "A", "academic", "x"),
                WorkflowStep::new("a", "A again", "academic", "x"),
            ],
        );
        assert!(duplicate.validate().is_err());

        let mut ungated = WorkflowStep::new("a", "A", "administrative", "request_approval");
        ungated.requires_approval = true;
        assert!(WorkflowTemplate::new("ungated", vec![ungated]).validate().is_err());

        assert!(WorkflowTemplate::new("empty", vec![]).validate().is_err());
    }

    #[test]
    fn test_parse_accepts_legacy_field_names() {
        let yaml = r#"
templates:
  - name: leave_request
    steps:
      - step_id: submit
        step_name: Submit Leave
        agent: administrative
        action: request_approval
"#;
        let templates = parse_templates(yaml).unwrap();
        assert_eq!(templates[0].steps[0].id, "submit");
        assert_eq!(templates[0].steps[0].name, "Submit Leave");
        assert!(templates[0].description.is_empty());
    }
}
