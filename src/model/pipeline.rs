//! Pipeline: a named, ordered group of execution references that can be
//! addressed as a single unit.

use crate::model::ids::PipelineId;
use crate::model::reference::ReferenceExecution;
use crate::validate::{self, ValidationError};

/// One step of a pipeline: an ordered list of references to executions
/// registered elsewhere in the project. Step boundaries are informational
/// for reporting only — dependencies, not step membership, enforce ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStep {
    pub name: String,
    pub executions: Vec<ReferenceExecution>,
}

impl PipelineStep {
    pub fn new(
        name: impl Into<String>,
        executions: impl IntoIterator<Item = impl Into<ReferenceExecution>>,
    ) -> Self {
        Self {
            name: name.into(),
            executions: executions.into_iter().map(Into::into).collect(),
        }
    }
}

/// A named, ordered group of steps.
#[derive(Debug)]
pub struct Pipeline {
    pub id: PipelineId,
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub steps: Vec<PipelineStep>,
}

impl Pipeline {
    /// Every reference in every step, in order, flattened — the roots a
    /// scheduler run expands a pipeline target into.
    pub fn all_references(&self) -> impl Iterator<Item = &ReferenceExecution> {
        self.steps.iter().flat_map(|step| step.executions.iter())
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    name: Option<String>,
    aliases: Vec<String>,
    description: String,
    steps: Vec<PipelineStep>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn step(mut self, step: PipelineStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn build(self) -> Result<Pipeline, ValidationError> {
        let name = validate::name(self.name.as_deref().unwrap_or(""))
            .map_err(|e| e.wrap("name"))?;

        for alias in &self.aliases {
            validate::name(alias).map_err(|e| e.wrap("aliases"))?;
        }

        Ok(Pipeline {
            id: PipelineId::new(),
            name,
            aliases: self.aliases,
            description: self.description,
            steps: self.steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_builds_with_ordered_steps() {
        let pipeline = PipelineBuilder::new()
            .name("ci")
            .step(PipelineStep::new("lint", ["lint"]))
            .step(PipelineStep::new("verify", ["test", "bench"]))
            .build()
            .unwrap();

        assert_eq!(pipeline.steps.len(), 2);
        assert_eq!(pipeline.steps[0].executions[0].name, "lint");
        assert_eq!(pipeline.steps[1].executions.len(), 2);
        assert_eq!(pipeline.steps[1].executions[1].name, "bench");
    }

    #[test]
    fn all_references_flattens_every_step_in_order() {
        let pipeline = PipelineBuilder::new()
            .name("ci")
            .step(PipelineStep::new("lint", ["lint"]))
            .step(PipelineStep::new("verify", ["test", "bench"]))
            .build()
            .unwrap();

        let names: Vec<&str> = pipeline
            .all_references()
            .map(|reference| reference.name.as_str())
            .collect();
        assert_eq!(names, vec!["lint", "test", "bench"]);
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(PipelineBuilder::new().build().is_err());
    }
}
