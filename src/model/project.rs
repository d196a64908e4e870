//! Project: the registry an engine run executes against.
//!
//! Executions and pipelines are kept in insertion order (iteration order
//! matters for deterministic output) alongside a name/alias index for O(1)
//! lookup. A name colliding with any existing name or alias, in either
//! registry, is rejected — executions and pipelines share one namespace so a
//! step can reference either by name.

use crate::error::EngineError;
use crate::model::execution::Execution;
use crate::model::pipeline::Pipeline;
use std::collections::HashMap;

#[derive(Default)]
pub struct Project {
    executions: Vec<Execution>,
    pipelines: Vec<Pipeline>,
    index: HashMap<String, Entry>,
}

#[derive(Debug, Clone, Copy)]
enum Entry {
    Execution(usize),
    Pipeline(usize),
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    fn names_of(execution_or_pipeline: (&str, &[String])) -> impl Iterator<Item = &str> {
        let (name, aliases) = execution_or_pipeline;
        std::iter::once(name).chain(aliases.iter().map(String::as_str))
    }

    pub fn add_execution(&mut self, execution: Execution) -> Result<(), EngineError> {
        let names: Vec<String> = Self::names_of((&execution.name, &execution.aliases))
            .map(String::from)
            .collect();
        for name in &names {
            if self.index.contains_key(name) {
                return Err(EngineError::DuplicateName(name.clone()));
            }
        }

        let slot = self.executions.len();
        for name in names {
            self.index.insert(name, Entry::Execution(slot));
        }
        self.executions.push(execution);
        Ok(())
    }

    pub fn add_pipeline(&mut self, pipeline: Pipeline) -> Result<(), EngineError> {
        let names: Vec<String> = Self::names_of((&pipeline.name, &pipeline.aliases))
            .map(String::from)
            .collect();
        for name in &names {
            if self.index.contains_key(name) {
                return Err(EngineError::DuplicateName(name.clone()));
            }
        }

        let slot = self.pipelines.len();
        for name in names {
            self.index.insert(name, Entry::Pipeline(slot));
        }
        self.pipelines.push(pipeline);
        Ok(())
    }

    pub fn get_execution(&self, name: &str) -> Option<&Execution> {
        match self.index.get(name) {
            Some(Entry::Execution(slot)) => self.executions.get(*slot),
            _ => None,
        }
    }

    pub fn get_pipeline(&self, name: &str) -> Option<&Pipeline> {
        match self.index.get(name) {
            Some(Entry::Pipeline(slot)) => self.pipelines.get(*slot),
            _ => None,
        }
    }

    /// Executions in the order they were registered.
    pub fn executions(&self) -> impl Iterator<Item = &Execution> {
        self.executions.iter()
    }

    /// Pipelines in the order they were registered.
    pub fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
        self.pipelines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::execution::ExecutionBuilder;
    use crate::model::pipeline::PipelineBuilder;

    fn exec(name: &str) -> Execution {
        ExecutionBuilder::new()
            .name(name)
            .language("sh")
            .script("echo hi")
            .working_dir("/tmp")
            .build()
            .unwrap()
    }

    #[test]
    fn executions_iterate_in_insertion_order() {
        let mut project = Project::new();
        project.add_execution(exec("a")).unwrap();
        project.add_execution(exec("b")).unwrap();
        project.add_execution(exec("c")).unwrap();

        let names: Vec<&str> = project.executions().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut project = Project::new();
        project.add_execution(exec("build")).unwrap();
        let err = project.add_execution(exec("build")).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateName(n) if n == "build"));
    }

    #[test]
    fn name_colliding_with_alias_is_rejected() {
        let mut project = Project::new();
        let aliased = ExecutionBuilder::new()
            .name("build")
            .alias("compile")
            .language("sh")
            .script("echo hi")
            .working_dir("/tmp")
            .build()
            .unwrap();
        project.add_execution(aliased).unwrap();

        let err = project.add_execution(exec("compile")).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateName(n) if n == "compile"));
    }

    #[test]
    fn pipeline_and_execution_share_namespace() {
        let mut project = Project::new();
        project.add_execution(exec("build")).unwrap();

        let pipeline = PipelineBuilder::new().name("build").build().unwrap();
        let err = project.add_pipeline(pipeline).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateName(n) if n == "build"));
    }

    #[test]
    fn lookup_by_alias_finds_the_execution() {
        let mut project = Project::new();
        let aliased = ExecutionBuilder::new()
            .name("build")
            .alias("compile")
            .language("sh")
            .script("echo hi")
            .working_dir("/tmp")
            .build()
            .unwrap();
        project.add_execution(aliased).unwrap();

        assert!(project.get_execution("compile").is_some());
        assert_eq!(project.get_execution("compile").unwrap().name, "build");
    }
}
