//! Dependency resolution: expands a set of root executions into the full
//! transitive closure needed to run them, in dependency-first (topological)
//! order. A self-referencing dependency graph is rejected outright: this
//! walk tracks a grey set on the DFS stack the way a standard "detect
//! back-edge" topological sort does, rather than recursing forever.
//!
//! A root may also name a pipeline. A pipeline is sugar for "enqueue every
//! reference in every step as a root" — step boundaries are informational
//! for reporting, not additional synchronisation, so they are flattened away
//! here and never seen again downstream.

use crate::error::ResolverError;
use crate::model::project::Project;
use std::collections::HashSet;

/// Resolves `roots` (execution or pipeline names) against `project` into
/// dependency-first order: every execution appears only after all of its
/// `prev_executions`. A pipeline root expands to every reference across all
/// of its steps.
pub fn resolve(project: &Project, roots: &[String]) -> Result<Vec<String>, ResolverError> {
    let mut black = HashSet::new();
    let mut grey: Vec<String> = Vec::new();
    let mut order = Vec::new();

    for root in roots {
        if let Some(pipeline) = project.get_pipeline(root) {
            for reference in pipeline.all_references() {
                visit(project, &reference.name, &mut grey, &mut black, &mut order)?;
            }
        } else {
            visit(project, root, &mut grey, &mut black, &mut order)?;
        }
    }

    Ok(order)
}

fn visit(
    project: &Project,
    name: &str,
    grey: &mut Vec<String>,
    black: &mut HashSet<String>,
    order: &mut Vec<String>,
) -> Result<(), ResolverError> {
    if black.contains(name) {
        return Ok(());
    }
    if let Some(pos) = grey.iter().position(|n| n == name) {
        let mut cycle: Vec<String> = grey[pos..].to_vec();
        cycle.push(name.to_string());
        return Err(ResolverError::CyclicDependency(cycle));
    }

    let execution = project
        .get_execution(name)
        .ok_or_else(|| ResolverError::UnknownReference(name.to_string(), name.to_string()))?;

    grey.push(name.to_string());
    for dep in &execution.prev_executions {
        if project.get_execution(&dep.name).is_none() {
            return Err(ResolverError::UnknownReference(
                name.to_string(),
                dep.name.clone(),
            ));
        }
        visit(project, &dep.name, grey, black, order)?;
    }
    grey.pop();

    black.insert(name.to_string());
    order.push(name.to_string());
    Ok(())
}
