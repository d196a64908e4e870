//! Execution: the unit of work.

use crate::condition::Condition;
use crate::model::ids::ExecutionId;
use crate::model::reference::ReferenceExecution;
use crate::validate::{self, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};

/// Recognised interpreter language tags. Unknown tags are rejected at
/// construction time by [`ExecutionBuilder::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    Sh,
    Shell,
    Bash,
    Fish,
    #[strum(serialize = "py")]
    Py,
    Python,
    #[strum(serialize = "js")]
    Js,
    Javascript,
    #[strum(serialize = "ts")]
    Ts,
    Typescript,
}

impl Language {
    /// Parses a raw language tag, validating it against `^[a-z]+$` first so
    /// that unrecognised-but-plausible tags (e.g. `ruby`) produce a clear
    /// "unknown language" error instead of falling through `FromStr`'s
    /// generic parse failure.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        validate::language(raw)?;
        Language::from_str(raw)
            .map_err(|_| ValidationError::new(format!("unknown language tag '{raw}'")))
    }
}

/// One runnable unit: script + interpreter + environment + dependencies.
pub struct Execution {
    pub id: ExecutionId,
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub language: Language,
    pub interpreter_path: String,
    pub script: String,
    pub environments: Vec<String>,
    pub working_dir: String,
    pub additional_args: Vec<String>,
    pub prev_executions: Vec<ReferenceExecution>,
    pub export_environ: bool,
    pub skip_conditions: Vec<Condition>,
    pub require_conditions: Vec<Condition>,
}

impl fmt::Debug for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("language", &self.language)
            .field("working_dir", &self.working_dir)
            .field("prev_executions", &self.prev_executions)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Execution`]: validate each field as it's set, then construct
/// only once every required field is present.
#[derive(Default)]
pub struct ExecutionBuilder {
    name: Option<String>,
    aliases: Vec<String>,
    description: String,
    language: Option<String>,
    interpreter_path: String,
    script: String,
    environments: Vec<String>,
    working_dir: Option<String>,
    additional_args: Vec<String>,
    prev_executions: Vec<ReferenceExecution>,
    export_environ: bool,
    skip_conditions: Vec<Condition>,
    require_conditions: Vec<Condition>,
}

impl ExecutionBuilder {
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

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn interpreter_path(mut self, path: impl Into<String>) -> Self {
        self.interpreter_path = path.into();
        self
    }

    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.script = script.into();
        self
    }

    pub fn environment(mut self, entry: impl Into<String>) -> Self {
        self.environments.push(entry.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn additional_arg(mut self, arg: impl Into<String>) -> Self {
        self.additional_args.push(arg.into());
        self
    }

    pub fn prev(mut self, reference: ReferenceExecution) -> Self {
        self.prev_executions.push(reference);
        self
    }

    pub fn export_environ(mut self, export: bool) -> Self {
        self.export_environ = export;
        self
    }

    pub fn skip_condition(mut self, condition: Condition) -> Self {
        self.skip_conditions.push(condition);
        self
    }

    pub fn require_condition(mut self, condition: Condition) -> Self {
        self.require_conditions.push(condition);
        self
    }

    pub fn build(self) -> Result<Execution, ValidationError> {
        let name = validate::name(self.name.as_deref().unwrap_or(""))
            .map_err(|e| e.wrap("name"))?;

        for alias in &self.aliases {
            validate::name(alias).map_err(|e| e.wrap("aliases"))?;
        }

        let language = Language::parse(self.language.as_deref().unwrap_or(""))
            .map_err(|e| e.wrap("language"))?;

        validate::interpreter_path(&self.interpreter_path).map_err(|e| e.wrap("interpreter_path"))?;

        let working_dir = self
            .working_dir
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ValidationError::new("working_dir is required").wrap("working_dir"))?;

        Ok(Execution {
            id: ExecutionId::new(),
            name,
            aliases: self.aliases,
            description: self.description,
            language,
            interpreter_path: self.interpreter_path,
            script: self.script,
            environments: self.environments,
            working_dir,
            additional_args: self.additional_args,
            prev_executions: self.prev_executions,
            export_environ: self.export_environ,
            skip_conditions: self.skip_conditions,
            require_conditions: self.require_conditions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::shell_alias("sh")]
    #[case::shell_long("shell")]
    #[case::bash("bash")]
    #[case::fish("fish")]
    #[case::python_short("py")]
    #[case::python_long("python")]
    #[case::js_short("js")]
    #[case::js_long("javascript")]
    #[case::ts_short("ts")]
    #[case::ts_long("typescript")]
    fn recognised_languages_parse(#[case] tag: &str) {
        assert!(Language::parse(tag).is_ok());
    }

    #[test]
    fn unknown_language_is_rejected() {
        assert!(Language::parse("ruby").is_err());
    }

    #[test]
    fn missing_working_dir_is_rejected() {
        let result = ExecutionBuilder::new()
            .name("build")
            .language("sh")
            .script("echo hi")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn minimal_execution_builds() {
        let execution = ExecutionBuilder::new()
            .name("build")
            .language("sh")
            .script("echo hi")
            .working_dir("/tmp")
            .build()
            .unwrap();
        assert_eq!(execution.name, "build");
        assert_eq!(execution.language, Language::Sh);
    }
}
