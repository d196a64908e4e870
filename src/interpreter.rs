//! Interpreter resolution: turns an [`Execution`]'s language and optional
//! explicit interpreter path into a concrete `(path, argv)` pair the runner
//! can hand to [`std::process::Command`].
//!
//! `fish` resolves by looking up `fish` on `PATH`, not `bash`.

use crate::error::InterpreterError;
use crate::model::execution::{Execution, Language};
use std::path::PathBuf;

/// A resolved `(executable path, full argv)` ready to hand to `Command::new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInterpreter {
    pub path: String,
    pub args: Vec<String>,
}

fn look_path(name: &str) -> Result<String, InterpreterError> {
    which(name).ok_or_else(|| InterpreterError::CommandNotFound(name.to_string()))
}

/// Minimal `PATH`-scanning lookup, standing in for `exec.LookPath` /
/// `which(1)`: walks `$PATH` looking for an executable regular file named
/// `name`.
fn which(name: &str) -> Option<String> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate: PathBuf = dir.join(name);
        if is_executable(&candidate) {
            return candidate.to_str().map(String::from);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.is_file()
}

/// Resolves the interpreter for `execution`, honoring an explicit
/// `interpreter_path` override and falling back to `$SHELL` before `sh` for
/// the `sh`/`shell` languages.
pub fn resolve(execution: &Execution) -> Result<ResolvedInterpreter, InterpreterError> {
    let mut path = execution.interpreter_path.clone();
    let mut args = execution.additional_args.clone();

    match execution.language {
        Language::Sh | Language::Shell => {
            if path.is_empty() {
                path = match std::env::var("SHELL") {
                    Ok(shell) if !shell.is_empty() => shell,
                    _ => look_path("sh")
                        .map_err(|_| InterpreterError::EnvironmentNotFound("SHELL".to_string()))?,
                };
            }
            args.push("-c".to_string());
            args.push(execution.script.clone());
        }
        Language::Bash => {
            if path.is_empty() {
                path = look_path("bash")?;
            }
            args.push("-c".to_string());
            args.push(execution.script.clone());
        }
        Language::Fish => {
            if path.is_empty() {
                path = look_path("fish")?;
            }
            args.push("-c".to_string());
            args.push(execution.script.clone());
        }
        Language::Py | Language::Python => {
            if path.is_empty() {
                path = look_path("python")?;
            }
            args.push("-c".to_string());
            args.push(execution.script.clone());
        }
        Language::Js | Language::Javascript => {
            if path.is_empty() {
                path = look_path("node")?;
            }
            args.push("-c".to_string());
            args.push(execution.script.clone());
        }
        Language::Ts | Language::Typescript => {
            if path.is_empty() {
                path = look_path("tsnode")?;
            }
            args.push("-c".to_string());
            args.push(execution.script.clone());
        }
    }

    Ok(ResolvedInterpreter { path, args })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::execution::ExecutionBuilder;

    fn exec_with(language: &str, interpreter_path: &str) -> Execution {
        ExecutionBuilder::new()
            .name("t")
            .language(language)
            .interpreter_path(interpreter_path)
            .script("echo hi")
            .working_dir("/tmp")
            .build()
            .unwrap()
    }

    #[test]
    fn explicit_interpreter_path_is_honored_without_lookup() {
        let execution = exec_with("bash", "/opt/custom/bash");
        let resolved = resolve(&execution).unwrap();
        assert_eq!(resolved.path, "/opt/custom/bash");
        assert_eq!(resolved.args, vec!["-c", "echo hi"]);
    }

    #[test]
    fn explicit_path_skips_path_lookup_for_fish() {
        let execution = exec_with("fish", "/usr/local/bin/fish");
        let resolved = resolve(&execution).unwrap();
        assert_eq!(resolved.path, "/usr/local/bin/fish");
    }

    #[test]
    fn missing_command_is_reported() {
        let execution = exec_with("bash", "");
        std::env::set_var("PATH", "/nonexistent-taskforge-test-path");
        let result = resolve(&execution);
        assert!(result.is_err());
    }
}
