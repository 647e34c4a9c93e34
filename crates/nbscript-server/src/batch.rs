//! Batch runs started over HTTP.
//!
//! A request names a notebook relative to the server root. The configured
//! command template is filled in with the full path and run, either to
//! completion (output captured) or in the background.

use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::BatchConfig;
use crate::error::{ServerError, ServerResult};

/// Replaced by the notebook's full path in command templates.
pub const PLACEHOLDER: &str = "{path}";

/// The command run for each batch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandTemplate {
    /// Argument list.
    List(Vec<String>),
    /// A single shell-style line, split into words before substitution.
    Line(String),
}

impl Default for CommandTemplate {
    fn default() -> Self {
        CommandTemplate::List(vec![
            "nbscript".to_string(),
            "--save".to_string(),
            "--timestamp".to_string(),
        ])
    }
}

impl CommandTemplate {
    /// Parse a template from configuration text: a JSON array of strings,
    /// or anything else as a command line.
    pub fn parse(raw: &str) -> Self {
        if raw.trim_start().starts_with('[') {
            if let Ok(words) = serde_json::from_str::<Vec<String>>(raw) {
                return CommandTemplate::List(words);
            }
        }
        CommandTemplate::Line(raw.to_string())
    }

    /// The argument list for `fullpath`.
    ///
    /// Every `{path}` is substituted; if no word contains one, the path is
    /// appended as the last argument.
    pub fn render(&self, fullpath: &str) -> ServerResult<Vec<String>> {
        let words = match self {
            CommandTemplate::List(words) => words.clone(),
            CommandTemplate::Line(line) => shlex::split(line).ok_or_else(|| {
                nbscript_core::Error::Configuration(format!("unparsable batch command: {line:?}"))
            })?,
        };
        if words.is_empty() {
            return Err(nbscript_core::Error::Configuration("empty batch command".into()).into());
        }

        if words.iter().any(|word| word.contains(PLACEHOLDER)) {
            Ok(words
                .iter()
                .map(|word| word.replace(PLACEHOLDER, fullpath))
                .collect())
        } else {
            let mut words = words;
            words.push(fullpath.to_string());
            Ok(words)
        }
    }
}

/// JSON body returned for a batch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub fullpath: String,
    pub cmd: Vec<String>,
    pub asynchronous: bool,
    /// Stdout and stderr merged in write order (synchronous mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdouterr: Option<String>,
    /// Exit code (synchronous mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returncode: Option<i32>,
}

/// Full path of `relative` under `root`. Rejects absolute paths and any
/// `..` component.
pub fn resolve_path(root: &Path, relative: &str) -> ServerResult<PathBuf> {
    if relative.is_empty() {
        return Err(ServerError::MissingPath);
    }
    let rel = Path::new(relative);
    let escapes = rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ServerError::InvalidPath(relative.to_string()));
    }
    Ok(root.join(rel))
}

/// Run the batch command for `relative`.
pub async fn run_batch(config: &BatchConfig, relative: &str) -> ServerResult<BatchResponse> {
    let fullpath = resolve_path(&config.root, relative)?
        .to_string_lossy()
        .into_owned();
    let cmd = config.command.render(&fullpath)?;
    tracing::info!("batch run for {}: {:?}", fullpath, cmd);

    let program = cmd[0].clone();
    let mut command = Command::new(&program);
    command.args(&cmd[1..]).stdin(Stdio::null());

    let mut response = BatchResponse {
        fullpath,
        cmd,
        asynchronous: config.asynchronous,
        stdouterr: None,
        returncode: None,
    };

    if config.asynchronous {
        command.stdout(Stdio::null()).stderr(Stdio::null());
        let mut child = command.spawn().map_err(|source| ServerError::Launch {
            program: program.clone(),
            source,
        })?;
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => tracing::info!(
                    "background batch run of {} finished with {}",
                    program,
                    nbscript_core::runner::exit_code(status)
                ),
                Err(e) => tracing::warn!("lost background batch run of {}: {}", program, e),
            }
        });
    } else {
        // Both descriptors share one pipe so the output keeps its write order.
        let (mut reader, writer) = std::io::pipe()?;
        command.stdout(writer.try_clone()?).stderr(writer);
        let mut child = command
            .spawn()
            .map_err(|source| ServerError::Launch { program, source })?;
        // The command holds our copies of the write end; the reader only
        // sees EOF once they are closed.
        drop(command);

        let collect = tokio::task::spawn_blocking(move || {
            let mut combined = Vec::new();
            reader.read_to_end(&mut combined).map(|_| combined)
        });
        let status = child.wait().await?;
        let combined = collect.await.map_err(std::io::Error::other)??;
        response.stdouterr = Some(String::from_utf8_lossy(&combined).into_owned());
        response.returncode = Some(nbscript_core::runner::exit_code(status));
    }

    Ok(response)
}
