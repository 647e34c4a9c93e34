//! Run context and the environment protocol between nbscript and the
//! notebook it runs.
//!
//! The parent process environment is read exactly once, into a
//! [`RunContext`]. Everything a child needs to know travels in that child's
//! own [`ChildEnv`], applied at spawn time, so the parent's environment is
//! never modified and there is nothing to restore afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// JSON array: the notebook path followed by the notebook's arguments.
pub const NB_ARGV_VAR: &str = "NB_ARGV";

/// The bare notebook path.
pub const NB_NAME_VAR: &str = "NB_NAME";

/// Present (with any value) while a conversion is running.
pub const RUNNING_VAR: &str = "NBSCRIPT_RUNNING";

/// Value written to [`RUNNING_VAR`].
pub const RUNNING_VALUE: &str = "True";

/// The argument vector a notebook sees as its own "script arguments".
///
/// Element 0 is always the notebook path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct NotebookArgv(Vec<String>);

impl TryFrom<Vec<String>> for NotebookArgv {
    type Error = Error;

    fn try_from(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            return Err(Error::Configuration(format!(
                "{NB_ARGV_VAR} must contain at least the notebook path"
            )));
        }
        Ok(Self(argv))
    }
}

impl From<NotebookArgv> for Vec<String> {
    fn from(argv: NotebookArgv) -> Self {
        argv.0
    }
}

impl NotebookArgv {
    /// Build from the notebook path and its trailing arguments.
    pub fn new(notebook: impl Into<String>, args: impl IntoIterator<Item = String>) -> Self {
        let mut argv = vec![notebook.into()];
        argv.extend(args);
        Self(argv)
    }

    /// The notebook path (element 0).
    pub fn notebook(&self) -> &str {
        &self.0[0]
    }

    /// Arguments after the notebook path.
    pub fn args(&self) -> &[String] {
        &self.0[1..]
    }

    /// All elements, notebook path first.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Serialize to the `NB_ARGV` wire format.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Parse the `NB_ARGV` wire format.
    pub fn from_json(raw: &str) -> Result<Self> {
        Self::try_from(serde_json::from_str::<Vec<String>>(raw)?)
    }

    /// Arguments of the currently running notebook, for code executing
    /// inside it. `None` when not running under nbscript.
    pub fn from_env() -> Result<Option<Self>> {
        std::env::var(NB_ARGV_VAR)
            .ok()
            .map(|raw| Self::from_json(&raw))
            .transpose()
    }
}

/// Environment changes applied to a single child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildEnv {
    /// Variables to set, in order.
    pub set: Vec<(String, String)>,
    /// Variables to remove.
    pub remove: Vec<String>,
}

impl ChildEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value` in the child.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set.push((key.into(), value.into()));
        self
    }

    /// Remove `key` from the child.
    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.remove.push(key.into());
        self
    }

    /// The value this overlay sets for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.set
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Environment block for a converter child: the notebook's argv, its
    /// name, and the re-entrancy marker.
    pub fn for_conversion(argv: &NotebookArgv) -> Result<Self> {
        Ok(Self::new()
            .set(NB_NAME_VAR, argv.notebook())
            .set(NB_ARGV_VAR, argv.to_json()?)
            .set(RUNNING_VAR, RUNNING_VALUE))
    }
}

/// What this process learned from its own environment at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunContext {
    /// Another nbscript conversion is an ancestor of this process.
    pub already_running: bool,
}

impl RunContext {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key).map(|_| String::new()))
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            already_running: lookup(RUNNING_VAR).is_some(),
        }
    }
}
