//! Command-line splitting for the `nbscript` entry point.
//!
//! Tokens are split into three groups:
//!
//! ```text
//! nbscript --save --ExecutePreprocessor.kernel_name=python3 one.ipynb --alpha 3 B
//!          ──────  ────────────────────────────────────── ───────── ───────────
//!          known   converter pass-through                 notebook  notebook argv
//! ```
//!
//! Anything after the notebook is never interpreted, so notebooks can take
//! their own flags.

use crate::error::{Error, Result};

/// Description of one recognized option.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OptionSpec {
    pub long: &'static [&'static str],
    pub short: Option<char>,
    pub takes_value: bool,
}

/// Tokens after splitting against a set of [`OptionSpec`]s.
#[derive(Debug, Default)]
pub(crate) struct SplitArgs {
    /// `(spec index, value)` for every recognized option, in order.
    pub matches: Vec<(usize, Option<String>)>,
    /// Unrecognized tokens seen before the positional.
    pub unknown: Vec<String>,
    /// The first positional token.
    pub positional: String,
    /// Everything after the positional (or after the stop token), verbatim.
    pub rest: Vec<String>,
    /// Splitting ended at the stop token instead of a positional.
    pub stopped: bool,
}

impl SplitArgs {
    /// Values of every occurrence of the option at `index`.
    pub fn values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.matches
            .iter()
            .filter(move |(i, _)| *i == index)
            .filter_map(|(_, value)| value.as_deref())
    }

    /// Last value given for the option at `index`.
    pub fn last_value(&self, index: usize) -> Option<String> {
        self.values(index).last().map(str::to_string)
    }

    /// Whether the flag at `index` was given at all.
    pub fn has(&self, index: usize) -> bool {
        self.matches.iter().any(|(i, _)| *i == index)
    }
}

/// Split `tokens` into known options, unknown options, the first
/// positional and the remainder.
///
/// Long options may be abbreviated to any unambiguous prefix. A literal
/// `--` ends option parsing; the token after it is the positional. If
/// `stop` is given and seen before the positional, splitting ends there and
/// everything after it lands in `rest` with no positional.
pub(crate) fn split_known(
    tokens: &[String],
    specs: &[OptionSpec],
    stop: Option<&str>,
) -> Result<SplitArgs> {
    let mut split = SplitArgs::default();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];

        if stop == Some(token.as_str()) {
            split.stopped = true;
            split.rest = tokens[i + 1..].to_vec();
            return Ok(split);
        }

        if token == "--" {
            i += 1;
            break;
        }

        if let Some(body) = token.strip_prefix("--") {
            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (body, None),
            };
            match find_long(specs, name)? {
                Some(index) => {
                    let value = take_value(specs[index], token, inline, tokens, &mut i)?;
                    split.matches.push((index, value));
                }
                None => split.unknown.push(token.clone()),
            }
            i += 1;
            continue;
        }

        if token.len() > 1 && token.starts_with('-') {
            let mut chars = token[1..].chars();
            let short = chars.next();
            let attached = chars.as_str();
            let index = specs
                .iter()
                .position(|spec| spec.short.is_some() && spec.short == short);
            match index {
                Some(index) if specs[index].takes_value => {
                    let inline = (!attached.is_empty()).then(|| attached.to_string());
                    let value = take_value(specs[index], token, inline, tokens, &mut i)?;
                    split.matches.push((index, value));
                }
                Some(index) if attached.is_empty() => split.matches.push((index, None)),
                _ => split.unknown.push(token.clone()),
            }
            i += 1;
            continue;
        }

        break;
    }

    let Some(positional) = tokens.get(i) else {
        return Err(Error::Usage("the following argument is required: notebook".into()));
    };
    split.positional = positional.clone();
    split.rest = tokens[i + 1..].to_vec();
    Ok(split)
}

/// Find the spec for a long option name, allowing unambiguous prefixes.
fn find_long(specs: &[OptionSpec], name: &str) -> Result<Option<usize>> {
    if name.is_empty() {
        return Ok(None);
    }
    if let Some(index) = specs.iter().position(|spec| spec.long.contains(&name)) {
        return Ok(Some(index));
    }

    let candidates: Vec<usize> = specs
        .iter()
        .enumerate()
        .filter(|(_, spec)| spec.long.iter().any(|long| long.starts_with(name)))
        .map(|(index, _)| index)
        .collect();

    match candidates.as_slice() {
        [] => Ok(None),
        [index] => Ok(Some(*index)),
        _ => {
            let names: Vec<String> = candidates
                .iter()
                .flat_map(|&index| specs[index].long.iter())
                .filter(|long| long.starts_with(name))
                .map(|long| format!("--{long}"))
                .collect();
            Err(Error::Usage(format!(
                "ambiguous option: --{name} could match {}",
                names.join(", ")
            )))
        }
    }
}

fn take_value(
    spec: OptionSpec,
    token: &str,
    inline: Option<String>,
    tokens: &[String],
    i: &mut usize,
) -> Result<Option<String>> {
    if !spec.takes_value {
        if inline.is_some() {
            return Err(Error::Usage(format!("{token}: option takes no value")));
        }
        return Ok(None);
    }
    if inline.is_some() {
        return Ok(inline);
    }
    *i += 1;
    match tokens.get(*i) {
        Some(value) => Ok(Some(value.clone())),
        None => Err(Error::Usage(format!("{token}: expected one argument"))),
    }
}

const TO: usize = 0;
const OUTPUT: usize = 1;
const SAVE: usize = 2;
const TIMESTAMP: usize = 3;
const VERBOSE: usize = 4;

const INVOCATION_OPTIONS: [OptionSpec; 5] = [
    OptionSpec { long: &["to"], short: None, takes_value: true },
    OptionSpec { long: &["output"], short: Some('o'), takes_value: true },
    OptionSpec { long: &["save"], short: None, takes_value: false },
    OptionSpec { long: &["timestamp", "ts"], short: None, takes_value: false },
    OptionSpec { long: &["verbose"], short: Some('v'), takes_value: false },
];

/// Parsed `nbscript` command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvocationArgs {
    /// `--to FORMAT`, unvalidated.
    pub to: Option<String>,
    /// `--output/-o PATH`.
    pub output: Option<String>,
    /// `--save`.
    pub save: bool,
    /// `--timestamp/--ts`.
    pub timestamp: bool,
    /// `--verbose/-v`.
    pub verbose: bool,
    /// Unrecognized options before the notebook, forwarded to the converter.
    pub converter_args: Vec<String>,
    /// The notebook path.
    pub notebook: String,
    /// Everything after the notebook.
    pub notebook_argv: Vec<String>,
}

impl InvocationArgs {
    /// Split raw tokens (without the program name).
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        let split = split_known(&tokens, &INVOCATION_OPTIONS, None)?;

        Ok(Self {
            to: split.last_value(TO),
            output: split.last_value(OUTPUT),
            save: split.has(SAVE),
            timestamp: split.has(TIMESTAMP),
            verbose: split.has(VERBOSE),
            converter_args: split.unknown,
            notebook: split.positional,
            notebook_argv: split.rest,
        })
    }

    /// Whether `tokens` ask for verbose output. Malformed input counts as no.
    pub fn wants_verbose<S: AsRef<str>>(tokens: &[S]) -> bool {
        Self::parse(tokens).map(|args| args.verbose).unwrap_or(false)
    }
}
