//! Line-oriented command protocol over a [`PatriciaTrie`].
//!
//! | Line               | Success       | Failure            |
//! |--------------------|---------------|--------------------|
//! | `+ <word> <value>` | `OK`          | `Exist`            |
//! | `- <word>`         | `OK`          | `NoSuchWord`       |
//! | `<word>`           | `OK: <value>` | `NoSuchWord`       |
//! | `! Save <path>`    | `OK`          | `ERROR: <message>` |
//! | `! Load <path>`    | `OK`          | `ERROR: <message>` |
//!
//! Blank lines and unknown `!` sub-commands produce no output. Lines are
//! handled as raw bytes, so words need not be valid UTF-8.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, trace};

use crate::config::Config;
use crate::error::DictError;
use crate::trie::PatriciaTrie;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Insert { word: &'a [u8], value: u64 },
    Remove { word: &'a [u8] },
    Find { word: &'a [u8] },
    Save { path: &'a [u8] },
    Load { path: &'a [u8] },
    /// `!` followed by something other than `Save` or `Load`.
    Ignored,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("missing word")]
    MissingWord,
    #[error("missing value")]
    MissingValue,
    #[error("invalid value '{0}'")]
    InvalidValue(String),
    #[error("missing path")]
    MissingPath,
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a [u8]) -> Result<Self, ParseError> {
        let mut fields = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|field| !field.is_empty());
        let head = fields.next().ok_or(ParseError::Empty)?;
        match head {
            b"+" => {
                let word = fields.next().ok_or(ParseError::MissingWord)?;
                let raw = fields.next().ok_or(ParseError::MissingValue)?;
                let value = std::str::from_utf8(raw)
                    .ok()
                    .and_then(|digits| digits.parse::<u64>().ok())
                    .ok_or_else(|| {
                        ParseError::InvalidValue(String::from_utf8_lossy(raw).into_owned())
                    })?;
                Ok(Command::Insert { word, value })
            }
            b"-" => {
                let word = fields.next().ok_or(ParseError::MissingWord)?;
                Ok(Command::Remove { word })
            }
            b"!" => match fields.next() {
                Some(b"Save") => {
                    let path = fields.next().ok_or(ParseError::MissingPath)?;
                    Ok(Command::Save { path })
                }
                Some(b"Load") => {
                    let path = fields.next().ok_or(ParseError::MissingPath)?;
                    Ok(Command::Load { path })
                }
                _ => Ok(Command::Ignored),
            },
            word => Ok(Command::Find { word }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,
    Found(u64),
    Exist,
    NoSuchWord,
    Error(String),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => f.write_str("OK"),
            Response::Found(value) => write!(f, "OK: {value}"),
            Response::Exist => f.write_str("Exist"),
            Response::NoSuchWord => f.write_str("NoSuchWord"),
            Response::Error(msg) => write!(f, "ERROR: {msg}"),
        }
    }
}

impl From<DictError> for Response {
    fn from(e: DictError) -> Self {
        match e {
            DictError::DuplicateKey => Response::Exist,
            DictError::KeyNotFound => Response::NoSuchWord,
            other => Response::Error(other.to_string()),
        }
    }
}

/// The current dictionary plus the settings commands are run with.
pub struct Session {
    dict: PatriciaTrie,
    config: Config,
}

impl Session {
    pub fn new() -> Result<Self, DictError> {
        Self::with_config(Config::default())
    }

    /// Fails with [`DictError::OutOfMemory`] when `config.initial_capacity`
    /// cannot be reserved.
    pub fn with_config(config: Config) -> Result<Self, DictError> {
        Ok(Self {
            dict: PatriciaTrie::with_capacity(config.initial_capacity)?,
            config,
        })
    }

    pub fn dictionary(&self) -> &PatriciaTrie {
        &self.dict
    }

    fn key<'w>(&self, word: &'w [u8]) -> Cow<'w, [u8]> {
        if self.config.fold_case && word.iter().any(u8::is_ascii_uppercase) {
            Cow::Owned(word.to_ascii_lowercase())
        } else {
            Cow::Borrowed(word)
        }
    }

    /// Runs one input line. Returns `None` when the line produces no output.
    pub fn execute(&mut self, line: impl AsRef<[u8]>) -> Option<Response> {
        let line = line.as_ref();
        if line.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        match Command::parse(line) {
            Ok(cmd) => self.apply(cmd),
            Err(e) => {
                debug!(error = %e, line = %String::from_utf8_lossy(line), "malformed command");
                Some(Response::Error(e.to_string()))
            }
        }
    }

    /// Applies a parsed command. [`Command::Ignored`] yields `None`.
    pub fn apply(&mut self, cmd: Command<'_>) -> Option<Response> {
        trace!(?cmd, "apply");
        let result = match cmd {
            Command::Insert { word, value } => {
                let key = self.key(word);
                self.dict.insert(&key, value).map(|()| Response::Ok)
            }
            Command::Remove { word } => {
                let key = self.key(word);
                self.dict.remove(&key).map(|_| Response::Ok)
            }
            Command::Find { word } => {
                let key = self.key(word);
                Ok(self
                    .dict
                    .get(&key)
                    .map_or(Response::NoSuchWord, Response::Found))
            }
            Command::Save { path } => self.dict.save(as_path(path)).map(|()| Response::Ok),
            Command::Load { path } => self.dict.load(as_path(path)).map(|()| Response::Ok),
            Command::Ignored => return None,
        };
        Some(result.unwrap_or_else(Response::from))
    }
}

#[cfg(unix)]
fn as_path(raw: &[u8]) -> Cow<'_, Path> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(Path::new(std::ffi::OsStr::from_bytes(raw)))
}

#[cfg(not(unix))]
fn as_path(raw: &[u8]) -> Cow<'_, Path> {
    match String::from_utf8_lossy(raw) {
        Cow::Borrowed(s) => Cow::Borrowed(Path::new(s)),
        Cow::Owned(s) => Cow::Owned(s.into()),
    }
}

/// Feeds every line of `input` to `session`, writing one response per line.
///
/// Only I/O errors on `input` or `output` end the run.
pub fn run<R: BufRead, W: Write>(session: &mut Session, input: R, mut output: W) -> io::Result<()> {
    for line in input.split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if let Some(response) = session.execute(&line) {
            writeln!(output, "{response}")?;
        }
    }
    output.flush()
}
