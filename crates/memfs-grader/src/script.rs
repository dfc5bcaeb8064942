//! Line-oriented syscall scripts.
//!
//! One call per line, optionally followed by an expectation:
//!
//! ```text
//! # comments and blank lines are skipped
//! mkdir /a            => 0
//! creat /a/f          => ok
//! write 0 hello world => 11
//! close 0
//! open /missing       => err
//! read 0 5            => "hello"
//! pwd                 => /
//! free
//! ```
//!
//! Expectations are an integer (exact return value), `ok` (non-negative),
//! `err` (`-1`), or the text a `read`/`pwd` produced, either quoted or as a
//! bare absolute path. The first `=>` outside double quotes starts the
//! expectation, so `write` text containing `=>` must be quoted:
//! `write 0 "a=>b" => 4`. A `read` count may not exceed [`MAX_TRANSFER`].

use std::path::Path;
use std::str::FromStr;

use memfs_kernel::{FAILURE, MAX_TRANSFER, Syscalls};
use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::grader::Grader;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("line {line}: unknown call `{name}`")]
    UnknownCall { line: usize, name: String },

    #[error("line {line}: `{call}` needs {expected}")]
    MissingArgument {
        line: usize,
        call: CallName,
        expected: &'static str,
    },

    #[error("line {line}: invalid {what} `{value}`")]
    InvalidValue {
        line: usize,
        what: &'static str,
        value: String,
    },

    #[error("failed to read script {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Call names as written in scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CallName {
    Mkdir,
    Rmdir,
    Chdir,
    Creat,
    Open,
    Read,
    Write,
    Close,
    Unlink,
    Free,
    Pwd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Mkdir(String),
    Rmdir(String),
    Chdir(String),
    Creat(String),
    Open(String),
    Read { fd: i32, count: usize },
    Write { fd: i32, text: String },
    Close(i32),
    Unlink(String),
    Free,
    Pwd,
}

impl std::fmt::Display for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Call::Mkdir(p) => write!(f, "mkdir {p}"),
            Call::Rmdir(p) => write!(f, "rmdir {p}"),
            Call::Chdir(p) => write!(f, "chdir {p}"),
            Call::Creat(p) => write!(f, "creat {p}"),
            Call::Open(p) => write!(f, "open {p}"),
            Call::Read { fd, count } => write!(f, "read {fd} {count}"),
            Call::Write { fd, text } => write!(f, "write {fd} {text}"),
            Call::Close(fd) => write!(f, "close {fd}"),
            Call::Unlink(p) => write!(f, "unlink {p}"),
            Call::Free => write!(f, "free"),
            Call::Pwd => write!(f, "pwd"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expect {
    Value(i64),
    Success,
    Failure,
    Output(String),
}

impl Expect {
    fn matches(&self, result: i64, output: Option<&str>) -> bool {
        match self {
            Expect::Value(v) => result == *v,
            Expect::Success => result >= 0,
            Expect::Failure => result == i64::from(FAILURE),
            Expect::Output(text) => output == Some(text.as_str()),
        }
    }
}

impl std::fmt::Display for Expect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expect::Value(v) => write!(f, "{v}"),
            Expect::Success => write!(f, "ok"),
            Expect::Failure => write!(f, "err"),
            Expect::Output(text) => write!(f, "{text:?}"),
        }
    }
}

impl FromStr for Expect {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        let s = s.trim();
        if let Some(inner) = s.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
            return Ok(Expect::Output(inner.to_string()));
        }
        if s.starts_with('/') {
            return Ok(Expect::Output(s.to_string()));
        }
        match s.to_ascii_lowercase().as_str() {
            "ok" => Ok(Expect::Success),
            "err" => Ok(Expect::Failure),
            _ => s.parse().map(Expect::Value).map_err(|_| ()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub line: usize,
    pub call: Call,
    pub expect: Option<Expect>,
}

/// What one step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub line: usize,
    pub call: String,
    pub result: i64,
    /// Bytes read or cwd printed.
    pub output: Option<String>,
    pub passed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, ScriptError> {
        let mut steps = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            steps.push(parse_step(line, text)?);
        }
        Ok(Self {
            name: name.into(),
            steps,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(name, &source)
    }

    /// Execute every step, grading the ones with expectations.
    pub fn run(&self, sys: &mut impl Syscalls, grader: &mut Grader) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let (result, output) = execute(sys, &step.call);
            let passed = match &step.expect {
                Some(expect) => grader.assert_true_msg(
                    expect.matches(result, output.as_deref()),
                    format!(
                        "line {}: `{}` returned {}{}, expected {}",
                        step.line,
                        step.call,
                        result,
                        output.as_deref().map(|o| format!(" ({o:?})")).unwrap_or_default(),
                        expect
                    ),
                ),
                None => true,
            };
            if matches!(step.call, Call::Pwd) {
                grader.print_cwd(&*sys);
            }
            tracing::debug!(line = step.line, call = %step.call, result, "script step");
            outcomes.push(Outcome {
                line: step.line,
                call: step.call.to_string(),
                result,
                output,
                passed,
            });
        }
        outcomes
    }
}

fn execute(sys: &mut impl Syscalls, call: &Call) -> (i64, Option<String>) {
    match call {
        Call::Mkdir(p) => (sys.mkdir(p).into(), None),
        Call::Rmdir(p) => (sys.rmdir(p).into(), None),
        Call::Chdir(p) => (sys.chdir(p).into(), None),
        Call::Creat(p) => (sys.creat(p).into(), None),
        Call::Open(p) => (sys.open(p).into(), None),
        Call::Read { fd, count } => read_chunked(sys, *fd, *count),
        Call::Write { fd, text } => (sys.write(*fd, text.as_bytes()).into(), None),
        Call::Close(fd) => (sys.close(*fd).into(), None),
        Call::Unlink(p) => (sys.unlink(p).into(), None),
        Call::Free => (sys.get_free_disk_size(), None),
        Call::Pwd => match sys.cwd() {
            Some(cwd) => (0, Some(cwd)),
            None => (FAILURE.into(), None),
        },
    }
}

/// Read up to `count` bytes without allocating `count` up front. Stops at
/// the first short read; fails only if the first call fails.
fn read_chunked(sys: &mut impl Syscalls, fd: i32, count: usize) -> (i64, Option<String>) {
    const CHUNK: usize = 64 * 1024;

    let mut data = Vec::new();
    let mut buf = vec![0u8; count.min(CHUNK)];
    while data.len() < count {
        let want = (count - data.len()).min(buf.len());
        let n = sys.read(fd, &mut buf[..want]);
        let Ok(n) = usize::try_from(n) else {
            if data.is_empty() {
                return (n.into(), None);
            }
            break;
        };
        data.extend_from_slice(&buf[..n.min(want)]);
        if n < want {
            break;
        }
    }
    let n = i64::try_from(data.len()).unwrap_or(i64::MAX);
    (n, Some(String::from_utf8_lossy(&data).into_owned()))
}

/// Split at the first `=>` that is not inside double quotes.
fn split_expectation(text: &str) -> Option<(&str, &str)> {
    let mut quoted = false;
    for (i, c) in text.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '=' if !quoted && text[i..].starts_with("=>") => {
                return Some((&text[..i], &text[i + 2..]));
            }
            _ => {}
        }
    }
    None
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

fn parse_step(line: usize, text: &str) -> Result<Step, ScriptError> {
    let (body, expect) = match split_expectation(text) {
        Some((body, expect)) => {
            let parsed = expect
                .parse::<Expect>()
                .map_err(|_| ScriptError::InvalidValue {
                    line,
                    what: "expectation",
                    value: expect.trim().to_string(),
                })?;
            (body.trim(), Some(parsed))
        }
        None => (text, None),
    };

    let (name, rest) = body
        .split_once(char::is_whitespace)
        .map(|(n, r)| (n, r.trim()))
        .unwrap_or((body, ""));
    let call_name = CallName::from_str(name).map_err(|_| ScriptError::UnknownCall {
        line,
        name: name.to_string(),
    })?;

    let call = match call_name {
        CallName::Mkdir => Call::Mkdir(path_arg(line, call_name, rest)?),
        CallName::Rmdir => Call::Rmdir(path_arg(line, call_name, rest)?),
        CallName::Chdir => Call::Chdir(path_arg(line, call_name, rest)?),
        CallName::Creat => Call::Creat(path_arg(line, call_name, rest)?),
        CallName::Open => Call::Open(path_arg(line, call_name, rest)?),
        CallName::Unlink => Call::Unlink(path_arg(line, call_name, rest)?),
        CallName::Read => {
            let (fd, count) = fd_arg(line, call_name, rest)?;
            if count.is_empty() {
                return Err(ScriptError::MissingArgument {
                    line,
                    call: call_name,
                    expected: "a byte count",
                });
            }
            let count = count
                .parse::<usize>()
                .ok()
                .filter(|&n| n <= MAX_TRANSFER)
                .ok_or_else(|| ScriptError::InvalidValue {
                    line,
                    what: "byte count",
                    value: count.to_string(),
                })?;
            Call::Read { fd, count }
        }
        CallName::Write => {
            let (fd, text) = fd_arg(line, call_name, rest)?;
            Call::Write {
                fd,
                text: unquote(text).to_string(),
            }
        }
        CallName::Close => Call::Close(fd_arg(line, call_name, rest)?.0),
        CallName::Free => Call::Free,
        CallName::Pwd => Call::Pwd,
    };

    Ok(Step { line, call, expect })
}

fn path_arg(line: usize, call: CallName, rest: &str) -> Result<String, ScriptError> {
    if rest.is_empty() {
        return Err(ScriptError::MissingArgument {
            line,
            call,
            expected: "a path",
        });
    }
    Ok(rest.to_string())
}

/// Leading descriptor and whatever follows it.
fn fd_arg(line: usize, call: CallName, rest: &str) -> Result<(i32, &str), ScriptError> {
    let (fd, tail) = rest
        .split_once(char::is_whitespace)
        .map(|(f, t)| (f, t.trim_start()))
        .unwrap_or((rest, ""));
    if fd.is_empty() {
        return Err(ScriptError::MissingArgument {
            line,
            call,
            expected: "a descriptor",
        });
    }
    let fd = fd.parse().map_err(|_| ScriptError::InvalidValue {
        line,
        what: "descriptor",
        value: fd.to_string(),
    })?;
    Ok((fd, tail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use memfs_kernel::FileSystem;

    #[test]
    fn test_parse_calls_and_expectations() {
        let script = Script::parse(
            "t",
            "# setup\n\nmkdir /a => 0\nwrite 3 hello world => 11\nread 0 5 => \"hello\"\npwd => /\nopen x => err\nfree\n",
        )
        .unwrap();
        assert_eq!(script.steps.len(), 6);
        assert_eq!(script.steps[0].line, 3);
        assert_eq!(script.steps[0].call, Call::Mkdir("/a".into()));
        assert_eq!(script.steps[0].expect, Some(Expect::Value(0)));
        assert_eq!(
            script.steps[1].call,
            Call::Write {
                fd: 3,
                text: "hello world".into()
            }
        );
        assert_eq!(script.steps[2].expect, Some(Expect::Output("hello".into())));
        assert_eq!(script.steps[3].expect, Some(Expect::Output("/".into())));
        assert_eq!(script.steps[4].expect, Some(Expect::Failure));
        assert_eq!(script.steps[5].expect, None);
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        let err = Script::parse("t", "mkdir a\nfrobnicate x\n").unwrap_err();
        assert!(matches!(err, ScriptError::UnknownCall { line: 2, .. }));
        assert_eq!(err.to_string(), "line 2: unknown call `frobnicate`");

        let err = Script::parse("t", "read 0\n").unwrap_err();
        assert!(matches!(err, ScriptError::MissingArgument { line: 1, .. }));

        let err = Script::parse("t", "\n\nclose x\n").unwrap_err();
        assert!(matches!(err, ScriptError::InvalidValue { line: 3, what: "descriptor", .. }));

        let err = Script::parse("t", "mkdir\n").unwrap_err();
        assert!(matches!(err, ScriptError::MissingArgument { expected: "a path", .. }));

        let err = Script::parse("t", "free => maybe\n").unwrap_err();
        assert!(matches!(err, ScriptError::InvalidValue { what: "expectation", .. }));

        let err = Script::parse("t", "creat f\nread 0 18446744073709551615 => 0\n").unwrap_err();
        assert!(matches!(err, ScriptError::InvalidValue { line: 2, what: "byte count", .. }));
    }

    #[test]
    fn test_arrow_inside_quotes_is_text() {
        let script = Script::parse(
            "t",
            "creat f => 0\nwrite 0 \"a=>b\" => 4\nclose 0\nopen f\nread 0 10 => \"a=>b\"\n",
        )
        .unwrap();
        assert_eq!(
            script.steps[1].call,
            Call::Write {
                fd: 0,
                text: "a=>b".into()
            }
        );
        assert_eq!(script.steps[4].expect, Some(Expect::Output("a=>b".into())));

        let fs = FileSystem::default();
        let mut session = fs.session();
        let mut grader = Grader::new("t");
        script.run(&mut session, &mut grader);
        let report = grader.done();
        assert!(report.is_success(), "{:?}", report.messages);
        assert_eq!(report.passed, 3);
    }

    #[test]
    fn test_large_read_count_is_bounded_by_file() {
        let big = MAX_TRANSFER.to_string();
        let source = format!("creat f => 0\nwrite 0 hello => 5\nclose 0\nopen f\nread 0 {big} => \"hello\"\nread 0 {big} => 0\n");
        let script = Script::parse("t", &source).unwrap();

        let fs = FileSystem::default();
        let mut session = fs.session();
        let mut grader = Grader::new("t");
        let outcomes = script.run(&mut session, &mut grader);
        let report = grader.done();
        assert!(report.is_success(), "{:?}", report.messages);
        assert_eq!(outcomes[4].result, 5);
        assert_eq!(outcomes[5].output.as_deref(), Some(""));
    }

    #[test]
    fn test_read_spanning_chunks() {
        let fs = FileSystem::default();
        let mut session = fs.session();
        let fd = session.creat("big").unwrap();
        session.write(fd, &vec![b'x'; 150 * 1024]).unwrap();
        session.close(fd).unwrap();

        let script = Script::parse("t", "open big => 0\nread 0 200000 => 153600\nread 0 1 => 0\nread 7 1 => err\n").unwrap();
        let mut grader = Grader::new("t");
        let outcomes = script.run(&mut session, &mut grader);
        let report = grader.done();
        assert!(report.is_success(), "{:?}", report.messages);
        assert_eq!(outcomes[1].output.as_ref().map(String::len), Some(150 * 1024));
        assert_eq!(outcomes[3].output, None);
    }

    #[test]
    fn test_run_grades_expectations() {
        let script = Script::parse(
            "t",
            "creat f => 0\nwrite 0 abc => 3\nclose 0 => 0\nopen f => 0\nread 0 10 => \"abc\"\nunlink f => 0\nopen f => ok\n",
        )
        .unwrap();
        let fs = FileSystem::default();
        let mut session = fs.session();
        let mut grader = Grader::new("t");

        let outcomes = script.run(&mut session, &mut grader);
        let report = grader.done();
        assert_eq!(report.passed, 6);
        assert_eq!(report.failed, 1);
        assert_eq!(report.messages, vec!["line 7: `open f` returned -1, expected ok"]);
        assert_eq!(outcomes[4].output.as_deref(), Some("abc"));
        assert!(!outcomes[6].passed);
    }
}
