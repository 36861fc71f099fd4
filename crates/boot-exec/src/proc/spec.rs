use std::path::PathBuf;

use crate::util::cmdline;

/// One program invocation.
#[derive(Clone, Debug, Default)]
pub struct ProcSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Extra `KEY=VALUE` entries; they override the inherited environment.
    pub env: Vec<String>,
    /// Working directory. Relative paths resolve against the runner's source tree.
    pub dir: PathBuf,
}

impl ProcSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            dir: PathBuf::from("."),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.env.push(format!("{key}={}", value.as_ref()));
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn cmdline(&self) -> String {
        cmdline(&self.program, &self.args)
    }
}
