//! Builder for external tool invocations.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

/// One invocation of an external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    tool: String,
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ToolCommand {
    /// `tool` is the short name used in logs and errors.
    pub fn new(tool: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Append `flag value` when `value` is present.
    pub fn opt_arg(self, flag: &str, value: Option<impl AsRef<OsStr>>) -> Self {
        match value {
            Some(v) => self.arg(flag).arg(v),
            None => self,
        }
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn tool_name(&self) -> &str {
        &self.tool
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Program and arguments as display strings.
    pub fn tokens(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect()
    }

    /// Shell-like single line for logs. Tokens with spaces are quoted.
    pub fn display(&self) -> String {
        self.tokens()
            .iter()
            .map(|t| {
                if t.is_empty() || t.contains(char::is_whitespace) {
                    format!("\"{}\"", t)
                } else {
                    t.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Build the std `Command` (stdio not yet configured).
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref dir) = self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_argument_list() {
        let cmd = ToolCommand::new("truehdd", "/opt/bin/truehdd")
            .arg("decode")
            .args(["--loglevel", "off"])
            .opt_arg("--presentation", Some("3"))
            .opt_arg("--warp-mode", None::<&str>);

        assert_eq!(
            cmd.tokens(),
            vec!["/opt/bin/truehdd", "decode", "--loglevel", "off", "--presentation", "3"]
        );
        assert_eq!(cmd.tool_name(), "truehdd");
    }

    #[test]
    fn display_quotes_spaces() {
        let cmd = ToolCommand::new("dee", "/opt/dee").arg("-x").arg("/tmp/my job.xml");
        assert_eq!(cmd.display(), "/opt/dee -x \"/tmp/my job.xml\"");
    }
}
