use std::env::consts::EXE_SUFFIX;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use crate::model::plan::Invocation;

/// Exit status of a finished child, reduced to what the bootstrapper needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    code: Option<i32>,
}

impl CommandStatus {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success() -> Self {
        Self::from_code(0)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for CommandStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("no exit code (terminated by signal)"),
        }
    }
}

/// Runs one invocation to completion.
pub trait CommandRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<CommandStatus>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &mut R {
    fn run(&mut self, invocation: &Invocation) -> io::Result<CommandStatus> {
        (**self).run(invocation)
    }
}

/// Spawns real child processes with inherited stdio.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// A program sitting in the working directory wins over `PATH`, so the
    /// checkout's own executables resolve the way they would from a shell
    /// started there.
    fn resolve_program(invocation: &Invocation) -> PathBuf {
        let local = invocation.cwd.join(&invocation.program);
        if local.is_file() {
            return local;
        }

        if !EXE_SUFFIX.is_empty() {
            let suffixed = invocation
                .cwd
                .join(format!("{}{EXE_SUFFIX}", invocation.program));
            if suffixed.is_file() {
                return suffixed;
            }
        }

        PathBuf::from(&invocation.program)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<CommandStatus> {
        let program = Self::resolve_program(invocation);
        tracing::debug!(
            "spawning {} in {}",
            program.display(),
            invocation.cwd.display()
        );

        let status = Command::new(&program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .status()?;

        Ok(status.into())
    }
}

/// Prints what would run and reports success without spawning anything.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    pub executed: usize,
}

impl CommandRunner for DryRunRunner {
    fn run(&mut self, invocation: &Invocation) -> io::Result<CommandStatus> {
        self.executed += 1;
        println!("[dry-run] ({}) {invocation}", invocation.cwd.display());
        Ok(CommandStatus::success())
    }
}
