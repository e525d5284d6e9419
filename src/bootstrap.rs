use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, SetupError};
use crate::model::config::SetupConfig;
use crate::model::plan::{Invocation, Step};
use crate::model::policy::FailurePolicy;
use crate::runner::{CommandRunner, CommandStatus};

/// How many levels the repository root sits above the executable's directory
/// (`<root>/target/<profile>/vendor-setup`).
const ROOT_DEPTH: usize = 2;

/// Directory containing the running executable.
pub fn resolve_self_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(SetupError::SelfPath)?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        SetupError::SelfPath(io::Error::other(format!(
            "{} has no parent directory",
            exe.display()
        )))
    })
}

/// Walk up from the executable's directory to the repository root.
pub fn resolve_root(self_dir: &Path) -> Result<PathBuf> {
    self_dir
        .ancestors()
        .nth(ROOT_DEPTH)
        .filter(|root| root.is_dir())
        .map(Path::to_path_buf)
        .ok_or_else(|| SetupError::RootNotFound(self_dir.to_path_buf()))
}

/// Create `path` and any missing parents. An existing directory is fine.
pub fn ensure_directory(path: &Path) -> Result<()> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(_) if path.is_dir() => Ok(()),
        Err(source) => Err(SetupError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[derive(Debug)]
pub enum Outcome {
    Exited(CommandStatus),
    SpawnFailed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Exited(status) if status.is_success())
    }
}

#[derive(Debug)]
pub struct StepOutcome {
    pub step: Step,
    pub invocation: Invocation,
    pub outcome: Outcome,
}

#[derive(Debug, Default)]
pub struct SetupReport {
    pub steps: Vec<StepOutcome>,
}

impl SetupReport {
    pub fn failed(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| !step.outcome.is_success())
            .count()
    }

    pub fn summary(&self) -> String {
        format!("{} steps, {} failed", self.steps.len(), self.failed())
    }

    pub fn failure_notifications(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter_map(|step| match &step.outcome {
                Outcome::Exited(status) if !status.is_success() => {
                    Some(format!("{}: `{}` {status}", step.step.label(), step.invocation))
                }
                Outcome::SpawnFailed(err) => Some(format!(
                    "{}: `{}` could not start: {err}",
                    step.step.label(),
                    step.invocation
                )),
                _ => None,
            })
            .collect()
    }
}

/// Drives the clone → bootstrap → integrate → install sequence.
///
/// The working directory is tracked here and handed to every invocation;
/// the process's own current directory is never changed.
pub struct Bootstrapper<'a, R: CommandRunner> {
    config: &'a SetupConfig,
    runner: R,
    policy: FailurePolicy,
    dry_run: bool,
    cwd: PathBuf,
    report: SetupReport,
}

impl<'a, R: CommandRunner> Bootstrapper<'a, R> {
    pub fn new(config: &'a SetupConfig, runner: R, root: PathBuf) -> Self {
        Self {
            config,
            runner,
            policy: config.policy(),
            dry_run: false,
            cwd: root,
            report: SetupReport::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Skip filesystem changes and directory checks.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.cwd
    }

    pub fn run(mut self) -> Result<SetupReport> {
        tracing::info!(
            "setting up vendor dependencies in {} ({})",
            self.cwd.display(),
            self.policy.label()
        );

        self.prepare_vendor()?;
        self.clone_package_manager()?;
        for step in Step::checkout_sequence(self.config) {
            self.execute(step)?;
        }

        tracing::info!(
            "vendor setup finished in {}: {}",
            self.working_dir().display(),
            self.report.summary()
        );
        Ok(self.report)
    }

    /// Ensure the vendor directory exists and make it the working directory.
    pub fn prepare_vendor(&mut self) -> Result<()> {
        let config = self.config;
        let vendor = self.cwd.join(&config.vendor.dir);
        if self.dry_run {
            tracing::info!("dry run: not creating {}", vendor.display());
        } else {
            ensure_directory(&vendor)?;
        }
        self.enter_directory(&config.vendor.dir)
    }

    /// Clone into the vendor directory, then move into the checkout.
    pub fn clone_package_manager(&mut self) -> Result<()> {
        println!("Installing {}...", self.config.package_manager.checkout);
        self.execute(Step::Clone)?;
        let checkout = PathBuf::from(&self.config.package_manager.checkout);
        self.enter_directory(&checkout)
    }

    /// Relative paths resolve against the current working directory.
    pub fn enter_directory(&mut self, path: &Path) -> Result<()> {
        let target = self.cwd.join(path);
        if !self.dry_run {
            let metadata = fs::metadata(&target).map_err(|source| SetupError::EnterDirectory {
                path: target.clone(),
                source,
            })?;
            if !metadata.is_dir() {
                return Err(SetupError::EnterDirectory {
                    path: target,
                    source: io::Error::other("not a directory"),
                });
            }
        }

        tracing::debug!("entering {}", target.display());
        self.cwd = target;
        Ok(())
    }

    pub fn run_external_command(&mut self, invocation: &Invocation) -> io::Result<CommandStatus> {
        tracing::info!("running `{invocation}` in {}", invocation.cwd.display());
        self.runner.run(invocation)
    }

    fn execute(&mut self, step: Step) -> Result<()> {
        let invocation = step.invocation(self.config, &self.cwd);

        let outcome = match self.run_external_command(&invocation) {
            Ok(status) if status.is_success() => Outcome::Exited(status),
            Ok(status) => {
                tracing::warn!("`{invocation}` finished with {status}");
                if self.policy == FailurePolicy::Halt {
                    return Err(SetupError::CommandFailed {
                        invocation,
                        status: status.to_string(),
                    });
                }
                Outcome::Exited(status)
            }
            Err(source) => {
                tracing::warn!("`{invocation}` could not be started: {source}");
                if self.policy == FailurePolicy::Halt {
                    return Err(SetupError::Spawn { invocation, source });
                }
                Outcome::SpawnFailed(source.to_string())
            }
        };

        self.report.steps.push(StepOutcome {
            step,
            invocation,
            outcome,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records invocations instead of spawning them. A clone creates the
    /// checkout directory so the sequence can enter it, like a real clone.
    struct RecordingRunner {
        calls: Vec<Invocation>,
        status: CommandStatus,
        spawn_error: bool,
        create_checkout: bool,
    }

    impl RecordingRunner {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                status: CommandStatus::success(),
                spawn_error: false,
                create_checkout: true,
            }
        }

        fn failing(code: i32) -> Self {
            Self {
                status: CommandStatus::from_code(code),
                ..Self::new()
            }
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&mut self, invocation: &Invocation) -> io::Result<CommandStatus> {
            self.calls.push(invocation.clone());
            if self.create_checkout && invocation.program == "git" {
                fs::create_dir_all(invocation.cwd.join("vcpkg"))?;
            }
            if self.spawn_error {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no such program"));
            }
            Ok(self.status)
        }
    }

    fn argvs(calls: &[Invocation]) -> Vec<Vec<String>> {
        calls
            .iter()
            .map(|call| call.argv().into_iter().map(str::to_string).collect())
            .collect()
    }

    fn owned(argv: &[&str]) -> Vec<String> {
        argv.iter().map(|arg| arg.to_string()).collect()
    }

    fn expected_argvs(config: &SetupConfig) -> Vec<Vec<String>> {
        vec![
            owned(&["git", "clone", "https://github.com/microsoft/vcpkg.git"]),
            owned(&[config.bootstrap_program()]),
            owned(&["vcpkg", "integrate", "install"]),
            owned(&["vcpkg", "install", "glad:x64-windows-static"]),
            owned(&["vcpkg", "install", "glfw3:x64-windows-static"]),
            owned(&["vcpkg", "install", "glm:x64-windows-static"]),
            owned(&["vcpkg", "install", "nlohmann-json:x64-windows-static"]),
            owned(&[
                "vcpkg",
                "install",
                "imgui[core,docking-experimental,opengl3-binding,glfw-binding]:x64-windows-static",
            ]),
            owned(&["vcpkg", "install", "stb:x64-windows-static"]),
            owned(&["vcpkg", "integrate", "install"]),
        ]
    }

    #[test]
    fn ensure_directory_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("src/StarTracker/Vendor");

        ensure_directory(&path).unwrap();
        ensure_directory(&path).unwrap();

        assert!(path.is_dir());
        let entries: Vec<_> = fs::read_dir(root.path().join("src/StarTracker"))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn ensure_directory_reports_cause() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("blocker");
        fs::write(&blocker, "file, not a folder").unwrap();

        let err = ensure_directory(&blocker.join("nested")).unwrap_err();
        assert!(matches!(err, SetupError::CreateDirectory { .. }));
        assert!(err.to_string().starts_with("Could not create folder!"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn creation_failure_stops_before_any_command() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("src"), "blocks the vendor path").unwrap();

        let config = SetupConfig::defaults().unwrap();
        let mut runner = RecordingRunner::new();
        let err = Bootstrapper::new(&config, &mut runner, root.path().to_path_buf())
            .run()
            .unwrap_err();

        assert!(err.to_string().starts_with("Could not create folder!"));
        assert!(runner.calls.is_empty());
    }

    #[test]
    fn runs_the_fixed_sequence_in_order() {
        let root = tempfile::tempdir().unwrap();
        let config = SetupConfig::defaults().unwrap();
        let mut runner = RecordingRunner::new();

        let report = Bootstrapper::new(&config, &mut runner, root.path().to_path_buf())
            .run()
            .unwrap();

        assert_eq!(argvs(&runner.calls), expected_argvs(&config));
        assert_eq!(report.steps.len(), 10);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.summary(), "10 steps, 0 failed");
    }

    #[test]
    fn working_directory_follows_vendor_then_checkout() {
        let root = tempfile::tempdir().unwrap();
        let config = SetupConfig::defaults().unwrap();
        let vendor = root.path().join("src/StarTracker/Vendor");
        let mut runner = RecordingRunner::new();

        let mut bootstrapper =
            Bootstrapper::new(&config, &mut runner, root.path().to_path_buf());
        assert_eq!(bootstrapper.working_dir(), root.path());

        bootstrapper.prepare_vendor().unwrap();
        assert_eq!(bootstrapper.working_dir(), vendor);

        bootstrapper.clone_package_manager().unwrap();
        assert_eq!(bootstrapper.working_dir(), vendor.join("vcpkg"));
        drop(bootstrapper);

        assert_eq!(runner.calls.len(), 1);
        assert_eq!(runner.calls[0].cwd, vendor);
    }

    #[test]
    fn checkout_commands_run_inside_the_checkout() {
        let root = tempfile::tempdir().unwrap();
        let config = SetupConfig::defaults().unwrap();
        let checkout = root.path().join("src/StarTracker/Vendor/vcpkg");
        let mut runner = RecordingRunner::new();

        Bootstrapper::new(&config, &mut runner, root.path().to_path_buf())
            .run()
            .unwrap();

        assert!(runner.calls[1..].iter().all(|call| call.cwd == checkout));
    }

    #[test]
    fn non_zero_exits_do_not_halt_best_effort_runs() {
        let root = tempfile::tempdir().unwrap();
        let config = SetupConfig::defaults().unwrap();
        let mut runner = RecordingRunner::failing(1);

        let report = Bootstrapper::new(&config, &mut runner, root.path().to_path_buf())
            .with_policy(FailurePolicy::Continue)
            .run()
            .unwrap();

        assert_eq!(runner.calls.len(), 10);
        assert_eq!(report.failed(), 10);
        assert_eq!(report.failure_notifications().len(), 10);
        assert!(report.failure_notifications()[0].starts_with("clone: `git clone"));
    }

    #[test]
    fn spawn_failures_do_not_halt_best_effort_runs() {
        let root = tempfile::tempdir().unwrap();
        let config = SetupConfig::defaults().unwrap();
        let mut runner = RecordingRunner::new();
        runner.spawn_error = true;

        let report = Bootstrapper::new(&config, &mut runner, root.path().to_path_buf())
            .run()
            .unwrap();

        assert_eq!(runner.calls.len(), 10);
        assert!(matches!(report.steps[0].outcome, Outcome::SpawnFailed(_)));
    }

    #[test]
    fn strict_runs_stop_at_first_failure() {
        let root = tempfile::tempdir().unwrap();
        let config = SetupConfig::defaults().unwrap();
        let mut runner = RecordingRunner::failing(3);

        let err = Bootstrapper::new(&config, &mut runner, root.path().to_path_buf())
            .with_policy(FailurePolicy::Halt)
            .run()
            .unwrap_err();

        assert_eq!(runner.calls.len(), 1);
        match err {
            SetupError::CommandFailed { invocation, status } => {
                assert_eq!(invocation.program, "git");
                assert_eq!(status, "exit code 3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_checkout_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let config = SetupConfig::defaults().unwrap();
        let mut runner = RecordingRunner::new();
        runner.create_checkout = false;

        let err = Bootstrapper::new(&config, &mut runner, root.path().to_path_buf())
            .run()
            .unwrap_err();

        assert!(matches!(err, SetupError::EnterDirectory { .. }));
        assert_eq!(runner.calls.len(), 1);
    }

    #[test]
    fn dry_run_touches_nothing() {
        let root = tempfile::tempdir().unwrap();
        let config = SetupConfig::defaults().unwrap();
        let mut runner = RecordingRunner::new();
        runner.create_checkout = false;

        let report = Bootstrapper::new(&config, &mut runner, root.path().to_path_buf())
            .with_dry_run(true)
            .run()
            .unwrap();

        assert_eq!(report.steps.len(), 10);
        assert!(!root.path().join("src").exists());
    }

    #[test]
    fn root_is_two_levels_above_the_executable() {
        let root = tempfile::tempdir().unwrap();
        let exe_dir = root.path().join("target/debug");
        fs::create_dir_all(&exe_dir).unwrap();

        assert_eq!(resolve_root(&exe_dir).unwrap(), root.path());
        assert!(matches!(
            resolve_root(Path::new("/")),
            Err(SetupError::RootNotFound(_))
        ));
    }

    #[test]
    fn self_path_is_a_directory() {
        assert!(resolve_self_path().unwrap().is_dir());
    }
}
