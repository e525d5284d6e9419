/// What to do when a spawned command fails or exits non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and keep going through the sequence.
    #[default]
    Continue,
    /// Stop at the first failure.
    Halt,
}

impl FailurePolicy {
    pub fn label(&self) -> &'static str {
        match self {
            FailurePolicy::Continue => "best-effort",
            FailurePolicy::Halt => "strict",
        }
    }
}
