/// How a send or receive run concluded, mapped to the process exit code
/// in `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Clean,
    Incomplete,
}
