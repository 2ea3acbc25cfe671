use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MsmError {
    #[error("domain error: {0}")]
    Domain(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("length mismatch: {left} has {left_len} values, {right} has {right_len}")]
    LengthMismatch {
        left: &'static str,
        left_len: usize,
        right: &'static str,
        right_len: usize,
    },

    #[error("optimizer error: {0}")]
    Optimizer(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type MsmResult<T> = Result<T, MsmError>;

impl MsmError {
    pub(crate) fn ensure_same_len(
        left: &'static str,
        left_len: usize,
        right: &'static str,
        right_len: usize,
    ) -> MsmResult<()> {
        if left_len != right_len {
            return Err(MsmError::LengthMismatch {
                left,
                left_len,
                right,
                right_len,
            });
        }
        Ok(())
    }
}

impl From<argmin::core::Error> for MsmError {
    fn from(e: argmin::core::Error) -> Self {
        MsmError::Optimizer(e.to_string())
    }
}
