use thiserror::Error;

pub type Result<T> = std::result::Result<T, CutError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CutError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("item '{item}' (length {length}) does not fit any stock (longest is {max_stock_length})")]
    InfeasibleItem {
        item: String,
        length: u32,
        max_stock_length: u32,
    },

    /// A full scan of every stock type left residual demand unchanged.
    #[error("{solver} stalled with {residual} pieces still outstanding")]
    StalledProgress { solver: &'static str, residual: u64 },

    #[error("no feasible solution constructed within {iterations} iterations")]
    BudgetExhausted { iterations: usize },
}

impl CutError {
    /// Errors caused by the caller's catalogues rather than by the engine.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CutError::InvalidConfiguration(_) | CutError::InfeasibleItem { .. }
        )
    }
}
