pub mod annealing;
pub mod error;
pub mod evaluate;
pub mod ffd;
pub mod greedy;
pub mod pattern;
pub mod report;
pub mod solver;
pub mod types;

pub use error::{CutError, Result};
