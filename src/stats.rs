//! Population mean / standard deviation over a sequence of samples.

use crate::error::{EvalError, Result};

/// Mean and population standard deviation (divisor = `count`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

/// Summarise `values`. `quantity` names what is being summarised and ends up
/// in the [`EvalError::DegenerateStatistics`] returned for an empty input.
pub fn summarize(values: &[f64], quantity: &'static str) -> Result<Summary> {
    if values.is_empty() {
        return Err(EvalError::DegenerateStatistics { quantity });
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Ok(Summary {
        mean,
        std_dev: var.sqrt(),
        count: values.len(),
    })
}
