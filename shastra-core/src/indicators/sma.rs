//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a trailing window.
//! Lookback: period - 1 (first valid value at index period-1).

use std::num::NonZeroUsize;

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: NonZeroUsize) -> Self {
        let period = period.get();
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, closes: &[f64]) -> Vec<f64> {
        let n = closes.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        let mut sum = window_sum(&closes[..self.period]);
        // Length of the run of equal closes ending at the current index.
        let mut run = 1;
        for i in 1..self.period {
            run = next_run(run, closes[i - 1], closes[i]);
        }
        result[self.period - 1] = self.mean(sum, run, closes[self.period - 1]);

        for i in self.period..n {
            let leaving = closes[i - self.period];
            let entering = closes[i];
            run = next_run(run, closes[i - 1], entering);

            // Non-finite values poison the running sum; rescan until they drop out.
            sum = match sum {
                Some(s) if leaving.is_finite() && entering.is_finite() => {
                    let rolled = s - leaving + entering;
                    if rolled.is_finite() {
                        Some(rolled)
                    } else {
                        window_sum(&closes[(i + 1 - self.period)..=i])
                    }
                }
                _ => window_sum(&closes[(i + 1 - self.period)..=i]),
            };
            result[i] = self.mean(sum, run, entering);
        }

        result
    }
}

impl Sma {
    /// A window of identical closes averages to that close exactly.
    fn mean(&self, sum: Option<f64>, run: usize, last: f64) -> f64 {
        if run >= self.period {
            return last;
        }
        sum.map_or(f64::NAN, |sum| sum / self.period as f64)
    }
}

/// Sum of a window, or `None` when a value in it or the sum itself is not finite.
fn window_sum(window: &[f64]) -> Option<f64> {
    window.iter().try_fold(0.0, |acc: f64, &v| {
        let next = acc + v;
        next.is_finite().then_some(next)
    })
}

fn next_run(run: usize, previous: f64, current: f64) -> usize {
    if current.is_finite() && current == previous {
        run + 1
    } else {
        1
    }
}
