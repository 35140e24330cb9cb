//! Monthly expense forecasting.
//!
//! Amounts are bucketed into calendar-month sums and fed to a fixed-order
//! autoregressive integrated moving-average model. The order is a
//! configuration constant, not selected adaptively, and months absent from
//! the data are not synthesized as zero, so gaps silently collapse the
//! series' cadence. The tests pin both behaviors rather than correcting
//! them.

use crate::error::{ExpenseInsightsError, Result};
use crate::schema::{ForecastPoint, ForecastReport, Transaction};
use crate::utils::{format_year_month, month_start, next_month};
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct ForecastConfig {
    /// Model order `(p, d, q)`. Only `q == 0` is supported.
    pub order: (usize, usize, usize),
    /// Number of future months to project.
    pub horizon: usize,
    /// Minimum number of monthly buckets required before fitting.
    pub min_months: usize,
    /// Two-sided confidence level for the interval bounds.
    pub confidence: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            order: (5, 1, 0),
            horizon: 6,
            min_months: 24,
            confidence: 0.95,
        }
    }
}

/// Sums amounts per calendar month, keyed by the first day of the month.
/// Only months present in the data appear.
pub fn monthly_totals(transactions: &[Transaction]) -> BTreeMap<NaiveDate, f64> {
    let mut totals = BTreeMap::new();
    for t in transactions {
        *totals.entry(month_start(t.date)).or_insert(0.0) += t.amount;
    }
    totals
}

/// Projects `config.horizon` future monthly totals with confidence bounds.
///
/// Any model-fit failure is reported as a structured error, never a panic;
/// an insufficient history is its own error naming the required and actual
/// bucket counts.
pub fn forecast_expenses(
    transactions: &[Transaction],
    config: &ForecastConfig,
) -> Result<ForecastReport> {
    if transactions.is_empty() {
        return Err(ExpenseInsightsError::NoData("forecasting".to_string()));
    }

    let totals = monthly_totals(transactions);
    if totals.len() < config.min_months {
        return Err(ExpenseInsightsError::InsufficientHistory {
            required: config.min_months,
            actual: totals.len(),
        });
    }
    info!(
        "Aggregated data into {} monthly periods for forecasting.",
        totals.len()
    );

    let (p, d, q) = config.order;
    if q != 0 {
        return Err(ExpenseInsightsError::ModelFit(format!(
            "moving-average order {} is not supported",
            q
        )));
    }
    if config.confidence <= 0.0 || config.confidence >= 1.0 {
        return Err(ExpenseInsightsError::ModelFit(format!(
            "confidence level {} is outside (0, 1)",
            config.confidence
        )));
    }

    let series: Vec<f64> = totals.values().copied().collect();
    let model = fit_ar_integrated(&series, p, d)?;
    info!("ARIMA model fitted successfully.");

    let predictions = model.forecast(&series, config.horizon);
    let standard_errors = model.forecast_standard_errors(config.horizon);
    let z = normal_quantile(0.5 + config.confidence / 2.0);

    let last_month = *totals
        .keys()
        .next_back()
        .ok_or_else(|| ExpenseInsightsError::NoData("forecasting".to_string()))?;

    let mut month = last_month;
    let forecast = predictions
        .iter()
        .zip(standard_errors.iter())
        .map(|(&predicted_amount, &se)| {
            month = next_month(month);
            ForecastPoint {
                month: format_year_month(month),
                predicted_amount,
                conf_int_lower: predicted_amount - z * se,
                conf_int_upper: predicted_amount + z * se,
            }
        })
        .collect();

    Ok(ForecastReport { forecast })
}

/// An AR(p) model on the `d`-times-differenced series, estimated by
/// conditional least squares with no intercept (no trend term under
/// differencing).
struct FittedModel {
    /// Coefficients of the level-form recursion, combining the AR polynomial
    /// with the differencing operator.
    level_coefficients: Vec<f64>,
    sigma2: f64,
}

fn fit_ar_integrated(series: &[f64], p: usize, d: usize) -> Result<FittedModel> {
    let mut differenced = series.to_vec();
    for _ in 0..d {
        differenced = differenced.windows(2).map(|w| w[1] - w[0]).collect();
    }

    let n = differenced.len();
    if n <= p || n - p < p {
        return Err(ExpenseInsightsError::ModelFit(format!(
            "{} differenced observations are too few to estimate {} autoregressive terms",
            n, p
        )));
    }

    // Normal equations for regressing w[t] on w[t-1..t-p].
    let rows = n - p;
    let mut xtx = vec![vec![0.0; p]; p];
    let mut xty = vec![0.0; p];
    for t in p..n {
        for i in 0..p {
            xty[i] += differenced[t - 1 - i] * differenced[t];
            for j in 0..p {
                xtx[i][j] += differenced[t - 1 - i] * differenced[t - 1 - j];
            }
        }
    }

    let phi = solve_linear_system(xtx, xty).ok_or_else(|| {
        ExpenseInsightsError::ModelFit(
            "normal equations are singular; the series has no usable variation".to_string(),
        )
    })?;

    // An explosive fitted polynomial is reported but not fatal; only a
    // numerical failure aborts the forecast.
    let coefficient_mass: f64 = phi.iter().map(|c| c.abs()).sum();
    if coefficient_mass >= 1.0 {
        warn!(
            "Fitted autoregressive polynomial may be non-stationary (|coefficients| sum to {:.3}); intervals can be unreliable.",
            coefficient_mass
        );
    }

    let mut sse = 0.0;
    for t in p..n {
        let mut predicted = 0.0;
        for (i, coefficient) in phi.iter().enumerate() {
            predicted += coefficient * differenced[t - 1 - i];
        }
        let residual = differenced[t] - predicted;
        sse += residual * residual;
    }
    let degrees_of_freedom = if rows > p { rows - p } else { 1 };
    let sigma2 = sse / degrees_of_freedom as f64;

    Ok(FittedModel {
        level_coefficients: level_form(&phi, d),
        sigma2,
    })
}

impl FittedModel {
    /// Iterates the level-form recursion forward, feeding forecasts back in
    /// as pseudo-observations.
    fn forecast(&self, series: &[f64], horizon: usize) -> Vec<f64> {
        let mut extended = series.to_vec();
        for _ in 0..horizon {
            let len = extended.len();
            let mut value = 0.0;
            for (i, coefficient) in self.level_coefficients.iter().enumerate() {
                value += coefficient * extended[len - 1 - i];
            }
            extended.push(value);
        }
        extended[series.len()..].to_vec()
    }

    /// Forecast-error standard deviations from the psi-weight recursion:
    /// `var(h) = sigma^2 * sum_{j<h} psi_j^2`.
    fn forecast_standard_errors(&self, horizon: usize) -> Vec<f64> {
        let order = self.level_coefficients.len();
        let mut psi = vec![1.0];
        for j in 1..horizon {
            let mut weight = 0.0;
            for i in 1..=j.min(order) {
                weight += self.level_coefficients[i - 1] * psi[j - i];
            }
            psi.push(weight);
        }

        let mut cumulative = 0.0;
        psi.iter()
            .map(|w| {
                cumulative += w * w;
                (self.sigma2 * cumulative).sqrt()
            })
            .collect()
    }
}

/// Expands `(1 - phi_1 B - ... - phi_p B^p)(1 - B)^d` and returns the
/// coefficients `a_i` of the equivalent level recursion
/// `z_t = a_1 z_{t-1} + ... + a_{p+d} z_{t-p-d} + e_t`.
fn level_form(phi: &[f64], d: usize) -> Vec<f64> {
    let mut polynomial = vec![1.0];
    polynomial.extend(phi.iter().map(|c| -c));

    for _ in 0..d {
        let mut expanded = vec![0.0; polynomial.len() + 1];
        for (i, &coefficient) in polynomial.iter().enumerate() {
            expanded[i] += coefficient;
            expanded[i + 1] -= coefficient;
        }
        polynomial = expanded;
    }

    polynomial.iter().skip(1).map(|c| -c).collect()
}

/// Gaussian elimination with partial pivoting; `None` when the system is
/// singular to working precision.
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for column in 0..n {
        let pivot_row = (column..n)
            .max_by(|&r1, &r2| {
                a[r1][column]
                    .abs()
                    .partial_cmp(&a[r2][column].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;
        if a[pivot_row][column].abs() < 1e-10 {
            return None;
        }
        a.swap(column, pivot_row);
        b.swap(column, pivot_row);

        for row in (column + 1)..n {
            let factor = a[row][column] / a[column][column];
            for k in column..n {
                a[row][k] -= factor * a[column][k];
            }
            b[row] -= factor * b[column];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut value = b[row];
        for k in (row + 1)..n {
            value -= a[row][k] * x[k];
        }
        x[row] = value / a[row][row];
    }
    Some(x)
}

/// Inverse standard-normal CDF (Acklam's rational approximation); accurate
/// to ~1e-9 over (0, 1), which is far below the interval widths involved.
fn normal_quantile(probability: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    let p = probability;
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}
