use rayon::prelude::*;
use tracing::{debug, info};

use super::error::{Result, SimulationError};
use super::sampler::{ReturnSampler, derive_seed};
use super::types::{
    AmortizationMonth, AmortizationResult, MonteCarloRun, ProfitSummary, ResultTable,
    SimulationParameters, StrategyComparison, StrategyOutcome, TrialRecord,
};

/// Longest repayment schedule accepted before a loan is treated as never clearing.
pub const MAX_AMORTIZATION_MONTHS: u32 = 1_200;

pub fn effective_monthly_rate(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / 12.0) - 1.0
}

/// Month-by-month repayment of `principal` at a fixed monthly repayment.
///
/// Once the outstanding balance falls below the repayment, the month is treated as
/// the closing payment: the balance is reduced by `repayment - balance` and no
/// interest is charged. A balance between half the repayment and the full
/// repayment therefore needs more than one closing month.
pub fn amortization_schedule(
    principal: f64,
    monthly_rate: f64,
    repayment_cap: f64,
) -> Result<Vec<AmortizationMonth>> {
    if !principal.is_finite() || principal <= 0.0 {
        return Err(SimulationError::invalid("principal", "must be a finite value > 0"));
    }
    if !repayment_cap.is_finite() || repayment_cap <= 0.0 {
        return Err(SimulationError::invalid("repayment_cap", "must be a finite value > 0"));
    }
    if !monthly_rate.is_finite() || monthly_rate < 0.0 {
        return Err(SimulationError::invalid("monthly_rate", "must be a finite value >= 0"));
    }

    let diverging = |months| SimulationError::DivergingAmortization {
        principal,
        monthly_rate,
        repayment_cap,
        months,
    };

    // Interest only falls as the balance falls, so the first interest-bearing month decides.
    if principal >= repayment_cap && repayment_cap <= principal * monthly_rate {
        return Err(diverging(0));
    }

    let mut schedule = Vec::new();
    let mut remaining = principal;
    let mut month = 0;
    while remaining > 0.0 {
        if month == MAX_AMORTIZATION_MONTHS {
            return Err(diverging(month));
        }
        month += 1;

        let (interest, principal_paid) = if remaining < repayment_cap {
            (0.0, repayment_cap - remaining)
        } else {
            let interest = remaining * monthly_rate;
            (interest, repayment_cap - interest)
        };
        let opening_balance = remaining;
        remaining -= principal_paid;

        schedule.push(AmortizationMonth {
            month,
            opening_balance,
            interest,
            principal_paid,
            closing_balance: remaining,
        });
    }

    Ok(schedule)
}

pub fn amortize(
    principal: f64,
    monthly_rate: f64,
    repayment_cap: f64,
) -> Result<AmortizationResult> {
    let schedule = amortization_schedule(principal, monthly_rate, repayment_cap)?;
    let result = AmortizationResult {
        months: schedule.len() as u32,
        interest_paid: schedule.iter().map(|m| m.interest).sum(),
    };
    debug!(
        principal,
        monthly_rate,
        repayment_cap,
        months = result.months,
        interest_paid = result.interest_paid,
        "amortization computed"
    );
    Ok(result)
}

fn amortize_params(params: &SimulationParameters) -> Result<AmortizationResult> {
    amortize(
        params.invested_amount(),
        params.monthly_rate(),
        params.max_monthly_investment(),
    )
}

/// Months needed to stage the full amount at the monthly cap.
pub fn no_lvr_months(params: &SimulationParameters) -> Result<u32> {
    let months = (params.invested_amount() / params.max_monthly_investment()).ceil();
    if months > MAX_AMORTIZATION_MONTHS as f64 {
        return Err(SimulationError::invalid(
            "max_monthly_investment",
            format!(
                "staging {} at {} a month takes {months} months, over the {MAX_AMORTIZATION_MONTHS}-month limit",
                params.invested_amount(),
                params.max_monthly_investment()
            ),
        ));
    }
    Ok(months as u32)
}

pub fn compare(
    params: &SimulationParameters,
    sampler: &mut ReturnSampler,
) -> Result<StrategyComparison> {
    let no_lvr = no_lvr_months(params)?;
    let schedule = amortize_params(params)?;
    let horizon = schedule.months.max(no_lvr);
    Ok(compare_with_schedule(params, schedule, horizon, sampler))
}

fn compare_with_schedule(
    params: &SimulationParameters,
    schedule: AmortizationResult,
    horizon: u32,
    sampler: &mut ReturnSampler,
) -> StrategyComparison {
    let returns = sampler.sample_returns(horizon);

    StrategyComparison {
        months: horizon,
        profit_equity_builder: equity_builder_profit(
            &returns,
            params.invested_amount(),
            schedule.interest_paid,
        ),
        profit_no_lvr: no_lvr_profit(&returns, params.invested_amount()),
        returns,
    }
}

/// Equity Builder over its own repayment period.
pub fn evaluate_equity_builder(
    params: &SimulationParameters,
    sampler: &mut ReturnSampler,
) -> Result<StrategyOutcome> {
    let schedule = amortize_params(params)?;
    let returns = sampler.sample_returns(schedule.months);
    Ok(StrategyOutcome {
        months: schedule.months,
        profit: equity_builder_profit(&returns, params.invested_amount(), schedule.interest_paid),
    })
}

/// No-LVR over its own staging period.
pub fn evaluate_no_lvr(
    params: &SimulationParameters,
    sampler: &mut ReturnSampler,
) -> Result<StrategyOutcome> {
    let months = no_lvr_months(params)?;
    let returns = sampler.sample_returns(months);
    Ok(StrategyOutcome {
        months,
        profit: no_lvr_profit(&returns, params.invested_amount()),
    })
}

fn equity_builder_profit(returns: &[f64], invested: f64, interest_paid: f64) -> f64 {
    returns.iter().map(|r| r * invested).sum::<f64>() - interest_paid
}

// Month m's return is weighted by m as a stand-in for capital staged over m months;
// this approximates exposure rather than compounding it.
fn no_lvr_profit(returns: &[f64], invested: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let weighted: f64 = returns
        .iter()
        .enumerate()
        .map(|(idx, r)| r * (idx + 1) as f64)
        .sum();
    (invested / returns.len() as f64) * weighted
}

pub fn run_monte_carlo(params: &SimulationParameters) -> Result<MonteCarloRun> {
    let no_lvr_months = no_lvr_months(params)?;
    let amortization = amortize_params(params)?;
    let horizon_months = amortization.months.max(no_lvr_months);
    info!(
        trials = params.trial_count(),
        horizon = horizon_months,
        seed = params.seed(),
        "starting monte carlo run"
    );

    let records = (0..params.trial_count())
        .into_par_iter()
        .map(|trial| -> Result<TrialRecord> {
            let mut sampler =
                ReturnSampler::new(params.constants(), derive_seed(params.seed(), trial))?;
            let comparison =
                compare_with_schedule(params, amortization, horizon_months, &mut sampler);
            Ok(TrialRecord {
                trial,
                invested: params.invested_amount(),
                equity_builder_profit: comparison.profit_equity_builder,
                no_lvr_profit: comparison.profit_no_lvr,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(rows = records.len(), "monte carlo run finished");
    Ok(MonteCarloRun {
        amortization,
        no_lvr_months,
        horizon_months,
        table: ResultTable::from_records(records),
    })
}

pub fn summarize(values: &[f64]) -> Option<ProfitSummary> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    let median = percentile(&mut sorted, 50.0);
    Some(ProfitSummary {
        mean,
        median,
        p10: percentile(&mut sorted, 10.0),
        p90: percentile(&mut sorted, 90.0),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
    })
}

/// Share of trials where Equity Builder beat No-LVR.
pub fn equity_builder_win_rate(table: &ResultTable) -> f64 {
    if table.is_empty() {
        return 0.0;
    }
    let wins = table
        .records()
        .iter()
        .filter(|r| r.equity_builder_profit > r.no_lvr_profit)
        .count();
    wins as f64 / table.len() as f64
}

fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}
