mod engine;
mod error;
mod histogram;
mod sampler;
mod types;

pub use engine::{
    MAX_AMORTIZATION_MONTHS, amortization_schedule, amortize, compare, effective_monthly_rate,
    equity_builder_win_rate, evaluate_equity_builder, evaluate_no_lvr, no_lvr_months,
    run_monte_carlo, summarize,
};
pub use error::{Result, SimulationError};
pub use histogram::{MAX_HISTOGRAM_BINS, histogram};
pub use sampler::ReturnSampler;
pub use types::{
    AmortizationMonth, AmortizationResult, Column, HistogramBin, Instrument, MAX_TRIAL_COUNT,
    ModelConstants, MonteCarloRun, ProfitSummary, ResultTable, SimulationParameters,
    StrategyComparison, StrategyOutcome, TrialRecord,
};
