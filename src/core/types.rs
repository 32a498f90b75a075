use serde::Serialize;

use super::error::{Result, SimulationError};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Instrument {
    EquityBuilder,
    NoLvr,
}

impl Instrument {
    pub const ALL: [Instrument; 2] = [Instrument::EquityBuilder, Instrument::NoLvr];

    pub fn title(self) -> &'static str {
        match self {
            Instrument::EquityBuilder => "Equity Builder",
            Instrument::NoLvr => "No LVR",
        }
    }

    pub fn column(self) -> Column {
        match self {
            Instrument::EquityBuilder => Column::EquityBuilderProfit,
            Instrument::NoLvr => Column::NoLvrProfit,
        }
    }
}

/// Fixed distribution of monthly returns.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConstants {
    pub mean_monthly_return: f64,
    pub monthly_return_volatility: f64,
}

impl Default for ModelConstants {
    fn default() -> Self {
        Self {
            mean_monthly_return: 0.07 / 12.0,
            monthly_return_volatility: 1.1689_f64.powf(1.0 / 12.0) - 1.0,
        }
    }
}

/// Upper bound on trials in one run; each trial keeps a row in the result table.
pub const MAX_TRIAL_COUNT: u32 = 1_000_000;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    annual_rate: f64,
    monthly_rate: f64,
    invested_amount: f64,
    max_monthly_investment: f64,
    trial_count: u32,
    seed: u64,
    #[serde(skip)]
    constants: ModelConstants,
}

impl SimulationParameters {
    /// Validates the four model assumptions and derives the monthly rate.
    pub fn new(
        annual_rate: f64,
        invested_amount: f64,
        max_monthly_investment: f64,
        trial_count: u32,
        seed: u64,
    ) -> Result<Self> {
        require_positive("annual_rate", annual_rate)?;
        require_positive("invested_amount", invested_amount)?;
        require_positive("max_monthly_investment", max_monthly_investment)?;
        if trial_count == 0 {
            return Err(SimulationError::invalid("trial_count", "must be >= 1"));
        }
        if trial_count > MAX_TRIAL_COUNT {
            return Err(SimulationError::invalid(
                "trial_count",
                format!("must be <= {MAX_TRIAL_COUNT}"),
            ));
        }

        Ok(Self {
            annual_rate,
            monthly_rate: super::engine::effective_monthly_rate(annual_rate),
            invested_amount,
            max_monthly_investment,
            trial_count,
            seed,
            constants: ModelConstants::default(),
        })
    }

    pub fn annual_rate(&self) -> f64 {
        self.annual_rate
    }

    pub fn monthly_rate(&self) -> f64 {
        self.monthly_rate
    }

    pub fn invested_amount(&self) -> f64 {
        self.invested_amount
    }

    pub fn max_monthly_investment(&self) -> f64 {
        self.max_monthly_investment
    }

    pub fn trial_count(&self) -> u32 {
        self.trial_count
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn constants(&self) -> ModelConstants {
        self.constants
    }
}

#[cfg(test)]
impl SimulationParameters {
    pub(crate) fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub(crate) fn with_constants(mut self, constants: ModelConstants) -> Self {
        self.constants = constants;
        self
    }
}

fn require_positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SimulationError::invalid(
            name,
            format!("must be a finite value > 0, got {value}"),
        ));
    }
    Ok(())
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationResult {
    pub months: u32,
    pub interest_paid: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationMonth {
    pub month: u32,
    pub opening_balance: f64,
    pub interest: f64,
    pub principal_paid: f64,
    pub closing_balance: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StrategyComparison {
    pub months: u32,
    pub returns: Vec<f64>,
    pub profit_equity_builder: f64,
    pub profit_no_lvr: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOutcome {
    pub months: u32,
    pub profit: f64,
}

/// One row of the result table, serialized under its column names.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct TrialRecord {
    #[serde(rename = "Trial")]
    pub trial: u32,
    #[serde(rename = "Invested")]
    pub invested: f64,
    #[serde(rename = "EquityBuilderProfit")]
    pub equity_builder_profit: f64,
    #[serde(rename = "NoLVRProfit")]
    pub no_lvr_profit: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Column {
    Invested,
    EquityBuilderProfit,
    NoLvrProfit,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Invested => "Invested",
            Column::EquityBuilderProfit => "EquityBuilderProfit",
            Column::NoLvrProfit => "NoLVRProfit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            Column::Invested,
            Column::EquityBuilderProfit,
            Column::NoLvrProfit,
        ]
        .into_iter()
        .find(|column| column.name() == name)
    }

    fn read(self, record: &TrialRecord) -> f64 {
        match self {
            Column::Invested => record.invested,
            Column::EquityBuilderProfit => record.equity_builder_profit,
            Column::NoLvrProfit => record.no_lvr_profit,
        }
    }
}

/// Trial outcomes in trial order. Only the driver builds one.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultTable {
    records: Vec<TrialRecord>,
}

impl ResultTable {
    pub(crate) fn from_records(records: Vec<TrialRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrialRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn column(&self, column: Column) -> Vec<f64> {
        self.records.iter().map(|r| column.read(r)).collect()
    }

    pub fn column_by_name(&self, name: &str) -> Option<Vec<f64>> {
        Column::from_name(name).map(|column| self.column(column))
    }
}

/// Output of one Monte Carlo run together with the schedule it was priced against.
#[derive(Clone, Debug, PartialEq)]
pub struct MonteCarloRun {
    pub amortization: AmortizationResult,
    pub no_lvr_months: u32,
    pub horizon_months: u32,
    pub table: ResultTable,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistogramBin {
    pub count: u32,
    pub left: f64,
    pub right: f64,
    pub label: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitSummary {
    pub mean: f64,
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
    pub min: f64,
    pub max: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(trial: u32, eb: f64, nl: f64) -> TrialRecord {
        TrialRecord {
            trial,
            invested: 10_000.0,
            equity_builder_profit: eb,
            no_lvr_profit: nl,
        }
    }

    #[test]
    fn parameters_derive_monthly_rate() {
        let params = SimulationParameters::new(0.039, 10_000.0, 3_000.0, 10, 1).expect("valid");
        assert!((params.monthly_rate() - (1.039_f64.powf(1.0 / 12.0) - 1.0)).abs() < 1e-15);
        assert_eq!(params.constants(), ModelConstants::default());
        assert_eq!(params.trial_count(), 10);
    }

    #[test]
    fn parameters_accept_the_trial_ceiling() {
        let params = SimulationParameters::new(0.039, 10_000.0, 3_000.0, MAX_TRIAL_COUNT, 1)
            .expect("ceiling is inclusive");
        assert_eq!(params.trial_count(), MAX_TRIAL_COUNT);
    }

    #[test]
    fn parameters_reject_non_positive_values() {
        for (rate, amount, cap, trials, field) in [
            (0.0, 10_000.0, 3_000.0, 10, "annual_rate"),
            (-0.1, 10_000.0, 3_000.0, 10, "annual_rate"),
            (0.039, 0.0, 3_000.0, 10, "invested_amount"),
            (0.039, 10_000.0, -5.0, 10, "max_monthly_investment"),
            (0.039, 10_000.0, f64::NAN, 10, "max_monthly_investment"),
            (0.039, 10_000.0, 3_000.0, 0, "trial_count"),
            (0.039, 10_000.0, 3_000.0, MAX_TRIAL_COUNT + 1, "trial_count"),
            (0.039, 10_000.0, 3_000.0, u32::MAX, "trial_count"),
        ] {
            match SimulationParameters::new(rate, amount, cap, trials, 1) {
                Err(SimulationError::InvalidParameter { name, .. }) => assert_eq!(name, field),
                other => panic!("expected InvalidParameter({field}), got {other:?}"),
            }
        }
    }

    #[test]
    fn result_table_columns_are_addressable_by_name() {
        let table = ResultTable::from_records(vec![record(0, 1.0, 2.0), record(1, 3.0, 4.0)]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1).map(|r| r.trial), Some(1));
        assert_eq!(table.column_by_name("EquityBuilderProfit"), Some(vec![1.0, 3.0]));
        assert_eq!(table.column_by_name("NoLVRProfit"), Some(vec![2.0, 4.0]));
        assert_eq!(table.column_by_name("Invested"), Some(vec![10_000.0, 10_000.0]));
        assert_eq!(table.column_by_name("Equity_Builder"), None);
    }

    #[test]
    fn trial_record_serializes_with_column_names() {
        let json = serde_json::to_string(&record(0, 1.5, 2.5)).expect("serializes");
        assert_eq!(
            json,
            r#"{"Trial":0,"Invested":10000.0,"EquityBuilderProfit":1.5,"NoLVRProfit":2.5}"#
        );
        for column in [
            Column::Invested,
            Column::EquityBuilderProfit,
            Column::NoLvrProfit,
        ] {
            assert!(json.contains(&format!("\"{}\"", column.name())));
        }
    }
}
