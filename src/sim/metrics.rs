//! Run metrics: incremental collection and post-hoc recomputation.

use std::fmt;

use serde::Serialize;

use super::run::SimulationRun;
use super::types::StepRecord;

/// Aggregate indicators for one run.
///
/// A pure projection of the step records plus the storage capacity;
/// [`MetricsSummary::from_run`] and the incremental [`MetricsCollector`]
/// produce the same values for the same run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    /// Number of completed steps.
    pub steps: usize,
    /// Total demand (kWh).
    pub total_load_kwh: f64,
    /// Total generation available (kWh).
    pub total_generation_kwh: f64,
    /// Share of load served without grid import; `None` if there was no load.
    pub self_sufficiency: Option<f64>,
    /// Demand that could not be served (kWh).
    pub unmet_load_kwh: f64,
    /// Generation that was spilled (kWh).
    pub curtailment_kwh: f64,
    /// Energy imported from the grid (kWh).
    pub grid_import_kwh: f64,
    /// Energy exported to the grid (kWh).
    pub grid_export_kwh: f64,
    /// Energy into the storage terminals (kWh).
    pub storage_charge_kwh: f64,
    /// Energy out of the storage terminals (kWh).
    pub storage_discharge_kwh: f64,
    /// Equivalent full cycles (terminal throughput / 2*capacity).
    pub storage_cycles: f64,
    /// Net grid cost over priced steps; `None` if no step had a price.
    pub energy_cost: Option<f64>,
    /// Peak import power (kW).
    pub peak_import_kw: f64,
    /// Peak export power (kW).
    pub peak_export_kw: f64,
    /// Lowest post-step SOC (kWh); `None` for an empty run.
    pub min_soc_kwh: Option<f64>,
    /// Highest post-step SOC (kWh); `None` for an empty run.
    pub max_soc_kwh: Option<f64>,
    /// Number of steps with any unmet load.
    pub unmet_load_steps: usize,
}

impl MetricsSummary {
    /// Recomputes every metric from a complete (or partial) run.
    ///
    /// # Arguments
    ///
    /// * `run` - Step records, in order
    /// * `capacity_kwh` - Storage capacity for the cycle count
    pub fn from_run(run: &SimulationRun, capacity_kwh: f64) -> Self {
        let mut collector = MetricsCollector::new(capacity_kwh);
        for record in run.iter() {
            collector.record(record);
        }
        collector.summary()
    }
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Metrics ---")?;
        writeln!(f, "Steps:                 {}", self.steps)?;
        writeln!(f, "Load:                  {:.2} kWh", self.total_load_kwh)?;
        writeln!(f, "Generation:            {:.2} kWh", self.total_generation_kwh)?;
        match self.self_sufficiency {
            Some(ratio) => writeln!(f, "Self-sufficiency:      {:.1}%", ratio * 100.0)?,
            None => writeln!(f, "Self-sufficiency:      n/a")?,
        }
        writeln!(
            f,
            "Unmet load:            {:.2} kWh ({} steps)",
            self.unmet_load_kwh, self.unmet_load_steps
        )?;
        writeln!(f, "Curtailment:           {:.2} kWh", self.curtailment_kwh)?;
        writeln!(
            f,
            "Grid import/export:    {:.2} / {:.2} kWh (peak {:.2} / {:.2} kW)",
            self.grid_import_kwh, self.grid_export_kwh, self.peak_import_kw, self.peak_export_kw
        )?;
        writeln!(
            f,
            "Storage charge/disch.: {:.2} / {:.2} kWh ({:.2} equiv. cycles)",
            self.storage_charge_kwh, self.storage_discharge_kwh, self.storage_cycles
        )?;
        if let (Some(lo), Some(hi)) = (self.min_soc_kwh, self.max_soc_kwh) {
            writeln!(f, "SOC range:             {lo:.2} .. {hi:.2} kWh")?;
        }
        match self.energy_cost {
            Some(cost) => write!(f, "Energy cost:           {cost:.2}"),
            None => write!(f, "Energy cost:           n/a"),
        }
    }
}

/// Incremental accumulator fed one [`StepRecord`] at a time.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    capacity_kwh: f64,
    steps: usize,
    load_kwh: f64,
    generation_kwh: f64,
    local_served_kwh: f64,
    unmet_kwh: f64,
    curtailment_kwh: f64,
    import_kwh: f64,
    export_kwh: f64,
    charge_kwh: f64,
    discharge_kwh: f64,
    cost: Option<f64>,
    peak_import_kw: f64,
    peak_export_kw: f64,
    min_soc_kwh: Option<f64>,
    max_soc_kwh: Option<f64>,
    unmet_steps: usize,
}

impl MetricsCollector {
    /// Creates an empty collector for storage of the given capacity.
    pub fn new(capacity_kwh: f64) -> Self {
        Self {
            capacity_kwh,
            steps: 0,
            load_kwh: 0.0,
            generation_kwh: 0.0,
            local_served_kwh: 0.0,
            unmet_kwh: 0.0,
            curtailment_kwh: 0.0,
            import_kwh: 0.0,
            export_kwh: 0.0,
            charge_kwh: 0.0,
            discharge_kwh: 0.0,
            cost: None,
            peak_import_kw: 0.0,
            peak_export_kw: 0.0,
            min_soc_kwh: None,
            max_soc_kwh: None,
            unmet_steps: 0,
        }
    }

    /// Folds one step into the totals.
    pub fn record(&mut self, record: &StepRecord) {
        let t = &record.timestep;
        let flow = &record.flow;

        self.steps += 1;
        self.load_kwh += t.energy_kwh(flow.load_kw);
        self.generation_kwh += t.energy_kwh(flow.generation_kw);
        self.local_served_kwh +=
            t.energy_kwh((flow.served_load_kw() - flow.grid_import_kw).max(0.0));
        self.unmet_kwh += t.energy_kwh(flow.unmet_load_kw);
        self.curtailment_kwh += t.energy_kwh(flow.curtailment_kw);
        self.import_kwh += t.energy_kwh(flow.grid_import_kw);
        self.export_kwh += t.energy_kwh(flow.grid_export_kw);
        self.charge_kwh += t.energy_kwh(flow.storage_charge_kw());
        self.discharge_kwh += t.energy_kwh(flow.storage_discharge_kw());

        if let Some(price) = record.sample.price {
            let step_cost = t.energy_kwh(flow.net_grid_kw()) * price;
            self.cost = Some(self.cost.unwrap_or(0.0) + step_cost);
        }

        self.peak_import_kw = self.peak_import_kw.max(flow.grid_import_kw);
        self.peak_export_kw = self.peak_export_kw.max(flow.grid_export_kw);

        let soc = record.storage.soc_kwh;
        self.min_soc_kwh = Some(self.min_soc_kwh.map_or(soc, |m| m.min(soc)));
        self.max_soc_kwh = Some(self.max_soc_kwh.map_or(soc, |m| m.max(soc)));

        if flow.unmet_load_kw > 0.0 {
            self.unmet_steps += 1;
        }
    }

    /// Number of steps recorded so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Snapshot of the metrics so far.
    pub fn summary(&self) -> MetricsSummary {
        let self_sufficiency = if self.load_kwh > 0.0 {
            Some(self.local_served_kwh / self.load_kwh)
        } else {
            None
        };
        let storage_cycles = if self.capacity_kwh > 0.0 {
            (self.charge_kwh + self.discharge_kwh) / (2.0 * self.capacity_kwh)
        } else {
            0.0
        };

        MetricsSummary {
            steps: self.steps,
            total_load_kwh: self.load_kwh,
            total_generation_kwh: self.generation_kwh,
            self_sufficiency,
            unmet_load_kwh: self.unmet_kwh,
            curtailment_kwh: self.curtailment_kwh,
            grid_import_kwh: self.import_kwh,
            grid_export_kwh: self.export_kwh,
            storage_charge_kwh: self.charge_kwh,
            storage_discharge_kwh: self.discharge_kwh,
            storage_cycles,
            energy_cost: self.cost,
            peak_import_kw: self.peak_import_kw,
            peak_export_kw: self.peak_export_kw,
            min_soc_kwh: self.min_soc_kwh,
            max_soc_kwh: self.max_soc_kwh,
            unmet_load_steps: self.unmet_steps,
        }
    }
}
