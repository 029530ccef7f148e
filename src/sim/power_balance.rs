//! Single-bus power balance: grid exchange, curtailment, and unmet load.

use crate::config::GridConfig;
use crate::error::SimError;
use crate::sim::types::{GridLimits, RealizedFlow};

/// Resolves the realized flows at the bus for one step.
///
/// Stateless apart from its configured caps; identical inputs always produce
/// bit-identical outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyBalanceResolver {
    import_cap_kw: f64,
    export_cap_kw: f64,
    tolerance: f64,
}

impl EnergyBalanceResolver {
    /// Creates a resolver with the given grid caps and relative tolerance.
    pub fn new(grid: &GridConfig, tolerance: f64) -> Self {
        Self {
            import_cap_kw: grid.import_cap_kw,
            export_cap_kw: grid.export_cap_kw,
            tolerance,
        }
    }

    /// Maximum import power (kW).
    pub fn import_cap_kw(&self) -> f64 {
        self.import_cap_kw
    }

    /// Maximum export power (kW).
    pub fn export_cap_kw(&self) -> f64 {
        self.export_cap_kw
    }

    /// Import cap in force for one step once `limits` are applied (kW).
    pub fn effective_import_cap_kw(&self, limits: GridLimits) -> f64 {
        limits
            .import_kw
            .map_or(self.import_cap_kw, |kw| kw.min(self.import_cap_kw))
    }

    /// Export cap in force for one step once `limits` are applied (kW).
    pub fn effective_export_cap_kw(&self, limits: GridLimits) -> f64 {
        limits
            .export_kw
            .map_or(self.export_cap_kw, |kw| kw.min(self.export_cap_kw))
    }

    /// Largest charging power the bus can feed without shedding load (kW, >= 0).
    pub fn charge_headroom_kw(&self, generation_kw: f64, load_kw: f64, limits: GridLimits) -> f64 {
        (generation_kw + self.effective_import_cap_kw(limits) - load_kw).max(0.0)
    }

    /// Resolves flows using the configured caps.
    ///
    /// # Arguments
    ///
    /// * `generation_kw` - Generation available (kW, >= 0)
    /// * `load_kw` - Demand (kW, >= 0)
    /// * `storage_kw` - Realized storage power (kW; positive=charge, negative=discharge)
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvariantViolation` if the resulting flow does not
    /// balance within tolerance. The timestep in the error is 0; the engine
    /// rewrites it with the actual index.
    pub fn resolve(
        &self,
        generation_kw: f64,
        load_kw: f64,
        storage_kw: f64,
    ) -> Result<RealizedFlow, SimError> {
        self.resolve_with_limits(generation_kw, load_kw, storage_kw, GridLimits::default())
    }

    /// Resolves flows with per-step limits that can only tighten the caps.
    ///
    /// Surplus is exported up to the export cap and the rest is curtailed.
    /// A deficit is imported up to the import cap and the rest is unmet load.
    ///
    /// # Errors
    ///
    /// See [`EnergyBalanceResolver::resolve`].
    pub fn resolve_with_limits(
        &self,
        generation_kw: f64,
        load_kw: f64,
        storage_kw: f64,
        limits: GridLimits,
    ) -> Result<RealizedFlow, SimError> {
        let import_cap = self.effective_import_cap_kw(limits);
        let export_cap = self.effective_export_cap_kw(limits);

        let net_kw = generation_kw - load_kw - storage_kw;

        let mut flow = RealizedFlow {
            generation_kw,
            load_kw,
            storage_kw,
            grid_import_kw: 0.0,
            grid_export_kw: 0.0,
            curtailment_kw: 0.0,
            unmet_load_kw: 0.0,
        };

        if net_kw >= 0.0 {
            flow.grid_export_kw = net_kw.min(export_cap);
            flow.curtailment_kw = net_kw - flow.grid_export_kw;
        } else {
            let deficit_kw = -net_kw;
            flow.grid_import_kw = deficit_kw.min(import_cap);
            // Rounding can leave a sub-ulp excess; anything larger fails the check
            flow.unmet_load_kw = (deficit_kw - flow.grid_import_kw).min(load_kw);
        }

        self.check(&flow)?;
        Ok(flow)
    }

    /// Verifies conservation of `flow` against the relative tolerance.
    ///
    /// Negative flow components and unmet load above the load itself are
    /// violations too; both would let storage charge from nothing.
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvariantViolation` when the imbalance exceeds tolerance.
    pub fn check(&self, flow: &RealizedFlow) -> Result<(), SimError> {
        let tolerance_kw = self.tolerance * flow.scale_kw();
        let violation = |imbalance_kw: f64| SimError::InvariantViolation {
            timestep: 0,
            imbalance_kw,
            tolerance_kw,
        };

        for kw in [
            flow.grid_import_kw,
            flow.grid_export_kw,
            flow.curtailment_kw,
            flow.unmet_load_kw,
        ] {
            if kw < -tolerance_kw {
                return Err(violation(kw));
            }
        }
        let overshoot_kw = flow.unmet_load_kw - flow.load_kw;
        if overshoot_kw > tolerance_kw {
            return Err(violation(overshoot_kw));
        }

        let imbalance_kw = flow.imbalance_kw();
        // NaN imbalance must fail too
        if imbalance_kw.abs() <= tolerance_kw {
            Ok(())
        } else {
            Err(violation(imbalance_kw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(import_cap_kw: f64, export_cap_kw: f64) -> EnergyBalanceResolver {
        EnergyBalanceResolver::new(
            &GridConfig {
                import_cap_kw,
                export_cap_kw,
            },
            1e-9,
        )
    }

    #[test]
    fn surplus_is_exported() {
        let flow = resolver(50.0, 50.0).resolve(20.0, 5.0, 10.0).expect("balanced");
        assert_eq!(flow.grid_export_kw, 5.0);
        assert_eq!(flow.curtailment_kw, 0.0);
        assert_eq!(flow.grid_import_kw, 0.0);
        assert_eq!(flow.unmet_load_kw, 0.0);
    }

    #[test]
    fn surplus_beyond_export_cap_is_curtailed() {
        let flow = resolver(50.0, 2.0).resolve(12.0, 5.0, 0.0).expect("balanced");
        assert_eq!(flow.grid_export_kw, 2.0);
        assert_eq!(flow.curtailment_kw, 5.0);
    }

    #[test]
    fn deficit_is_imported() {
        let flow = resolver(50.0, 50.0).resolve(0.0, 10.0, 0.0).expect("balanced");
        assert_eq!(flow.grid_import_kw, 10.0);
        assert_eq!(flow.unmet_load_kw, 0.0);
    }

    #[test]
    fn deficit_beyond_import_cap_is_unmet() {
        let flow = resolver(4.0, 50.0).resolve(0.0, 10.0, 0.0).expect("balanced");
        assert_eq!(flow.grid_import_kw, 4.0);
        assert_eq!(flow.unmet_load_kw, 6.0);
    }

    #[test]
    fn discharge_covers_load() {
        let flow = resolver(0.0, 0.0).resolve(0.0, 3.0, -3.0).expect("balanced");
        assert_eq!(flow.grid_import_kw, 0.0);
        assert_eq!(flow.unmet_load_kw, 0.0);
        assert_eq!(flow.curtailment_kw, 0.0);
    }

    #[test]
    fn grid_charging_is_imported() {
        let flow = resolver(50.0, 50.0).resolve(0.0, 1.0, 4.0).expect("balanced");
        assert_eq!(flow.grid_import_kw, 5.0);
    }

    #[test]
    fn per_step_limits_only_tighten() {
        let r = resolver(10.0, 10.0);
        let tight = GridLimits {
            import_kw: None,
            export_kw: Some(0.0),
        };
        let flow = r.resolve_with_limits(8.0, 2.0, 0.0, tight).expect("balanced");
        assert_eq!(flow.grid_export_kw, 0.0);
        assert_eq!(flow.curtailment_kw, 6.0);

        let loose = GridLimits {
            import_kw: Some(100.0),
            export_kw: None,
        };
        let flow = r.resolve_with_limits(0.0, 30.0, 0.0, loose).expect("balanced");
        assert_eq!(flow.grid_import_kw, 10.0);
        assert_eq!(flow.unmet_load_kw, 20.0);
    }

    #[test]
    fn infinite_caps_never_curtail() {
        let flow = resolver(f64::INFINITY, f64::INFINITY)
            .resolve(1e6, 1.0, 0.0)
            .expect("balanced");
        assert_eq!(flow.curtailment_kw, 0.0);
        assert_eq!(flow.grid_export_kw, 1e6 - 1.0);
    }

    #[test]
    fn resolve_is_idempotent() {
        let r = resolver(7.3, 2.1);
        let a = r.resolve(3.141_592, 9.876_5, -1.234_5).ok();
        let b = r.resolve(3.141_592, 9.876_5, -1.234_5).ok();
        assert_eq!(
            a.map(|f| f.grid_import_kw.to_bits()),
            b.map(|f| f.grid_import_kw.to_bits())
        );
        assert_eq!(a, b);
    }

    #[test]
    fn check_rejects_unbalanced_flow() {
        let r = resolver(10.0, 10.0);
        let flow = RealizedFlow {
            generation_kw: 5.0,
            load_kw: 1.0,
            storage_kw: 0.0,
            grid_import_kw: 0.0,
            grid_export_kw: 3.0,
            curtailment_kw: 0.0,
            unmet_load_kw: 0.0,
        };
        assert!(matches!(
            r.check(&flow),
            Err(SimError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn check_rejects_unmet_beyond_load() {
        let r = resolver(0.0, 0.0);
        // Balanced on paper, but 20 kW of charging has no source
        let flow = RealizedFlow {
            generation_kw: 0.0,
            load_kw: 5.0,
            storage_kw: 20.0,
            grid_import_kw: 0.0,
            grid_export_kw: 0.0,
            curtailment_kw: 0.0,
            unmet_load_kw: 25.0,
        };
        assert!(flow.imbalance_kw().abs() < 1e-12);
        assert!(matches!(
            r.check(&flow),
            Err(SimError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn check_rejects_negative_components() {
        let r = resolver(10.0, 10.0);
        let flow = RealizedFlow {
            generation_kw: 5.0,
            load_kw: 1.0,
            storage_kw: 0.0,
            grid_import_kw: 0.0,
            grid_export_kw: 5.0,
            curtailment_kw: -1.0,
            unmet_load_kw: 0.0,
        };
        assert!(r.check(&flow).is_err());
    }

    #[test]
    fn uncovered_charge_request_fails_instead_of_shedding_load() {
        // Callers must clamp charging to the headroom first
        let r = resolver(0.0, 0.0);
        assert!(r.resolve(0.0, 5.0, 20.0).is_err());
        assert_eq!(r.charge_headroom_kw(0.0, 5.0, GridLimits::default()), 0.0);
    }

    #[test]
    fn charge_headroom_respects_step_limits() {
        let r = resolver(10.0, 10.0);
        assert_eq!(r.charge_headroom_kw(3.0, 5.0, GridLimits::default()), 8.0);
        let tight = GridLimits {
            import_kw: Some(4.0),
            export_kw: None,
        };
        assert_eq!(r.charge_headroom_kw(3.0, 5.0, tight), 2.0);
        assert_eq!(r.charge_headroom_kw(0.0, 20.0, tight), 0.0);
    }

    #[test]
    fn check_rejects_nan() {
        let r = resolver(10.0, 10.0);
        assert!(r.resolve(f64::NAN, 1.0, 0.0).is_err());
    }
}
