use serde::{Deserialize, Serialize};
use crate::controls::ControlSnapshot;

pub const NORMAL_CRCL: f64 = 110.0; // mL/min (eGFR 100 + 10% overestimation)

/// Fraction of normal renal function, saturating at 1.
pub fn renal_function_fraction(crcl: f64, normal_crcl: f64) -> f64 {
    (crcl / normal_crcl).min(1.0)
}

/// Mean activity of both CYP2C9 alleles as a fraction (100% -> 1.0).
/// Both alleles weigh equally.
pub fn cyp2c9_activity_fraction(allele1_pct: f64, allele2_pct: f64) -> f64 {
    (allele1_pct + allele2_pct) / 2.0 / 100.0
}

/// Composite inputs derived from the controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedPhysiology {
    pub f_renal_function: f64,
    pub f_cyp2c9: f64,
}

impl DerivedPhysiology {
    pub fn from_controls(controls: &ControlSnapshot, normal_crcl: f64) -> Self {
        Self {
            f_renal_function: renal_function_fraction(controls.crcl_mlmin, normal_crcl),
            f_cyp2c9: cyp2c9_activity_fraction(
                controls.allele1_activity_pct,
                controls.allele2_activity_pct,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_renal_function_fraction() {
        assert_eq!(renal_function_fraction(220.0, NORMAL_CRCL), 1.0);
        assert_eq!(renal_function_fraction(55.0, NORMAL_CRCL), 0.5);
        assert_eq!(renal_function_fraction(110.0, NORMAL_CRCL), 1.0);
    }

    #[test]
    fn test_renal_function_monotonic() {
        let mut previous = 0.0;
        for crcl in (1..=150).map(f64::from) {
            let f = renal_function_fraction(crcl, NORMAL_CRCL);
            assert!(f >= previous);
            assert!((0.0..=1.0).contains(&f));
            previous = f;
        }
    }

    #[test]
    fn test_cyp2c9_activity_fraction() {
        assert_relative_eq!(cyp2c9_activity_fraction(100.0, 63.0), 0.815, epsilon = 1e-12);
        assert_eq!(cyp2c9_activity_fraction(150.0, 150.0), 1.5);
        assert_eq!(cyp2c9_activity_fraction(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_from_controls() {
        let controls = ControlSnapshot {
            crcl_mlmin: 55.0,
            allele1_activity_pct: 21.0,
            allele2_activity_pct: 21.0,
            ..ControlSnapshot::default()
        };
        let derived = DerivedPhysiology::from_controls(&controls, NORMAL_CRCL);
        assert_eq!(derived.f_renal_function, 0.5);
        assert_relative_eq!(derived.f_cyp2c9, 0.21, epsilon = 1e-12);
    }
}
