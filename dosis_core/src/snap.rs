//! Syringe graduation rounding.
//!
//! Volumes are always floored to the graduation of the smallest standard
//! syringe that holds them: giving slightly less is preferred over giving
//! slightly more.

use serde::Serialize;

/// A standard syringe size and its smallest graduation
#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct SyringeTier {
    pub capacity_ml: f64,
    pub step_ml: f64,
    pub label: &'static str,
}

/// Ascending by capacity
pub const SYRINGE_TIERS: [SyringeTier; 5] = [
    SyringeTier { capacity_ml: 1.0, step_ml: 0.05, label: "1 mL" },
    SyringeTier { capacity_ml: 3.0, step_ml: 0.1, label: "3 mL" },
    SyringeTier { capacity_ml: 5.0, step_ml: 0.2, label: "5 mL" },
    SyringeTier { capacity_ml: 10.0, step_ml: 0.5, label: "10 mL" },
    SyringeTier { capacity_ml: 20.0, step_ml: 1.0, label: "20 mL" },
];

// Absorbs binary representation error in v / step (e.g. 0.3 / 0.05).
const STEP_EPSILON: f64 = 1e-9;

/// Smallest syringe that holds `volume_ml`, else the largest one
pub fn syringe_for(volume_ml: f64) -> SyringeTier {
    if !volume_ml.is_finite() || volume_ml <= 0.0 {
        return SYRINGE_TIERS[0];
    }
    SYRINGE_TIERS
        .iter()
        .copied()
        .find(|tier| volume_ml <= tier.capacity_ml)
        .unwrap_or(SYRINGE_TIERS[SYRINGE_TIERS.len() - 1])
}

/// Floor a volume to a real syringe graduation
///
/// Never returns more than `volume_ml`. A positive volume smaller than one
/// graduation keeps its own value (truncated to 0.001 mL) instead of
/// collapsing to zero; `SnapInfo::below_graduation` flags that case.
/// Non-positive or non-finite input yields 0.
pub fn snap(volume_ml: f64) -> f64 {
    if !volume_ml.is_finite() || volume_ml <= 0.0 {
        return 0.0;
    }

    let tier = syringe_for(volume_ml);
    let steps = (volume_ml / tier.step_ml + STEP_EPSILON).floor();
    let mut snapped = round_ml(steps * tier.step_ml);
    if snapped > volume_ml {
        snapped = round_ml((steps - 1.0) * tier.step_ml);
    }

    if snapped > 0.0 {
        snapped
    } else {
        below_graduation(volume_ml)
    }
}

fn below_graduation(volume_ml: f64) -> f64 {
    let truncated = (volume_ml * 1000.0).floor() / 1000.0;
    if truncated > 0.0 && truncated <= volume_ml {
        truncated
    } else {
        volume_ml
    }
}

fn round_ml(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Rounding diagnostics for display and audit
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SnapInfo {
    pub original: f64,
    pub snapped: f64,
    pub tier: SyringeTier,
    pub percent_difference: f64,
    pub was_rounded: bool,
    pub below_graduation: bool,
}

pub fn snap_info(volume_ml: f64) -> SnapInfo {
    if !volume_ml.is_finite() || volume_ml <= 0.0 {
        return SnapInfo {
            original: 0.0,
            snapped: 0.0,
            tier: SYRINGE_TIERS[0],
            percent_difference: 0.0,
            was_rounded: false,
            below_graduation: false,
        };
    }

    let tier = syringe_for(volume_ml);
    let snapped = snap(volume_ml);
    let diff = volume_ml - snapped;
    let percent = (diff / volume_ml * 100.0 * 10.0).round() / 10.0;

    SnapInfo {
        original: round_ml(volume_ml),
        snapped,
        tier,
        percent_difference: percent,
        was_rounded: diff > 0.001,
        below_graduation: volume_ml < tier.step_ml,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floors_to_tier_step() {
        // 3 mL syringe, 0.1 mL marks
        assert_eq!(snap(2.37), 2.3);
        assert_eq!(snap(0.73), 0.7);
        assert_eq!(snap(4.5), 4.4);
        assert_eq!(snap(7.9), 7.5);
        assert_eq!(snap(14.6), 14.0);
    }

    #[test]
    fn test_exact_graduations_survive_float_error() {
        assert_eq!(snap(0.3), 0.3);
        assert_eq!(snap(1.0), 1.0);
        assert_eq!(snap(2.1), 2.1);
        assert_eq!(snap(0.45), 0.45);
    }

    #[test]
    fn test_tier_selection() {
        assert_eq!(syringe_for(0.5).capacity_ml, 1.0);
        assert_eq!(syringe_for(1.0).capacity_ml, 1.0);
        assert_eq!(syringe_for(1.01).capacity_ml, 3.0);
        assert_eq!(syringe_for(25.0).capacity_ml, 20.0);
    }

    #[test]
    fn test_above_largest_syringe_uses_last_tier() {
        assert_eq!(snap(25.7), 25.0);
    }

    #[test]
    fn test_non_positive_is_zero() {
        assert_eq!(snap(0.0), 0.0);
        assert_eq!(snap(-1.0), 0.0);
        assert_eq!(snap(f64::NAN), 0.0);
    }

    #[test]
    fn test_never_exceeds_and_never_zero() {
        let mut v = 0.001;
        while v < 30.0 {
            let s = snap(v);
            assert!(s <= v, "snap({}) = {} exceeds input", v, s);
            assert!(s > 0.0, "snap({}) collapsed to zero", v);
            v += 0.007;
        }
    }

    #[test]
    fn test_tiny_volume_keeps_its_value() {
        assert_eq!(snap(0.03), 0.03);
        let info = snap_info(0.03);
        assert!(info.below_graduation);
        assert!(!info.was_rounded);
    }

    #[test]
    fn test_snap_info() {
        let info = snap_info(2.37);
        assert_eq!(info.snapped, 2.3);
        assert_eq!(info.tier.step_ml, 0.1);
        assert!(info.was_rounded);
        assert_eq!(info.percent_difference, 3.0);

        let exact = snap_info(1.5);
        assert!(!exact.was_rounded);
        assert_eq!(exact.percent_difference, 0.0);
    }
}
