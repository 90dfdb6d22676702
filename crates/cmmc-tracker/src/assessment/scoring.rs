//! SPRS (Supplier Performance Risk System) scoring.
//!
//! The score starts at 110 and loses points for every unmet control:
//!
//! | status                  | deduction            |
//! |-------------------------|----------------------|
//! | `implemented`           | 0                    |
//! | `partially_implemented` | half weight, rounded up |
//! | `planned`               | full weight          |
//! | `not_implemented`       | full weight          |
//! | `not_applicable`        | 0                    |
//! | `not_assessed`, unknown | 0                    |
//!
//! With the standard 1/3/5 weights the reachable range is -203 to 110. Nothing here
//! clamps to that range.

use serde::Serialize;

use super::domain::{Control, ImplementationStatus, StatusValue};

pub struct SprsCalculator;

impl SprsCalculator {
    pub const BASE_SCORE: i64 = 110;

    /// Score for the given controls. Input order does not matter.
    pub fn calculate(controls: &[Control]) -> i64 {
        let total_deduction: i64 = controls
            .iter()
            .map(|control| deduction(control.status(), control.weight()))
            .sum();
        Self::BASE_SCORE - total_deduction
    }

    /// Per-control explanation of [`SprsCalculator::calculate`], in input order.
    pub fn breakdown(controls: &[Control]) -> ScoreBreakdown {
        let rows: Vec<ControlDeduction> = controls
            .iter()
            .map(|control| {
                let status = control.status();
                let weight = control.weight();
                ControlDeduction {
                    control_number: control.control_number.clone(),
                    title: control.title.clone(),
                    status: status.as_str().to_string(),
                    weight,
                    deduction: deduction(status, weight),
                }
            })
            .collect();

        let total_deduction = rows.iter().map(|row| row.deduction).sum();

        ScoreBreakdown {
            base_score: Self::BASE_SCORE,
            total_deduction,
            sprs_score: Self::BASE_SCORE - total_deduction,
            controls: rows,
        }
    }
}

pub fn deduction(status: StatusValue<'_>, weight: i64) -> i64 {
    match status.known() {
        Some(ImplementationStatus::PartiallyImplemented) => ceil_half(weight),
        Some(ImplementationStatus::Planned | ImplementationStatus::NotImplemented) => weight,
        Some(
            ImplementationStatus::Implemented
            | ImplementationStatus::NotApplicable
            | ImplementationStatus::NotAssessed,
        )
        | None => 0,
    }
}

/// Integer ceiling of `weight / 2`, rounding toward positive infinity for any sign.
fn ceil_half(weight: i64) -> i64 {
    -(-weight).div_euclid(2)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlDeduction {
    pub control_number: String,
    pub title: String,
    pub status: String,
    pub weight: i64,
    pub deduction: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub base_score: i64,
    pub total_deduction: i64,
    pub sprs_score: i64,
    pub controls: Vec<ControlDeduction>,
}
