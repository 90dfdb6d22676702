use super::super::domain::{Control, ControlFamily, ImplementationStatus};
use super::views::FamilyHeatmapEntry;
use std::collections::HashMap;

const GREEN: &str = "#22c55e";
const AMBER: &str = "#f59e0b";
const RED: &str = "#ef4444";

#[derive(Debug, Default, Clone, Copy)]
struct FamilyTally {
    total: usize,
    implemented: usize,
}

pub(crate) fn family_heatmap(
    controls: &[Control],
    families: &[ControlFamily],
) -> Vec<FamilyHeatmapEntry> {
    let mut tallies: HashMap<&str, FamilyTally> = HashMap::new();
    for control in controls {
        let tally = tallies.entry(control.family_id.as_str()).or_default();
        tally.total += 1;
        if control.status().known() == Some(ImplementationStatus::Implemented) {
            tally.implemented += 1;
        }
    }

    let mut ordered: Vec<&ControlFamily> = families.iter().collect();
    ordered.sort_by_key(|family| family.sort_key());

    ordered
        .into_iter()
        .map(|family| {
            let tally = tallies
                .get(family.id.as_str())
                .copied()
                .unwrap_or_default();
            let percentage = implemented_percentage(tally.implemented, tally.total);
            FamilyHeatmapEntry {
                name: family.name.clone(),
                code: family.family_code.clone(),
                total: tally.total,
                implemented: tally.implemented,
                percentage,
                color: heat_color(percentage),
            }
        })
        .collect()
}

/// Whole-number share of implemented controls. Halves round to even, and the
/// quotient is taken in floating point before scaling, so 23 of 40 reads as 57.
fn implemented_percentage(implemented: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (implemented as f64 / total as f64 * 100.0).round_ties_even() as u32
}

fn heat_color(percentage: u32) -> &'static str {
    if percentage >= 80 {
        GREEN
    } else if percentage >= 50 {
        AMBER
    } else {
        RED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(id: &str, code: &str, sort_order: Option<i64>) -> ControlFamily {
        ControlFamily {
            id: id.to_string(),
            family_code: code.to_string(),
            name: format!("{code} family"),
            sort_order,
            ..ControlFamily::default()
        }
    }

    fn control(family_id: &str, status: &str) -> Control {
        Control {
            family_id: family_id.to_string(),
            implementation_status: Some(status.to_string()),
            ..Control::default()
        }
    }

    #[test]
    fn half_implemented_family_is_amber() {
        let families = [family("f-ac", "AC", Some(1))];
        let controls = [
            control("f-ac", "implemented"),
            control("f-ac", "not_implemented"),
        ];
        let heatmap = family_heatmap(&controls, &families);
        assert_eq!(heatmap.len(), 1);
        assert_eq!(heatmap[0].total, 2);
        assert_eq!(heatmap[0].implemented, 1);
        assert_eq!(heatmap[0].percentage, 50);
        assert_eq!(heatmap[0].color, AMBER);
    }

    #[test]
    fn empty_family_reads_zero_and_red() {
        let heatmap = family_heatmap(&[], &[family("f-pe", "PE", None)]);
        assert_eq!(heatmap[0].total, 0);
        assert_eq!(heatmap[0].percentage, 0);
        assert_eq!(heatmap[0].color, RED);
    }

    #[test]
    fn families_follow_sort_order_with_missing_as_zero() {
        let families = [
            family("f-sc", "SC", Some(3)),
            family("f-at", "AT", None),
            family("f-ac", "AC", Some(-1)),
            family("f-au", "AU", Some(0)),
        ];
        let codes: Vec<String> = family_heatmap(&[], &families)
            .into_iter()
            .map(|entry| entry.code)
            .collect();
        assert_eq!(codes, vec!["AC", "AT", "AU", "SC"]);
    }

    #[test]
    fn controls_outside_listed_families_are_ignored() {
        let controls = [control("f-orphan", "implemented")];
        let heatmap = family_heatmap(&controls, &[family("f-ac", "AC", Some(1))]);
        assert_eq!(heatmap[0].total, 0);
    }

    #[test]
    fn percentage_rounding_matches_float_half_even() {
        assert_eq!(implemented_percentage(5, 8), 62);
        assert_eq!(implemented_percentage(1, 8), 12);
        assert_eq!(implemented_percentage(23, 40), 57);
        assert_eq!(implemented_percentage(2, 3), 67);
        assert_eq!(implemented_percentage(4, 5), 80);
        assert_eq!(heat_color(80), GREEN);
        assert_eq!(heat_color(79), AMBER);
        assert_eq!(heat_color(49), RED);
    }
}
