use serde::Serialize;

use super::domain::ProgressUpdate;
use super::RepairError;

pub const DEFAULT_HOURLY_RATE: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub labor_cost: f64,
    pub total_cost: f64,
}

/// `labor = hours * max(people, 1) * rate`; `total = labor + material + equipment`.
///
/// A crew of zero is billed as one person so logged hours are never free.
pub fn estimate(update: &ProgressUpdate, hourly_rate: f64) -> Result<CostBreakdown, RepairError> {
    check("hourly_rate", hourly_rate)?;
    check("hours_applied", update.hours_applied)?;
    check("filler_material_kg", update.filler_material_kg)?;
    check("material_cost", update.material_cost)?;
    check("equipment_cost", update.equipment_cost)?;

    let crew_size = f64::from(update.people_used.max(1));
    let labor_cost = update.hours_applied * crew_size * hourly_rate;
    Ok(CostBreakdown {
        labor_cost,
        total_cost: labor_cost + update.material_cost + update.equipment_cost,
    })
}

fn check(field: &'static str, value: f64) -> Result<(), RepairError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(RepairError::InvalidFigure { field, value })
    }
}
