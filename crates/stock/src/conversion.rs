//! Kilogram <-> unit conversions.
//!
//! A unit's weight is modelled as normally distributed with mean `avg_kg` and
//! standard deviation `sd_kg`. Conversions use the pessimistic weight
//! `(avg + z·sd)·(1 + shrinkage)` so that a unit count derived from kilograms
//! can always be covered, and so that a unit-based reservation never takes
//! less than the kilograms those units may weigh.

/// Round a kilogram amount to whole grams.
pub fn round_kg(kg: f64) -> f64 {
    (kg * 1000.0).round() / 1000.0
}

/// Whole grams in a kilogram amount that is already gram-aligned.
pub fn kg_to_grams(kg: f64) -> i64 {
    (kg * 1000.0).round() as i64
}

pub fn grams_to_kg(grams: i64) -> f64 {
    grams as f64 / 1000.0
}

/// Signed whole-gram amount a kilogram request moves.
///
/// The magnitude always rounds *up* to the next gram, in both directions: a
/// reservation never takes less than asked for, a non-zero request never
/// moves nothing, and a release of `x` returns exactly what a reservation of
/// `x` took.
pub fn delta_kg_to_grams(delta_kg: f64) -> i64 {
    let grams = snap(delta_kg.abs() * 1000.0).ceil() as i64;
    if delta_kg < 0.0 { -grams } else { grams }
}

/// Remove accumulated float noise before a directional (ceil/floor) rounding.
fn snap(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative_or_zero(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// Worst-case weight of one unit, including handling loss.
///
/// Negative or non-finite `sd_kg`, `z_score` and `shrinkage_pct` count as 0:
/// they could only make the weight (and therefore the estimate) optimistic.
pub fn effective_unit_weight_kg(avg_kg: f64, sd_kg: f64, z_score: f64, shrinkage_pct: f64) -> f64 {
    let margin = non_negative_or_zero(z_score) * non_negative_or_zero(sd_kg);
    (avg_kg + margin) * (1.0 + non_negative_or_zero(shrinkage_pct))
}

/// Units that `available_kg` can cover under worst-case unit weight, floored
/// to a multiple of `bundle_size`.
///
/// Returns 0 when `available_kg` or `avg_kg` is not positive.
pub fn conservative_units_from_kg(
    available_kg: f64,
    avg_kg: f64,
    sd_kg: f64,
    z_score: f64,
    shrinkage_pct: f64,
    bundle_size: u32,
) -> u64 {
    if !positive(available_kg) || !positive(avg_kg) {
        return 0;
    }
    let effective = effective_unit_weight_kg(avg_kg, sd_kg, z_score, shrinkage_pct);
    if !positive(effective) {
        return 0;
    }

    let units = (available_kg / effective).floor() as u64;
    let bundle = u64::from(bundle_size.max(1));
    units / bundle * bundle
}

/// Signed kilogram delta for a signed unit delta.
///
/// The unit count is first truncated toward zero to whole bundles. The kg
/// magnitude is rounded to grams *up* for a reservation (negative) and *down*
/// for a release (positive). Returns 0.0 when less than one bundle was asked
/// for or `avg_kg` is not positive.
pub fn units_to_kg_delta(
    units_delta: i64,
    avg_kg: f64,
    sd_kg: f64,
    z_score: f64,
    shrinkage_pct: f64,
    bundle_size: u32,
) -> f64 {
    let bundle = i64::from(bundle_size.max(1));
    let whole_units = units_delta / bundle * bundle;
    if whole_units == 0 || !positive(avg_kg) {
        return 0.0;
    }

    let effective = effective_unit_weight_kg(avg_kg, sd_kg, z_score, shrinkage_pct);
    let grams = snap(whole_units.unsigned_abs() as f64 * effective * 1000.0);

    if whole_units < 0 {
        -(grams.ceil() / 1000.0)
    } else {
        grams.floor() / 1000.0
    }
}
