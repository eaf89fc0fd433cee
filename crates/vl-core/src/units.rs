// vl-core/src/units.rs
//
// Breathing-circuit quantities are carried as plain f64 in clinical units
// (mL, cmH2O, s). uom is the single source of the conversion factors between
// the units clinicians quote (L, min) and the ones the equations use.

use uom::si::f64::{Time as UomTime, Volume as UomVolume};

pub type Time = UomTime;
pub type Volume = UomVolume;

#[inline]
pub fn ml(v: f64) -> Volume {
    use uom::si::volume::milliliter;
    Volume::new::<milliliter>(v)
}

#[inline]
pub fn liters(v: f64) -> Volume {
    use uom::si::volume::liter;
    Volume::new::<liter>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn minutes(v: f64) -> Time {
    use uom::si::time::minute;
    Time::new::<minute>(v)
}

/// Millilitres in one litre. Rounded: the ratio is integral by definition.
#[inline]
pub fn ml_per_liter() -> f64 {
    use uom::si::volume::milliliter;
    liters(1.0).get::<milliliter>().round()
}

/// Seconds in one minute.
#[inline]
pub fn seconds_per_minute() -> f64 {
    use uom::si::time::second;
    minutes(1.0).get::<second>().round()
}

/// Resistance quoted per litre-per-second to per millilitre-per-second:
/// cmH2O/(L/s) -> cmH2O/(mL/s).
#[inline]
pub fn per_l_per_s_to_per_ml_per_s(resistance: f64) -> f64 {
    resistance / ml_per_liter()
}

/// Volume flow mL/s -> L/min.
#[inline]
pub fn ml_per_s_to_l_per_min(flow: f64) -> f64 {
    flow * seconds_per_minute() / ml_per_liter()
}

/// Rate per minute -> Hz.
#[inline]
pub fn per_minute_to_hz(rate: f64) -> f64 {
    rate / seconds_per_minute()
}
