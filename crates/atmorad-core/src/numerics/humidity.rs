use crate::common::constants::CELSIUS_OFFSET;
use crate::domain::{RadError, RadResult};

/// Saturation vapour pressure over water in mbar (Magnus form).
pub fn saturation_vapour_pressure(temperature_k: f64) -> f64 {
    let celsius = temperature_k - CELSIUS_OFFSET;
    6.11 * (17.3 * celsius / (celsius + 237.3)).exp()
}

/// Water vapour mass mixing ratio for `relative_humidity` percent at the
/// given temperature (K) and total pressure (mbar).
pub fn water_vapour_mixing_ratio(
    temperature_k: f64,
    pressure_mbar: f64,
    relative_humidity: f64,
) -> RadResult<f64> {
    if !(0.0..=100.0).contains(&relative_humidity) {
        return Err(RadError::input_validation(
            "INPUT.RELATIVE_HUMIDITY",
            format!("relative humidity {} must lie in [0, 100]", relative_humidity),
        ));
    }

    let partial = relative_humidity / 100.0 * saturation_vapour_pressure(temperature_k);
    if partial >= pressure_mbar {
        return Err(RadError::input_validation(
            "INPUT.RELATIVE_HUMIDITY",
            format!(
                "water vapour pressure {:.3} mbar reaches total pressure {} mbar",
                partial, pressure_mbar
            ),
        ));
    }
    Ok(0.622 * partial / (pressure_mbar - partial))
}
