//! Room temperature integration.
//!
//! Temperature is advanced with explicit Euler steps of one second. Every
//! second the room relaxes towards the outside temperature (faster with the
//! door open) and, while the compressor runs, towards the compressor
//! temperature.

/// Ambient temperature outside the room (°C).
pub const OUTSIDE_TEMP: f64 = 20.0;
/// Cold-side temperature of the compressor (°C).
pub const COMPRESSOR_TEMP: f64 = -5.0;

/// Heat-loss coefficient with the door closed (1/s).
pub const LOSS_CLOSED: f64 = 5e-7;
/// Heat-loss coefficient with the door open (1/s).
pub const LOSS_OPEN: f64 = 3e-5;
/// Cooling coefficient with the compressor running (1/s).
pub const COOLING: f64 = 8e-6;

pub const MINUTES_PER_PERIOD: usize = 5;
pub const SECONDS_PER_MINUTE: usize = 60;

pub fn loss_coeff(door_open: bool) -> f64 {
    if door_open { LOSS_OPEN } else { LOSS_CLOSED }
}

pub fn cool_coeff(comp_on: bool) -> f64 {
    if comp_on { COOLING } else { 0.0 }
}

/// Advance the temperature by one second.
pub fn step_second(temp: f64, door_open: bool, comp_on: bool) -> f64 {
    temp + loss_coeff(door_open) * (OUTSIDE_TEMP - temp)
        + cool_coeff(comp_on) * (COMPRESSOR_TEMP - temp)
}

/// Advance the temperature over one period and return the final temperature.
///
/// The door state is fixed for the whole period. `compressor` is asked for the
/// compressor state at the start of every minute, with the temperature at
/// that instant.
pub fn integrate_period<F, E>(temp: f64, door_open: bool, mut compressor: F) -> Result<f64, E>
where
    F: FnMut(f64) -> Result<bool, E>,
{
    let mut temp = temp;
    for _ in 0..MINUTES_PER_PERIOD {
        let comp_on = compressor(temp)?;
        for _ in 0..SECONDS_PER_MINUTE {
            temp = step_second(temp, door_open, comp_on);
        }
    }
    Ok(temp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn coefficients_are_bounded() {
        for flag in [false, true] {
            assert!((0.0..=LOSS_OPEN).contains(&loss_coeff(flag)));
            assert!((0.0..=COOLING).contains(&cool_coeff(flag)));
        }
    }

    #[test]
    fn one_second_step_has_bounded_drift() {
        let temps = [-4.9, 0.0, 3.5, 5.0, 6.5, 19.9];
        for &temp in &temps {
            for door_open in [false, true] {
                for comp_on in [false, true] {
                    let next = step_second(temp, door_open, comp_on);
                    assert!(next > COMPRESSOR_TEMP && next < OUTSIDE_TEMP);
                    let max_drift = (loss_coeff(door_open) + cool_coeff(comp_on))
                        * (OUTSIDE_TEMP - COMPRESSOR_TEMP);
                    assert!((next - temp).abs() <= max_drift);
                }
            }
        }
    }

    #[test]
    fn idle_room_warms_towards_outside() {
        let next = step_second(5.0, false, false);
        let expected = 5.0 + LOSS_CLOSED * 15.0;
        assert!((next - expected).abs() < 1e-15);

        let open = step_second(5.0, true, false);
        assert!(open > next);
    }

    #[test]
    fn running_compressor_cools_the_room() {
        let next = step_second(5.0, false, true);
        assert!(next < 5.0);
        assert!(next > COMPRESSOR_TEMP);
    }

    #[test]
    fn compressor_is_polled_once_per_minute() {
        let mut polled = Vec::new();
        let end = integrate_period(5.0, false, |temp| {
            polled.push(temp);
            Ok::<_, Infallible>(false)
        })
        .unwrap();

        assert_eq!(polled.len(), MINUTES_PER_PERIOD);
        assert_eq!(polled[0], 5.0);
        assert!(polled.windows(2).all(|pair| pair[1] > pair[0]));
        assert!(end > polled[MINUTES_PER_PERIOD - 1]);

        let mut expected = 5.0;
        for _ in 0..MINUTES_PER_PERIOD * SECONDS_PER_MINUTE {
            expected = step_second(expected, false, false);
        }
        assert_eq!(end, expected);
    }

    #[test]
    fn compressor_can_switch_mid_period() {
        let mut decisions = Vec::new();
        let end = integrate_period(5.0, false, |temp| {
            let on = temp > 5.0;
            decisions.push(on);
            Ok::<_, Infallible>(on)
        })
        .unwrap();

        // One warm minute is undone by one minute of cooling.
        assert_eq!(decisions, vec![false, true, false, false, false]);
        assert!(end < 5.0);
    }

    #[test]
    fn compressor_errors_abort_the_period() {
        let result = integrate_period(5.0, false, |_| Err("no price"));
        assert_eq!(result, Err("no price"));
    }
}
