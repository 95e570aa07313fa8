//! Adaptive SSPRK22 solver for transport networks.
//!
//! Each step uses the two-stage strong-stability-preserving Runge-Kutta
//! scheme (Heun's method):
//!
//! ```text
//! k1 = f(t, y)
//! k2 = f(t + h, y + h·k1)
//! y_{n+1} = y + h/2 · (k1 + k2)
//! ```
//!
//! The embedded forward Euler solution gives the local error estimate
//! `h/2 · (k2 - k1)`, which drives step size control.
//!
//! Steps never cross a vial rotation or a source window edge. A step that
//! ends on such a boundary evaluates its second stage just before it, so the
//! step integrates the left-hand regime exactly. Rotations due at the current
//! time are applied before the next step is taken.
//!
//! # Example
//!
//! ```ignore
//! use tritium_solvers::transient::ssprk22;
//!
//! let solution = ssprk22::solve_unobserved(&network, 8.0 * 86_400.0)?;
//!
//! for snapshot in &solution.history {
//!     println!("t={}: {:?}", snapshot.time, snapshot.state.values);
//! }
//! ```

mod action;
mod error;
mod event;
mod solution;

pub use action::Action;
pub use error::Error;
pub use event::Event;
pub use solution::{Solution, Status};

use tracing::{debug, info, trace, warn};
use tritium_core::{Network, Observer, Snapshot, StepIntegrable, SystemState};

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Integrates a network from its initial state over `[0, horizon]`.
///
/// Step sizes and error tolerances come from [`Network::settings`].
///
/// # Algorithm
///
/// 1. Evaluate the initial state and emit step 0.
/// 2. Until the horizon is reached:
///    - Apply every rotation due at the current time and emit it.
///    - Pick a step no larger than the current step size that does not
///      cross the next rotation, breakpoint, or the horizon.
///    - Take an SSPRK22 step and estimate its local error.
///    - On rejection, shrink the step and retry.
///    - On acceptance, check the new state, record it, emit it, and adapt
///      the step size.
/// 3. Return the solution with the full history.
///
/// # Observer
///
/// The observer receives an [`Event`] after each accepted step and each
/// rotation, and may return [`Action::StopEarly`] to end the run.
///
/// # Errors
///
/// Returns an error if the horizon is invalid, the network fails to evaluate
/// or reports an invalid state, or a step at the minimum step size still
/// violates the error tolerance.
pub fn solve<Obs>(network: &Network, horizon: f64, mut observer: Obs) -> Result<Solution, Error>
where
    Obs: Observer<Event, Action>,
{
    if !horizon.is_finite() || horizon <= 0.0 {
        return Err(Error::Horizon(horizon));
    }

    let settings = network.settings();
    let (dt_min, dt_max) = (settings.dt_min(), settings.dt_max());
    let mut dt = settings.dt().clamp(dt_min, dt_max);

    let mut current = Snapshot::new(0.0, network.initial_state());
    network
        .check_state(&current.state, current.time)
        .map_err(|err| Error::network(err, &current))?;

    debug!(
        horizon,
        states = current.state.len(),
        rotations = network.events().len(),
        "starting transient run"
    );

    let mut solution = Solution {
        status: Status::Complete,
        history: vec![current.clone()],
        steps: 0,
        rejected: 0,
        rotations: Vec::new(),
    };

    let initial = Event::Step {
        step: 0,
        dt: 0.0,
        snapshot: current.clone(),
    };
    if let Some(Action::StopEarly) = observer.observe(&initial) {
        solution.status = Status::StoppedByObserver;
        return Ok(solution);
    }

    let events = network.events();
    let breakpoints = network.breakpoints();
    let mut next_event = 0;

    loop {
        // Apply due rotations.
        while let Some(rotation) = events.get(next_event).filter(|e| e.time <= current.time) {
            network
                .apply_event(&mut current.state, rotation)
                .map_err(|err| Error::network(err, &current))?;
            next_event += 1;
            solution.rotations.push(*rotation);

            let event = Event::Rotation {
                rotation: *rotation,
                snapshot: current.clone(),
            };
            if let Some(Action::StopEarly) = observer.observe(&event) {
                solution.status = Status::StoppedByObserver;
                return Ok(solution);
            }
        }

        if current.time >= horizon {
            break;
        }

        let limit = next_boundary(current.time, horizon, events.get(next_event), breakpoints);

        // Attempt steps until one is accepted.
        let (next, taken) = loop {
            let remaining = limit - current.time;
            let truncated = dt >= remaining;
            let h = if truncated { remaining } else { dt };
            let t_end = if truncated { limit } else { current.time + h };

            let (state, ratio) = attempt(network, &current, h, truncated, t_end, settings)
                .map_err(|err| Error::network(err, &current))?;

            let factor = step_factor(ratio);
            if ratio <= 1.0 {
                let base = if truncated { dt.max(h) } else { h };
                dt = (base * factor).clamp(dt_min, dt_max);
                break (Snapshot::new(t_end, state), h);
            }

            solution.rejected += 1;
            trace!(time = current.time, h, ratio, "rejected step");

            if h <= dt_min {
                warn!(time = current.time, h, ratio, "tolerance not met at the minimum step");
                return Err(Error::ToleranceUnsatisfiable {
                    time: current.time,
                    dt: h,
                    last: Box::new(current),
                });
            }
            dt = (h * factor).max(dt_min);
        };

        network
            .check_state(&next.state, next.time)
            .map_err(|err| Error::network(err, &current))?;

        trace!(time = next.time, h = taken, next_dt = dt, "accepted step");
        current = next;
        solution.steps += 1;
        solution.history.push(current.clone());

        let event = Event::Step {
            step: solution.steps,
            dt: taken,
            snapshot: current.clone(),
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            solution.status = Status::StoppedByObserver;
            return Ok(solution);
        }
    }

    info!(
        steps = solution.steps,
        rejected = solution.rejected,
        rotations = solution.rotations.len(),
        "transient run complete"
    );

    Ok(solution)
}

/// Integrates a network without observation.
///
/// This is a convenience wrapper around [`solve`] that discards events.
///
/// # Errors
///
/// Returns an error if the horizon is invalid, the network fails to evaluate
/// or reports an invalid state, or the error tolerance cannot be met.
pub fn solve_unobserved(network: &Network, horizon: f64) -> Result<Solution, Error> {
    solve(network, horizon, ())
}

/// Returns the earliest of the horizon, the next rotation, and the next
/// breakpoint strictly after `t`.
fn next_boundary(
    t: f64,
    horizon: f64,
    next_event: Option<&tritium_core::Event>,
    breakpoints: &[f64],
) -> f64 {
    let event = next_event.map_or(f64::INFINITY, |e| e.time);
    let breakpoint = breakpoints
        .iter()
        .copied()
        .find(|&b| b > t)
        .unwrap_or(f64::INFINITY);
    horizon.min(event).min(breakpoint)
}

/// Takes one SSPRK22 step of size `h` and returns the new state with its
/// error ratio. A ratio of at most one satisfies the tolerance.
fn attempt(
    network: &Network,
    current: &Snapshot,
    h: f64,
    truncated: bool,
    t_end: f64,
    settings: &tritium_core::SolverSettings,
) -> Result<(SystemState, f64), tritium_core::RunError> {
    let k1 = network.derivative(&current.state, current.time)?;
    let predictor = current.state.step(&k1, h);

    // Left limit of the boundary.
    let t_stage = if truncated && t_end > current.time {
        previous_float(t_end).max(current.time)
    } else {
        t_end
    };
    let k2 = network.derivative(&predictor, t_stage)?;

    let slope: Vec<f64> = k1.iter().zip(&k2).map(|(a, b)| 0.5 * (a + b)).collect();
    let next = current.state.step(&slope, h);

    let (rel, abs) = (settings.lte_rel(), settings.lte_abs());
    let ratio = current
        .state
        .values
        .iter()
        .zip(&next.values)
        .zip(k1.iter().zip(&k2))
        .map(|((y, y_new), (a, b))| {
            let error = (0.5 * h * (b - a)).abs();
            let scale = abs + rel * y.abs().max(y_new.abs());
            if !y_new.is_finite() || !error.is_finite() {
                f64::INFINITY
            } else if scale > 0.0 {
                error / scale
            } else if error == 0.0 {
                0.0
            } else {
                f64::INFINITY
            }
        })
        .fold(0.0, f64::max);

    Ok((next, ratio))
}

/// Returns the factor applied to the step size after an attempt.
fn step_factor(ratio: f64) -> f64 {
    if ratio == 0.0 {
        MAX_FACTOR
    } else {
        (SAFETY * ratio.powf(-0.5)).clamp(MIN_FACTOR, MAX_FACTOR)
    }
}

/// Returns the largest float below a positive finite `x`.
fn previous_float(x: f64) -> f64 {
    if x > 0.0 {
        f64::from_bits(x.to_bits() - 1)
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use tritium_core::{
        Bubbler, BubblerConfig, Integrator, NetworkBuilder, Process, ResiduePolicy, RunError,
        Scaler, SolverSettings, Source,
    };

    // --- Test fixtures ---

    fn tight() -> SolverSettings {
        SolverSettings::new(0.01, 1e-9, 0.5)
            .unwrap()
            .with_lte(1e-8, 1e-12)
            .unwrap()
    }

    /// A compartment draining with no inflow.
    fn decay(settings: SolverSettings) -> Network {
        let mut builder = NetworkBuilder::new();
        builder.settings(settings);
        builder.try_add("none", Source::step(0.0, 0.0)).unwrap();
        builder
            .try_add("tank", Process::new(2.0).and_then(|p| p.with_initial_mass(1.0)))
            .unwrap();
        builder.connect(("none", "out"), ("tank", "inflow"));
        builder.build().unwrap()
    }

    /// A constant feed into an integrator, switched off at `end`.
    fn windowed_feed(end: f64) -> Network {
        let mut builder = NetworkBuilder::new();
        builder.settings(SolverSettings::new(0.7, 1e-6, 0.7).unwrap());
        builder.try_add("feed", Source::new(3.0, 0.0, Some(end))).unwrap();
        builder.add("total", Integrator::new()).unwrap();
        builder.connect(("feed", "out"), ("total", "in"));
        builder.build().unwrap()
    }

    fn sampler(times: Vec<f64>) -> Network {
        let mut builder = NetworkBuilder::new();
        builder.try_add("feed", Source::step(2.0, 0.0)).unwrap();
        builder
            .try_add(
                "bubbler",
                Bubbler::new(BubblerConfig {
                    collection_efficiency: 0.5,
                    conversion_efficiency: 1.0,
                    replacement_times: times,
                    residue: ResiduePolicy::Converted,
                }),
            )
            .unwrap();
        builder
            .connect(("feed", "out"), ("bubbler", "sample_in_soluble"))
            .connect(("feed", "out"), ("bubbler", "sample_in_insoluble"));
        builder.build().unwrap()
    }

    // --- Tests ---

    #[test]
    fn exponential_decay_matches_analytic() {
        let network = decay(tight());
        let solution = solve_unobserved(&network, 5.0).expect("should solve");

        assert_eq!(solution.status, Status::Complete);
        let last = solution.last().unwrap();
        assert_relative_eq!(last.time, 5.0);
        assert_relative_eq!(last.state.values[0], (-2.5_f64).exp(), max_relative = 1e-5);
    }

    #[test]
    fn step_size_grows_on_smooth_problems() {
        let network = windowed_feed(100.0);
        let solution = solve_unobserved(&network, 10.0).expect("should solve");

        // Constant input is integrated exactly at the maximum step.
        assert_eq!(solution.rejected, 0);
        assert_relative_eq!(solution.last().unwrap().state.values[0], 30.0, epsilon = 1e-9);
        assert!(solution.steps <= 16);
    }

    #[test]
    fn lands_on_source_window_edges() {
        let network = windowed_feed(3.3);
        let solution = solve_unobserved(&network, 10.0).expect("should solve");

        assert!(solution.history.iter().any(|s| s.time == 3.3));
        assert_relative_eq!(
            solution.last().unwrap().state.values[0],
            3.0 * 3.3,
            epsilon = 1e-9
        );
    }

    #[test]
    fn rotations_happen_at_scheduled_times() {
        let network = sampler(vec![2.5, 7.0]);
        let mut seen = Vec::new();

        let solution = solve(&network, 10.0, |event: &Event| {
            if let Event::Rotation { rotation, snapshot } = event {
                seen.push((rotation.time, snapshot.time, snapshot.state.values.clone()));
            }
            None
        })
        .expect("should solve");

        assert_eq!(solution.rotations.len(), 2);
        assert_eq!(seen.len(), 2);

        // Collection rate is 0.5 × (2 + 2) = 2.
        let (scheduled, at, ref vials) = seen[0];
        assert_eq!(scheduled, 2.5);
        assert_eq!(at, 2.5);
        assert_relative_eq!(vials[0], 5.0, epsilon = 1e-9);
        assert_eq!(vials[1], 0.0);

        let last = solution.last().unwrap();
        assert_eq!(last.state.active_vials, vec![2]);
        assert_relative_eq!(last.state.values[0], 5.0, epsilon = 1e-9);
        assert_relative_eq!(last.state.values[1], 9.0, epsilon = 1e-9);
        assert_relative_eq!(last.state.values[2], 6.0, epsilon = 1e-9);
    }

    #[test]
    fn rotations_past_the_horizon_are_not_applied() {
        let network = sampler(vec![2.0, 20.0]);
        let solution = solve_unobserved(&network, 10.0).expect("should solve");

        assert_eq!(solution.rotations.len(), 1);
        assert_eq!(solution.last().unwrap().state.active_vials, vec![1]);
    }

    #[test]
    fn observer_can_stop_early() {
        let network = decay(tight());

        let observer = |event: &Event| match event {
            Event::Step { step, .. } if *step >= 5 => Some(Action::StopEarly),
            _ => None,
        };

        let solution = solve(&network, 5.0, observer).expect("should stop early");

        assert_eq!(solution.status, Status::StoppedByObserver);
        assert_eq!(solution.steps, 5);
        assert_eq!(solution.history.len(), 6); // initial + 5 steps
    }

    #[test]
    fn step_numbers_start_at_zero() {
        let network = windowed_feed(100.0);
        let mut steps = Vec::new();

        let solution = solve(&network, 2.0, |event: &Event| {
            if let Event::Step { step, .. } = event {
                steps.push(*step);
            }
            None
        })
        .expect("should solve");

        assert_eq!(steps[0], 0);
        assert_eq!(steps, (0..=solution.steps).collect::<Vec<_>>());
    }

    #[test]
    fn rejects_bad_horizon() {
        let network = decay(tight());
        assert!(matches!(
            solve_unobserved(&network, 0.0),
            Err(Error::Horizon(h)) if h == 0.0
        ));
        assert!(matches!(
            solve_unobserved(&network, f64::NAN),
            Err(Error::Horizon(_))
        ));
    }

    #[test]
    fn stiff_problem_with_fixed_step_fails() {
        let mut builder = NetworkBuilder::new();
        builder.settings(SolverSettings::new(1.0, 1.0, 1.0).unwrap());
        builder.try_add("none", Source::step(0.0, 0.0)).unwrap();
        builder
            .try_add("tank", Process::new(1e-3).and_then(|p| p.with_initial_mass(1.0)))
            .unwrap();
        builder.connect(("none", "out"), ("tank", "inflow"));
        let network = builder.build().unwrap();

        let error = solve_unobserved(&network, 10.0).unwrap_err();
        assert!(matches!(error, Error::ToleranceUnsatisfiable { time, .. } if time == 0.0));
        assert_eq!(error.last_snapshot().unwrap().state.values, vec![1.0]);
    }

    #[test]
    fn negative_mass_halts_with_last_accepted_state() {
        let mut builder = NetworkBuilder::new();
        builder.settings(SolverSettings::new(0.1, 1e-6, 0.1).unwrap());
        builder.try_add("drain", Source::step(-1.0, 0.0)).unwrap();
        builder
            .try_add("tank", Process::new(1e6).and_then(|p| p.with_initial_mass(0.55)))
            .unwrap();
        builder.connect(("drain", "out"), ("tank", "inflow"));
        let network = builder.build().unwrap();

        let mut observed = None;
        let error = solve(&network, 5.0, |event: &Event| {
            observed = Some(event.snapshot().clone());
            None
        })
        .unwrap_err();

        let Error::Network {
            source: RunError::NegativeMass { block, time, mass },
            last,
        } = &error
        else {
            panic!("unexpected error: {error}");
        };
        assert_eq!(block, "tank");
        assert!(*mass < 0.0);
        assert_relative_eq!(*time, 0.6, epsilon = 1e-9);

        // The failing step is never reported; the error carries the last
        // accepted one.
        assert_eq!(Some(&**last), observed.as_ref());
        assert_relative_eq!(last.time, 0.5, epsilon = 1e-9);
        assert!(last.state.values[0] >= 0.0);
    }

    #[test]
    fn unconverged_feedback_halts_before_the_first_step() {
        let settings = SolverSettings::default().with_fixed_point(1, 1e-6).unwrap();
        let mut builder = NetworkBuilder::new();
        builder.settings(settings);
        builder.try_add("feed", Source::step(1.0, 0.0)).unwrap();
        builder
            .try_add(
                "bubbler",
                Bubbler::new(BubblerConfig {
                    collection_efficiency: 0.9,
                    conversion_efficiency: 0.5,
                    replacement_times: vec![],
                    residue: ResiduePolicy::Converted,
                }),
            )
            .unwrap();
        builder.try_add("gain", Scaler::new(0.5)).unwrap();
        builder
            .connect(("feed", "out"), ("bubbler", "sample_in_soluble"))
            .connect(("bubbler", "vial1"), ("gain", "in"))
            .connect(("gain", "out"), ("bubbler", "sample_in_insoluble"));
        let network = builder.build().unwrap();
        assert!(network.requires_iteration());

        let error = solve_unobserved(&network, 1.0).unwrap_err();

        assert!(matches!(
            error,
            Error::Network {
                source: RunError::FixedPointDiverged { time, iterations: 1 },
                ..
            } if time == 0.0
        ));
        let last = error.last_snapshot().unwrap();
        assert_eq!(last.time, 0.0);
        assert_eq!(last.state, network.initial_state());
    }

    #[test]
    fn previous_float_is_just_below() {
        let x = 3.3;
        let below = previous_float(x);
        assert!(below < x);
        assert_eq!(f64::from_bits(below.to_bits() + 1), x);
    }
}
