use approx::assert_relative_eq;
use tritium_breeder::{BreederConfig, ConfigFileError, Recorder, Sampling, SolverConfig};
use tritium_core::{ConfigError, Network, SystemState};
use tritium_solvers::transient::ssprk22::{self, Status};

fn total(network: &Network, state: &SystemState, block: &str) -> f64 {
    network.block_state(state, block).unwrap().iter().sum()
}

#[test]
fn baby_run_conserves_tritium() {
    let config = BreederConfig::default();
    let derived = config.derived().unwrap();
    let network = config.network().unwrap();

    let mut recorder = Recorder::new(&network);
    let solution = ssprk22::solve(&network, config.horizon(), &mut recorder).unwrap();
    assert_eq!(solution.status, Status::Complete);
    assert!(recorder.error().is_none());

    for snapshot in solution.history.iter().skip(1) {
        let state = &snapshot.state;
        let produced = derived.production_rate * snapshot.time.min(derived.irradiation_time);

        let held = total(&network, state, "baby")
            + total(&network, state, "iv_gas")
            + total(&network, state, "ov_gas");
        let released = total(&network, state, "iv_release") + total(&network, state, "ov_release");
        assert_relative_eq!(held + released, produced, max_relative = 1e-9);

        // With full conversion, every released atom ends in a vial or the
        // environment.
        let sampled = total(&network, state, "iv_bubbler")
            + total(&network, state, "ov_bubbler")
            + total(&network, state, "environment_release");
        assert_relative_eq!(sampled, released, max_relative = 1e-9);
    }

    // All nine rotations happened, at their scheduled times.
    assert_eq!(solution.rotations.len(), 9);
    assert_eq!(solution.rotations.as_slice(), network.events());

    let last = solution.last().unwrap();
    assert_relative_eq!(last.time, 8.0 * 86_400.0);
    assert_eq!(network.active_vial(&last.state, "iv_bubbler"), Some(6));
    assert_eq!(network.active_vial(&last.state, "ov_bubbler"), Some(3));

    // Inventory peaks at the end of irradiation and decays afterwards.
    let inventory = recorder.trace("baby_inventory", "inventory").unwrap();
    let peak = inventory
        .values
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let at_peak = inventory.values.iter().position(|&v| v == peak).unwrap();
    assert_relative_eq!(inventory.times[at_peak], derived.irradiation_time);
    assert!(inventory.last().unwrap() < peak);

    // Every IV vial collected something.
    let vials = recorder.traces().iter().filter(|t| t.probe == "iv_vials");
    assert_eq!(vials.clone().count(), 7);
    assert!(vials.clone().all(|t| t.last().unwrap() > 0.0));
}

#[test]
fn default_step_cap_matches_a_fine_one() {
    let coarse = BreederConfig::default();
    let fine = BreederConfig {
        solver: SolverConfig {
            dt: 10.0,
            dt_max: 10.0,
            ..SolverConfig::default()
        },
        ..BreederConfig::default()
    };

    let run = |config: &BreederConfig| {
        let network = config.network().unwrap();
        let solution = ssprk22::solve_unobserved(&network, config.horizon()).unwrap();
        let last = solution.last().unwrap().state.clone();
        let vials: Vec<f64> = ["iv_bubbler", "ov_bubbler"]
            .iter()
            .flat_map(|b| network.block_state(&last, b).unwrap().to_vec())
            .collect();
        (vials, solution.steps)
    };

    let (coarse_vials, coarse_steps) = run(&coarse);
    let (fine_vials, fine_steps) = run(&fine);

    assert_eq!(coarse_vials.len(), 7 + 4);
    for (c, f) in coarse_vials.iter().zip(&fine_vials) {
        assert_relative_eq!(*c, *f, max_relative = 1e-4);
    }
    assert!(coarse_steps * 10 < fine_steps);
}

#[test]
fn invalid_sampling_fails_before_any_step() {
    let config = BreederConfig {
        sampling: Sampling {
            soluble_fraction: 1.5,
            ..Sampling::default()
        },
        ..BreederConfig::default()
    };

    match config.network() {
        Err(ConfigFileError::Network(ConfigError::Block { block, .. })) => {
            assert_eq!(block, "iv_soluble_split");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
