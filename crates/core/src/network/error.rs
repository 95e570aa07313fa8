use thiserror::Error;

/// Errors that halt a run during integration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("port values did not converge within {iterations} fixed-point iterations at t = {time}")]
    FixedPointDiverged { time: f64, iterations: usize },

    #[error("compartment {block} holds negative mass {mass} at t = {time}")]
    NegativeMass { block: String, time: f64, mass: f64 },

    #[error(
        "rotation of {block} to vial {requested} at t = {time} is out of order (vial {active} is active)"
    )]
    EventOutOfOrder {
        block: String,
        time: f64,
        active: usize,
        requested: usize,
    },

    #[error("event targets block {0}, which is not a bubbler")]
    NotABubbler(usize),

    #[error("{block} has {vials} vials but vial {active} is marked active")]
    ActiveVial {
        block: String,
        active: usize,
        vials: usize,
    },

    #[error("state has {found} values and {found_vials} vial indices, expected {expected} and {expected_vials}")]
    StateShape {
        expected: usize,
        found: usize,
        expected_vials: usize,
        found_vials: usize,
    },
}
