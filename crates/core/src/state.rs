/// A trait for types that can be stepped using their derivative.
///
/// Implementing this trait lets a driver advance a state via
/// `state + derivative * delta` without knowing its layout.
pub trait StepIntegrable<Delta> {
    /// The derivative of the type with respect to `Delta`.
    type Derivative;

    /// Returns the value after stepping with a derivative and step size.
    #[must_use]
    fn step(&self, derivative: &Self::Derivative, delta: Delta) -> Self;
}

/// The global state of a [`Network`](crate::Network).
///
/// `values` is the concatenation of every stateful block's continuous state,
/// in block registration order. `active_vials` holds the discrete state: the
/// index of the active vial for each bubbler, also in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemState {
    pub values: Vec<f64>,
    pub active_vials: Vec<usize>,
}

impl SystemState {
    /// Returns the number of continuous state variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the state has no continuous variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Stepping only advances the continuous part; vial indices change through
/// events alone.
impl StepIntegrable<f64> for SystemState {
    type Derivative = Vec<f64>;

    fn step(&self, derivative: &Vec<f64>, delta: f64) -> Self {
        let values = self
            .values
            .iter()
            .zip(derivative)
            .map(|(x, dx)| x + dx * delta)
            .collect();

        Self {
            values,
            active_vials: self.active_vials.clone(),
        }
    }
}

/// A captured state at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub time: f64,
    pub state: SystemState,
}

impl Snapshot {
    #[must_use]
    pub fn new(time: f64, state: SystemState) -> Self {
        Self { time, state }
    }
}
