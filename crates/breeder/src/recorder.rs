//! Probe recording during a run.

use tritium_core::{Network, Observer, RunError, Snapshot};
use tritium_solvers::transient::ssprk22::{Action, Event};

/// The recorded time series of one probe channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub probe: String,
    pub label: String,
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl Trace {
    /// Returns the most recent value, if any.
    #[must_use]
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

/// An observer that records every probe channel of a network.
///
/// Pass `&mut Recorder` as the observer of
/// [`ssprk22::solve`](tritium_solvers::transient::ssprk22::solve) to read the
/// traces after the run. Channels are sampled after every accepted step and
/// every vial rotation, so a rotation shows up as two points at the same
/// time.
///
/// # Example
///
/// ```ignore
/// let mut recorder = Recorder::new(&network);
/// ssprk22::solve(&network, horizon, &mut recorder)?;
///
/// let inventory = recorder.trace("baby_inventory", "inventory").unwrap();
/// ```
#[derive(Debug)]
pub struct Recorder<'n> {
    network: &'n Network,
    traces: Vec<Trace>,
    error: Option<RunError>,
}

impl<'n> Recorder<'n> {
    #[must_use]
    pub fn new(network: &'n Network) -> Self {
        Self {
            network,
            traces: Vec::new(),
            error: None,
        }
    }

    /// Samples every channel at the snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`RunError`] if the network cannot be evaluated at the
    /// snapshot.
    pub fn record(&mut self, snapshot: &Snapshot) -> Result<(), RunError> {
        let channels = self.network.channels(&snapshot.state, snapshot.time)?;

        if self.traces.is_empty() {
            self.traces = channels
                .iter()
                .map(|c| Trace {
                    probe: c.probe.to_owned(),
                    label: c.label.to_owned(),
                    times: Vec::new(),
                    values: Vec::new(),
                })
                .collect();
        }

        for (trace, channel) in self.traces.iter_mut().zip(&channels) {
            trace.times.push(snapshot.time);
            trace.values.push(channel.value);
        }

        Ok(())
    }

    /// Returns all traces in probe registration order.
    #[must_use]
    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    /// Returns the trace of `label` on `probe`.
    #[must_use]
    pub fn trace(&self, probe: &str, label: &str) -> Option<&Trace> {
        self.traces
            .iter()
            .find(|t| t.probe == probe && t.label == label)
    }

    /// Returns the error that stopped recording, if any.
    #[must_use]
    pub fn error(&self) -> Option<&RunError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn into_traces(self) -> Vec<Trace> {
        self.traces
    }
}

impl Observer<Event, Action> for Recorder<'_> {
    fn observe(&mut self, event: &Event) -> Option<Action> {
        match self.record(event.snapshot()) {
            Ok(()) => None,
            Err(error) => {
                self.error = Some(error);
                Some(Action::StopEarly)
            }
        }
    }
}

/// Allows `&mut Recorder` to be passed to solvers that take an observer by
/// value, so the traces can be read after the solve completes.
impl Observer<Event, Action> for &mut Recorder<'_> {
    fn observe(&mut self, event: &Event) -> Option<Action> {
        (**self).observe(event)
    }
}
