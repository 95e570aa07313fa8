use thiserror::Error;

use crate::BlockId;

/// Vial rotation times for a single [`Bubbler`](crate::Bubbler).
///
/// A schedule of `k` rotation times divides a run into `k + 1` intervals, one
/// per vial. Times are finite, non-negative, and strictly increasing.
///
/// # Examples
///
/// ```
/// use tritium_core::{BlockId, RotationSchedule};
///
/// let schedule = RotationSchedule::new(vec![3600.0, 7200.0]).unwrap();
/// assert_eq!(schedule.vial_count(), 3);
///
/// let events = schedule.events(BlockId(4));
/// assert_eq!(events[1].time, 7200.0);
/// assert_eq!(events[1].vial, 2);
///
/// assert!(RotationSchedule::new(vec![7200.0, 3600.0]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RotationSchedule {
    times: Vec<f64>,
}

/// Errors that can occur when validating a [`RotationSchedule`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ScheduleError {
    #[error("rotation schedule is empty")]
    Empty,

    #[error("rotation time {index} is not finite: {time}")]
    NotFinite { index: usize, time: f64 },

    #[error("rotation time {index} is negative: {time}")]
    Negative { index: usize, time: f64 },

    #[error("rotation time {index} ({time}) does not follow the previous time ({previous})")]
    NotIncreasing {
        index: usize,
        time: f64,
        previous: f64,
    },
}

/// A scheduled vial rotation.
///
/// At `time`, the bubbler identified by `bubbler` freezes its active vial and
/// starts accumulating into vial index `vial` (zero-based).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub time: f64,
    pub bubbler: BlockId,
    pub vial: usize,
}

impl RotationSchedule {
    /// Creates a schedule from rotation times.
    ///
    /// # Errors
    ///
    /// Returns a [`ScheduleError`] identifying the first offending time if the
    /// list is empty, contains a non-finite or negative time, or is not
    /// strictly increasing.
    pub fn new(times: Vec<f64>) -> Result<Self, ScheduleError> {
        if times.is_empty() {
            return Err(ScheduleError::Empty);
        }

        for (index, &time) in times.iter().enumerate() {
            if !time.is_finite() {
                return Err(ScheduleError::NotFinite { index, time });
            }
            if time < 0.0 {
                return Err(ScheduleError::Negative { index, time });
            }
        }

        if let Some(index) = times.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(ScheduleError::NotIncreasing {
                index: index + 1,
                time: times[index + 1],
                previous: times[index],
            });
        }

        Ok(Self { times })
    }

    /// Returns the rotation times in increasing order.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Returns the number of vials the schedule cycles through.
    #[must_use]
    pub fn vial_count(&self) -> usize {
        self.times.len() + 1
    }

    /// Returns the rotation events for the bubbler at `bubbler`.
    ///
    /// The `i`-th rotation time activates vial `i + 1`.
    #[must_use]
    pub fn events(&self, bubbler: BlockId) -> Vec<Event> {
        self.times
            .iter()
            .enumerate()
            .map(|(index, &time)| Event {
                time,
                bubbler,
                vial: index + 1,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_activate_successive_vials() {
        let schedule = RotationSchedule::new(vec![0.0, 10.0, 25.0]).unwrap();
        let events = schedule.events(BlockId(2));

        assert_eq!(events.len(), 3);
        for (index, event) in events.iter().enumerate() {
            assert_eq!(event.bubbler, BlockId(2));
            assert_eq!(event.vial, index + 1);
            assert_eq!(event.time, schedule.times()[index]);
        }
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(RotationSchedule::new(vec![]), Err(ScheduleError::Empty));
    }

    #[test]
    fn rejects_negative() {
        assert_eq!(
            RotationSchedule::new(vec![-1.0, 5.0]),
            Err(ScheduleError::Negative {
                index: 0,
                time: -1.0
            })
        );
    }

    #[test]
    fn rejects_non_finite() {
        assert!(matches!(
            RotationSchedule::new(vec![1.0, f64::NAN]),
            Err(ScheduleError::NotFinite { index: 1, .. })
        ));
        assert!(matches!(
            RotationSchedule::new(vec![f64::INFINITY]),
            Err(ScheduleError::NotFinite { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_repeated_and_decreasing_times() {
        assert_eq!(
            RotationSchedule::new(vec![1.0, 2.0, 2.0]),
            Err(ScheduleError::NotIncreasing {
                index: 2,
                time: 2.0,
                previous: 2.0
            })
        );
        assert!(matches!(
            RotationSchedule::new(vec![5.0, 4.0]),
            Err(ScheduleError::NotIncreasing { index: 1, .. })
        ));
    }
}
