//! Gated coupling between the optimizer and its rate schedule.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::optim::{Interval, Optimizer, RateSchedule};

/// Serialized controller internals: one opaque optimizer blob plus the
/// schedule bookkeeping blob. Stored field-for-field in the checkpoint
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    /// Optimizer collaborator state, opaque to the orchestrator.
    pub optimizer: Vec<u8>,
    /// Encoded [`ScheduleState`].
    pub schedule: Vec<u8>,
}

/// Schedule bookkeeping that must survive a restart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct ScheduleState {
    advances: u64,
    rate: f64,
}

struct ScheduleSlot {
    schedule: Box<dyn RateSchedule>,
    cadence: Interval,
    frequency: u64,
    advances: u64,
}

/// Owns the optimizer seam and an optional rate schedule.
///
/// Gradient calls delegate straight through. Schedule advancement is
/// gated three ways (schedule present, interval match, step-count
/// multiple of the frequency); a call that fails any gate is a strict
/// no-op, so callers fire it unconditionally at both cadences.
pub struct ScheduleController {
    optimizer: Box<dyn Optimizer>,
    slot: Option<ScheduleSlot>,
    base_rate: f64,
}

impl ScheduleController {
    /// Wrap an optimizer with no schedule: the rate never moves.
    ///
    /// The base rate for schedule factors is captured here, so wrap
    /// the optimizer while it still carries its configured initial
    /// rate (import state afterwards, not before).
    #[must_use]
    pub fn new(optimizer: Box<dyn Optimizer>) -> Self {
        let base_rate = optimizer.rate();
        Self { optimizer, slot: None, base_rate }
    }

    /// Attach a schedule bound to `cadence`, advancing once every
    /// `frequency` matching counts. A `frequency` of 0 never passes
    /// the gate.
    #[must_use]
    pub fn with_schedule(
        mut self,
        schedule: Box<dyn RateSchedule>,
        cadence: Interval,
        frequency: u64,
    ) -> Self {
        self.slot = Some(ScheduleSlot { schedule, cadence, frequency, advances: 0 });
        self
    }

    /// Delegate one parameter-update step to the optimizer.
    pub fn apply_gradients(&mut self) -> Result<()> {
        self.optimizer.step()
    }

    /// Delegate gradient clearing to the optimizer.
    pub fn clear_gradients(&mut self) {
        self.optimizer.zero_grad();
    }

    /// Advance the schedule one notch if every gate passes:
    /// a schedule is configured, `interval` matches its cadence, and
    /// `step_count` is a multiple of its frequency. Otherwise a strict
    /// no-op; repeated no-op calls change nothing.
    pub fn advance_schedule(&mut self, interval: Interval, step_count: u64) {
        let Some(slot) = self.slot.as_mut() else {
            return;
        };
        if interval != slot.cadence {
            return;
        }
        if slot.frequency == 0 || step_count % slot.frequency != 0 {
            return;
        }
        slot.advances += 1;
        let rate = self.base_rate * slot.schedule.factor(slot.advances);
        self.optimizer.set_rate(rate);
    }

    /// The optimizer's current learning-rate-like scalar.
    #[must_use]
    pub fn current_rate(&self) -> f64 {
        self.optimizer.rate()
    }

    /// Number of schedule advancements so far (0 without a schedule).
    #[must_use]
    pub fn advances(&self) -> u64 {
        self.slot.as_ref().map_or(0, |s| s.advances)
    }

    /// True when a schedule is attached.
    #[must_use]
    pub fn has_schedule(&self) -> bool {
        self.slot.is_some()
    }

    /// Capture optimizer and schedule state for checkpointing.
    pub fn export_state(&self) -> Result<ControllerState> {
        let schedule = ScheduleState {
            advances: self.advances(),
            rate: self.current_rate(),
        };
        Ok(ControllerState {
            optimizer: self.optimizer.export_state()?,
            schedule: serde_json::to_vec(&schedule)
                .map_err(|e| Error::serialization("exporting schedule state", e))?,
        })
    }

    /// Restore optimizer and schedule state from a checkpoint so that
    /// subsequent `advance_schedule` calls behave as if the process
    /// never restarted.
    pub fn import_state(&mut self, state: &ControllerState) -> Result<()> {
        self.optimizer.import_state(&state.optimizer)?;
        let schedule: ScheduleState = serde_json::from_slice(&state.schedule)
            .map_err(|e| Error::serialization("importing schedule state", e))?;
        if let Some(slot) = self.slot.as_mut() {
            slot.advances = schedule.advances;
        }
        self.optimizer.set_rate(schedule.rate);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::optimizer::testing::SpyOptimizer;
    use crate::optim::StepDecaySchedule;
    use approx::assert_abs_diff_eq;

    fn controller(frequency: u64, cadence: Interval) -> ScheduleController {
        ScheduleController::new(Box::new(SpyOptimizer::with_rate(1.0))).with_schedule(
            Box::new(StepDecaySchedule::new(0.5, 1)),
            cadence,
            frequency,
        )
    }

    #[test]
    fn test_gradient_calls_delegate() {
        let mut ctl = ScheduleController::new(Box::new(SpyOptimizer::with_rate(0.1)));
        ctl.clear_gradients();
        ctl.apply_gradients().unwrap();
        ctl.apply_gradients().unwrap();
        assert_abs_diff_eq!(ctl.current_rate(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_no_schedule_is_always_noop() {
        let mut ctl = ScheduleController::new(Box::new(SpyOptimizer::with_rate(0.3)));
        for count in [0, 1, 7, 100] {
            ctl.advance_schedule(Interval::Step, count);
            ctl.advance_schedule(Interval::Epoch, count);
        }
        assert_eq!(ctl.advances(), 0);
        assert_abs_diff_eq!(ctl.current_rate(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_interval_mismatch_is_noop() {
        let mut ctl = controller(1, Interval::Epoch);
        ctl.advance_schedule(Interval::Step, 4);
        assert_eq!(ctl.advances(), 0);
        assert_abs_diff_eq!(ctl.current_rate(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_frequency_gate() {
        let mut ctl = controller(3, Interval::Step);
        ctl.advance_schedule(Interval::Step, 1);
        ctl.advance_schedule(Interval::Step, 2);
        assert_eq!(ctl.advances(), 0);
        ctl.advance_schedule(Interval::Step, 3);
        assert_eq!(ctl.advances(), 1);
        ctl.advance_schedule(Interval::Step, 4);
        assert_eq!(ctl.advances(), 1);
        ctl.advance_schedule(Interval::Step, 6);
        assert_eq!(ctl.advances(), 2);
    }

    #[test]
    fn test_zero_frequency_never_passes() {
        let mut ctl = controller(0, Interval::Step);
        for count in 0..10 {
            ctl.advance_schedule(Interval::Step, count);
        }
        assert_eq!(ctl.advances(), 0);
    }

    #[test]
    fn test_advancement_scales_base_rate() {
        let mut ctl = controller(1, Interval::Epoch);
        ctl.advance_schedule(Interval::Epoch, 0);
        assert_abs_diff_eq!(ctl.current_rate(), 0.5, epsilon = 1e-12);
        ctl.advance_schedule(Interval::Epoch, 1);
        assert_abs_diff_eq!(ctl.current_rate(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_export_import_is_exact() {
        let mut a = controller(1, Interval::Step);
        for count in 1..=5 {
            a.advance_schedule(Interval::Step, count);
        }
        let state = a.export_state().unwrap();

        let mut b = controller(1, Interval::Step);
        b.import_state(&state).unwrap();
        assert_eq!(b.advances(), a.advances());
        assert_abs_diff_eq!(b.current_rate(), a.current_rate(), epsilon = 1e-12);

        // Both continue identically.
        a.advance_schedule(Interval::Step, 6);
        b.advance_schedule(Interval::Step, 6);
        assert_eq!(b.advances(), a.advances());
        assert_abs_diff_eq!(b.current_rate(), a.current_rate(), epsilon = 1e-12);
    }

    #[test]
    fn test_import_without_schedule_restores_rate() {
        let mut a = ScheduleController::new(Box::new(SpyOptimizer::with_rate(0.8)));
        // Simulate a run that had moved the rate before exporting.
        a.optimizer.set_rate(0.2);
        let exported = a.export_state().unwrap();

        let mut b = ScheduleController::new(Box::new(SpyOptimizer::with_rate(0.8)));
        b.import_state(&exported).unwrap();
        assert_abs_diff_eq!(b.current_rate(), 0.2, epsilon = 1e-12);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::optim::optimizer::testing::SpyOptimizer;
    use crate::optim::StepDecaySchedule;
    use proptest::prelude::*;

    proptest! {
        /// FALSIFY: some sequence of gate-failing calls mutates the
        /// controller (advances or rate).
        #[test]
        fn prop_noop_calls_are_idempotent(
            frequency in 2u64..9,
            counts in prop::collection::vec(0u64..1000, 1..50)
        ) {
            let mut ctl = ScheduleController::new(
                Box::new(SpyOptimizer::with_rate(1.0)),
            ).with_schedule(
                Box::new(StepDecaySchedule::new(0.5, 1)),
                Interval::Step,
                frequency,
            );
            let rate_before = ctl.current_rate();
            for count in counts {
                // Interval mismatch always fails the gate.
                ctl.advance_schedule(Interval::Epoch, count);
                // Non-multiples fail the frequency gate.
                if count % frequency != 0 {
                    ctl.advance_schedule(Interval::Step, count);
                }
            }
            prop_assert_eq!(ctl.advances(), 0);
            prop_assert_eq!(ctl.current_rate(), rate_before);
        }

        /// FALSIFY: export/import drifts after further advancement.
        #[test]
        fn prop_round_trip_then_advance_matches(
            pre in 1u64..20,
            post in 1u64..20
        ) {
            let build = || ScheduleController::new(
                Box::new(SpyOptimizer::with_rate(2.0)),
            ).with_schedule(
                Box::new(StepDecaySchedule::new(0.9, 2)),
                Interval::Step,
                1,
            );

            let mut straight = build();
            for count in 1..=(pre + post) {
                straight.advance_schedule(Interval::Step, count);
            }

            let mut first = build();
            for count in 1..=pre {
                first.advance_schedule(Interval::Step, count);
            }
            let state = first.export_state().unwrap();
            let mut resumed = build();
            resumed.import_state(&state).unwrap();
            for count in (pre + 1)..=(pre + post) {
                resumed.advance_schedule(Interval::Step, count);
            }

            prop_assert_eq!(resumed.advances(), straight.advances());
            let diff = (resumed.current_rate() - straight.current_rate()).abs();
            prop_assert!(diff < 1e-12);
        }
    }
}
