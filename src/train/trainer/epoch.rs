//! Per-epoch drivers: the TRAIN step loop and the evaluation pass.

use super::core::Trainer;
use crate::error::Result;
use crate::metric::{MetricSet, MetricSnapshot};
use crate::optim::Interval;
use crate::train::{DataSource, LoopPhase, Mode, TrainTask};

fn window_summary(snapshot: &MetricSnapshot) -> String {
    snapshot
        .iter()
        .map(|(name, value)| format!("{name}={value:.6}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl<T: TrainTask> Trainer<T> {
    /// Run one TRAIN epoch over `source`.
    ///
    /// Every batch runs the same sequence: clear gradients, read item,
    /// forward, fold metrics, backward, apply gradients, bump counters,
    /// maybe log, offer the per-step schedule advance. The metric
    /// window resets at the start of every step, so a log boundary
    /// reports that step's values rather than an epoch-wide mean.
    pub(crate) fn train_epoch<D>(&mut self, source: &mut D) -> Result<()>
    where
        D: DataSource<Batch = T::Batch>,
    {
        self.phase = LoopPhase::RunningEpoch(Mode::Train);
        self.state.local_step = 0;
        source.restart(self.state.epoch_seed(Mode::Train))?;

        let total = source.len();
        let mut window = MetricSet::new(self.task.metric_names());

        while let Some(batch) = source.next_batch()? {
            window.reset();
            self.controller.clear_gradients();

            let batch = self.task.read_item(batch)?;
            let output = self.task.run_step(&batch, Mode::Train)?;
            for (name, value) in output.values() {
                window.update(name, value, output.weight())?;
            }

            self.task.backward()?;
            self.controller.apply_gradients()?;

            self.state.global_step += 1;
            self.state.local_step += 1;

            if self.state.global_step % self.config.log_every_local_step == 0 {
                self.log_train_window(&window, total)?;
            }
            self.controller.advance_schedule(Interval::Step, self.state.global_step);
        }

        self.task.post_process(Mode::Train, None)
    }

    /// Run one evaluation pass (VALIDATE or TEST) over `source`.
    ///
    /// One window spans the whole pass; the aggregated snapshot is
    /// logged against the epoch axis, handed to the task's end-of-epoch
    /// hook, and returned. `global_step` and the schedule never move
    /// here. An empty source surfaces as [`Error::EmptyState`]: there
    /// is no honest aggregate to report.
    ///
    /// [`Error::EmptyState`]: crate::Error::EmptyState
    pub(crate) fn eval_epoch<D>(&mut self, mode: Mode, source: &mut D) -> Result<MetricSnapshot>
    where
        D: DataSource<Batch = T::Batch>,
    {
        self.phase = LoopPhase::RunningEpoch(mode);
        self.state.local_step = 0;
        source.restart(self.state.epoch_seed(mode))?;

        let total = source.len();
        let mut window = MetricSet::new(self.task.metric_names());

        while let Some(batch) = source.next_batch()? {
            let batch = self.task.read_item(batch)?;
            let output = self.task.run_step(&batch, mode)?;
            for (name, value) in output.values() {
                window.update(name, value, output.weight())?;
            }

            self.state.local_step += 1;

            if self.state.local_step % self.config.log_every_local_step == 0 {
                let running = window.snapshot()?;
                let line = format!(
                    "epoch {:03} ({mode}) {}/{total}: {}",
                    self.state.current_epoch,
                    self.state.local_step,
                    window_summary(&running),
                );
                self.logger.log_text(&line, self.state.global_step);
            }
        }

        let snapshot = window.snapshot()?;
        let line = format!(
            "epoch {:03} ({mode}) complete: {}",
            self.state.current_epoch,
            window_summary(&snapshot),
        );
        self.logger.log_text(&line, self.state.global_step);
        for (name, value) in &snapshot {
            self.logger.log_scalar(
                "epoch",
                self.state.current_epoch,
                &format!("{}/{name}", mode.tag()),
                *value,
            );
        }

        self.task.post_process(mode, Some(&snapshot))?;
        Ok(snapshot)
    }

    /// Emit the TRAIN log boundary: one text line plus one scalar per
    /// metric and the current rate, all against the global-step axis.
    fn log_train_window(&mut self, window: &MetricSet, total: usize) -> Result<()> {
        let snapshot = window.snapshot()?;
        let rate = self.controller.current_rate();
        let line = format!(
            "epoch {:03} (train) {}/{total}: {}, lr={rate:.6}",
            self.state.current_epoch,
            self.state.local_step,
            window_summary(&snapshot),
        );
        self.logger.log_text(&line, self.state.global_step);
        for (name, value) in &snapshot {
            self.logger.log_scalar(
                "step_global",
                self.state.global_step,
                &format!("train/{name}"),
                *value,
            );
        }
        self.logger.log_scalar("step_global", self.state.global_step, "lr", rate);
        Ok(())
    }
}
