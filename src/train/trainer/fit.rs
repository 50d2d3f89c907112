//! The multi-epoch fit loop, best-model selection, and the TEST entry.

use std::time::Instant;

use super::core::Trainer;
use super::result::FitResult;
use crate::checkpoint::{BestModelRecord, CheckpointStore, BEST_MODEL};
use crate::error::{Error, Result};
use crate::metric::MetricSnapshot;
use crate::optim::Interval;
use crate::train::{DataSource, LoopPhase, Mode, TrainTask};

impl<T: TrainTask> Trainer<T> {
    /// Run the remaining epochs: for each one a TRAIN pass over
    /// `train`, a VALIDATE pass over `valid`, then the end-of-epoch
    /// bookkeeping (epoch-cadence schedule advance, best-model
    /// selection, snapshot and rolling-checkpoint writes).
    ///
    /// Picks up wherever `current_epoch` stands, so the same call
    /// drives both fresh and resumed runs. With zero epochs remaining
    /// it completes without touching the collaborators or the store.
    ///
    /// The first error from any collaborator or the store aborts the
    /// run. The rolling checkpoint is only written at the end of a
    /// fully completed epoch, so the last durable state is always
    /// consistent.
    pub fn fit<DT, DV>(&mut self, train: &mut DT, valid: &mut DV) -> Result<FitResult>
    where
        DT: DataSource<Batch = T::Batch>,
        DV: DataSource<Batch = T::Batch>,
    {
        let started = Instant::now();
        while self.state.current_epoch < self.state.total_epochs {
            self.log_epoch_banner();
            self.train_epoch(train)?;
            let snapshot = self.eval_epoch(Mode::Validate, valid)?;
            self.finish_epoch(&snapshot)?;
        }
        self.phase = LoopPhase::Completed;
        self.log_run_summary();
        Ok(self.fit_result(started))
    }

    /// Run one TEST pass over `source`.
    ///
    /// Usable mid-run or after completion; the state-machine phase is
    /// restored afterwards and no counter, schedule, or checkpoint
    /// state moves.
    pub fn evaluate<D>(&mut self, source: &mut D) -> Result<MetricSnapshot>
    where
        D: DataSource<Batch = T::Batch>,
    {
        let prior = self.phase;
        let result = self.eval_epoch(Mode::Test, source);
        self.phase = prior;
        result
    }

    /// End-of-epoch bookkeeping, in checkpoint-consistency order: the
    /// epoch-cadence schedule advance and best-model selection happen
    /// before the rolling checkpoint is written, so the record captures
    /// them; the epoch counter moves only after the write succeeds.
    fn finish_epoch(&mut self, snapshot: &MetricSnapshot) -> Result<()> {
        self.controller.advance_schedule(Interval::Epoch, self.state.current_epoch);
        self.select_best(snapshot)?;

        let epoch = self.state.current_epoch;
        if epoch > self.config.save_model_after_epoch
            && epoch % self.config.save_model_every_epoch == 0
        {
            let blob = self.task.export_params()?;
            self.store.save_model_blob(&CheckpointStore::snapshot_name(epoch), &blob)?;
        }

        let record = self.build_record()?;
        self.store.save_latest(&record)?;

        self.state.current_epoch += 1;
        self.phase = LoopPhase::Idle;
        Ok(())
    }

    /// Compare this epoch's validation snapshot against the best so
    /// far on the primary metric. Strict improvement (or no incumbent)
    /// replaces the best record and rewrites the best-model blob; a tie
    /// keeps the earlier epoch.
    fn select_best(&mut self, snapshot: &MetricSnapshot) -> Result<()> {
        let primary = &self.config.primary_metric;
        let candidate = snapshot
            .get(primary)
            .copied()
            .ok_or_else(|| Error::unknown_metric(primary))?;

        let improved = match &self.best {
            None => true,
            Some(best) => match best.metrics.get(primary) {
                Some(incumbent) => self.config.direction.improves(candidate, *incumbent),
                // The recorded best predates this primary metric
                // (resumed under a changed config): no baseline.
                None => true,
            },
        };
        if !improved {
            return Ok(());
        }

        self.best = Some(BestModelRecord {
            metrics: snapshot.clone(),
            epoch: self.state.current_epoch,
        });
        let blob = self.task.export_params()?;
        self.store.save_model_blob(BEST_MODEL, &blob)?;

        let line = format!(
            "new best at epoch {:03}: {primary}={candidate:.6}",
            self.state.current_epoch
        );
        self.logger.log_text(&line, self.state.global_step);
        Ok(())
    }

    /// Start-of-epoch banner: where the best stands and the current rate.
    fn log_epoch_banner(&mut self) {
        let step = self.state.global_step;
        let best_epoch = self.best.as_ref().map_or(0, |b| b.epoch);
        self.logger.log_text(&format!("best epoch: {best_epoch}"), step);
        self.logger.log_text(&format!("lr: {:.6}", self.controller.current_rate()), step);
    }

    fn log_run_summary(&mut self) {
        let step = self.state.global_step;
        let rate = self.controller.current_rate();
        match self.best.clone() {
            Some(best) => {
                self.logger.log_text(&format!("best epoch: {}", best.epoch), step);
                for (name, value) in &best.metrics {
                    self.logger.log_text(&format!("best {name}: {value:.6}"), step);
                }
            }
            None => self.logger.log_text("best epoch: 0", step),
        }
        self.logger.log_text(&format!("lr: {rate:.6}"), step);
        self.logger.log_text("training complete", step);
    }

    fn fit_result(&self, started: Instant) -> FitResult {
        let primary = &self.config.primary_metric;
        FitResult {
            final_epoch: self.state.current_epoch,
            global_step: self.state.global_step,
            best_epoch: self.best.as_ref().map(|b| b.epoch),
            best_metric: self.best.as_ref().and_then(|b| b.metrics.get(primary).copied()),
            elapsed_secs: started.elapsed().as_secs_f64(),
        }
    }
}
