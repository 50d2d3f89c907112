//! Optimizer seam, rate schedules, and the gated schedule controller.

mod control;
pub(crate) mod optimizer;
mod schedule;

pub use control::{ControllerState, ScheduleController};
pub use optimizer::Optimizer;
pub use schedule::{
    ConstantSchedule, Interval, RateSchedule, StepDecaySchedule, WarmupDecaySchedule,
};
