mod idea;
mod stage;

pub use idea::{Idea, TransitionRequest};
pub use stage::{JobKind, Stage, required_jobs};
