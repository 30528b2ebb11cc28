pub mod scoring;
pub mod session;

pub use crate::scoring::{Judgement, Scorekeeper, Tally};
pub use crate::session::Session;
