pub mod agreement;
pub mod common;
pub mod doi;
pub mod intake;
pub mod pending;
pub mod retrieve;
pub mod status;
pub mod transition;
