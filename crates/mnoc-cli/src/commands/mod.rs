pub mod common;
pub mod plan;
pub mod queue;
pub mod submit;
pub mod worker;
