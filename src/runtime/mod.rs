pub mod callable;
pub mod engine;
pub mod graph;
pub mod history;
pub mod step;
pub mod worker;
