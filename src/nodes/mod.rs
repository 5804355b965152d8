pub mod activity;
pub mod event;
pub mod gateway;
pub mod task;
