pub mod clean;
pub mod describe;
pub mod predict;
pub mod rate;
pub mod setup;
pub mod ui;
