pub mod controller;
pub mod correlate;
