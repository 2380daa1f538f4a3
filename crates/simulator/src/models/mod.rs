//! Example models built on the kernel.

pub mod bank;
pub mod tank;

pub use bank::{run_bank, BankReport};
pub use tank::{run_tank, TankReport};
