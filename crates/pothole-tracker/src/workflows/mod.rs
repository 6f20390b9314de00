pub mod intake;
pub mod memory;
pub mod repairs;
