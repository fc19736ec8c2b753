pub mod client;
pub mod manager;
pub mod model;
pub mod probe;
pub mod prober;
pub mod scale;

pub use manager::Manager;
pub use prober::Prober;

#[cfg(test)]
pub mod fixtures;
