pub mod session;
pub mod strategy;
