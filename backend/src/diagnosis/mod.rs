pub mod classifier;
pub mod response;
