pub mod detection;
pub mod upload;
