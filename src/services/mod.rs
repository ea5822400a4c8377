pub mod gateway;
pub mod mock;
pub mod placeholder;
pub mod upstream;
