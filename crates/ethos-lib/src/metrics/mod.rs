pub mod binned;
pub mod ratio;
pub mod trials;
