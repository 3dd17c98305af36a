pub mod appointment;
pub mod doctor;
pub mod enums;
pub mod patient;
pub mod service;

pub use appointment::*;
pub use doctor::*;
pub use enums::*;
pub use patient::*;
pub use service::*;
