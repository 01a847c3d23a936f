pub mod doctor;
pub mod hash_pin;
pub mod provision;
pub mod serve;
