pub mod check;
pub mod secrets;
pub mod serve;
pub mod token;
