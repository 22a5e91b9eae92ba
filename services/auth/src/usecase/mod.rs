pub mod auth;
pub mod otp;
pub mod password;
pub mod refresh;
pub mod token;
