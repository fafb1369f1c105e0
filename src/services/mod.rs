pub mod file;
pub mod message;
pub mod room;
pub mod user;
