pub mod banner;
pub mod handler;
pub mod keys;
