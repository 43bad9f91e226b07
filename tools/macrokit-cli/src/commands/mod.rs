pub mod click;
pub mod config;
pub mod info;
pub mod play;
pub mod validate;
