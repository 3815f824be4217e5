pub mod config;
pub mod http;
pub mod mods;
pub mod util;
