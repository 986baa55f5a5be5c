pub mod accounts;
pub mod config;
pub mod db;
pub mod error;
pub mod names;
pub mod util;

pub use error::{Error, Result};
