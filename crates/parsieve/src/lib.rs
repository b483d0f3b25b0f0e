#![doc = include_str!("../README.md")]

mod aggregate;
mod api;
mod callback;
mod chunk;
mod config;
mod coordinator;
mod counters;
mod engine;
mod error;
pub(crate) mod mutex;
mod planner;
mod progress;
mod range;
mod status;

pub use crate::aggregate::*;
pub use crate::api::*;
pub use crate::callback::*;
pub use crate::chunk::*;
pub use crate::config::*;
pub use crate::coordinator::*;
pub use crate::counters::*;
pub use crate::engine::*;
pub use crate::error::*;
pub use crate::planner::*;
pub use crate::progress::*;
pub use crate::range::*;
pub use crate::status::*;
