// src/lib.rs

//! alertcast: zone weather alert polling and announcement decisions

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
