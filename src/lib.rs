pub mod algorithm;
pub mod common;
pub mod config;
pub mod error;
pub mod experiment;
pub mod generator;
pub mod map;
pub mod risk;
pub mod simulation;
pub mod stat;
