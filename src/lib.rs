pub mod aggregate;
pub mod compare;
pub mod config;
pub mod error;
pub mod features;
pub mod fixtures;
pub mod league;
pub mod lineup;
pub mod player;
pub mod predictor;
pub mod scoring;
pub mod stability;
pub mod tree;
