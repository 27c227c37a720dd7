//! Command-line front end for the lexdec decoder.

pub mod cli;
pub mod config;
pub mod decode;
pub mod spell;
