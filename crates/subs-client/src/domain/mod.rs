//! Client commands and field rules.

pub mod commands;
pub mod validation;
