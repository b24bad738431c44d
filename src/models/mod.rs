// src/models/mod.rs

pub mod ledger;
pub mod quiz;
