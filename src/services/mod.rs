// src/services/mod.rs

pub mod account;
pub mod bump;
pub mod capability;
pub mod listing;
pub mod login_gate;
pub mod password_history;
pub mod password_policy;
