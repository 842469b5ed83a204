// src/models/mod.rs

pub mod advertising;
pub mod category;
pub mod conversation;
pub mod post;
pub mod preferences;
pub mod reply;
pub mod user;
