// src/lib.rs
pub mod config;
pub mod errors;
pub mod models;
pub mod client;
pub mod controller;
pub mod filter;
pub mod selection;
pub mod banner;
pub mod api;
