#[macro_use]
extern crate failure;

pub mod backend;
pub mod config;
pub mod error;
pub mod overlay;
pub mod parking;
pub mod poller;
pub mod render;
pub mod session;
pub mod types;
pub mod views;
pub mod web;
pub mod workflow;
