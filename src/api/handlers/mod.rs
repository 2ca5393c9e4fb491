//! HTTP request handlers

pub mod admin;
pub mod front;
pub mod health;
pub mod webhook;
