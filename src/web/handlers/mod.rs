//! HTTP request handlers organized by domain

pub mod health;
pub mod server_status;
pub mod websocket;
