pub mod api;
pub mod common;
pub mod configs;
pub mod gateway;
pub mod monitoring;
pub mod rest;
pub mod server;
pub mod tracker;
pub mod transport;
