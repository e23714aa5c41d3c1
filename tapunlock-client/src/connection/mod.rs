//! Connection to the detection service

mod client;

pub use client::Connection;
