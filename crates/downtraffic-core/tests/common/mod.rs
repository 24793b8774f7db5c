#![allow(dead_code)]

pub mod payload_server;
