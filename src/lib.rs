// RTMP streaming server and client library

pub mod amf;
pub mod client;
pub mod log;
pub mod rtmp;
pub mod server;
pub mod session;
pub mod utils;
