// RTMP protocol utilities

mod command;
mod constants;
mod data;
mod handshake;
mod messages;
mod packet;
mod url;

pub use command::*;
pub use constants::*;
pub use data::*;
pub use handshake::*;
pub use messages::*;
pub use packet::*;
pub use url::*;
