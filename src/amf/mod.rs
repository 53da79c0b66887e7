// AMF0 parsers and serializers

mod amf0;
mod decode;

pub use amf0::*;
pub use decode::*;
