pub mod value;
pub mod record;
pub mod formatter;
pub mod handler;
pub mod layer;

#[cfg(feature = "http")]
pub mod http;
pub mod tcp;
pub mod udp;
pub mod noop;

pub mod init;
pub mod transport;
pub mod env;
