//! UDP caption relay: wire codec, peer tracking, listener service.

pub mod packet;
pub mod peers;
pub mod service;
