// src/live/mod.rs
pub mod client;
pub mod message;

pub use client::{
    ChannelConfig, ChannelState, ConnectionId, HandlerId, LiveChannel, MessageHandler,
    DEFAULT_RECONNECT_DELAY,
};
pub use message::{ControlMessage, LiveMessage, DEFAULT_CHANNEL};
