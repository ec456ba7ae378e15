//! Background Tasks Module
//!
//! Contains the background tasks driving automatic eviction.
//!
//! # Tasks
//! - Expiry scheduler: turns entry deadlines into eviction events

mod expiry;

pub use expiry::{spawn_expiry_scheduler, ExpiryTicket};
