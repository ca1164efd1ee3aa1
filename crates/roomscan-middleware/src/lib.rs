//! `roomscan-middleware` – signal routing.
//!
//! Carries calibration progress, feedback and lifecycle signals from the
//! scan loop to whoever is listening, without caring about their meaning.
//!
//! # Modules
//!
//! - [`bus`] – Headless, typed, topic-based publish/subscribe event bus built
//!   on Tokio broadcast channels.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
