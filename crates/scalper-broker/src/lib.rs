//! Broker connectors.

pub mod sim;

pub use sim::{SimBroker, SimClose};
