//! Core data types for the scalping engine.

mod account;
mod bar;
mod order;
mod signal;
mod timeframe;

pub use account::AccountState;
pub use bar::{Bar, BarSeries};
pub use order::{BrokerPosition, OrderRequest, OrderTicket};
pub use signal::{Direction, Signal};
pub use timeframe::Timeframe;
