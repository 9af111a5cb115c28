//! Order execution: the REST executor, the event funnel, and the user
//! data stream handler.

pub mod events;
pub mod executor;
pub mod user_stream;

pub use events::{spawn as spawn_event_writer, EventSink, EventWriter};
pub use executor::{decimals_from_step, format_with_precision, Executor};
pub use user_stream::parse_order_update;
