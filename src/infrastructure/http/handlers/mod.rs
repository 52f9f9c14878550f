//! HTTP Handlers

mod ping;
mod speech;
mod state_sync;
mod worker;

pub use ping::ping;
pub use speech::{clear_queue, enqueue_speech, queue_status};
pub use state_sync::{get_state, push_state};
pub use worker::{join_channel, leave_channel, worker_info};
