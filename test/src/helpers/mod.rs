pub mod channel_network;

pub use channel_network::{ChannelNetwork, PendingData};

/// Routes `log` output through the test harness, safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
