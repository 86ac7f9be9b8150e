//! Redis pub/sub backend

mod bus;
mod pool;

pub use bus::{RedisEventBus, SubscriberConfig};
pub use pool::{RedisPool, RedisPoolConfig};
