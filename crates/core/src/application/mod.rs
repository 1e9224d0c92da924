// Application Layer - Use Cases and Delivery Workers

pub mod pool;
pub mod producer;
pub mod worker;

// Re-exports
pub use pool::{PoolConfig, PoolMonitor, WorkerPool};
pub use producer::{EnqueueRequest, TaskProducer};
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker, WorkerConfig, WorkerState};
