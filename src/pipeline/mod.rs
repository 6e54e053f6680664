mod coordinator;
mod state;
mod summary;
mod window;

pub use coordinator::{
    DEFAULT_CHUNK_SIZE, DEFAULT_CONSUMERS, DEFAULT_QUEUE_CAPACITY, PipelinePlan, run_pipeline,
};
pub use state::ProducerState;
pub use summary::RunSummary;
