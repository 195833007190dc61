pub mod aggregator;
pub mod dispatcher;
pub mod pipeline;
