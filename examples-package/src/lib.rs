//! Runnable examples for the range query cache. See `examples/`.
