//! Logging and trace export for docchat.

pub mod tracing_setup;
