//! accprof - OpenACC Profiling Interface on top of OMPT
//!
//! This library implements the OpenACC Profiling Interface for OpenACC
//! programs compiled to OpenMP offloading. It is loaded by the OpenMP
//! runtime as an OMPT tool, loads the profiling libraries named in
//! `ACC_PROFLIB`, and translates the runtime's OMPT device, region, and
//! data-operation callbacks into OpenACC profiling events.

pub mod acc;
pub mod adapter;
pub mod cli;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod entry;
pub mod error;
pub mod host;
pub mod info;
pub mod logging;
pub mod ompt;
pub mod proflib;
pub mod queue;
pub mod subscription;

pub use adapter::{Phase, ProfContext};
pub use error::{EventRef, UsageError};
pub use host::ToolHost;
