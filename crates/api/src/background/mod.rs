//! Background tasks.
//!
//! Each submodule provides a long-running async loop intended to be spawned
//! via `tokio::spawn`, stopping when its [`CancellationToken`] fires.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod scheduled_dispatch;
