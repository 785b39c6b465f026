//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! database row, plus `Deserialize` DTOs for inserts and patches where the
//! table takes writes from the API.

pub mod comment;
pub mod event;
pub mod history;
pub mod note;
pub mod notification;
pub mod template;
pub mod user;
