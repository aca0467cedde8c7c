//! HTTP implementations of the quote source and CRM seams.

pub mod monday;
pub mod simpro;

pub use monday::MondayClient;
pub use simpro::{SimproClient, SimproSourceFactory};
