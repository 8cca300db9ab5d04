//! REST client for the scheduler backend (`<base_url>/api/v1`).

mod client;
mod envelope;
mod error;

pub use client::{ApiClient, Payload};
pub use envelope::{Envelope, SUCCESS_CODE, UNAUTHORIZED_CODE};
pub use error::Error;

#[cfg(test)]
pub(crate) mod mock;
#[cfg(test)]
mod tests;
