//! Retrieval-augmented answering over the trámite index.
//!
//! A question comes in, gets rewritten into a formal search query, the
//! nearest documents come back from the index, and a completion call
//! composes an answer constrained to those documents. The HTTP surface in
//! [`server`] exposes this as `POST /chat`.

mod prompts;
mod server;
mod service;

pub use prompts::NOT_FOUND_MESSAGE;
pub use server::{router, serve};
pub use service::{Answer, AnswerService};
