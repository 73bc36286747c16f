//! Worker module split across focused submodules:
//! - `shared`: state shared across workers (queue, progress board, operation)
//! - `process`: worker struct plus the claim-and-execute loop
//! - `tests`: worker unit tests

mod process;
mod shared;

#[cfg(test)]
mod tests;

pub(crate) use process::{panic_message, Worker};
pub(crate) use shared::{WorkerShared, WorkerSharedParams};
