//! Client driver
//!
//! Drives commands over a control connection, listening for the server's
//! data channel whenever a command carries a payload.

pub mod driver;
pub mod results;

pub use driver::FtpClient;
pub use results::{Reply, TransferOutcome};
