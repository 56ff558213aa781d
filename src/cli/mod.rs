//! Command-line front end: parses arguments, calls the service, prints results

pub mod convert;
pub mod price;
pub mod production;
pub mod setup;
pub mod shell;
pub mod status;
pub mod ui;
