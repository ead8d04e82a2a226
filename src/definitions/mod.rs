//! Test and server definitions
//!
//! Deserializes the servers file and the `*.test.json` files, resolves
//! `@file` references and `${env:...}` values, and validates everything
//! before a single request is sent.

mod env;
mod loader;
mod server;
mod test_case;

pub use env::substitute_env;
pub use loader::{
    load_servers, load_suite, Suite, TestFile, SETUP_FILE, TEARDOWN_FILE, TEST_FILE_SUFFIX,
};
pub use server::{ApiKey, Authentication, JwtSource, ServerProfile, SessionConfig};
pub use test_case::{ExpectedResponse, TestCase};
