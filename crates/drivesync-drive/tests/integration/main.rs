//! Integration tests for drivesync-drive
//!
//! Uses wiremock to simulate the Google Drive v3 API and the OAuth token
//! endpoint, and verifies end-to-end behavior of listing, uploads, error
//! mapping and token exchange.

mod common;

mod test_errors;
mod test_list;
mod test_oauth;
mod test_refresh;
mod test_upload;
