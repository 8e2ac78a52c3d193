pub mod access;
pub mod client_scope;
pub mod file_response;
pub mod tokens;
pub mod upload;
