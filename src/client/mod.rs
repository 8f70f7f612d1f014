//! HTTP client for the print-on-demand provider.

pub mod http;
