/// Hexadecimal encoding utilities.
pub mod hex;

/// HTTP request utilities used for alert delivery.
pub mod http;

/// Input/output utilities for file manipulation.
pub mod io;

/// String manipulation and formatting utilities.
pub mod strings;
