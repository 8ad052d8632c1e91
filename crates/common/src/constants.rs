use fancy_regex::Regex;
use lazy_static::lazy_static;

lazy_static! {
    /// The following regex is used to validate Ethereum addresses.
    pub static ref ADDRESS_REGEX: Regex = Regex::new("^(0x)?[0-9a-fA-F]{40}$").expect("failed to compile regex");
}
