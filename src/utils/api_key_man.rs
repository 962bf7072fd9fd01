use std::fs::File;
use std::io::{self, BufRead, BufReader};

use crate::exchanges::kraken::Credentials;

/// Reads a key file of the form
///
/// ```text
/// api_key: <key>
/// api_sec: <base64 secret>
/// ```
pub fn read_api_credentials_from_file(file_path: &str) -> io::Result<Credentials> {
    let file = File::open(file_path)?;
    parse_api_credentials(BufReader::new(file))
}

pub fn parse_api_credentials<R: BufRead>(reader: R) -> io::Result<Credentials> {
    let mut api_key = String::new();
    let mut api_sec = String::new();

    for line in reader.lines() {
        let line = line?;
        if let Some(key) = line.strip_prefix("api_key:") {
            api_key = key.trim().to_string();
        } else if let Some(sec) = line.strip_prefix("api_sec:") {
            api_sec = sec.trim().to_string();
        }
    }

    if api_key.is_empty() || api_sec.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "key file needs both api_key and api_sec",
        ));
    }
    Ok(Credentials::new(api_key, api_sec))
}

/// `KRAKEN_API_KEY` and `KRAKEN_API_SECRET`, when both are set.
pub fn read_api_credentials_from_env() -> Option<Credentials> {
    let api_key = std::env::var("KRAKEN_API_KEY").ok()?;
    let api_sec = std::env::var("KRAKEN_API_SECRET").ok()?;
    Some(Credentials::new(api_key, api_sec))
}
