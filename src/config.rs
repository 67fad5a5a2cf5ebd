use failure::Error;
use log::info;
use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: Url,
    pub listen_addr: SocketAddr,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub max_upload_bytes: u64,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        let poll_ms: u64 = try_load("POLL_INTERVAL_MS", "3000")?;
        if poll_ms == 0 {
            return Err(format_err!("POLL_INTERVAL_MS must be greater than zero"));
        }
        Ok(Config {
            backend_url: backend_url(&load_var("BACKEND_URL", "http://localhost:5000/"))?,
            listen_addr: try_load("LISTEN_ADDR", "0.0.0.0:8402")?,
            poll_interval: Duration::from_millis(poll_ms),
            request_timeout: Duration::from_secs(try_load("REQUEST_TIMEOUT_SECS", "30")?),
            max_upload_bytes: try_load("MAX_UPLOAD_BYTES", "10485760")?,
        })
    }
}

fn load_var(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{} not set, using default: {}", key, default);
        default.to_string()
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, Error>
where
    T::Err: Display,
{
    let value = load_var(key, default);
    value
        .parse()
        .map_err(|e| format_err!("Invalid {} value {:?}: {}", key, value, e))
}

/// Parses the backend origin, making sure relative endpoint paths join under it.
pub fn backend_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw).map_err(|e| format_err!("Invalid BACKEND_URL {:?}: {}", raw, e))?;
    if url.cannot_be_a_base() {
        return Err(format_err!("BACKEND_URL {:?} cannot be a base URL", raw));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
