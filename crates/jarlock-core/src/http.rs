//! Blocking HTTP GET over libcurl.
//!
//! Every call uses a fresh `Easy` handle with connect and total timeouts.
//! Runs in the current thread; call from `spawn_blocking` if used from async code.

use std::time::Duration;

use serde_json::Value;

use crate::checksum::CHUNK_SIZE;
use crate::config::JarlockConfig;
use crate::retry::FetchError;

const USER_AGENT: &str = concat!("jarlock/", env!("CARGO_PKG_VERSION"));

/// Timeouts applied to each request.
#[derive(Debug, Clone, Copy)]
pub struct HttpClient {
    pub connect_timeout: Duration,
    /// Total time for listing/info calls.
    pub timeout: Duration,
    /// Artifact downloads abort if the transfer stalls below 1 KiB/s for this long.
    pub stall_timeout: Duration,
    /// Total time allowed for one artifact download attempt.
    pub artifact_timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(60),
            stall_timeout: Duration::from_secs(60),
            artifact_timeout: Duration::from_secs(1800),
        }
    }
}

impl HttpClient {
    pub fn from_config(cfg: &JarlockConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            timeout: cfg.timeout(),
            stall_timeout: cfg.timeout(),
            artifact_timeout: cfg.artifact_timeout(),
        }
    }

    fn easy(&self, url: &str) -> Result<curl::easy::Easy, FetchError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.useragent(USER_AGENT)?;
        easy.connect_timeout(self.connect_timeout)?;
        Ok(easy)
    }

    /// GET `url` and parse the body as JSON. Non-2xx is `FetchError::Http`;
    /// a body that is not JSON is `FetchError::Malformed`.
    pub fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let mut easy = self.easy(url)?;
        easy.timeout(self.timeout)?;
        easy.http_headers({
            let mut list = curl::easy::List::new();
            list.append("Accept: application/json")?;
            list
        })?;

        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }
        check_status(&mut easy)?;

        serde_json::from_slice(&body)
            .map_err(|e| FetchError::Malformed(format!("GET {}: {}", url, e)))
    }

    /// GET `url` and feed the body to `sink` in chunks of at most `CHUNK_SIZE`
    /// bytes as it arrives. Returns the number of bytes streamed.
    ///
    /// The body is passed to `sink` before the status is known; callers must
    /// discard what they accumulated when this returns an error.
    pub fn get_streaming<F>(&self, url: &str, mut sink: F) -> Result<u64, FetchError>
    where
        F: FnMut(&[u8]),
    {
        let mut easy = self.easy(url)?;
        easy.buffer_size(CHUNK_SIZE)?;
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(self.stall_timeout)?;
        easy.timeout(self.artifact_timeout)?;
        easy.fail_on_error(true)?;

        let mut received = 0u64;
        let performed = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                for chunk in data.chunks(CHUNK_SIZE) {
                    sink(chunk);
                }
                received += data.len() as u64;
                Ok(data.len())
            })?;
            transfer.perform()
        };
        if let Err(e) = performed {
            // fail_on_error turns >= 400 into a curl error; surface the status instead.
            if e.is_http_returned_error() {
                check_status(&mut easy)?;
            }
            return Err(e.into());
        }
        check_status(&mut easy)?;
        Ok(received)
    }
}

fn check_status(easy: &mut curl::easy::Easy) -> Result<(), FetchError> {
    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }
    Ok(())
}

/// Render a JSON scalar build/version identifier as a string.
/// Upstreams use either strings (`"build-5"`) or numbers (`2213`).
pub fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
