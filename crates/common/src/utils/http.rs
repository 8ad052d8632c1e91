use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep as async_sleep;
use tracing::trace;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Make a POST request with a JSON body to the target URL, retrying up to `retries` times
/// with exponential backoff when the request cannot be sent or the server answers with a
/// non-success status.
///
/// ```no_run
/// use slotwatch_common::utils::http::post_json_to_url;
///
/// let url = "https://example.com/hook";
/// let body = serde_json::json!({ "text": "hello" });
/// // post_json_to_url(url, &body, 5, 2).await;
/// ```
pub async fn post_json_to_url<T: Serialize + ?Sized>(
    url: &str,
    body: &T,
    timeout: u64,
    retries: u8,
) -> Result<(), reqwest::Error> {
    let client = Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(Duration::from_secs(timeout))
        .build()?;

    let mut attempt: u32 = 0;
    loop {
        trace!("POST {}", &url);
        let result = client
            .post(url)
            .json(body)
            .send()
            .await
            .and_then(|res| res.error_for_status());

        match result {
            Ok(res) => {
                trace!("POST {}: {:?}", &url, &res);
                return Ok(());
            }
            Err(e) if attempt < retries as u32 => {
                trace!("POST {}: {:?}", &url, &e);

                // exponential backoff
                attempt += 1;
                let sleep_time = 2u64.pow(attempt) * 250;
                async_sleep(Duration::from_millis(sleep_time)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
