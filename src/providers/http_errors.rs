use anyhow::anyhow;
use std::error::Error as StdError;
use std::io::ErrorKind;

fn error_chain_matches(
    err: &(dyn StdError + 'static),
    kind: ErrorKind,
    needle: &str,
) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == kind
        {
            return true;
        }

        if source.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }

        current = source.source();
    }

    false
}

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::ConnectionRefused, "connection refused")
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::TimedOut, "timed out")
}

pub(crate) fn model_api_request_error(
    err: reqwest::Error,
    api_url: &str,
    provider: &str,
) -> anyhow::Error {
    if err.is_timeout() || error_chain_has_timeout(&err) {
        return anyhow!(
            "Request to {} timed out while calling '{}'.",
            provider,
            api_url
        );
    }

    if err.is_connect() {
        if error_chain_has_connection_refused(&err) {
            if provider == "ollama" {
                return anyhow!(
                    "Connection refused by '{}'. Ensure the Ollama server is running locally.",
                    api_url
                );
            }
            return anyhow!("Connection refused by {} API at '{}'.", provider, api_url);
        }

        return anyhow!(
            "Failed to connect to {} API at '{}'. Check network connectivity.",
            provider,
            api_url
        );
    }

    anyhow!("Failed to call {} API at '{}': {}", provider, api_url, err)
}

pub(crate) async fn non_success_error(
    response: reqwest::Response,
    provider: &str,
) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read response body>".to_string());
    tracing::warn!(
        provider,
        status = %status,
        response_body_len = body.len(),
        "provider returned non-success status"
    );
    anyhow!("{} request failed with status {}: {}", provider, status, body)
}
