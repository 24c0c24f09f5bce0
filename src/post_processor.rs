//! Per-issue notification requests sent after a release is written.
use log::*;
use reqwest::{
    blocking::Client,
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};

use crate::{
    config::{AuthType, PostProcessConfig},
    error::{ChangelogError, Result},
};

/// Resolved request authentication.
enum Auth {
    None,
    Basic { username: String, password: String },
    Bearer(String),
}

/// Read auth content from the configured environment variable. Basic auth
/// expects "{username}:{api_key}".
fn resolve_auth(config: &PostProcessConfig) -> Result<Auth> {
    let Some(env_name) = &config.auth_env else {
        return Ok(Auth::None);
    };

    let value = std::env::var(env_name).map_err(|_| {
        ChangelogError::invalid_config(format!(
            "missing environment variable '{}'",
            env_name
        ))
    })?;

    match config.auth_type {
        AuthType::Basic => {
            let (username, password) =
                value.split_once(':').ok_or_else(|| {
                    ChangelogError::invalid_config(format!(
                        "'{}' must contain '{{username}}:{{api_key}}'",
                        env_name
                    ))
                })?;

            Ok(Auth::Basic {
                username: username.to_string(),
                password: password.to_string(),
            })
        }
        AuthType::Bearer => Ok(Auth::Bearer(value)),
    }
}

/// Fill `::issue_ref::` and `::version::` placeholders in a template.
fn substitute(template: &str, issue_ref: &str, version: &str) -> String {
    template
        .replace("::issue_ref::", issue_ref)
        .replace("::version::", version)
}

fn request_headers(config: &PostProcessConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ChangelogError::invalid_config(format!(
                "invalid post-process header name '{}'",
                name
            ))
        })?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            ChangelogError::invalid_config(format!(
                "invalid post-process header value for '{}'",
                name
            ))
        })?;

        headers.insert(name, value);
    }

    Ok(headers)
}

/// Send one notification request per issue ref. Misconfiguration fails the
/// whole fan-out; per-request network failures are logged and skipped so one
/// unreachable issue does not block the rest.
pub fn per_issue_post_process(
    config: &PostProcessConfig,
    issue_refs: &[String],
    version_tag: &str,
    dry_run: bool,
) -> Result<()> {
    if config.url.is_empty() {
        return Ok(());
    }

    warn!("per issue post processing");

    let auth = resolve_auth(config)?;
    let method =
        Method::from_bytes(config.verb.as_bytes()).map_err(|_| {
            ChangelogError::invalid_config(format!(
                "invalid post-process verb '{}'",
                config.verb
            ))
        })?;

    let client = Client::builder()
        .default_headers(request_headers(config)?)
        .build()?;

    for issue_ref in issue_refs {
        let url = substitute(&config.url, issue_ref, version_tag);
        let body = substitute(&config.body, issue_ref, version_tag);

        if dry_run {
            info!("  would request: {} {} {}", config.verb, url, body);
            continue;
        }

        info!("  request: {} {} {}", config.verb, url, body);

        let mut request = client.request(method.clone(), &url).body(body);

        request = match &auth {
            Auth::None => request,
            Auth::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Auth::Bearer(token) => request.bearer_auth(token),
        };

        match request.send() {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => error!(
                "post process request failed for '{}': status {}",
                issue_ref,
                response.status()
            ),
            Err(e) => error!(
                "post process request failed for '{}': {}",
                issue_ref, e
            ),
        }
    }

    Ok(())
}
