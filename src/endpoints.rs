use crate::{error::AppError, model::Endpoint};

/// Turns the JSON endpoint list into one URL per line, in input order.
pub fn extract_urls(raw: &str) -> Result<String, AppError> {
    let endpoints: Vec<Endpoint> = serde_json::from_str(raw)?;

    let mut urls = String::new();
    for endpoint in endpoints {
        urls.push_str(&endpoint.url);
        urls.push('\n');
    }

    Ok(urls)
}
