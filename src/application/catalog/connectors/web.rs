use super::{required_str, InvokeError, ToolInvoker};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub enum WebOp {
    FetchJson,
    Search,
}

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const MAX_SEARCH_RESULTS: usize = 8;

/// Web tools: JSON fetch and a best-effort HTML search scrape. The search
/// result shape is not stable; downstream consumers must not depend on
/// specific fields being present.
pub struct WebTool {
    op: WebOp,
    http: Client,
}

impl WebTool {
    pub fn new(op: WebOp, http: Client) -> Self {
        Self { op, http }
    }
}

#[async_trait]
impl ToolInvoker for WebTool {
    async fn invoke(&self, args: Value) -> Result<Value, InvokeError> {
        match self.op {
            WebOp::FetchJson => {
                let url = required_str(&args, "url")?;
                let response = self.http.get(url).send().await?;
                let status = response.status().as_u16();
                let body: Value = response.json().await?;
                Ok(json!({ "status": status, "body": body }))
            }
            WebOp::Search => {
                let query = required_str(&args, "query")?;
                let response = self
                    .http
                    .get(SEARCH_ENDPOINT)
                    .query(&[("q", query)])
                    .send()
                    .await?;
                let html = response.text().await?;
                let results = scrape_results(&html);
                debug!(query, results = results.len(), "Web search scraped");
                Ok(json!({ "query": query, "results": results }))
            }
        }
    }
}

/// Lenient scrape of the search result page: anchor tags carrying the
/// `result__a` class, paired with the following snippet block when one
/// exists. Anything that fails to parse is skipped silently.
fn scrape_results(html: &str) -> Vec<Value> {
    let mut results = Vec::new();
    let mut cursor = 0usize;

    while let Some(offset) = html[cursor..].find("result__a") {
        let anchor_at = cursor + offset;
        cursor = anchor_at + "result__a".len();

        let Some(href) = attribute_after(html, anchor_at, "href=\"") else {
            continue;
        };
        let Some(title) = text_between(html, anchor_at, '>', "</a>") else {
            continue;
        };

        let snippet = html[cursor..]
            .find("result__snippet")
            .and_then(|snippet_offset| {
                text_between(html, cursor + snippet_offset, '>', "</a>")
                    .or_else(|| text_between(html, cursor + snippet_offset, '>', "</div>"))
            });

        results.push(json!({
            "title": strip_tags(&title),
            "url": href,
            "snippet": snippet.map(|s| strip_tags(&s)),
        }));
        if results.len() >= MAX_SEARCH_RESULTS {
            break;
        }
    }

    results
}

fn attribute_after(html: &str, from: usize, marker: &str) -> Option<String> {
    let start = from + html[from..].find(marker)? + marker.len();
    let end = start + html[start..].find('"')?;
    Some(html[start..end].to_string())
}

fn text_between(html: &str, from: usize, open: char, close: &str) -> Option<String> {
    let start = from + html[from..].find(open)? + open.len_utf8();
    let end = start + html[start..].find(close)?;
    Some(html[start..end].trim().to_string())
}

fn strip_tags(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => cleaned.push(ch),
            _ => {}
        }
    }
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_extracts_title_url_and_snippet() {
        let html = r##"
            <a class="result__a" href="https://example.com/gold">Gold <b>price</b> today</a>
            <a class="result__snippet" href="#">Spot gold trades at 2650.</a>
        "##;
        let results = scrape_results(html);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["title"], "Gold price today");
        assert_eq!(results[0]["url"], "https://example.com/gold");
        assert_eq!(results[0]["snippet"], "Spot gold trades at 2650.");
    }

    #[test]
    fn scrape_tolerates_markup_it_does_not_recognize() {
        assert!(scrape_results("<html><body>nothing here</body></html>").is_empty());
        assert!(scrape_results("result__a with no anchor").is_empty());
    }
}
