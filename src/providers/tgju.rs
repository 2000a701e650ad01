use anyhow::{Result, anyhow};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

use crate::core::numerals::to_latin_digits;
use crate::core::rate::{ExchangeRateProvider, REFERENCE_RATE, RateQuote};

pub const DEFAULT_BASE_URL: &str = "https://www.tgju.org";
const RATE_PAGE: &str = "/profile/price_dollar_rl";
const RATE_SELECTOR: &str = r#"span[data-col="info.last_trade.PDrCotVal"]"#;

/// Reads the last traded USD price in Rials from the tgju.org profile page.
pub struct TgjuRateProvider {
    base_url: String,
    fallback_rate: f64,
}

impl TgjuRateProvider {
    pub fn new(base_url: &str) -> Self {
        TgjuRateProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            fallback_rate: REFERENCE_RATE,
        }
    }

    pub fn with_fallback_rate(mut self, rate: f64) -> Self {
        self.fallback_rate = rate;
        self
    }
}

/// Pulls the rate out of the profile page markup.
pub fn extract_rate(html: &str) -> Result<f64> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse(RATE_SELECTOR).map_err(|e| anyhow!("Invalid rate selector: {e}"))?;

    let text = document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .ok_or_else(|| anyhow!("No exchange rate element found in page"))?;

    let cleaned: String = to_latin_digits(&text)
        .chars()
        .filter(|c| !matches!(c, ',' | '٬') && !c.is_whitespace())
        .collect();

    cleaned
        .parse::<f64>()
        .map_err(|e| anyhow!("Failed to parse exchange rate '{}': {}", text.trim(), e))
}

#[async_trait]
impl ExchangeRateProvider for TgjuRateProvider {
    #[instrument(name = "TgjuRateFetch", skip(self), fields(base_url = %self.base_url))]
    async fn fetch_rate(&self) -> Result<RateQuote> {
        let url = format!("{}{}", self.base_url, RATE_PAGE);
        debug!("Requesting exchange rate from {}", url);

        let client = reqwest::Client::builder().user_agent("hpx/1.0").build()?;
        let response = match client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Error in fetching {}: {}. Using fallback rate", url, e);
                return Ok(RateQuote::fallback(self.fallback_rate));
            }
        };

        if !response.status().is_success() {
            warn!(
                "Error in fetching {}: {}. Using fallback rate",
                url,
                response.status()
            );
            return Ok(RateQuote::fallback(self.fallback_rate));
        }

        let body = response.text().await?;
        let rate = extract_rate(&body)?;
        debug!(rate, "Parsed exchange rate");
        Ok(RateQuote::live(rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate::RateSource;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rate_page(value: &str) -> String {
        format!(
            r#"<html><body>
            <table><tr>
                <td>نرخ فعلی</td>
                <td><span data-col="info.last_trade.PDrCotVal">{value}</span></td>
            </tr></table>
            </body></html>"#
        )
    }

    async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RATE_PAGE))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[test]
    fn test_extract_rate_latin_digits() {
        assert_eq!(extract_rate(&rate_page("612,350")).unwrap(), 612_350.0);
    }

    #[test]
    fn test_extract_rate_persian_digits() {
        assert_eq!(extract_rate(&rate_page("۶۱۲٬۳۵۰")).unwrap(), 612_350.0);
    }

    #[test]
    fn test_extract_rate_missing_element() {
        let err = extract_rate("<html><body><span>612,350</span></body></html>").unwrap_err();
        assert_eq!(err.to_string(), "No exchange rate element found in page");
    }

    #[test]
    fn test_extract_rate_unparsable() {
        let err = extract_rate(&rate_page("n/a")).unwrap_err();
        assert!(err.to_string().contains("Failed to parse exchange rate 'n/a'"));
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_server = create_mock_server(200, &rate_page("598,700")).await;
        let provider = TgjuRateProvider::new(&mock_server.uri());

        let quote = provider.fetch_rate().await.unwrap();
        assert_eq!(quote.rate, 598_700.0);
        assert_eq!(quote.source, RateSource::Live);
    }

    #[tokio::test]
    async fn test_error_status_uses_fallback() {
        let mock_server = create_mock_server(503, "").await;
        let provider = TgjuRateProvider::new(&mock_server.uri());

        let quote = provider.fetch_rate().await.unwrap();
        assert_eq!(quote.rate, 300000.0);
        assert_eq!(quote.source, RateSource::Fallback);
    }

    #[tokio::test]
    async fn test_not_found_uses_configured_fallback() {
        let mock_server = MockServer::start().await;
        let provider = TgjuRateProvider::new(&mock_server.uri()).with_fallback_rate(420_000.0);

        let quote = provider.fetch_rate().await.unwrap();
        assert_eq!(quote.rate, 420_000.0);
        assert!(quote.is_fallback());
    }

    #[tokio::test]
    async fn test_unreachable_host_uses_fallback() {
        let provider = TgjuRateProvider::new("http://127.0.0.1:1");

        let quote = provider.fetch_rate().await.unwrap();
        assert_eq!(quote.rate, 300000.0);
        assert!(quote.is_fallback());
    }

    #[tokio::test]
    async fn test_malformed_page_is_an_error() {
        let mock_server = create_mock_server(200, "<html><body>maintenance</body></html>").await;
        let provider = TgjuRateProvider::new(&mock_server.uri());

        assert!(provider.fetch_rate().await.is_err());
    }
}
