use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::domain::{Accession, FetchFormat};
use crate::error::GbkError;

pub const DEFAULT_EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const NUCLEOTIDE_DB: &str = "nucleotide";

/// Fetches one record from the nucleotide database. Implementations make a
/// single attempt; retry policy belongs to the caller.
pub trait NcbiClient: Send + Sync {
    fn fetch(&self, accession: &Accession, format: FetchFormat) -> Result<String, GbkError>;
}

/// Client identification and transport settings for E-utilities.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub email: String,
    pub tool: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct EntrezHttpClient {
    client: Client,
    settings: ClientSettings,
}

impl EntrezHttpClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, GbkError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gbk-fetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GbkError::InvalidConfig(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| GbkError::NcbiHttp(err.to_string()))?;

        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    fn efetch_url(&self) -> String {
        format!("{}/efetch.fcgi", self.settings.base_url.trim_end_matches('/'))
    }

    fn transport_error(&self, err: reqwest::Error) -> GbkError {
        if err.is_timeout() {
            return GbkError::NcbiHttp(format!(
                "timed out after {}s",
                self.settings.timeout.as_secs_f64()
            ));
        }
        GbkError::NcbiHttp(err.to_string())
    }
}

impl NcbiClient for EntrezHttpClient {
    fn fetch(&self, accession: &Accession, format: FetchFormat) -> Result<String, GbkError> {
        if accession.as_str().is_empty() {
            return Err(GbkError::NcbiService("empty accession".to_string()));
        }

        let params = efetch_params(accession, format, &self.settings);
        debug!(accession = %accession, rettype = format.rettype(), "efetch");
        let response = self
            .client
            .get(self.efetch_url())
            .query(&params)
            .send()
            .map_err(|err| self.transport_error(err))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "NCBI request failed".to_string());
            return Err(GbkError::NcbiStatus {
                status,
                message: message.trim().to_string(),
            });
        }

        let body = response.text().map_err(|err| self.transport_error(err))?;
        check_body(accession, body)
    }
}

/// Query parameters of one `efetch` request, in the order they are sent.
pub fn efetch_params(
    accession: &Accession,
    format: FetchFormat,
    settings: &ClientSettings,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("db", NUCLEOTIDE_DB.to_string()),
        ("id", accession.as_str().to_string()),
        ("rettype", format.rettype().to_string()),
        ("retmode", "text".to_string()),
        ("tool", settings.tool.clone()),
        ("email", settings.email.clone()),
    ];
    if let Some(api_key) = settings.api_key.as_deref() {
        params.push(("api_key", api_key.to_string()));
    }
    params
}

/// E-utilities answers some bad ids with status 200 and an error document.
pub fn check_body(accession: &Accession, body: String) -> Result<String, GbkError> {
    let trimmed = body.trim_start();
    if trimmed.is_empty() {
        return Err(GbkError::EmptyResponse(accession.to_string()));
    }
    if trimmed.starts_with("Error") || trimmed.contains("<ERROR>") {
        let message = trimmed.lines().next().unwrap_or_default().trim().to_string();
        return Err(GbkError::NcbiService(message));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn settings() -> ClientSettings {
        ClientSettings {
            email: "someone@example.org".to_string(),
            tool: "gbk-fetch".to_string(),
            api_key: None,
            base_url: DEFAULT_EUTILS_BASE.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn efetch_url_tolerates_trailing_slash() {
        let mut settings = settings();
        settings.base_url = format!("{DEFAULT_EUTILS_BASE}/");
        let client = EntrezHttpClient::new(&settings).unwrap();
        assert_eq!(
            client.efetch_url(),
            "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi"
        );
    }

    #[test]
    fn empty_accession_is_rejected_locally() {
        let client = EntrezHttpClient::new(&settings()).unwrap();
        let err = client
            .fetch(&Accession::new(" "), FetchFormat::Fasta)
            .unwrap_err();
        assert_matches!(err, GbkError::NcbiService(_));
    }

    #[test]
    fn error_documents_are_failures() {
        let acc = Accession::new("XX_1");
        let body = "\n\nError: CEFetchPApplication::proxy_stream(): Failed to retrieve sequence: XX_1\n";
        let err = check_body(&acc, body.to_string()).unwrap_err();
        assert_matches!(err, GbkError::NcbiService(msg) if msg.starts_with("Error:"));

        let body = "<eFetchResult>\n\t<ERROR>ID list is empty!</ERROR>\n</eFetchResult>";
        let err = check_body(&acc, body.to_string()).unwrap_err();
        assert_matches!(err, GbkError::NcbiService(_));

        let err = check_body(&acc, "  \n".to_string()).unwrap_err();
        assert_matches!(err, GbkError::EmptyResponse(_));
    }
}
