//! # Document-Verification Collaborator
//!
//! External identity-verification provider behind a trait. The HTTP
//! implementation posts the stored object locator and document type to
//! the provider and maps its judgment to a terminal
//! [`VerificationStatus`]. Provider transport failures degrade to
//! `Rejected` rather than erroring the whole profile submission —
//! verification can be retried by an admin, a half-saved profile
//! cannot.

use kavach_core::{DocumentType, VerificationStatus};
use serde::Deserialize;

/// Outcome of a provider call, with the raw result string for audit.
#[derive(Debug, Clone)]
pub struct VerifierJudgment {
    pub status: VerificationStatus,
    pub provider_result: String,
}

/// Verification provider surface.
#[async_trait::async_trait]
pub trait DocumentVerifier: Send + Sync {
    async fn verify(&self, locator: &str, document_type: DocumentType) -> VerifierJudgment;
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    result: Option<String>,
}

/// HTTP provider client. Authenticates with a bearer key and expects a
/// JSON body whose `result` field is `"success"` on a pass.
pub struct HttpVerifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpVerifier {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl DocumentVerifier for HttpVerifier {
    async fn verify(&self, locator: &str, document_type: DocumentType) -> VerifierJudgment {
        let url = format!("{}/verify", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "documentUrl": locator,
                "documentType": document_type.as_str(),
            }))
            .send()
            .await;

        let parsed = match response {
            Ok(resp) if resp.status().is_success() => resp.json::<ProviderResponse>().await,
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), %url, "verification provider returned error status");
                return VerifierJudgment {
                    status: VerificationStatus::Rejected,
                    provider_result: format!("provider_status_{}", resp.status().as_u16()),
                };
            }
            Err(err) => {
                tracing::warn!(error = %err, %url, "verification provider unreachable");
                return VerifierJudgment {
                    status: VerificationStatus::Rejected,
                    provider_result: "provider_unreachable".to_string(),
                };
            }
        };

        match parsed {
            Ok(body) => {
                let result = body.result.unwrap_or_else(|| "missing".to_string());
                let status = if result == "success" {
                    VerificationStatus::Verified
                } else {
                    VerificationStatus::Rejected
                };
                VerifierJudgment {
                    status,
                    provider_result: result,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "verification provider returned malformed body");
                VerifierJudgment {
                    status: VerificationStatus::Rejected,
                    provider_result: "malformed_response".to_string(),
                }
            }
        }
    }
}

/// Fixed-judgment verifier for development and tests.
pub struct StaticVerifier {
    status: VerificationStatus,
}

impl StaticVerifier {
    pub fn verified() -> Self {
        Self {
            status: VerificationStatus::Verified,
        }
    }

    pub fn rejected() -> Self {
        Self {
            status: VerificationStatus::Rejected,
        }
    }
}

#[async_trait::async_trait]
impl DocumentVerifier for StaticVerifier {
    async fn verify(&self, _locator: &str, _document_type: DocumentType) -> VerifierJudgment {
        VerifierJudgment {
            status: self.status,
            provider_result: match self.status {
                VerificationStatus::Verified => "success".to_string(),
                _ => "static_reject".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_verifier_judgments() {
        let pass = StaticVerifier::verified()
            .verify("mem://b/document/k", DocumentType::PanFront)
            .await;
        assert_eq!(pass.status, VerificationStatus::Verified);
        assert_eq!(pass.provider_result, "success");

        let fail = StaticVerifier::rejected()
            .verify("mem://b/document/k", DocumentType::PanFront)
            .await;
        assert_eq!(fail.status, VerificationStatus::Rejected);
    }
}
