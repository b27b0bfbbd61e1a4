//! KYC document and profession domain types.
//!
//! These mirror the relational records owned by the storage layer. The
//! `document_number` and `gstin` fields hold *encrypted* tokens once a
//! record has been persisted — plaintext only exists transiently inside
//! a handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Closed set of document types accepted by the intake endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Selfie,
    StudentId,
    PaySlip,
    GstinCertificate,
    BankStatement,
    PanFront,
    PanBack,
    AadhaarFront,
    AadhaarBack,
    Passport,
}

impl DocumentType {
    /// Stable wire/storage name for this document type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selfie => "SELFIE",
            Self::StudentId => "STUDENT_ID",
            Self::PaySlip => "PAY_SLIP",
            Self::GstinCertificate => "GSTIN_CERTIFICATE",
            Self::BankStatement => "BANK_STATEMENT",
            Self::PanFront => "PAN_FRONT",
            Self::PanBack => "PAN_BACK",
            Self::AadhaarFront => "AADHAAR_FRONT",
            Self::AadhaarBack => "AADHAAR_BACK",
            Self::Passport => "PASSPORT",
        }
    }

    /// Parse a stored wire name back into the enum.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.as_str() == s)
    }

    /// Every member of the closed enum, in declaration order.
    pub const ALL: [DocumentType; 10] = [
        Self::Selfie,
        Self::StudentId,
        Self::PaySlip,
        Self::GstinCertificate,
        Self::BankStatement,
        Self::PanFront,
        Self::PanBack,
        Self::AadhaarFront,
        Self::AadhaarBack,
        Self::Passport,
    ];
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verification lifecycle of a document.
///
/// Monotonic: once `Verified`, the status never changes again — further
/// verification attempts are rejected by the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Verified => "VERIFIED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "VERIFIED" => Some(Self::Verified),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Whether the monotonic invariant forbids any further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored KYC document record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KycDocument {
    pub id: Uuid,
    pub user_id: String,
    pub document_type: DocumentType,
    /// Encrypted token (base64 IV ‖ ciphertext ‖ tag), absent for
    /// document types that carry no number (e.g. selfies).
    pub document_number: Option<String>,
    /// Object-storage locator returned by the store collaborator.
    pub document_locator: String,
    pub verification_status: VerificationStatus,
    pub verification_notes: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Profession category declared during profile submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Profession {
    Student,
    Employee,
    GigEconomy,
    Msme,
}

impl Profession {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Employee => "EMPLOYEE",
            Self::GigEconomy => "GIG_ECONOMY",
            Self::Msme => "MSME",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STUDENT" => Some(Self::Student),
            "EMPLOYEE" => Some(Self::Employee),
            "GIG_ECONOMY" => Some(Self::GigEconomy),
            "MSME" => Some(Self::Msme),
            _ => None,
        }
    }
}

/// Employment sector, declared by employees only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sector {
    Government,
    Private,
}

impl Sector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Government => "GOVERNMENT",
            Self::Private => "PRIVATE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GOVERNMENT" => Some(Self::Government),
            "PRIVATE" => Some(Self::Private),
            _ => None,
        }
    }
}

/// Self-declared annual income band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AnnualIncome {
    #[serde(rename = "BELOW_1_LAKH")]
    Below1Lakh,
    #[serde(rename = "1_TO_5_LAKH")]
    OneToFiveLakh,
    #[serde(rename = "5_TO_10_LAKH")]
    FiveToTenLakh,
    #[serde(rename = "ABOVE_10_LAKH")]
    Above10Lakh,
}

impl AnnualIncome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Below1Lakh => "BELOW_1_LAKH",
            Self::OneToFiveLakh => "1_TO_5_LAKH",
            Self::FiveToTenLakh => "5_TO_10_LAKH",
            Self::Above10Lakh => "ABOVE_10_LAKH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BELOW_1_LAKH" => Some(Self::Below1Lakh),
            "1_TO_5_LAKH" => Some(Self::OneToFiveLakh),
            "5_TO_10_LAKH" => Some(Self::FiveToTenLakh),
            "ABOVE_10_LAKH" => Some(Self::Above10Lakh),
            _ => None,
        }
    }
}

/// Profession details captured alongside a KYC profile submission.
///
/// `gstin` holds the encrypted token once persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfession {
    pub id: Uuid,
    pub user_id: String,
    pub profession: Profession,
    pub sector: Option<Sector>,
    /// Gig-economy platform name, when applicable.
    pub platform: Option<String>,
    /// MSME company name, when applicable.
    pub company_name: Option<String>,
    /// Encrypted GSTIN token, MSME only.
    pub gstin: Option<String>,
    pub annual_income: AnnualIncome,
    pub created_at: DateTime<Utc>,
}
