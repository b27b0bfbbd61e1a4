//! # API Route Modules
//!
//! Route modules for the KYC service surface:
//!
//! - `auth` — compliance session issuance and revocation. Session
//!   issuance is the one public POST; everything else sits behind the
//!   compliance gate.
//! - `kyc` — user-facing intake: document upload, profile submission
//!   (which triggers provider verification of pending documents), and
//!   the caller's own KYC status.
//! - `admin` — admin-only review surface: manual verification verdicts,
//!   per-user document listings with decrypted numbers and signed
//!   download URLs, and the audit trail query.

pub mod admin;
pub mod auth;
pub mod kyc;
