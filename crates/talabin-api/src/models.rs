// Backend wire types
//
// Request bodies and response payloads for the endpoints in `endpoints`.
// Monetary amounts and gold weights are kept as the decimal strings the
// backend emits; nothing on the client does arithmetic on them. Most
// response types carry an `extra` catch-all so new backend fields survive a
// round-trip through the session file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Auth ─────────────────────────────────────────────────────────────

/// KYC verification state of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    NotStarted,
    #[default]
    Pending,
    Verified,
    Rejected,
}

/// The authenticated user, as returned by login and `/auth/me/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// `full_name`, falling back to the phone number for unnamed accounts.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.phone_number
        } else {
            &self.full_name
        }
    }
}

/// Fields of `PUT /auth/profile/update/`; unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<&'a str>,
}

impl ProfileUpdate<'_> {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.date_of_birth.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange<'a> {
    pub old_password: &'a str,
    pub new_password: &'a str,
    pub new_password_confirm: &'a str,
}

/// Token pair issued by login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

/// `data` of a successful `/auth/login/`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub phone_number: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub phone_number: &'a str,
    pub password: &'a str,
    pub password_confirm: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Registration,
    Login,
    PasswordReset,
}

#[derive(Debug, Clone, Serialize)]
pub struct OtpRequest<'a> {
    pub phone_number: &'a str,
    pub otp_type: OtpPurpose,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
}

/// `data` of register and send-otp. Development backends echo the code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OtpIssued {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub otp_code: Option<String>,
}

/// Body of `/auth/token/refresh/` and `/auth/logout/`.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// The refresh endpoint answers with a bare token object, not an envelope.
/// `refresh` is present only when the backend rotates refresh tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

// ── Wallet ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    #[serde(default)]
    pub id: Option<u64>,
    pub balance_irr: String,
    pub gold_balance: String,
    #[serde(default)]
    pub frozen_balance_irr: Option<String>,
    #[serde(default)]
    pub frozen_gold_balance: Option<String>,
    #[serde(default)]
    pub available_balance_irr: Option<String>,
    #[serde(default)]
    pub available_gold_balance: Option<String>,
    #[serde(default)]
    pub total_value_irr: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: u64,
    pub transaction_type: String,
    #[serde(default)]
    pub transaction_type_display: Option<String>,
    pub status: String,
    #[serde(default)]
    pub status_display: Option<String>,
    #[serde(default)]
    pub amount_irr: Option<String>,
    #[serde(default)]
    pub amount_gold: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    pub created_at: String,
}

/// `/wallet/transactions/` is either a plain list or, when the backend
/// paginates, `{count, next, previous, results: {success, data}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TransactionList {
    Paged {
        count: u64,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: PagedResults,
    },
    Plain(Vec<WalletTransaction>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagedResults {
    #[serde(default)]
    pub data: Vec<WalletTransaction>,
}

impl TransactionList {
    pub fn items(&self) -> &[WalletTransaction] {
        match self {
            Self::Paged { results, .. } => &results.data,
            Self::Plain(items) => items,
        }
    }

    /// Total count across pages, when the backend reports it.
    pub fn total(&self) -> Option<u64> {
        match self {
            Self::Paged { count, .. } => Some(*count),
            Self::Plain(_) => None,
        }
    }

    pub fn into_items(self) -> Vec<WalletTransaction> {
        match self {
            Self::Paged { results, .. } => results.data,
            Self::Plain(items) => items,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Online,
    BankTransfer,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepositRequest<'a> {
    pub amount: &'a str,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawRequest<'a> {
    pub bank_account_id: u64,
    pub amount: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: u64,
    pub bank_name: String,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub sheba_number: Option<String>,
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub account_holder_name: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_default: bool,
}

/// Body of `POST /wallet/bank-accounts/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewBankAccount<'a> {
    pub bank_name: &'a str,
    pub sheba_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_holder_name: Option<&'a str>,
    pub is_default: bool,
}

/// Partial body of `PUT /wallet/bank-accounts/{id}/`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BankAccountUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_holder_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

// ── Trading ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest<'a> {
    pub order_type: OrderSide,
    pub amount_irr: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPreview {
    pub order_type: OrderSide,
    pub amount_irr: String,
    pub gold_price_per_gram: String,
    pub gold_amount: String,
    pub fee: String,
    pub total_amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub order_type: OrderSide,
    pub status: String,
    #[serde(default)]
    pub status_display: Option<String>,
    pub gold_amount: String,
    pub gold_price_per_gram: String,
    pub amount_irr: String,
    #[serde(default)]
    pub fee: Option<String>,
    #[serde(default)]
    pub total_amount: Option<String>,
    #[serde(default)]
    pub order_number: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub executed_at: Option<String>,
}

// ── Prices ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldPrice {
    pub buy_price: String,
    pub sell_price: String,
    #[serde(default)]
    pub spread: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: String,
    pub price: String,
    #[serde(default)]
    pub source: Option<String>,
}

/// Window accepted by `/prices/history/?timeframe=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeframe {
    OneHour,
    #[default]
    OneDay,
    SevenDays,
    ThirtyDays,
}

impl Timeframe {
    pub fn as_query(self) -> &'static str {
        match self {
            Self::OneHour => "1h",
            Self::OneDay => "24h",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Self::OneHour),
            "24h" | "1d" => Ok(Self::OneDay),
            "7d" => Ok(Self::SevenDays),
            "30d" => Ok(Self::ThirtyDays),
            other => Err(format!("unknown timeframe '{other}' (expected 1h, 24h, 7d or 30d)")),
        }
    }
}

// ── KYC ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KycStatus {
    pub status: VerificationStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KycSubmission<'a> {
    pub national_id: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<&'a str>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn user_keeps_unknown_fields() {
        let user: User = serde_json::from_value(json!({
            "id": 7,
            "phone_number": "09123456789",
            "full_name": "",
            "verification_status": "verified",
            "profile_image": null
        }))
        .unwrap();
        assert_eq!(user.display_name(), "09123456789");
        assert_eq!(user.verification_status, VerificationStatus::Verified);
        assert!(user.extra.contains_key("profile_image"));
    }

    #[test]
    fn paginated_transactions_unwrap_inner_envelope() {
        let list: TransactionList = serde_json::from_value(json!({
            "count": 41,
            "next": "http://x/api/wallet/transactions/?page=2",
            "previous": null,
            "results": {"success": true, "data": [{
                "id": 1, "transaction_type": "deposit", "status": "completed",
                "amount_irr": "500000.00", "created_at": "2025-01-01T00:00:00Z"
            }]}
        }))
        .unwrap();
        assert_eq!(list.total(), Some(41));
        assert_eq!(list.items().len(), 1);

        let plain: TransactionList = serde_json::from_value(json!([])).unwrap();
        assert!(plain.items().is_empty());
        assert_eq!(plain.total(), None);
    }

    #[test]
    fn timeframe_parses_query_values() {
        assert_eq!("7d".parse::<Timeframe>().unwrap(), Timeframe::SevenDays);
        assert_eq!(Timeframe::default().as_query(), "24h");
        assert!("1y".parse::<Timeframe>().is_err());
    }
}
