//! Backend endpoint paths, relative to the configured base URL.

pub mod auth {
    pub const LOGIN: &str = "/auth/login/";
    pub const REGISTER: &str = "/auth/register/";
    pub const LOGOUT: &str = "/auth/logout/";
    pub const SEND_OTP: &str = "/auth/send-otp/";
    pub const VERIFY_OTP: &str = "/auth/verify-otp/";
    pub const REFRESH_TOKEN: &str = "/auth/token/refresh/";
    pub const ME: &str = "/auth/me/";
    pub const PROFILE_UPDATE: &str = "/auth/profile/update/";
    pub const CHANGE_PASSWORD: &str = "/auth/profile/change-password/";

    /// Endpoints that must never carry an `Authorization` header.
    pub const PUBLIC: [&str; 4] = [LOGIN, REGISTER, SEND_OTP, VERIFY_OTP];

    pub fn is_public(path: &str) -> bool {
        PUBLIC.contains(&path)
    }
}

pub mod wallet {
    pub const BALANCE: &str = "/wallet/balance/";
    pub const TRANSACTIONS: &str = "/wallet/transactions/";
    pub const DEPOSIT: &str = "/wallet/deposit/";
    pub const WITHDRAW: &str = "/wallet/withdraw/";
    pub const BANK_ACCOUNTS: &str = "/wallet/bank-accounts/";

    pub fn bank_account(id: u64) -> String {
        format!("{BANK_ACCOUNTS}{id}/")
    }

    pub fn deposit_receipt(deposit_id: u64) -> String {
        format!("/wallet/deposits/{deposit_id}/upload_receipt/")
    }
}

pub mod trading {
    pub const BUY: &str = "/trading/buy/";
    pub const SELL: &str = "/trading/sell/";
    pub const ORDERS: &str = "/trading/orders/";
    pub const PREVIEW: &str = "/trading/preview/";
}

pub mod prices {
    pub const CURRENT: &str = "/prices/current/";
    pub const HISTORY: &str = "/prices/history/";
}

pub mod kyc {
    pub const STATUS: &str = "/kyc/status/";
    pub const SUBMIT: &str = "/kyc/submit/";
    pub const UPLOAD_DOCUMENT: &str = "/kyc/upload-document/";
    pub const UPLOAD_SELFIE: &str = "/kyc/upload-selfie/";
}
