// Wallet endpoints

use serde_json::Value;
use talabin_api::endpoints::wallet as ep;
use talabin_api::models::{
    BankAccount, BankAccountUpdate, DepositRequest, NewBankAccount, PaymentMethod,
    TransactionList, Wallet, WithdrawRequest,
};
use talabin_api::{ApiRequest, FileUpload, ResponseEnvelope};

use super::TalabinClient;

impl TalabinClient {
    /// `GET /wallet/balance/`
    pub async fn wallet_balance(&self) -> ResponseEnvelope<Wallet> {
        self.auth_client()
            .execute(&ApiRequest::get(ep::BALANCE))
            .await
    }

    /// `GET /wallet/transactions/`, optionally filtered by type
    /// (`deposit`, `withdrawal`, `buy`, `sell`, ...) and page.
    pub async fn wallet_transactions(
        &self,
        transaction_type: Option<&str>,
        page: Option<u32>,
    ) -> ResponseEnvelope<TransactionList> {
        let request = ApiRequest::get(ep::TRANSACTIONS)
            .query_opt("type", transaction_type)
            .query_opt("page", page);
        self.auth_client().execute(&request).await
    }

    /// `POST /wallet/deposit/`. Amount is a decimal string in rials.
    pub async fn deposit(&self, amount: &str, method: PaymentMethod) -> ResponseEnvelope<Value> {
        let request = ApiRequest::post(ep::DEPOSIT).json(&DepositRequest {
            amount,
            payment_method: method,
        });
        self.auth_client().execute(&request).await
    }

    /// `POST /wallet/withdraw/` to one of the user's bank accounts.
    pub async fn withdraw(&self, bank_account_id: u64, amount: &str) -> ResponseEnvelope<Value> {
        let request = ApiRequest::post(ep::WITHDRAW).json(&WithdrawRequest {
            bank_account_id,
            amount,
        });
        self.auth_client().execute(&request).await
    }

    /// `GET /wallet/bank-accounts/`
    pub async fn bank_accounts(&self) -> ResponseEnvelope<Vec<BankAccount>> {
        self.auth_client()
            .execute(&ApiRequest::get(ep::BANK_ACCOUNTS))
            .await
    }

    /// `POST /wallet/bank-accounts/`
    pub async fn add_bank_account(
        &self,
        account: &NewBankAccount<'_>,
    ) -> ResponseEnvelope<BankAccount> {
        let request = ApiRequest::post(ep::BANK_ACCOUNTS).json(account);
        self.auth_client().execute(&request).await
    }

    /// `PUT /wallet/bank-accounts/{id}/`
    pub async fn update_bank_account(
        &self,
        id: u64,
        update: &BankAccountUpdate<'_>,
    ) -> ResponseEnvelope<BankAccount> {
        let request = ApiRequest::put(ep::bank_account(id)).json(update);
        self.auth_client().execute(&request).await
    }

    /// `DELETE /wallet/bank-accounts/{id}/`
    pub async fn delete_bank_account(&self, id: u64) -> ResponseEnvelope<()> {
        self.auth_client()
            .execute(&ApiRequest::delete(ep::bank_account(id)))
            .await
    }

    /// Attach a payment receipt image to a bank-transfer deposit. Sent as
    /// the `receipt_image` form field.
    pub async fn upload_deposit_receipt(
        &self,
        deposit_id: u64,
        receipt: FileUpload,
    ) -> ResponseEnvelope<Value> {
        let request = ApiRequest::post(ep::deposit_receipt(deposit_id))
            .multipart(receipt.with_field("receipt_image"));
        self.auth_client().execute(&request).await
    }
}
