// KYC endpoints

use serde_json::Value;
use talabin_api::endpoints::kyc as ep;
use talabin_api::models::{KycStatus, KycSubmission};
use talabin_api::{ApiRequest, FileUpload, ResponseEnvelope};

use super::TalabinClient;

impl TalabinClient {
    /// `GET /kyc/status/`
    pub async fn kyc_status(&self) -> ResponseEnvelope<KycStatus> {
        self.auth_client().execute(&ApiRequest::get(ep::STATUS)).await
    }

    /// `POST /kyc/submit/`
    pub async fn submit_kyc(&self, submission: &KycSubmission<'_>) -> ResponseEnvelope<Value> {
        let request = ApiRequest::post(ep::SUBMIT).json(submission);
        self.auth_client().execute(&request).await
    }

    /// `POST /kyc/upload-document/` (identity card scan).
    pub async fn upload_kyc_document(&self, document: FileUpload) -> ResponseEnvelope<Value> {
        let request = ApiRequest::post(ep::UPLOAD_DOCUMENT).multipart(document);
        self.auth_client().execute(&request).await
    }

    /// `POST /kyc/upload-selfie/`
    pub async fn upload_selfie(&self, selfie: FileUpload) -> ResponseEnvelope<Value> {
        let request = ApiRequest::post(ep::UPLOAD_SELFIE).multipart(selfie);
        self.auth_client().execute(&request).await
    }
}
