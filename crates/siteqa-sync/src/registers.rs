//! Register lists.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use siteqa_core::register::{unwrap_records, Certificate, Material, MixDesign, RegisterKind, TestMethod};
use tracing::debug;

use crate::client::ApiClient;
use crate::SyncError;

impl ApiClient {
    async fn list_register<T: DeserializeOwned>(&self, project: &str, kind: RegisterKind) -> Result<Vec<T>, SyncError> {
        let body: Value = self
            .send_json(self.request(Method::GET, &["projects", project, kind.path()]))
            .await?;
        let records: Vec<T> = unwrap_records(&body, kind.response_key());
        debug!(project, register = kind.path(), count = records.len(), "register listed");
        Ok(records)
    }

    pub async fn list_certificates(&self, project: &str) -> Result<Vec<Certificate>, SyncError> {
        self.list_register(project, RegisterKind::Certificates).await
    }

    pub async fn list_materials(&self, project: &str) -> Result<Vec<Material>, SyncError> {
        self.list_register(project, RegisterKind::Materials).await
    }

    pub async fn list_methods(&self, project: &str) -> Result<Vec<TestMethod>, SyncError> {
        self.list_register(project, RegisterKind::Methods).await
    }

    pub async fn list_mix_designs(&self, project: &str) -> Result<Vec<MixDesign>, SyncError> {
        self.list_register(project, RegisterKind::MixDesigns).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::stub::Stub;
    use serde_json::json;

    #[tokio::test]
    async fn registers_unwrap_named_arrays() {
        let server = Stub::new()
            .on(
                "GET",
                "/api/v1/projects/p1/mix-designs",
                200,
                json!({"mixDesigns": [{"id": "md1", "mix_design_code": "N32-20", "status": "approved"}]}),
            )
            .on("GET", "/api/v1/projects/p1/certificates", 200, json!({}))
            .start()
            .await;
        let api = ApiClient::new(ClientConfig::new(&server.base_url)).unwrap();

        let designs = api.list_mix_designs("p1").await.unwrap();
        assert_eq!(designs[0].mix_design_code, "N32-20");
        assert!(api.list_certificates("p1").await.unwrap().is_empty());
    }
}
