use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Status code plus decoded JSON body. Non-2xx responses are not errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `view` field: `loading`, `form`, `result` or `error`.
    pub fn view(&self) -> Option<&str> {
        self.body.get("view").and_then(Value::as_str)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }
}

pub struct Luca3Client {
    client: Client,
    base_url: String,
    admin_key: Option<String>,
}

impl Luca3Client {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_key: None,
        }
    }

    pub fn with_admin_key(mut self, key: &str) -> Self {
        self.admin_key = Some(key.to_string());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<ApiResponse, reqwest::Error> {
        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(ApiResponse { status, body })
    }

    fn admin(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.admin_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    pub async fn health(&self) -> Result<ApiResponse, reqwest::Error> {
        self.send(self.client.get(self.url("/health"))).await
    }

    pub async fn student(&self, card_uid: &str) -> Result<ApiResponse, reqwest::Error> {
        self.send(self.client.get(self.url(&format!("/api/students/{}", card_uid))))
            .await
    }

    /// Start a registration. The response carries `session_id`.
    pub async fn register(
        &self,
        card_uid: &str,
        student_id: &str,
        file_name: &str,
        image: Vec<u8>,
        name: Option<&str>,
    ) -> Result<ApiResponse, reqwest::Error> {
        let mut form = Form::new()
            .text("student_id", student_id.to_string())
            .part("image", Part::bytes(image).file_name(file_name.to_string()));
        if let Some(name) = name {
            form = form.text("name", name.to_string());
        }
        let url = self.url(&format!("/api/students/{}/register", card_uid));
        self.send(self.client.post(url).multipart(form)).await
    }

    pub async fn registration(&self, session_id: &str) -> Result<ApiResponse, reqwest::Error> {
        self.send(self.client.get(self.url(&format!("/api/registrations/{}", session_id))))
            .await
    }

    pub async fn certifications(&self, card_uid: &str) -> Result<ApiResponse, reqwest::Error> {
        let url = self.url(&format!("/api/students/{}/certifications", card_uid));
        self.send(self.client.get(url)).await
    }

    /// The response carries `action_id`.
    pub async fn claim(
        &self,
        card_uid: &str,
        certification_id: &str,
    ) -> Result<ApiResponse, reqwest::Error> {
        let url = self.url(&format!("/api/students/{}/certifications/claim", card_uid));
        self.send(
            self.client
                .post(url)
                .json(&json!({ "certification_id": certification_id })),
        )
        .await
    }

    pub async fn treasury(&self, card_uid: &str) -> Result<ApiResponse, reqwest::Error> {
        let url = self.url(&format!("/api/students/{}/treasury", card_uid));
        self.send(self.client.get(url)).await
    }

    pub async fn swap(&self, card_uid: &str, amount: &str) -> Result<ApiResponse, reqwest::Error> {
        let url = self.url(&format!("/api/students/{}/treasury/swap", card_uid));
        self.send(self.client.post(url).json(&json!({ "amount": amount })))
            .await
    }

    /// `token` is `usdc` or `eth`.
    pub async fn send_funds(
        &self,
        card_uid: &str,
        recipient: &str,
        amount: &str,
        token: &str,
    ) -> Result<ApiResponse, reqwest::Error> {
        let url = self.url(&format!("/api/students/{}/treasury/send", card_uid));
        let body = json!({ "recipient": recipient, "amount": amount, "token": token });
        self.send(self.client.post(url).json(&body)).await
    }

    pub async fn action(&self, action_id: &str) -> Result<ApiResponse, reqwest::Error> {
        self.send(self.client.get(self.url(&format!("/api/actions/{}", action_id))))
            .await
    }

    pub async fn search_names(
        &self,
        domain: Option<&str>,
        name: &str,
    ) -> Result<ApiResponse, reqwest::Error> {
        let mut query = vec![("name", name)];
        if let Some(domain) = domain {
            query.push(("domain", domain));
        }
        self.send(self.client.get(self.url("/api/names/search")).query(&query))
            .await
    }

    pub async fn names_for(&self, address: &str) -> Result<ApiResponse, reqwest::Error> {
        self.send(
            self.client
                .get(self.url("/api/names/by-address"))
                .query(&[("address", address)]),
        )
        .await
    }

    pub async fn admin_status(&self, address: Option<&str>) -> Result<ApiResponse, reqwest::Error> {
        let mut request = self.client.get(self.url("/api/admin"));
        if let Some(address) = address {
            request = request.query(&[("address", address)]);
        }
        self.send(request).await
    }

    pub async fn create_certification(
        &self,
        name: &str,
        eligible: &str,
        file_name: &str,
        image: Vec<u8>,
    ) -> Result<ApiResponse, reqwest::Error> {
        let form = Form::new()
            .text("name", name.to_string())
            .text("eligible", eligible.to_string())
            .part("image", Part::bytes(image).file_name(file_name.to_string()));
        let request = self.client.post(self.url("/admin/certifications")).multipart(form);
        self.send(self.admin(request)).await
    }

    pub async fn withdraw(&self, amount: &str) -> Result<ApiResponse, reqwest::Error> {
        let request = self
            .client
            .post(self.url("/admin/withdraw"))
            .json(&json!({ "amount": amount }));
        self.send(self.admin(request)).await
    }

    /// Poll an action until it reaches a `result` or `error` view.
    pub async fn wait_for_action(
        &self,
        action_id: &str,
        interval: Duration,
        attempts: usize,
    ) -> Result<ApiResponse, reqwest::Error> {
        self.poll(attempts, interval, || self.action(action_id)).await
    }

    /// Poll a registration until it reaches a `result` or `error` view.
    pub async fn wait_for_registration(
        &self,
        session_id: &str,
        interval: Duration,
        attempts: usize,
    ) -> Result<ApiResponse, reqwest::Error> {
        self.poll(attempts, interval, || self.registration(session_id))
            .await
    }

    async fn poll<'a, F, Fut>(
        &'a self,
        attempts: usize,
        interval: Duration,
        mut fetch: F,
    ) -> Result<ApiResponse, reqwest::Error>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<ApiResponse, reqwest::Error>> + 'a,
    {
        let mut last = fetch().await?;
        for _ in 1..attempts.max(1) {
            if !last.is_success() || matches!(last.view(), Some("result") | Some("error")) {
                break;
            }
            tokio::time::sleep(interval).await;
            last = fetch().await?;
        }
        Ok(last)
    }
}
