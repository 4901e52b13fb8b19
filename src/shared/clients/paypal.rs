use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine as _;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

// PayPal API 클라이언트
// PayPal API client for the external payment provider
//
// 이 코어가 소비하는 것은 두 가지 능력뿐:
// - 주문 생성 (금액, 통화, 메타데이터)
// - 주문 상태 조회 (완료 여부 + 결제 금액)
// The core consumes only two capabilities: create an order and
// fetch its completion status + paid amount.

/// 프로바이더가 생성한 주문
/// A provider-created order
#[derive(Debug, Clone)]
pub struct ProviderOrder {
    pub order_id: String,
}

/// 프로바이더가 보고한 주문 상태
/// Order status reported by the provider
#[derive(Debug, Clone)]
pub struct ProviderOrderStatus {
    /// 결제 완료 여부 (캡처 완료)
    /// Whether payment completed (captured)
    pub completed: bool,
    /// 결제 금액 (완료 시)
    /// Paid amount (when completed)
    pub amount: Option<Decimal>,
    /// 통화 코드
    /// Currency code
    pub currency: Option<String>,
    /// 주문 생성 시 실어 보낸 메타데이터 ("user_id|coins" 형식)
    /// Metadata attached at creation ("user_id|coins" format)
    pub metadata: Option<String>,
}

/// 결제 프로바이더 능력 (외부 협력자)
/// Payment provider capability (external collaborator)
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// 주문 생성
    /// Create an order
    async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
        metadata: &str,
    ) -> Result<ProviderOrder>;

    /// 주문 상태 조회
    /// Get order status
    async fn get_order_status(&self, order_id: &str) -> Result<ProviderOrderStatus>;
}

pub struct PayPalClient {
    http_client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    status: Option<String>,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    custom_id: Option<String>,
    amount: Option<PayPalAmount>,
    payments: Option<Payments>,
}

#[derive(Debug, Deserialize)]
struct PayPalAmount {
    currency_code: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Payments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct Capture {
    status: Option<String>,
    amount: Option<PayPalAmount>,
}

impl PayPalClient {
    // 클라이언트 생성
    // Create new PayPal client instance
    pub fn new(base_url: String, client_id: String, client_secret: String) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
            client_id,
            client_secret,
        })
    }

    // OAuth 토큰 발급 (client credentials)
    // Fetch an OAuth token (client credentials)
    async fn get_access_token(&self) -> Result<String> {
        let creds = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.client_id, self.client_secret));

        let response = self
            .http_client
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .header("Authorization", format!("Basic {creds}"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .context("Failed to request PayPal token")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("PayPal token endpoint returned error: {} - {}", status, body);
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse PayPal token response")?;

        Ok(token.access_token)
    }
}

#[async_trait]
impl PaymentProvider for PayPalClient {
    async fn create_order(
        &self,
        amount: Decimal,
        currency: &str,
        metadata: &str,
    ) -> Result<ProviderOrder> {
        let access_token = self.get_access_token().await?;

        // custom_id에 메타데이터를 실어 보냄 (캡처 시 회수)
        // Metadata rides in custom_id (recovered at capture time)
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": currency,
                    "value": amount.to_string(),
                },
                "custom_id": metadata,
            }],
        });

        let response = self
            .http_client
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .header("Authorization", format!("Bearer {access_token}"))
            .json(&body)
            .send()
            .await
            .context("Failed to create PayPal order")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("PayPal create order returned error: {} - {}", status, body);
        }

        let order: OrderResponse = response
            .json()
            .await
            .context("Failed to parse PayPal order response")?;

        Ok(ProviderOrder { order_id: order.id })
    }

    async fn get_order_status(&self, order_id: &str) -> Result<ProviderOrderStatus> {
        let access_token = self.get_access_token().await?;

        let response = self
            .http_client
            .get(format!("{}/v2/checkout/orders/{}", self.base_url, order_id))
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .await
            .context("Failed to fetch PayPal order")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("PayPal get order returned error: {} - {}", status, body);
        }

        let order: OrderResponse = response
            .json()
            .await
            .context("Failed to parse PayPal order response")?;

        let unit = order.purchase_units.first();

        // 캡처가 있으면 캡처 금액이 권위, 없으면 주문 금액
        // A capture's amount is authoritative; fall back to the order amount
        let capture = unit
            .and_then(|u| u.payments.as_ref())
            .and_then(|p| p.captures.first());

        let completed = match capture {
            Some(capture) => capture.status.as_deref() == Some("COMPLETED"),
            None => order.status.as_deref() == Some("COMPLETED"),
        };

        let amount_field = capture
            .and_then(|c| c.amount.as_ref())
            .or_else(|| unit.and_then(|u| u.amount.as_ref()));

        let amount = amount_field
            .and_then(|a| a.value.as_deref())
            .and_then(|v| v.parse::<Decimal>().ok());
        let currency = amount_field.and_then(|a| a.currency_code.clone());

        Ok(ProviderOrderStatus {
            completed,
            amount,
            currency,
            metadata: unit.and_then(|u| u.custom_id.clone()),
        })
    }
}
