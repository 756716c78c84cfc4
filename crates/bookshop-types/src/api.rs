use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BookPatch, Identity, OrderItem, PaymentMethod, Role};

// -- Session token --

/// JWT claims carried in the session cookie. Canonical definition shared by
/// the API middleware and anything else that needs to verify a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.sub,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub action: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Option<Identity>,
}

// -- Books --

#[derive(Debug, Deserialize)]
pub struct UpdateBookRequest {
    pub id: Uuid,
    #[serde(flatten)]
    pub patch: BookPatch,
}

#[derive(Debug, Deserialize)]
pub struct DeleteBookRequest {
    pub id: Uuid,
}

// -- Orders --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

// -- Generic bodies --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}
