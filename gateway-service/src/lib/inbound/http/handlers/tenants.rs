use axum::extract::Path;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::middleware::AuthenticatedService;

/// Reject bearers whose tenant does not match the route.
fn require_tenant(service: &str, auth: &AuthenticatedService) -> Result<(), ApiError> {
    if auth.service_name != service {
        return Err(ApiError::Forbidden(format!(
            "Access denied. This endpoint is only for the {service} service."
        )));
    }
    Ok(())
}

/// Accept a request on behalf of a downstream tenant service. The actual
/// adapters live outside this gateway; this boundary only enforces tenant
/// isolation and acknowledges receipt.
pub async fn tenant_process(
    Path(service): Path<String>,
    Extension(auth): Extension<AuthenticatedService>,
    Json(payload): Json<serde_json::Value>,
) -> Result<ApiSuccess<TenantProcessResponseData>, ApiError> {
    require_tenant(&service, &auth)?;

    tracing::info!(
        service,
        client_id = auth.client_id,
        payload_bytes = payload.to_string().len(),
        "Tenant request accepted"
    );

    Ok(ApiSuccess::new(
        StatusCode::ACCEPTED,
        TenantProcessResponseData {
            success: true,
            message: "Request accepted for processing".to_string(),
            service,
        },
    ))
}

pub async fn tenant_health(
    Path(service): Path<String>,
    Extension(auth): Extension<AuthenticatedService>,
) -> Result<ApiSuccess<TenantHealthResponseData>, ApiError> {
    require_tenant(&service, &auth)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        TenantHealthResponseData {
            status: "healthy".to_string(),
            service,
        },
    ))
}

pub async fn tenant_info(
    Path(service): Path<String>,
    Extension(auth): Extension<AuthenticatedService>,
) -> Result<ApiSuccess<TenantInfoResponseData>, ApiError> {
    require_tenant(&service, &auth)?;

    let description = match service.as_str() {
        "ecare" => "E-Care electronic healthcare management with AI chatbot",
        "georgetown" => "Georgetown university health services",
        "chronic_care_bridge" => "ChronicCareBridge long-term care coordination",
        "anarcare" => "Anarcare community care network",
        _ => "Downstream healthcare tenant",
    };

    Ok(ApiSuccess::new(
        StatusCode::OK,
        TenantInfoResponseData {
            service_name: service,
            description: description.to_string(),
            capabilities: vec![
                "chatbot".to_string(),
                "appointments".to_string(),
                "tickets".to_string(),
                "otp_auth".to_string(),
            ],
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantProcessResponseData {
    pub success: bool,
    pub message: String,
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantHealthResponseData {
    pub status: String,
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantInfoResponseData {
    pub service_name: String,
    pub description: String,
    pub capabilities: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_gate_rejects_other_services() {
        let ecare_bearer = AuthenticatedService {
            client_id: "ecare_client".to_string(),
            service_name: "ecare".to_string(),
        };

        assert!(require_tenant("ecare", &ecare_bearer).is_ok());

        // An ecare token must not open georgetown routes.
        let result = require_tenant("georgetown", &ecare_bearer);
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }
}
