pub mod admin;
pub mod auth;
pub mod campaign_requests;
pub mod checkout;
pub mod health;
pub mod payment_confirm;
pub mod payments;
pub mod projects;
pub mod swagger;
pub mod uploads;
pub mod users;
pub mod webhook;

use actix_web::{
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    HttpResponse,
};
use serde::Serialize;

/// `{success, count, data}` envelope for list endpoints
pub(crate) fn list_response<T: Serialize>(items: &[T]) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": items.len(),
        "data": items
    }))
}

/// Streams a PDF as a download named `filename`
pub(crate) fn pdf_attachment(filename: String, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{body::to_bytes, http::header};

    #[actix_web::test]
    async fn test_list_envelope() {
        let res = list_response(&["a", "b"]);
        let body = to_bytes(res.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 2);
        assert_eq!(json["data"][1], "b");
    }

    #[test]
    fn test_pdf_attachment_headers() {
        let res = pdf_attachment("FundRise_Receipt_Asha.pdf".into(), b"%PDF-1.5".to_vec());
        assert_eq!(res.headers().get(header::CONTENT_TYPE).unwrap(), "application/pdf");
        assert_eq!(
            res.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"FundRise_Receipt_Asha.pdf\""
        );
    }
}
