use chrono::{DateTime, Utc};

use super::canvas::{Canvas, Color, Font};
use crate::utils::{format_inr, AppError};

/// Everything printed on a payment receipt
#[derive(Debug, Clone)]
pub struct ReceiptData {
    pub payment_id: String,
    pub backer_name: String,
    pub backer_email: String,
    pub project_title: String,
    pub amount: f64,
    pub transaction_id: String,
    pub issued_at: DateTime<Utc>,
}

/// Card processing fee shown on the receipt: 2.9% + 0.30, rounded to a whole unit
pub fn processing_fee(amount: f64) -> f64 {
    (amount * 0.029 + 0.30).round()
}

pub fn receipt_number(payment_id: &str) -> String {
    payment_id.chars().take(12).collect::<String>().to_uppercase()
}

pub fn render_receipt(data: &ReceiptData) -> Result<Vec<u8>, AppError> {
    let brand = Color::hex(0x3b82f6);
    let brand_dark = Color::hex(0x1e40af);
    let brand_light = Color::hex(0xdbeafe);
    let ink = Color::hex(0x1e293b);
    let muted = Color::hex(0x64748b);
    let rule = Color::hex(0xe5e7eb);
    let green = Color::hex(0x16a34a);
    let white = Color::hex(0xffffff);

    let mut page = Canvas::a4_portrait();
    let width = page.width();
    let height = page.height();
    let content_width = width - 100.0;
    let amount_x = width - 150.0;

    // Header band
    page.fill_rect(0.0, 0.0, width, 90.0, brand);
    page.text(50.0, 30.0, 26.0, Font::Bold, white, "FundRise");
    page.text(50.0, 62.0, 10.0, Font::Regular, Color::hex(0xe0f2fe), "Empowering Innovation Together");

    page.text(50.0, 110.0, 22.0, Font::Bold, ink, "PAYMENT RECEIPT");

    page.panel(width - 220.0, 110.0, 170.0, 35.0, brand_light, brand);
    page.text(width - 210.0, 116.0, 9.0, Font::Regular, brand_dark, "Receipt ID");
    page.text(width - 210.0, 129.0, 10.0, Font::Bold, brand_dark, &receipt_number(&data.payment_id));

    page.line((50.0, 165.0), (width - 50.0, 165.0), rule, 2.0);

    let mut y = 185.0;
    let issued = data.issued_at.format("%B %-d, %Y %I:%M %p").to_string();
    let details = [
        ("Date & Time:", issued.as_str(), 22.0),
        ("Backer Name:", data.backer_name.as_str(), 20.0),
        ("Email:", data.backer_email.as_str(), 30.0),
    ];
    for (label, value, advance) in details {
        page.text(50.0, y, 11.0, Font::Bold, muted, label);
        page.text_fit(180.0, y, 11.0, Font::Regular, ink, value, width - 230.0);
        y += advance;
    }

    // Project box
    page.panel(50.0, y, content_width, 60.0, Color::hex(0xf0f9ff), brand);
    page.text(70.0, y + 12.0, 12.0, Font::Bold, brand_dark, "Project Backed");
    page.text_fit(70.0, y + 32.0, 14.0, Font::Bold, ink, &data.project_title, width - 140.0);
    y += 80.0;

    page.text(50.0, y, 14.0, Font::Bold, ink, "Payment Details");
    y += 25.0;

    // Table
    page.fill_rect(50.0, y, content_width, 28.0, Color::hex(0xf1f5f9));
    page.text(70.0, y + 9.0, 10.0, Font::Bold, Color::hex(0x475569), "Description");
    page.text(amount_x, y + 9.0, 10.0, Font::Bold, Color::hex(0x475569), "Amount");
    y += 28.0;

    let fee = processing_fee(data.amount);
    let total = data.amount + fee;

    page.text(70.0, y + 8.0, 11.0, Font::Regular, ink, "Contribution Amount");
    page.text(amount_x, y + 8.0, 11.0, Font::Bold, green, &format!("INR {}", format_inr(data.amount)));
    y += 28.0;

    page.text(70.0, y + 8.0, 11.0, Font::Regular, muted, "Processing Fee (2.9% + 0.30)");
    page.text(amount_x, y + 8.0, 11.0, Font::Regular, muted, &format!("INR {}", format_inr(fee)));
    y += 32.0;

    page.line((50.0, y), (width - 50.0, y), Color::hex(0xcbd5e1), 1.0);
    y += 15.0;

    page.text(70.0, y, 14.0, Font::Bold, ink, "Total Paid");
    page.text(amount_x, y, 16.0, Font::Bold, green, &format!("INR {}", format_inr(total)));
    y += 35.0;

    page.text(50.0, y, 10.0, Font::Regular, muted, "Payment Method: Credit/Debit Card");
    page.text_fit(
        50.0,
        y + 18.0,
        10.0,
        Font::Regular,
        muted,
        &format!("Transaction ID: {}", data.transaction_id),
        content_width,
    );

    // Footer
    let footer = height - 120.0;
    page.line((50.0, footer), (width - 50.0, footer), rule, 1.0);
    page.text_centered(50.0, content_width, footer + 20.0, 12.0, Font::Bold, brand, "Thank You for Your Support!");
    page.text_centered(
        50.0,
        content_width,
        footer + 38.0,
        9.0,
        Font::Regular,
        muted,
        "This is a computer-generated receipt and does not require a signature.",
    );
    page.text_centered(
        50.0,
        content_width,
        footer + 53.0,
        9.0,
        Font::Regular,
        muted,
        "For any queries, contact us at support@fundrise.com",
    );

    page.fill_rect(0.0, height - 35.0, width, 35.0, Color::hex(0xf8fafc));
    let copyright = format!("© {} FundRise. All rights reserved.", data.issued_at.format("%Y"));
    page.text_centered(0.0, width, height - 22.0, 8.0, Font::Regular, Color::hex(0x94a3b8), &copyright);

    page.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ReceiptData {
        ReceiptData {
            payment_id: "65f1a2b3c4d5e6f708192a3b".into(),
            backer_name: "Priya Sharma".into(),
            backer_email: "priya@example.com".into(),
            project_title: "Clean Water for Villages".into(),
            amount: 1000.0,
            transaction_id: "pi_3OabcDEF".into(),
            issued_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_processing_fee() {
        // 1000 * 0.029 + 0.30 = 29.3
        assert_eq!(processing_fee(1000.0), 29.0);
        // 500 * 0.029 + 0.30 = 14.8
        assert_eq!(processing_fee(500.0), 15.0);
        assert_eq!(processing_fee(0.0), 0.0);
        assert_eq!(1000.0 + processing_fee(1000.0), 1029.0);
    }

    #[test]
    fn test_receipt_number_is_first_twelve_upper() {
        assert_eq!(receipt_number("65f1a2b3c4d5e6f708192a3b"), "65F1A2B3C4D5");
        assert_eq!(receipt_number("abc"), "ABC");
    }

    #[test]
    fn test_render_receipt_produces_pdf() {
        let bytes = render_receipt(&sample()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }
}
