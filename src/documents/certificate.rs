use chrono::{DateTime, Utc};

use super::canvas::{Canvas, Color, Font};
use crate::utils::{format_inr, AppError};

#[derive(Debug, Clone)]
pub struct CertificateData {
    pub request_id: String,
    pub creator_name: String,
    pub campaign_title: String,
    pub category: String,
    pub goal: f64,
    pub approved_at: DateTime<Utc>,
}

/// "Category | Goal | ID" line under the campaign title
pub fn detail_line(data: &CertificateData) -> String {
    let short_id = data.request_id.chars().take(8).collect::<String>().to_uppercase();
    format!(
        "Category: {} | Goal: INR {} | ID: {}",
        data.category,
        format_inr(data.goal),
        short_id
    )
}

pub fn render_certificate(data: &CertificateData) -> Result<Vec<u8>, AppError> {
    let primary = Color::hex(0x003366);
    let accent = Color::hex(0xff9900);
    let main = Color::hex(0x333333);
    let subtle = Color::hex(0x666666);

    let mut page = Canvas::a4_landscape();
    let width = page.width();
    let height = page.height();

    let margin = 72.0;
    let inset = 36.0;
    let inner_w = width - 2.0 * margin;
    let inner_h = height - 2.0 * margin;

    // Border, inner accent frame and corner flourishes
    page.stroke_rect(margin, margin, inner_w, inner_h, primary, 1.0);
    page.stroke_rect(
        margin + inset,
        margin + inset,
        inner_w - 2.0 * inset,
        inner_h - 2.0 * inset,
        accent,
        0.5,
    );
    let flair = 40.0;
    page.polyline(
        &[(margin, margin + flair), (margin, margin), (margin + flair, margin)],
        accent,
        3.0,
    );
    page.polyline(
        &[
            (width - margin, height - margin - flair),
            (width - margin, height - margin),
            (width - margin - flair, height - margin),
        ],
        accent,
        3.0,
    );

    // The landscape page is shorter than the design grid, so the body is packed tighter
    let mut y = 120.0;
    page.text_centered(0.0, width, y, 14.0, Font::Bold, primary, "FundRise");
    y += 26.0;
    page.text_centered(
        0.0,
        width,
        y,
        16.0,
        Font::Regular,
        subtle,
        "AWARDED FOR OUTSTANDING CONTRIBUTION",
    );
    y += 24.0;
    page.text_centered(0.0, width, y, 48.0, Font::Bold, primary, "CERTIFICATE");
    y += 62.0;

    page.text_centered(
        0.0,
        width,
        y,
        14.0,
        Font::Regular,
        main,
        "This distinguished honor is presented to",
    );
    y += 24.0;
    page.text_centered(
        margin + inset,
        inner_w - 2.0 * inset,
        y,
        34.0,
        Font::Bold,
        accent,
        &data.creator_name.to_uppercase(),
    );
    y += 46.0;

    page.text_centered(
        0.0,
        width,
        y,
        14.0,
        Font::Regular,
        main,
        "For the successful Launch & Leadership of the campaign:",
    );
    y += 24.0;
    page.text_centered(
        margin + inset,
        inner_w - 2.0 * inset,
        y,
        22.0,
        Font::Italic,
        primary,
        &format!("“{}”", data.campaign_title),
    );
    y += 36.0;

    page.line((width / 2.0 - 50.0, y), (width / 2.0 + 50.0, y), accent, 3.0);
    y += 14.0;
    page.text_centered(
        margin + inset,
        inner_w - 2.0 * inset,
        y,
        12.0,
        Font::Regular,
        subtle,
        &detail_line(data),
    );

    // Signatures
    let signature_y = height - 150.0;
    let left_x = 150.0;
    let right_x = width - 350.0;

    let approved = format!("Date: {}", data.approved_at.format("%B %-d, %Y"));
    page.text_centered(width / 2.0 - 90.0, 180.0, signature_y - 26.0, 13.0, Font::Regular, subtle, &approved);

    page.line((left_x, signature_y), (left_x + 200.0, signature_y), subtle, 1.5);
    page.line((right_x, signature_y), (right_x + 200.0, signature_y), subtle, 1.5);
    page.text_centered(left_x, 200.0, signature_y + 10.0, 12.0, Font::Bold, main, "Campaign Reference");
    page.text_centered(
        right_x,
        200.0,
        signature_y + 10.0,
        12.0,
        Font::Bold,
        main,
        "Authorized Platform Signature",
    );

    // Branding
    let bottom = height - margin + 12.0;
    page.text_centered(
        0.0,
        width,
        bottom,
        10.0,
        Font::Bold,
        primary,
        "FundRise - Empowering Visionaries | Integrity. Innovation. Impact.",
    );
    page.text_centered(
        0.0,
        width,
        bottom + 15.0,
        8.0,
        Font::Regular,
        subtle,
        &format!(
            "This certificate is digitally secured and verifiable via our platform. © {} FundRise",
            data.approved_at.format("%Y")
        ),
    );

    page.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> CertificateData {
        CertificateData {
            request_id: "65f1a2b3c4d5e6f708192a3b".into(),
            creator_name: "Arjun Mehta".into(),
            campaign_title: "Solar Lamps for Schools".into(),
            category: "Technology".into(),
            goal: 250000.0,
            approved_at: Utc.with_ymd_and_hms(2026, 5, 2, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_detail_line() {
        assert_eq!(
            detail_line(&sample()),
            "Category: Technology | Goal: INR 2,50,000 | ID: 65F1A2B3"
        );
    }

    #[test]
    fn test_render_certificate_produces_pdf() {
        let bytes = render_certificate(&sample()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
