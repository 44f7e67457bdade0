use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Polygon, Rgb,
};
use tracing::{debug, info, warn};

use super::chart;
use crate::models::{artifact_stem, RiskLevel, RiskProfile};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 18.0;
const COVER_HDR_H: f32 = 56.0;
const T_END: f32 = PAGE_W - MARGIN;

// ── Palette ───────────────────────────────────────────────────────────────────
const BG:           (f32, f32, f32) = (1.00, 1.00, 1.00);
const PANEL:        (f32, f32, f32) = (1.00, 1.00, 1.00);
const PANEL_ALT:    (f32, f32, f32) = (0.95, 0.97, 0.96);
const PANEL_BORDER: (f32, f32, f32) = (0.85, 0.89, 0.87);
const ACCENT_GRN:   (f32, f32, f32) = (0.11, 0.55, 0.36); // forest green
const ACCENT_TEAL:  (f32, f32, f32) = (0.09, 0.45, 0.62); // water teal
const TEXT_PRI:     (f32, f32, f32) = (0.07, 0.09, 0.10);
const TEXT_SEC:     (f32, f32, f32) = (0.34, 0.40, 0.42);
const TEXT_MUT:     (f32, f32, f32) = (0.56, 0.62, 0.64);
const WHITE:        (f32, f32, f32) = (1.00, 1.00, 1.00);
const WHITE_DIM:    (f32, f32, f32) = (0.84, 0.95, 0.92);

const LOW_FG:  (f32, f32, f32) = (0.07, 0.52, 0.22);
const MOD_FG:  (f32, f32, f32) = (0.70, 0.40, 0.02);
const HIGH_FG: (f32, f32, f32) = (0.76, 0.09, 0.13);

const R_PANEL: f32 = 2.5;
const R_BADGE: f32 = 1.5;

const REC_WRAP: usize = 88;
const REC_LINE_H: f32 = 4.8;
/// Lowest baseline for body text; the footer sits below it.
const CONTENT_FLOOR: f32 = 28.0;
const BODY_WRAP: usize = 100;

const FRAMEWORK_INTRO: &str = "The TNFD (Taskforce on Nature-related Financial Disclosures) is a \
market-led, science-based and government-supported initiative. It provides a framework to help \
organizations identify, manage and disclose their nature-related dependencies, impacts, risks \
and opportunities.";

const FRAMEWORK_PRINCIPLES: [(&str, &str); 7] = [
    ("Market Usability", "Easy to integrate with investor reporting."),
    ("Science-Based", "Grounded in environmental science."),
    ("Nature Risk Identification", "Risks across Land, Ocean, Freshwater and Atmosphere."),
    ("ESG Integration", "Works with existing ESG standards such as TCFD."),
    ("Time Horizons", "Covers short- and long-term environmental risk."),
    ("Transparency", "Helps stakeholders understand nature impact."),
    ("Global Relevance", "Applicable across industries and regions."),
];

const METHOD_NOTE: &str = "This report combines satellite imagery, biodiversity trend modelling, \
water risk analysis and natural capital valuation aligned with TNFD principles. Models were \
trained on real-world land-use data and environmental indicators. Risk values are normalized \
to the range 0 to 1 for interpretability.";

// ── Public entry points ───────────────────────────────────────────────────────

/// Outcome of rendering every company in a store.
#[derive(Debug, Default)]
pub struct RenderSummary {
    pub rendered: Vec<PathBuf>,
    /// `(company, reason)` for every document that could not be produced.
    pub failed: Vec<(String, String)>,
}

/// Render one PDF per store entry into `out_dir`. A failing entry is logged and skipped.
pub fn render_all(
    entries: &BTreeMap<String, serde_json::Value>,
    out_dir: &Path,
) -> Result<RenderSummary> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let generated_on = chrono::Local::now().format("%Y-%m-%d").to_string();
    let mut summary = RenderSummary::default();

    for (company, value) in entries {
        let result = serde_json::from_value::<RiskProfile>(value.clone())
            .with_context(|| format!("invalid record for {}", company))
            .and_then(|profile| render_company(company, &profile, out_dir, &generated_on));

        match result {
            Ok(path) => {
                info!(company = %company, path = %path.display(), "report saved");
                summary.rendered.push(path);
            }
            Err(e) => {
                warn!(company = %company, error = %format!("{:#}", e), "report skipped");
                summary.failed.push((company.clone(), format!("{:#}", e)));
            }
        }
    }

    Ok(summary)
}

/// Render `<stem>.pdf` for one company, replacing any previous document atomically.
pub fn render_company(
    company: &str,
    profile: &RiskProfile,
    out_dir: &Path,
    generated_on: &str,
) -> Result<PathBuf> {
    if let Some(field) = profile.first_non_finite() {
        bail!("{} is not a finite number", field);
    }

    let stem = artifact_stem(company);
    let chart_path = out_dir.join(format!("{}_chart.png", stem));
    let chart = match chart::render_chart(profile, &chart_path) {
        Ok(()) => Some(chart_path.as_path()),
        Err(e) => {
            warn!(company = %company, error = %e, "chart unavailable; omitting image");
            None
        }
    };

    let bytes = build_document(company, profile, chart, generated_on)?;

    let out_path = out_dir.join(format!("{}.pdf", stem));
    let mut tmp = tempfile::NamedTempFile::new_in(out_dir)?;
    tmp.write_all(&bytes)?;
    tmp.persist(&out_path)
        .with_context(|| format!("Failed to write PDF to {}", out_path.display()))?;

    Ok(out_path)
}

/// Build the two-page document. A missing or unreadable chart omits the image block.
pub fn build_document(
    company: &str,
    profile: &RiskProfile,
    chart: Option<&Path>,
    generated_on: &str,
) -> Result<Vec<u8>> {
    let doc = PdfDocument::empty(format!("TNFD ESG Report - {}", company));
    let font_b = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let font_r = doc.add_builtin_font(BuiltinFont::Helvetica)?;

    add_summary_page(&doc, company, profile, chart, generated_on, &font_b, &font_r);
    add_framework_page(&doc, &font_b, &font_r);

    Ok(doc.save_to_bytes()?)
}

/// Score text as printed on page 1, in fixed order.
pub fn score_lines(profile: &RiskProfile) -> Vec<String> {
    vec![
        format!("Deforestation Risk: {:.3}", profile.deforestation_risk),
        format!("Water Pollution Risk: {:.3}", profile.water_pollution_score),
        format!("Biodiversity Loss Risk: {:.3}", profile.biodiversity_loss_risk),
        format!(
            "Natural Capital Value: {}",
            format_currency(profile.natural_capital_value)
        ),
    ]
}

/// `$1,234,567.89`; negatives as `-$1,234.50`.
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u128;
    let (whole, frac) = (cents / 100, cents % 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, frac)
}

// ── Page 1: company summary ───────────────────────────────────────────────────

fn add_summary_page(
    doc: &PdfDocumentReference,
    company: &str,
    profile: &RiskProfile,
    chart: Option<&Path>,
    generated_on: &str,
    font_b: &IndirectFontRef,
    font_r: &IndirectFontRef,
) {
    let (page_idx, layer_idx) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Summary");
    let layer = doc.get_page(page_idx).get_layer(layer_idx);

    fill_rect(&layer, 0.0, 0.0, PAGE_W, PAGE_H, BG);

    // ── Header ────────────────────────────────────────────────────────────────
    let hdr_bot = PAGE_H - COVER_HDR_H;
    fill_gradient_h(&layer, 0.0, hdr_bot, PAGE_W, COVER_HDR_H, ACCENT_GRN, ACCENT_TEAL, 28);

    set_color(&layer, WHITE_DIM);
    layer.use_text(
        format!("esg-reportr v{}", env!("CARGO_PKG_VERSION")),
        7.5, Mm(PAGE_W - MARGIN - 36.0), Mm(PAGE_H - 10.5), font_r,
    );
    set_color(&layer, WHITE);
    layer.use_text("TNFD-Compliant", 26.0, Mm(MARGIN), Mm(PAGE_H - 25.0), font_b);
    set_color(&layer, WHITE_DIM);
    layer.use_text("ESG Report", 26.0, Mm(MARGIN), Mm(PAGE_H - 38.0), font_b);

    // ── Company chip ──────────────────────────────────────────────────────────
    let chip_y = hdr_bot - 18.0;
    let chip_h = 12.0f32;
    let chip_w = 106.0f32;
    fill_rounded_rect(&layer, MARGIN, chip_y, chip_w, chip_h, R_BADGE, PANEL);
    stroke_rounded_rect(&layer, MARGIN, chip_y, chip_w, chip_h, R_BADGE, PANEL_BORDER);
    fill_rect(&layer, MARGIN, chip_y, 2.5, chip_h, ACCENT_GRN);

    set_color(&layer, TEXT_MUT);
    layer.use_text("COMPANY", 6.0, Mm(MARGIN + 5.0), Mm(chip_y + chip_h - 3.8), font_b);
    set_color(&layer, TEXT_PRI);
    layer.use_text(truncate(company, 34), 9.5, Mm(MARGIN + 5.0), Mm(chip_y + 2.8), font_b);

    set_color(&layer, TEXT_SEC);
    layer.use_text(
        format!("Generated  {}", generated_on),
        9.0, Mm(MARGIN), Mm(chip_y - 8.0), font_r,
    );

    // ── Stat cards ────────────────────────────────────────────────────────────
    let rule_y = chip_y - 16.5;
    section_rule(&layer, rule_y, "RISK OVERVIEW", font_b);

    let card_y = rule_y - 36.0;
    let card_h = 26.0f32;
    let gap = 4.0f32;
    let card_w = (T_END - MARGIN - gap * 3.0) / 4.0;

    for (i, (kind, score)) in profile.bounded_scores().iter().enumerate() {
        let cx = MARGIN + (card_w + gap) * i as f32;
        let label = kind.label().to_uppercase();
        draw_stat_card(&layer, cx, card_y, card_w, card_h, &label,
                       &format!("{:.3}", score), 20.0, level_color(*score),
                       font_r, font_b);
    }
    let cx = MARGIN + (card_w + gap) * 3.0;
    draw_stat_card(&layer, cx, card_y, card_w, card_h, "NATURAL CAPITAL",
                   &format_currency(profile.natural_capital_value), 10.5, ACCENT_TEAL,
                   font_r, font_b);

    // ── Chart + scores ────────────────────────────────────────────────────────
    let section_y = card_y - 8.5;
    section_rule(&layer, section_y, "ENVIRONMENTAL RISK SUMMARY", font_b);
    set_color(&layer, TEXT_MUT);
    layer.use_text("SCORES", 6.5, Mm(122.0), Mm(section_y - 7.0), font_b);

    let chart_top = section_y - 12.0;
    if let Some(path) = chart {
        if let Err(e) = place_chart(&layer, path, MARGIN + 7.0, chart_top, font_r) {
            warn!(company = %company, error = %e, "chart could not be embedded");
        }
    }

    let (label_x, mut line_y) = (122.0, chart_top - 4.0);
    for line in score_lines(profile) {
        let (label, value) = line.split_once(": ").unwrap_or((line.as_str(), ""));
        set_color(&layer, TEXT_SEC);
        layer.use_text(label, 8.0, Mm(label_x), Mm(line_y), font_r);
        set_color(&layer, TEXT_PRI);
        layer.use_text(value, 11.0, Mm(label_x), Mm(line_y - 5.0), font_b);
        line_y -= 11.5;
    }

    // ── Recommendations ───────────────────────────────────────────────────────
    let (_, chart_h) = chart::size_mm();
    let rec_y = chart_top - chart_h - 10.0;
    section_rule(&layer, rec_y, "RECOMMENDATIONS", font_b);

    let mut layer = layer;
    let mut y = rec_y - 14.0;
    for rec in &profile.recommendations {
        let lines = wrap_text(rec, REC_WRAP);
        let last_line_y = y - REC_LINE_H * lines.len().saturating_sub(1) as f32;
        if last_line_y < CONTENT_FLOOR {
            footer(&layer, font_r, Some(generated_on));
            layer = add_continuation_page(doc, font_b);
            y = PAGE_H - MARGIN - 14.0;
            debug!(company = %company, "recommendations continued on a new page");
        }

        fill_rounded_rect(&layer, MARGIN, y + 0.6, 2.0, 2.0, 1.0, ACCENT_GRN);
        set_color(&layer, TEXT_PRI);
        for line in lines {
            layer.use_text(line, 9.0, Mm(MARGIN + 5.0), Mm(y), font_r);
            y -= REC_LINE_H;
        }
        y -= 2.0;
    }

    footer(&layer, font_r, Some(generated_on));
}

/// Overflow page for a recommendation list longer than page 1 can hold.
fn add_continuation_page(
    doc: &PdfDocumentReference,
    font_b: &IndirectFontRef,
) -> PdfLayerReference {
    let (page_idx, layer_idx) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Recommendations");
    let layer = doc.get_page(page_idx).get_layer(layer_idx);

    fill_rect(&layer, 0.0, 0.0, PAGE_W, PAGE_H, BG);
    fill_gradient_h(&layer, 0.0, PAGE_H - 2.5, PAGE_W, 2.5, ACCENT_GRN, ACCENT_TEAL, 21);
    section_rule(&layer, PAGE_H - MARGIN, "RECOMMENDATIONS (CONTINUED)", font_b);
    layer
}

/// Embed the chart bitmap with its top-left corner at (`x`, `top`) and label its axes.
fn place_chart(
    layer: &PdfLayerReference,
    path: &Path,
    x: f32,
    top: f32,
    font_r: &IndirectFontRef,
) -> Result<()> {
    let bitmap = image::open(path)
        .with_context(|| format!("Failed to read chart {}", path.display()))?;
    let bitmap = image::DynamicImage::ImageRgb8(bitmap.to_rgb8());

    let (w, h) = chart::size_mm();
    let bottom = top - h;
    Image::from_dynamic_image(&bitmap).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(bottom)),
            dpi: Some(chart::CHART_DPI),
            ..Default::default()
        },
    );

    set_color(layer, TEXT_MUT);
    for tick in [0.0, 0.5, 1.0] {
        let ty = bottom + chart::value_height_fraction(tick) * h - 1.0;
        layer.use_text(format!("{:.1}", tick), 6.5, Mm(x - 6.5), Mm(ty), font_r);
    }

    set_color(layer, TEXT_SEC);
    for (i, label) in ["Deforestation", "Water Pollution", "Biodiversity Loss"].iter().enumerate() {
        let cx = x + chart::bar_center_fraction(i) * w;
        // rough centring for Helvetica at 6.5pt
        let half = label.len() as f32 * 0.58;
        layer.use_text(*label, 6.5, Mm(cx - half), Mm(bottom - 4.0), font_r);
    }
    Ok(())
}

// ── Page 2: framework guidance ────────────────────────────────────────────────

fn add_framework_page(
    doc: &PdfDocumentReference,
    font_b: &IndirectFontRef,
    font_r: &IndirectFontRef,
) {
    let (page_idx, layer_idx) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Framework");
    let layer = doc.get_page(page_idx).get_layer(layer_idx);

    fill_rect(&layer, 0.0, 0.0, PAGE_W, PAGE_H, BG);
    fill_gradient_h(&layer, 0.0, PAGE_H - 2.5, PAGE_W, 2.5, ACCENT_GRN, ACCENT_TEAL, 21);

    set_color(&layer, TEXT_PRI);
    layer.use_text("ESG Reporting & TNFD Framework", 20.0, Mm(MARGIN), Mm(278.5), font_b);
    set_color(&layer, TEXT_SEC);
    layer.use_text("Guidance for companies", 9.0, Mm(MARGIN), Mm(271.5), font_r);
    draw_hline(&layer, MARGIN, T_END, 267.5, PANEL_BORDER);

    let mut y = 259.0;
    set_color(&layer, TEXT_PRI);
    for line in wrap_text(FRAMEWORK_INTRO, BODY_WRAP) {
        layer.use_text(line, 9.0, Mm(MARGIN), Mm(y), font_r);
        y -= 4.8;
    }

    // Principles table
    y -= 6.0;
    set_color(&layer, TEXT_MUT);
    layer.use_text("FRAMEWORK PRINCIPLES", 6.5, Mm(MARGIN), Mm(y), font_b);
    y -= 4.0;

    let row_h = 9.0;
    let table_h = row_h * FRAMEWORK_PRINCIPLES.len() as f32;
    fill_rounded_rect(&layer, MARGIN, y - table_h, T_END - MARGIN, table_h, R_PANEL, PANEL);
    stroke_rounded_rect(&layer, MARGIN, y - table_h, T_END - MARGIN, table_h, R_PANEL, PANEL_BORDER);

    for (i, (title, desc)) in FRAMEWORK_PRINCIPLES.iter().enumerate() {
        let row_top = y - i as f32 * row_h;
        if i % 2 == 1 {
            fill_rect(&layer, MARGIN, row_top - row_h, T_END - MARGIN, row_h, PANEL_ALT);
        }
        fill_rounded_rect(&layer, MARGIN + 3.0, row_top - 5.4, 2.0, 2.0, 1.0, ACCENT_GRN);
        set_color(&layer, TEXT_PRI);
        layer.use_text(*title, 8.5, Mm(MARGIN + 7.0), Mm(row_top - 6.0), font_b);
        set_color(&layer, TEXT_SEC);
        layer.use_text(*desc, 8.0, Mm(MARGIN + 60.0), Mm(row_top - 6.0), font_r);
    }
    y -= table_h + 12.0;

    section_rule(&layer, y, "HOW THIS REPORT WAS GENERATED", font_b);
    y -= 14.0;
    set_color(&layer, TEXT_PRI);
    for line in wrap_text(METHOD_NOTE, BODY_WRAP) {
        layer.use_text(line, 9.0, Mm(MARGIN), Mm(y), font_r);
        y -= 4.8;
    }

    footer(&layer, font_r, None);
}

// ── Building blocks ───────────────────────────────────────────────────────────

fn level_color(score: f64) -> (f32, f32, f32) {
    match RiskLevel::from_score(score) {
        RiskLevel::Low => LOW_FG,
        RiskLevel::Moderate => MOD_FG,
        RiskLevel::High => HIGH_FG,
    }
}

fn section_rule(layer: &PdfLayerReference, y: f32, label: &str, font_b: &IndirectFontRef) {
    draw_hline(layer, MARGIN, T_END, y, PANEL_BORDER);
    set_color(layer, TEXT_MUT);
    layer.use_text(label, 6.5, Mm(MARGIN), Mm(y - 7.0), font_b);
}

fn footer(layer: &PdfLayerReference, font_r: &IndirectFontRef, date: Option<&str>) {
    draw_hline(layer, MARGIN, T_END, 22.0, PANEL_BORDER);
    set_color(layer, TEXT_MUT);
    layer.use_text(
        format!("Generated by esg-reportr v{}", env!("CARGO_PKG_VERSION")),
        7.5, Mm(MARGIN), Mm(15.0), font_r,
    );
    if let Some(date) = date {
        layer.use_text(date, 7.5, Mm(T_END - 16.0), Mm(15.0), font_r);
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_stat_card(
    layer: &PdfLayerReference,
    x: f32, y: f32, w: f32, h: f32,
    label: &str,
    value: &str,
    value_size: f32,
    accent: (f32, f32, f32),
    font_r: &IndirectFontRef,
    font_b: &IndirectFontRef,
) {
    fill_rounded_rect(layer, x, y, w, h, R_BADGE, PANEL);
    stroke_rounded_rect(layer, x, y, w, h, R_BADGE, PANEL_BORDER);
    fill_rect(layer, x, y + h - 2.0, w, 2.0, accent);

    set_color(layer, accent);
    layer.use_text(value, value_size, Mm(x + 4.0), Mm(y + h * 0.38), font_b);

    set_color(layer, TEXT_MUT);
    layer.use_text(label, 6.0, Mm(x + 4.0), Mm(y + 3.5), font_r);
}

// ── Drawing helpers ───────────────────────────────────────────────────────────

fn set_color(layer: &PdfLayerReference, (r, g, b): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb { r, g, b, icc_profile: None }));
}

fn fill_rect(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32,
             (r, g, b): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb { r, g, b, icc_profile: None }));
    layer.add_polygon(Polygon {
        rings: vec![vec![
            (Point::new(Mm(x),     Mm(y)),     false),
            (Point::new(Mm(x + w), Mm(y)),     false),
            (Point::new(Mm(x + w), Mm(y + h)), false),
            (Point::new(Mm(x),     Mm(y + h)), false),
        ]],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
    layer.set_fill_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
}

/// Polygon ring approximating a rounded rectangle, 8 segments per corner.
fn rounded_rect_ring(x: f32, y: f32, w: f32, h: f32, r: f32) -> Vec<(Point, bool)> {
    let r = r.min(w / 2.0).min(h / 2.0);
    const SEGS: usize = 8;
    let mut pts = Vec::with_capacity(4 * (SEGS + 1));

    let corners = [
        (x + w - r, y + r,     270.0f32, 360.0f32),
        (x + w - r, y + h - r, 0.0f32,   90.0f32),
        (x + r,     y + h - r, 90.0f32,  180.0f32),
        (x + r,     y + r,     180.0f32, 270.0f32),
    ];

    for (cx, cy, start, end) in &corners {
        for i in 0..=SEGS {
            let t = i as f32 / SEGS as f32;
            let angle = (start + (end - start) * t).to_radians();
            pts.push((
                Point::new(Mm(cx + r * angle.cos()), Mm(cy + r * angle.sin())),
                false,
            ));
        }
    }
    pts
}

fn fill_rounded_rect(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32,
                     r: f32, (cr, cg, cb): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb { r: cr, g: cg, b: cb, icc_profile: None }));
    layer.add_polygon(Polygon {
        rings: vec![rounded_rect_ring(x, y, w, h, r)],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
    layer.set_fill_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
}

fn stroke_rounded_rect(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32,
                       r: f32, (cr, cg, cb): (f32, f32, f32)) {
    layer.set_outline_color(Color::Rgb(Rgb { r: cr, g: cg, b: cb, icc_profile: None }));
    layer.set_outline_thickness(0.4);
    layer.add_polygon(Polygon {
        rings: vec![rounded_rect_ring(x, y, w, h, r)],
        mode: PaintMode::Stroke,
        winding_order: WindingOrder::NonZero,
    });
    layer.set_outline_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
    layer.set_outline_thickness(1.0);
}

fn draw_hline(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32,
              (r, g, b): (f32, f32, f32)) {
    layer.set_outline_color(Color::Rgb(Rgb { r, g, b, icc_profile: None }));
    layer.set_outline_thickness(0.3);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
    layer.set_outline_color(Color::Rgb(Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None }));
    layer.set_outline_thickness(1.0);
}

/// Left-to-right gradient made of `steps` vertical strips.
#[allow(clippy::too_many_arguments)]
fn fill_gradient_h(
    layer: &PdfLayerReference,
    x: f32, y: f32, w: f32, h: f32,
    from: (f32, f32, f32),
    to: (f32, f32, f32),
    steps: usize,
) {
    let step_w = w / steps as f32;
    for i in 0..steps {
        let t = i as f32 / (steps - 1).max(1) as f32;
        let color = (
            from.0 + (to.0 - from.0) * t,
            from.1 + (to.1 - from.1) * t,
            from.2 + (to.2 - from.2) * t,
        );
        // strips overlap slightly to hide rounding gaps
        fill_rect(layer, x + i as f32 * step_w, y, step_w + 0.6, h, color);
    }
}

// ── Text helpers ──────────────────────────────────────────────────────────────

fn truncate(s: &str, max: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > max {
        format!("{}...", chars[..max - 3].iter().collect::<String>())
    } else {
        s.to_string()
    }
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.len() <= max_chars {
        return vec![text.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.len() + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current.push(' ');
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use printpdf::lopdf::content::Content;
    use printpdf::lopdf::Document;
    use tempfile::TempDir;

    fn profile() -> RiskProfile {
        RiskProfile {
            deforestation_risk: 0.5,
            water_pollution_score: 0.123456,
            biodiversity_loss_risk: 0.75,
            natural_capital_value: 1234567.891,
            recommendations: vec![
                "Improve forest conservation policies.".to_string(),
                "Reduce industrial water discharge.".to_string(),
            ],
        }
    }

    #[test]
    fn test_score_lines_format() {
        assert_eq!(
            score_lines(&profile()),
            vec![
                "Deforestation Risk: 0.500",
                "Water Pollution Risk: 0.123",
                "Biodiversity Loss Risk: 0.750",
                "Natural Capital Value: $1,234,567.89",
            ]
        );
    }

    /// Text shown on each page, one entry per `Tj` operator.
    fn page_texts(bytes: &[u8]) -> Vec<Vec<String>> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|&id| {
                let content = Content::decode(&doc.get_page_content(id).unwrap()).unwrap();
                content
                    .operations
                    .iter()
                    .filter(|op| op.operator == "Tj")
                    .filter_map(|op| op.operands.first())
                    .filter_map(|o| o.as_str().ok())
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_identical_profiles_render_identical_score_text() {
        let first = build_document("Acme Co", &profile(), None, "2026-01-01").unwrap();
        let second = build_document("Acme Co", &profile(), None, "2026-01-01").unwrap();

        let (first, second) = (page_texts(&first), page_texts(&second));
        assert_eq!(first[0], second[0]);
        for expected in ["0.500", "0.123", "0.750", "$1,234,567.89"] {
            assert!(first[0].iter().any(|t| t == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_long_recommendation_list_continues_on_new_page() {
        let mut p = profile();
        p.recommendations = (1..=40).map(|i| format!("Recommendation number {}.", i)).collect();

        let pages = page_texts(&build_document("Acme Co", &p, None, "2026-01-01").unwrap());
        assert!(pages.len() > 2);

        let shown: Vec<&String> = pages.iter().flatten().collect();
        for rec in &p.recommendations {
            assert_eq!(shown.iter().filter(|t| **t == rec).count(), 1, "{}", rec);
        }
        assert!(pages[1].iter().any(|t| t == "RECOMMENDATIONS (CONTINUED)"));
        let last = pages.last().unwrap();
        assert!(last.iter().any(|t| t == "ESG Reporting & TNFD Framework"));
    }

    #[test]
    fn test_short_list_stays_on_two_pages() {
        let pages = page_texts(&build_document("Acme Co", &profile(), None, "2026-01-01").unwrap());
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(12420.0), "$12,420.00");
        assert_eq!(format_currency(-1234.5), "-$1,234.50");
        assert_eq!(format_currency(100.0), "$100.00");
    }

    #[test]
    fn test_document_without_chart() {
        let bytes = build_document("Acme Co", &profile(), None, "2026-01-01").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_document_with_missing_chart_file() {
        let bytes = build_document(
            "Acme Co",
            &profile(),
            Some(Path::new("no/such/chart.png")),
            "2026-01-01",
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_all_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let mut entries = BTreeMap::new();
        entries.insert("Acme Co".to_string(), serde_json::to_value(profile()).unwrap());
        entries.insert(
            "Half Done Ltd".to_string(),
            serde_json::json!({ "Deforestation Risk": 0.2 }),
        );

        let summary = render_all(&entries, dir.path()).unwrap();
        assert_eq!(summary.rendered, vec![dir.path().join("acme_co.pdf")]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "Half Done Ltd");
        assert!(dir.path().join("acme_co.pdf").is_file());
        assert!(!dir.path().join("half_done_ltd.pdf").exists());
    }

    #[test]
    fn test_non_finite_profile_rejected() {
        let dir = TempDir::new().unwrap();
        let mut p = profile();
        p.biodiversity_loss_risk = f64::NAN;
        let err = render_company("Acme Co", &p, dir.path(), "2026-01-01").unwrap_err();
        assert!(err.to_string().contains("Biodiversity Loss"));
    }

    #[test]
    fn test_wrap_and_truncate() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(truncate("abcdefgh", 6), "abc...");
        assert_eq!(truncate("abc", 6), "abc");
    }
}
