//! Branded PDF report generation.
//!
//! The report is a fixed template: every US-Letter page carries the brand
//! header (light band, wordmark, subtitle, accent bars, rule and page
//! number), and the first page opens with the title, the objective in a
//! shaded box and the analysis parsed into [`blocks::Block`]s. Content
//! flows onto new pages as needed; a footer line closes the document.
//!
//! Layout is done in PDF points with the origin at the bottom-left corner,
//! and converted to millimetres only at the `printpdf` boundary.

pub mod blocks;
pub mod layout;

use crate::config::{BrandColor, ReportConfig};
use crate::error::KpiLensError;
use crate::output::AnalysisOutput;
use blocks::{parse_blocks, Block};
use layout::{sanitize, text_width, wrap, FontFace};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rect, Rgb,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const CONTENT_TOP: f32 = PAGE_HEIGHT - MARGIN;

/// What the download button posts: the analysis as displayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub objective: String,
    pub analysis: String,
    /// Name of the analysed upload; only used for the download name.
    #[serde(default)]
    pub filename: Option<String>,
    /// Model tag for the footer.
    #[serde(default)]
    pub model: Option<String>,
}

impl From<&AnalysisOutput> for ReportRequest {
    fn from(output: &AnalysisOutput) -> Self {
        Self {
            objective: output.objective.clone(),
            analysis: output.analysis.clone(),
            filename: Some(output.image.filename.clone()),
            model: Some(output.model.clone()),
        }
    }
}

/// Download name for a report: `dashboard_analysis_<stem>.pdf`.
///
/// The stem is the upload name up to its first `.`, with any directory part
/// removed and characters outside `[A-Za-z0-9_-]` replaced by `_`.
pub fn report_filename(upload_name: Option<&str>) -> String {
    let name = upload_name.unwrap_or_default();
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem: String = base
        .split('.')
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() { "dashboard".to_string() } else { stem };
    format!("dashboard_analysis_{}.pdf", stem)
}

/// Render the report on the blocking pool.
pub async fn render_report(
    request: &ReportRequest,
    config: &ReportConfig,
) -> Result<Vec<u8>, KpiLensError> {
    let (request, config) = (request.clone(), config.clone());
    tokio::task::spawn_blocking(move || build_report(&request, &config))
        .await
        .map_err(|e| KpiLensError::Internal(format!("Report task panicked: {}", e)))?
}

/// Lay out and serialise the report.
pub fn build_report(request: &ReportRequest, config: &ReportConfig) -> Result<Vec<u8>, KpiLensError> {
    if request.analysis.trim().is_empty() {
        return Err(KpiLensError::InvalidReport("the analysis text is empty".into()));
    }
    if request.objective.trim().is_empty() {
        return Err(KpiLensError::InvalidReport("the objective is empty".into()));
    }

    let blocks = parse_blocks(&request.analysis);
    debug!("Report: {} blocks", blocks.len());

    let mut w = PageWriter::new(&config.title, config)?;

    w.paragraph(&config.title, &styles::TITLE);
    w.space(21.6);

    w.paragraph("1. Dashboard Objective", &styles::SECTION);
    w.boxed_paragraph(&request.objective, &styles::OBJECTIVE);
    w.space(14.4);

    w.paragraph("2. AI Analysis Results", &styles::SECTION);
    w.space(7.2);

    for block in &blocks {
        match block {
            Block::Spacer => w.space(6.0),
            Block::SubHeading(text) => w.paragraph(text, &styles::SUB_HEADING),
            Block::LabeledItem { label, body } => w.labeled(label, body, &styles::BODY),
            Block::Bullet(text) => w.bullet(text, &styles::BULLET),
            Block::Paragraph(text) => w.paragraph(text, &styles::BODY),
        }
    }

    w.space(21.6);
    w.paragraph(&config.footer_for(request.model.as_deref()), &styles::FOOTER);

    let pages = w.page;
    let bytes = w.finish()?;
    info!("Report rendered: {} pages, {} bytes", pages, bytes.len());
    Ok(bytes)
}

// ── Styles ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Primary,
    Accent,
    Text,
    Muted,
}

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    face: FontFace,
    size: f32,
    leading: f32,
    tone: Tone,
    align: Align,
    indent_left: f32,
    indent_right: f32,
    space_before: f32,
    space_after: f32,
}

mod styles {
    use super::{Align, FontFace, TextStyle, Tone};

    pub(super) const TITLE: TextStyle = TextStyle {
        face: FontFace::Bold,
        size: 16.0,
        leading: 20.0,
        tone: Tone::Primary,
        align: Align::Center,
        indent_left: 0.0,
        indent_right: 0.0,
        space_before: 0.0,
        space_after: 24.0,
    };

    pub(super) const SECTION: TextStyle = TextStyle {
        face: FontFace::Bold,
        size: 14.0,
        leading: 17.0,
        tone: Tone::Primary,
        align: Align::Left,
        indent_left: 0.0,
        indent_right: 0.0,
        space_before: 20.0,
        space_after: 12.0,
    };

    pub(super) const SUB_HEADING: TextStyle = TextStyle {
        face: FontFace::Bold,
        size: 12.0,
        leading: 14.5,
        tone: Tone::Accent,
        align: Align::Left,
        indent_left: 0.0,
        indent_right: 0.0,
        space_before: 12.0,
        space_after: 6.0,
    };

    pub(super) const BODY: TextStyle = TextStyle {
        face: FontFace::Regular,
        size: 12.0,
        leading: 16.0,
        tone: Tone::Text,
        align: Align::Left,
        indent_left: 12.0,
        indent_right: 0.0,
        space_before: 4.0,
        space_after: 6.0,
    };

    pub(super) const BULLET: TextStyle = TextStyle {
        indent_left: 24.0,
        space_before: 3.0,
        ..BODY
    };

    pub(super) const OBJECTIVE: TextStyle = TextStyle {
        face: FontFace::Oblique,
        size: 12.0,
        leading: 16.0,
        tone: Tone::Text,
        align: Align::Left,
        indent_left: 12.0,
        indent_right: 12.0,
        space_before: 8.0,
        space_after: 12.0,
    };

    pub(super) const FOOTER: TextStyle = TextStyle {
        face: FontFace::Regular,
        size: 9.0,
        leading: 12.0,
        tone: Tone::Muted,
        align: Align::Center,
        indent_left: 0.0,
        indent_right: 0.0,
        space_before: 16.0,
        space_after: 4.0,
    };
}

/// Offset of the bullet marker from the left margin.
const BULLET_INDENT: f32 = 12.0;
/// Gap between the objective text and its box border.
const BOX_PADDING: f32 = 15.0;

// ── Page writer ──────────────────────────────────────────────────────────

fn mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

fn color(c: BrandColor) -> Color {
    let (r, g, b) = c.to_unit();
    Color::Rgb(Rgb::new(r, g, b, None))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: FontFace) -> &IndirectFontRef {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
            FontFace::Oblique => &self.oblique,
        }
    }
}

/// Cursor-based writer that flows text down the content frame and starts a
/// new branded page when the frame is full.
struct PageWriter<'a> {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    config: &'a ReportConfig,
    /// 1-based number of the current page.
    page: usize,
    /// Top of the free space on the current page, in points from the bottom.
    cursor: f32,
}

impl<'a> PageWriter<'a> {
    fn new(title: &str, config: &'a ReportConfig) -> Result<Self, KpiLensError> {
        let (doc, page, layer) =
            PdfDocument::new(sanitize(title), mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
        let font = |f: BuiltinFont| {
            doc.add_builtin_font(f)
                .map_err(|e| KpiLensError::ReportFailed(format!("font: {}", e)))
        };
        let fonts = Fonts {
            regular: font(BuiltinFont::Helvetica)?,
            bold: font(BuiltinFont::HelveticaBold)?,
            oblique: font(BuiltinFont::HelveticaOblique)?,
        };
        let layer = doc.get_page(page).get_layer(layer);

        let writer = Self {
            doc,
            layer,
            fonts,
            config,
            page: 1,
            cursor: CONTENT_TOP,
        };
        writer.draw_header();
        Ok(writer)
    }

    fn finish(self) -> Result<Vec<u8>, KpiLensError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| KpiLensError::ReportFailed(e.to_string()))
    }

    fn tone(&self, tone: Tone) -> BrandColor {
        match tone {
            Tone::Primary => self.config.primary,
            Tone::Accent => self.config.accent,
            Tone::Text => self.config.text,
            Tone::Muted => self.config.muted,
        }
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page += 1;
        self.cursor = CONTENT_TOP;
        self.draw_header();
    }

    fn at_page_top(&self) -> bool {
        (self.cursor - CONTENT_TOP).abs() < f32::EPSILON
    }

    /// Start a new page unless `height` points still fit above the margin.
    fn ensure_space(&mut self, height: f32) {
        if self.cursor - height < MARGIN && !self.at_page_top() {
            self.new_page();
        }
    }

    /// Vertical gap. Gaps never carry over to the next page.
    fn space(&mut self, height: f32) {
        if self.cursor - height < MARGIN {
            self.new_page();
        } else {
            self.cursor -= height;
        }
    }

    fn leading_space(&mut self, style: &TextStyle) {
        if !self.at_page_top() {
            self.space(style.space_before);
        }
    }

    // ── drawing primitives ───────────────────────────────────────────────

    fn fill_rect(&self, x: f32, y: f32, w: f32, h: f32, c: BrandColor) {
        self.layer.set_fill_color(color(c));
        let rect = Rect::new(mm(x), mm(y), mm(x + w), mm(y + h))
            .with_mode(PaintMode::Fill);
        self.layer.add_rect(rect);
    }

    fn stroke_rect(&self, x: f32, y: f32, w: f32, h: f32, c: BrandColor, thickness: f32) {
        self.layer.set_outline_color(color(c));
        self.layer.set_outline_thickness(thickness);
        let rect = Rect::new(mm(x), mm(y), mm(x + w), mm(y + h)).with_mode(PaintMode::Stroke);
        self.layer.add_rect(rect);
    }

    fn hline(&self, x1: f32, x2: f32, y: f32, c: BrandColor, thickness: f32) {
        self.layer.set_outline_color(color(c));
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(mm(x1), mm(y)), false),
                (Point::new(mm(x2), mm(y)), false),
            ],
            is_closed: false,
        });
    }

    fn text(&self, text: &str, face: FontFace, size: f32, x: f32, baseline: f32, c: BrandColor) {
        self.layer.set_fill_color(color(c));
        self.layer
            .use_text(text, size, mm(x), mm(baseline), self.fonts.get(face));
    }

    fn draw_header(&self) {
        let cfg = self.config;
        let top = PAGE_HEIGHT;

        self.fill_rect(40.0, top - 65.0, PAGE_WIDTH - 80.0, 55.0, cfg.background);

        self.text(&sanitize(&cfg.brand_name), FontFace::Bold, 18.0, 50.0, top - 30.0, cfg.primary);
        self.text(&sanitize(&cfg.subtitle), FontFace::Regular, 12.0, 50.0, top - 48.0, cfg.accent);

        self.fill_rect(PAGE_WIDTH - 120.0, top - 45.0, 60.0, 8.0, cfg.accent);
        self.fill_rect(PAGE_WIDTH - 120.0, top - 35.0, 60.0, 4.0, cfg.primary);

        self.hline(40.0, PAGE_WIDTH - 40.0, top - 68.0, cfg.accent, 3.0);

        let label = format!("Page {}", self.page);
        let width = text_width(&label, FontFace::Regular, 10.0);
        self.text(&label, FontFace::Regular, 10.0, PAGE_WIDTH - 50.0 - width, top - 25.0, cfg.muted);
    }

    // ── flowables ────────────────────────────────────────────────────────

    /// Draw pre-wrapped lines, breaking pages between lines.
    fn lines(&mut self, lines: &[(FontFace, String)], style: &TextStyle) {
        let color = self.tone(style.tone);
        let width = CONTENT_WIDTH - style.indent_left - style.indent_right;
        for (face, line) in lines {
            self.ensure_space(style.leading);
            let baseline = self.cursor - style.size;
            let x = match style.align {
                Align::Left => MARGIN + style.indent_left,
                Align::Center => {
                    let w = text_width(line, *face, style.size);
                    MARGIN + style.indent_left + ((width - w) / 2.0).max(0.0)
                }
            };
            self.text(line, *face, style.size, x, baseline, color);
            self.cursor -= style.leading;
        }
    }

    fn wrap_with(&self, text: &str, face: FontFace, style: &TextStyle, indent: f32) -> Vec<(FontFace, String)> {
        let width = CONTENT_WIDTH - indent - style.indent_right;
        wrap(&sanitize(text), face, style.size, width)
            .into_iter()
            .map(|l| (face, l))
            .collect()
    }

    fn paragraph(&mut self, text: &str, style: &TextStyle) {
        let lines = self.wrap_with(text, style.face, style, style.indent_left);
        if lines.is_empty() {
            return;
        }
        self.leading_space(style);
        self.lines(&lines, style);
        self.space(style.space_after);
    }

    /// Bold `label:` on its own line(s), then the body.
    fn labeled(&mut self, label: &str, body: &str, style: &TextStyle) {
        let mut lines = self.wrap_with(&format!("{}:", label), FontFace::Bold, style, style.indent_left);
        lines.extend(self.wrap_with(body, style.face, style, style.indent_left));
        self.leading_space(style);
        self.lines(&lines, style);
        self.space(style.space_after);
    }

    fn bullet(&mut self, text: &str, style: &TextStyle) {
        let lines = self.wrap_with(text, style.face, style, style.indent_left);
        if lines.is_empty() {
            return;
        }
        self.leading_space(style);
        self.ensure_space(style.leading);
        let marker_y = self.cursor - style.size * 0.65;
        self.fill_rect(MARGIN + BULLET_INDENT, marker_y, 3.5, 3.5, self.tone(style.tone));
        self.lines(&lines, style);
        self.space(style.space_after);
    }

    /// Paragraph inside a shaded, bordered box.
    ///
    /// The box is drawn only when the whole paragraph fits on one page;
    /// longer text flows like a normal paragraph.
    fn boxed_paragraph(&mut self, text: &str, style: &TextStyle) {
        let lines = self.wrap_with(text, style.face, style, style.indent_left);
        if lines.is_empty() {
            return;
        }
        self.leading_space(style);

        let text_height = lines.len() as f32 * style.leading;
        let box_height = text_height + 2.0 * BOX_PADDING;
        if self.cursor - box_height < MARGIN {
            if CONTENT_TOP - box_height >= MARGIN {
                self.new_page();
            } else {
                self.lines(&lines, style);
                self.space(style.space_after);
                return;
            }
        }

        let x = MARGIN + style.indent_left - BOX_PADDING;
        let w = CONTENT_WIDTH - style.indent_left - style.indent_right + 2.0 * BOX_PADDING;
        let y = self.cursor - box_height;
        self.fill_rect(x, y, w, box_height, self.config.background);
        self.stroke_rect(x, y, w, box_height, self.config.accent, 1.0);

        self.cursor -= BOX_PADDING;
        self.lines(&lines, style);
        self.cursor -= BOX_PADDING;
        self.space(style.space_after);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(analysis: &str) -> ReportRequest {
        ReportRequest {
            objective: "To monitor employee distribution across departments.".into(),
            analysis: analysis.into(),
            filename: Some("hr_dashboard.png".into()),
            model: Some("qwen2.5vl:7b".into()),
        }
    }

    #[test]
    fn filename_from_upload() {
        assert_eq!(report_filename(Some("hr.dashboard.png")), "dashboard_analysis_hr.pdf");
        assert_eq!(
            report_filename(Some("C:\\fakepath\\Q3 sales.jpg")),
            "dashboard_analysis_Q3_sales.pdf"
        );
        assert_eq!(report_filename(None), "dashboard_analysis_dashboard.pdf");
        assert_eq!(report_filename(Some(".png")), "dashboard_analysis_dashboard.pdf");
    }

    #[test]
    fn renders_pdf_bytes() {
        let analysis = "1. **Overall Summary:** Headcount is stable.\n\n* Engineering: 40%\n* Sales: 25%\n";
        let bytes = build_report(&request(analysis), &ReportConfig::default()).expect("report");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_analysis_spans_pages() {
        let paragraph = "The regional distribution shows a steady increase in headcount across \
                         every quarter, with the largest gains in engineering and support. ";
        let analysis: String = (0..80).map(|i| format!("{}. Point: {}\n", i % 9 + 1, paragraph)).collect();
        let config = ReportConfig::default();

        let mut writer = PageWriter::new("t", &config).unwrap();
        for block in parse_blocks(&analysis) {
            if let Block::LabeledItem { label, body } = block {
                writer.labeled(&label, &body, &styles::BODY);
            }
        }
        assert!(writer.page > 1, "expected multiple pages, got {}", writer.page);
        assert!(writer.cursor >= MARGIN);

        let bytes = build_report(&request(&analysis), &config).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn rejects_empty_analysis() {
        let err = build_report(&request("   \n"), &ReportConfig::default()).unwrap_err();
        assert!(matches!(err, KpiLensError::InvalidReport(_)));
    }

    #[test]
    fn huge_objective_still_renders() {
        let mut req = request("Fine.");
        req.objective = "grow ".repeat(3000);
        let bytes = build_report(&req, &ReportConfig::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
