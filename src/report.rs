// src/report.rs

use base64::{Engine as _, engine::general_purpose::STANDARD};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat, dictionary};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to build PDF content: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Failed to serialize PDF: {0}")]
    Io(#[from] std::io::Error),
}

/// Page geometry in PDF points. Defaults are A4 with 10 mm margins, a
/// 20 mm bottom margin and 10 mm lines of 12pt Helvetica.
#[derive(Debug, Clone)]
pub struct ReportLayout {
    pub page_width: i64,
    pub page_height: i64,
    pub margin: i64,
    pub bottom_margin: i64,
    pub font_size: i64,
    pub line_height: i64,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            page_width: 595,
            page_height: 842,
            margin: 28,
            bottom_margin: 57,
            font_size: 12,
            line_height: 28,
        }
    }
}

impl ReportLayout {
    pub fn lines_per_page(&self) -> usize {
        let usable = self.page_height - self.margin - self.bottom_margin;
        (usable / self.line_height.max(1)).max(1) as usize
    }

    fn text_width(&self) -> f64 {
        (self.page_width - 2 * self.margin) as f64
    }
}

/// A rendered summary, ready to be downloaded.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl ReportArtifact {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:` URI suitable for an `<a href=... download=...>` link.
    pub fn data_uri(&self) -> String {
        format!("data:application/pdf;base64,{}", self.to_base64())
    }
}

pub const DEFAULT_FILENAME: &str = "BillCheck_AI_Summary.pdf";

/// Lay `summary` out as paginated PDF. Each `\n`-separated line becomes a
/// word-wrapped paragraph; pages are added as content overflows.
pub fn render_report(summary: &str, layout: &ReportLayout) -> Result<ReportArtifact, ReportError> {
    let mut lines = Vec::new();
    for paragraph in summary.split('\n') {
        let paragraph = sanitize(paragraph);
        lines.extend(wrap_paragraph(
            &paragraph,
            layout.text_width(),
            layout.font_size as f64,
        ));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut page_ids: Vec<Object> = Vec::new();
    for page_lines in lines.chunks(layout.lines_per_page()) {
        let content = page_content(page_lines, layout);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), layout.page_width.into(), layout.page_height.into()],
        });
        page_ids.push(page_id.into());
    }

    let page_count = page_ids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    info!(pages = page_count, lines = lines.len(), bytes = bytes.len(), "Report rendered");

    Ok(ReportArtifact {
        bytes,
        filename: DEFAULT_FILENAME.to_string(),
    })
}

fn page_content(lines: &[String], layout: &ReportLayout) -> Content {
    let mut operations = Vec::new();
    // Baseline of the first line sits one font size below the top margin
    let mut y = layout.page_height - layout.margin - layout.font_size;

    for line in lines {
        if !line.is_empty() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec!["F1".into(), layout.font_size.into()],
            ));
            operations.push(Operation::new("Td", vec![layout.margin.into(), y.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(line), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }
        y -= layout.line_height;
    }

    Content { operations }
}

/// Replace characters the built-in font cannot show.
fn sanitize(line: &str) -> String {
    line.chars()
        .filter(|&c| c != '\r')
        .map(|c| match c {
            '\t' => ' ',
            c if win_ansi_byte(c).is_some() => c,
            _ => '?',
        })
        .collect()
}

fn encode_win_ansi(line: &str) -> Vec<u8> {
    line.chars().map(|c| win_ansi_byte(c).unwrap_or(b'?')).collect()
}

fn win_ansi_byte(c: char) -> Option<u8> {
    match c {
        ' '..='~' => Some(c as u8),
        '\u{A0}'..='\u{FF}' => Some(c as u32 as u8),
        '€' => Some(0x80),
        '‚' => Some(0x82),
        'ƒ' => Some(0x83),
        '„' => Some(0x84),
        '…' => Some(0x85),
        '†' => Some(0x86),
        '‡' => Some(0x87),
        'ˆ' => Some(0x88),
        '‰' => Some(0x89),
        'Š' => Some(0x8A),
        '‹' => Some(0x8B),
        'Œ' => Some(0x8C),
        'Ž' => Some(0x8E),
        '‘' => Some(0x91),
        '’' => Some(0x92),
        '“' => Some(0x93),
        '”' => Some(0x94),
        '•' => Some(0x95),
        '–' => Some(0x96),
        '—' => Some(0x97),
        '˜' => Some(0x98),
        '™' => Some(0x99),
        'š' => Some(0x9A),
        '›' => Some(0x9B),
        'œ' => Some(0x9C),
        'ž' => Some(0x9E),
        'Ÿ' => Some(0x9F),
        _ => None,
    }
}

// Helvetica advance widths for ' '..='~', in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

fn char_width(c: char, font_size: f64) -> f64 {
    let units = match c {
        ' '..='~' => HELVETICA_WIDTHS[(c as usize) - 0x20],
        _ => 556,
    };
    units as f64 * font_size / 1000.0
}

fn text_width(s: &str, font_size: f64) -> f64 {
    s.chars().map(|c| char_width(c, font_size)).sum()
}

/// Greedy word wrap. Words wider than a whole line are broken by
/// character. An empty paragraph is one empty line.
fn wrap_paragraph(paragraph: &str, max_width: f64, font_size: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let space = char_width(' ', font_size);

    for word in paragraph.split_whitespace() {
        let word_width = text_width(word, font_size);
        if !current.is_empty() && text_width(&current, font_size) + space + word_width <= max_width
        {
            current.push(' ');
            current.push_str(word);
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if word_width <= max_width {
            current.push_str(word);
            continue;
        }

        let mut width = 0.0;
        for c in word.chars() {
            let w = char_width(c, font_size);
            if width + w > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                width = 0.0;
            }
            current.push(c);
            width += w;
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_count(artifact: &ReportArtifact) -> usize {
        Document::load_mem(&artifact.bytes).unwrap().get_pages().len()
    }

    #[test]
    fn test_short_summary_single_page() {
        let artifact = render_report("Electricity bill.\n\nGST 18% applied.", &ReportLayout::default())
            .unwrap();
        assert!(artifact.bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(page_count(&artifact), 1);
        assert_eq!(artifact.filename, "BillCheck_AI_Summary.pdf");
    }

    #[test]
    fn test_empty_summary_still_has_a_page() {
        let artifact = render_report("", &ReportLayout::default()).unwrap();
        assert_eq!(page_count(&artifact), 1);
    }

    #[test]
    fn test_overflow_adds_pages() {
        let layout = ReportLayout::default();
        let per_page = layout.lines_per_page();
        let summary = vec!["line"; per_page * 2 + 1].join("\n");
        let artifact = render_report(&summary, &layout).unwrap();
        assert_eq!(page_count(&artifact), 3);
    }

    #[test]
    fn test_text_is_extractable() {
        let artifact = render_report("Vendor: Acme Traders\nTotal due 1180", &ReportLayout::default())
            .unwrap();
        let doc = Document::load_mem(&artifact.bytes).unwrap();
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains("Acme Traders"));
        assert!(text.contains("Total due 1180"));
    }

    #[test]
    fn test_wrap_fits_width() {
        let paragraph = "GST invoice ".repeat(40);
        let lines = wrap_paragraph(&paragraph, 200.0, 12.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| text_width(l, 12.0) <= 200.0));
        assert_eq!(
            lines.join(" ").split_whitespace().count(),
            paragraph.split_whitespace().count()
        );
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let word = "W".repeat(100);
        let lines = wrap_paragraph(&word, 100.0, 12.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| text_width(l, 12.0) <= 100.0));
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_wrap_empty_paragraph() {
        assert_eq!(wrap_paragraph("", 100.0, 12.0), vec![String::new()]);
    }

    #[test]
    fn test_unsupported_characters_replaced() {
        assert_eq!(sanitize("₹1,180 — paid\t✓"), "?1,180 — paid ?");
        assert_eq!(encode_win_ansi("é€"), vec![0xE9, 0x80]);
    }

    #[test]
    fn test_full_win_ansi_upper_range() {
        let text = "„Œuvre“ ‰ Šž Ÿ ƒ†‡";
        assert_eq!(sanitize(text), text);
        assert_eq!(
            encode_win_ansi("„Œž‰Ÿ"),
            vec![0x84, 0x8C, 0x9E, 0x89, 0x9F]
        );
        // 0x81, 0x8D, 0x8F, 0x90 and 0x9D are unassigned
        assert_eq!(sanitize("\u{81}\u{9D}"), "??");
    }

    #[test]
    fn test_data_uri() {
        let artifact = ReportArtifact {
            bytes: b"%PDF".to_vec(),
            filename: DEFAULT_FILENAME.to_string(),
        };
        assert_eq!(artifact.to_base64(), "JVBERg==");
        assert_eq!(artifact.data_uri(), "data:application/pdf;base64,JVBERg==");
    }
}
