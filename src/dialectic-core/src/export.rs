//! PDF transcript export.
//!
//! Collects `"Speaker: text"` lines as the debate runs and writes them to a
//! single timestamped PDF when the run finishes. The document uses the
//! built-in Times-Roman font with WinAnsi encoding, so no font files are
//! embedded; lines are wrapped by the font's glyph widths.

use std::fs;
use std::mem;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use tracing::info;

use crate::error::DebateError;
use crate::orchestrator::{DebateEvent, EventSink, RunOutcome};

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
/// 10 mm.
const MARGIN: f32 = 28.35;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const FONT_SIZE: f32 = 12.0;
const LEADING: f32 = 14.0;
/// Gap between two transcript entries.
const ENTRY_GAP: f32 = 5.67;
const FOOTER_SIZE: f32 = 9.0;
const FOOTER_SPACE: f32 = 24.0;

/// Times-Roman advance widths for 0x20..=0x7E, in 1/1000 em.
#[rustfmt::skip]
const TIMES_ASCII_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

/// Wrap `text` at word boundaries so no line exceeds `width` characters.
///
/// Newlines start a new paragraph; words longer than `width` are split.
/// Meant for terminal output, where every glyph has the same width.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > width {
                if current_len > 0 {
                    lines.push(mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            if current_len > 0 && current_len + word.len() + 1 > width {
                lines.push(mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += word.len();
            current.extend(word);
        }

        if current_len > 0 || lines.is_empty() {
            lines.push(current);
        }
    }

    lines
}

/// Output file name, `debate_<YYYY-mm-dd_HH-MM-SS>[_incomplete].<ext>`.
pub fn output_filename(timestamp: DateTime<Local>, extension: &str, complete: bool) -> String {
    let suffix = if complete { "" } else { "_incomplete" };
    format!(
        "debate_{}{}.{}",
        timestamp.format("%Y-%m-%d_%H-%M-%S"),
        suffix,
        extension
    )
}

/// WinAnsi code for `c`. Characters the encoding lacks become `?`.
fn win_ansi_byte(c: char) -> u8 {
    match c {
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{2122}' => 0x99,
        c if c.is_control() => b' ',
        c if c.is_ascii() => c as u8,
        c if ('\u{A0}'..='\u{FF}').contains(&c) => c as u8,
        _ => b'?',
    }
}

/// Encode `text` as WinAnsi bytes for a PDF string.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

/// Advance width of a WinAnsi code in 1/1000 em.
fn glyph_width(code: u8) -> u16 {
    match code {
        0x20..=0x7E => TIMES_ASCII_WIDTHS[usize::from(code - 0x20)],
        0x80 | 0x96 => 500,
        0x82 | 0x91 | 0x92 => 333,
        0x84 | 0x93 | 0x94 => 444,
        0x85 | 0x97 => 1000,
        0x95 => 350,
        0x99 => 980,
        0xA0 => 250,
        0xC6 => 889,
        0xE6 => 667,
        0xF7 => 564,
        // Widest glyph of the Latin-1 symbols and capitals.
        0xA1..=0xDE => 760,
        _ => 500,
    }
}

fn char_width(c: char, font_size: f32) -> f32 {
    f32::from(glyph_width(win_ansi_byte(c))) * font_size / 1000.0
}

/// Rendered width of `text` in points.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(|c| char_width(c, font_size)).sum()
}

/// Wrap `text` so no line is wider than `max_width` points when set in
/// Times-Roman at `font_size`.
///
/// Newlines start a new paragraph; words wider than a line are split.
pub fn wrap_to_width(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let space = char_width(' ', font_size);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0.0;

        for word in paragraph.split_whitespace() {
            let mut word = word.to_string();
            let mut word_width = text_width(&word, font_size);

            if word_width > max_width {
                if !current.is_empty() {
                    lines.push(mem::take(&mut current));
                    current_width = 0.0;
                }
                let mut piece = String::new();
                let mut piece_width = 0.0;
                for c in word.chars() {
                    let width = char_width(c, font_size);
                    if !piece.is_empty() && piece_width + width > max_width {
                        lines.push(mem::take(&mut piece));
                        piece_width = 0.0;
                    }
                    piece.push(c);
                    piece_width += width;
                }
                word = piece;
                word_width = piece_width;
            }

            if !current.is_empty() && current_width + space + word_width > max_width {
                lines.push(mem::take(&mut current));
                current_width = 0.0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_width += space;
            }
            current.push_str(&word);
            current_width += word_width;
        }

        if !current.is_empty() || lines.is_empty() {
            lines.push(current);
        }
    }

    lines
}

/// Render transcript lines into a complete PDF document.
pub fn render_pdf(entries: &[String]) -> Result<Vec<u8>, DebateError> {
    let pages = layout(entries);
    let page_count = pages.len();

    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(page_count);
    for (i, lines) in pages.iter().enumerate() {
        let mut operations = Vec::with_capacity((lines.len() + 1) * 5);
        for (y, text) in lines {
            show_text(&mut operations, FONT_SIZE, MARGIN, *y, encode_win_ansi(text));
        }
        let footer = format!("Page {}/{}", i + 1, page_count);
        let footer_x = (PAGE_WIDTH - text_width(&footer, FOOTER_SIZE)) / 2.0;
        show_text(&mut operations, FOOTER_SIZE, footer_x, MARGIN, footer.into_bytes());

        let content = Content { operations }.encode().map_err(|e| {
            DebateError::Export(format!("Failed to encode page {}: {}", i + 1, e))
        })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let media_box: Vec<Object> = vec![
        Object::Integer(0),
        Object::Integer(0),
        PAGE_WIDTH.into(),
        PAGE_HEIGHT.into(),
    ];
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| DebateError::Export(format!("Failed to serialize PDF: {}", e)))?;
    Ok(out)
}

fn show_text(operations: &mut Vec<Operation>, size: f32, x: f32, y: f32, text: Vec<u8>) {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new("Tf", vec!["F1".into(), size.into()]));
    operations.push(Operation::new("Td", vec![x.into(), y.into()]));
    operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
    operations.push(Operation::new("ET", vec![]));
}

/// Place wrapped lines on pages as (baseline y, text) pairs.
fn layout(entries: &[String]) -> Vec<Vec<(f32, String)>> {
    let top = PAGE_HEIGHT - MARGIN - FONT_SIZE;
    let bottom = MARGIN + FOOTER_SPACE;

    let mut pages = vec![Vec::new()];
    let mut y = top;

    for entry in entries {
        for line in wrap_to_width(entry, CONTENT_WIDTH, FONT_SIZE) {
            if y < bottom {
                pages.push(Vec::new());
                y = top;
            }
            if let Some(page) = pages.last_mut() {
                page.push((y, line));
            }
            y -= LEADING;
        }
        y -= ENTRY_GAP;
    }

    pages
}

/// Sink that writes the transcript to a PDF once the run is over.
pub struct TranscriptPdf {
    output_dir: PathBuf,
    lines: Vec<String>,
    written: Option<PathBuf>,
}

impl TranscriptPdf {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            lines: Vec::new(),
            written: None,
        }
    }

    /// Formatted lines received so far.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Path of the written PDF, once `finish` has run.
    pub fn written_path(&self) -> Option<&Path> {
        self.written.as_deref()
    }
}

impl EventSink for TranscriptPdf {
    fn on_event(&mut self, event: &DebateEvent) -> Result<(), DebateError> {
        self.lines.push(event.line());
        Ok(())
    }

    fn finish(&mut self, outcome: RunOutcome) -> Result<(), DebateError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            DebateError::Export(format!(
                "Failed to create {}: {}",
                self.output_dir.display(),
                e
            ))
        })?;

        let complete = outcome == RunOutcome::Completed;
        let path = self
            .output_dir
            .join(output_filename(Local::now(), "pdf", complete));
        let document = render_pdf(&self.lines)?;
        fs::write(&path, document).map_err(|e| {
            DebateError::Export(format!("Failed to write {}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), entries = self.lines.len(), complete, "transcript written");
        self.written = Some(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Speaker;
    use chrono::TimeZone;

    #[test]
    fn test_wrap_text_respects_width() {
        let lines = wrap_text("Hello world. This is a test. Another sentence here.", 20);
        assert_eq!(lines, vec!["Hello world. This is", "a test. Another", "sentence here."]);
        assert!(lines.iter().all(|l| l.chars().count() <= 20));
    }

    #[test]
    fn test_wrap_text_splits_long_words_and_paragraphs() {
        let lines = wrap_text("abcdefghij xy\nnext", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "xy", "next"]);
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn test_output_filename() {
        let ts = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(output_filename(ts, "pdf", true), "debate_2024-03-09_07-05-01.pdf");
        assert_eq!(
            output_filename(ts, "wav", false),
            "debate_2024-03-09_07-05-01_incomplete.wav"
        );
    }

    #[test]
    fn test_typographic_punctuation_is_encoded() {
        assert_eq!(
            encode_win_ansi("It’s “clear” – cats win… €5 — done"),
            b"It\x92s \x93clear\x94 \x96 cats win\x85 \x805 \x97 done".to_vec()
        );
        assert_eq!(encode_win_ansi("café"), b"caf\xe9".to_vec());
        assert_eq!(encode_win_ansi("日本\t"), b"?? ".to_vec());
    }

    #[test]
    fn test_wrap_to_width_fits_wide_glyphs() {
        let capitals = "W".repeat(92);
        let lines = wrap_to_width(&capitals, CONTENT_WIDTH, FONT_SIZE);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines.concat(), capitals);
        for line in &lines {
            assert!(text_width(line, FONT_SIZE) <= CONTENT_WIDTH);
        }

        let shouting = "WHY WOULD ANYONE MAKE MOMENTOUS DECISIONS ".repeat(6);
        for line in wrap_to_width(&shouting, CONTENT_WIDTH, FONT_SIZE) {
            assert!(text_width(&line, FONT_SIZE) <= CONTENT_WIDTH, "{line}");
        }
    }

    #[test]
    fn test_wrap_to_width_keeps_short_text_on_one_line() {
        let lines = wrap_to_width("Interlocutor1: Cats are better", CONTENT_WIDTH, FONT_SIZE);
        assert_eq!(lines, vec!["Interlocutor1: Cats are better"]);
        assert_eq!(wrap_to_width("", CONTENT_WIDTH, FONT_SIZE), vec![String::new()]);
    }

    fn shown_strings(pdf: &[u8]) -> Vec<Vec<Vec<u8>>> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .values()
            .map(|page_id| {
                let content = Content::decode(&doc.get_page_content(*page_id).unwrap()).unwrap();
                content
                    .operations
                    .iter()
                    .filter(|op| op.operator == "Tj")
                    .filter_map(|op| match op.operands.first() {
                        Some(Object::String(bytes, _)) => Some(bytes.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_render_pdf_single_page() {
        let pdf = render_pdf(&["Interlocutor1: It’s (clearly) better".to_string()]).unwrap();
        assert!(pdf.starts_with(b"%PDF-1.4"));

        let pages = shown_strings(&pdf);
        assert_eq!(pages.len(), 1);
        assert_eq!(
            pages[0],
            vec![
                b"Interlocutor1: It\x92s (clearly) better".to_vec(),
                b"Page 1/1".to_vec()
            ]
        );
    }

    #[test]
    fn test_render_pdf_paginates() {
        let entries: Vec<String> = (0..120).map(|i| format!("Supervisor: line {}", i)).collect();
        let pdf = render_pdf(&entries).unwrap();
        let expected_pages = layout(&entries).len();

        let pages = shown_strings(&pdf);
        assert!(expected_pages > 1);
        assert_eq!(pages.len(), expected_pages);
        let footer = format!("Page {}/{}", expected_pages, expected_pages);
        assert_eq!(pages[expected_pages - 1].last(), Some(&footer.into_bytes()));
        let shown_lines: usize = pages.iter().map(|p| p.len() - 1).sum();
        assert_eq!(shown_lines, 120);
    }

    #[test]
    fn test_sink_writes_incomplete_file_on_abort() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = TranscriptPdf::new(dir.path().join("output"));
        sink.on_event(&DebateEvent {
            speaker: Speaker::Persona1,
            text: "Cats are better".to_string(),
            sequence_no: 0,
        })
        .unwrap();
        sink.finish(RunOutcome::Aborted).unwrap();

        let path = sink.written_path().unwrap().to_path_buf();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("debate_"));
        assert!(name.ends_with("_incomplete.pdf"));
        assert!(fs::read(&path).unwrap().starts_with(b"%PDF"));
        assert_eq!(sink.lines(), ["Interlocutor1: Cats are better"]);
    }
}
