//! Multi-format file parser

use calamine::Reader;
use scraper::{Html, Selector};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::FileType;

/// How long pdf-extract may run before falling back to lopdf
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Elements whose text never reaches the index
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Text extracted from one file
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Detected file type
    pub file_type: FileType,
    /// Extracted text content
    pub text: String,
    /// Pages, slides or sheets seen while parsing (1 for flat formats)
    pub sections: u32,
}

impl ParsedFile {
    fn flat(file_type: FileType, text: String) -> Self {
        Self {
            file_type,
            text,
            sections: 1,
        }
    }
}

/// Compile a CSS selector, reporting a bad one as an invalid argument
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| Error::InvalidArgument(format!("invalid selector '{}': {:?}", css, e)))
}

/// Multi-format file parser
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedFile> {
        let file_type = FileType::from_path(std::path::Path::new(filename));

        match file_type {
            FileType::Pdf => Self::parse_pdf(filename, data),
            FileType::Docx => Self::parse_docx(filename, data),
            FileType::Pptx => Self::parse_pptx(filename, data),
            FileType::Xlsx => Self::parse_xlsx(filename, data),
            FileType::Csv => Self::parse_csv(filename, data),
            FileType::Html => Ok(ParsedFile::flat(
                FileType::Html,
                Self::html_to_text(&String::from_utf8_lossy(data)),
            )),
            FileType::Txt | FileType::Markdown => Ok(ParsedFile::flat(
                file_type,
                String::from_utf8_lossy(data).into_owned(),
            )),
            FileType::Unknown => Err(Error::UnsupportedFileType(filename.to_string())),
        }
    }

    /// Visible text of an HTML page, one line per text run
    pub fn html_to_text(html: &str) -> String {
        let document = Html::parse_document(html);

        let root = match selector("body")
            .ok()
            .and_then(|s| document.select(&s).next())
        {
            Some(body) => body,
            None => document.root_element(),
        };

        let mut lines: Vec<&str> = Vec::new();
        for node in root.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };

            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .map(|e| SKIPPED_ELEMENTS.contains(&e.name()))
                    .unwrap_or(false)
            });
            if hidden {
                continue;
            }

            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed);
            }
        }

        lines.join("\n")
    }

    /// Parse PDF document
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedFile> {
        let raw = Self::extract_pdf_with_timeout(filename, data)?;

        let text = normalize_pdf_text(&raw)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            return Err(Error::file_parse(
                filename,
                "No text content could be extracted from PDF",
            ));
        }

        let sections = lopdf::Document::load_mem(data)
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(1);

        Ok(ParsedFile {
            file_type: FileType::Pdf,
            text,
            sections,
        })
    }

    /// Run pdf-extract on a worker thread; some fonts make it spin forever
    fn extract_pdf_with_timeout(filename: &str, data: &[u8]) -> Result<String> {
        use std::sync::mpsc;

        let bytes = data.to_vec();
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let _ = tx.send(pdf_extract::extract_text_from_mem(&bytes));
        });

        match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
            Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
            Ok(Ok(_)) => {
                tracing::debug!("pdf-extract returned no text for {}, trying lopdf", filename);
                Self::extract_pdf_fallback(filename, data)
            }
            Ok(Err(e)) => {
                tracing::warn!("pdf-extract failed for {}: {}, trying lopdf", filename, e);
                Self::extract_pdf_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "PDF extraction of {} timed out after {:?}",
                    filename,
                    PDF_EXTRACT_TIMEOUT
                );
                Self::extract_pdf_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("PDF extraction thread for {} crashed", filename);
                Self::extract_pdf_fallback(filename, data)
            }
        }
    }

    fn extract_pdf_fallback(filename: &str, data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        doc.extract_text(&pages)
            .map_err(|e| Error::file_parse(filename, format!("Failed to extract text: {}", e)))
    }

    /// Parse DOCX document, paragraph by paragraph
    fn parse_docx(filename: &str, data: &[u8]) -> Result<ParsedFile> {
        let doc =
            docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut text = String::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                text.push_str(&t.text);
                            }
                        }
                    }
                }
                text.push('\n');
            }
        }

        Ok(ParsedFile::flat(FileType::Docx, text))
    }

    /// Parse PowerPoint presentation (.pptx)
    fn parse_pptx(filename: &str, data: &[u8]) -> Result<ParsedFile> {
        use std::io::Read;

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data))
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut slides: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| {
                let number = name
                    .strip_prefix("ppt/slides/slide")?
                    .strip_suffix(".xml")?
                    .parse::<u32>()
                    .ok()?;
                Some((number, name.to_string()))
            })
            .collect();
        slides.sort_by_key(|(number, _)| *number);

        let mut text = String::new();
        for (number, name) in &slides {
            let mut xml = String::new();
            let read = archive
                .by_name(name)
                .map_err(|e| e.to_string())
                .and_then(|mut f| f.read_to_string(&mut xml).map_err(|e| e.to_string()));
            if let Err(e) = read {
                tracing::debug!("Skipping slide {} of {}: {}", number, filename, e);
                continue;
            }

            let slide_text = slide_xml_text(&xml);
            if !slide_text.is_empty() {
                text.push_str(&format!("Slide {}:\n{}\n\n", number, slide_text));
            }
        }

        Ok(ParsedFile {
            file_type: FileType::Pptx,
            text,
            sections: slides.len() as u32,
        })
    }

    /// Parse Excel spreadsheet, one block per sheet
    fn parse_xlsx(filename: &str, data: &[u8]) -> Result<ParsedFile> {
        let mut workbook = calamine::open_workbook_auto_from_rs(std::io::Cursor::new(data))
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut text = String::new();
        let sheet_names = workbook.sheet_names().to_vec();

        for sheet_name in &sheet_names {
            let range = match workbook.worksheet_range(sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    tracing::debug!("Skipping sheet '{}' of {}: {}", sheet_name, filename, e);
                    continue;
                }
            };

            text.push_str(&format!("Sheet: {}\n", sheet_name));
            for row in range.rows() {
                let cells: Vec<String> = row
                    .iter()
                    .map(|cell| match cell {
                        calamine::Data::Empty => String::new(),
                        other => other.to_string(),
                    })
                    .collect();

                if cells.iter().any(|c| !c.is_empty()) {
                    text.push_str(&cells.join(" | "));
                    text.push('\n');
                }
            }
            text.push('\n');
        }

        Ok(ParsedFile {
            file_type: FileType::Xlsx,
            text,
            sections: sheet_names.len() as u32,
        })
    }

    /// Parse CSV file; each row becomes `header: value` pairs
    fn parse_csv(filename: &str, data: &[u8]) -> Result<ParsedFile> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Error::file_parse(filename, e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut text = String::new();
        for (line, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    tracing::debug!("Skipping row {} of {}: {}", line + 1, filename, e);
                    continue;
                }
            };

            let row: Vec<String> = record
                .iter()
                .enumerate()
                .filter(|(_, value)| !value.trim().is_empty())
                .map(|(i, value)| match headers.get(i) {
                    Some(h) if !h.is_empty() => format!("{}: {}", h, value.trim()),
                    _ => value.trim().to_string(),
                })
                .collect();

            if !row.is_empty() {
                text.push_str(&row.join(", "));
                text.push('\n');
            }
        }

        Ok(ParsedFile::flat(FileType::Csv, text))
    }
}

/// Text runs (`<a:t>`) of a slide, one line per paragraph
fn slide_xml_text(xml: &str) -> String {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut lines = Vec::new();
    let mut paragraph = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(e)) if in_text => {
                if let Ok(t) = e.unescape() {
                    if !paragraph.is_empty() {
                        paragraph.push(' ');
                    }
                    paragraph.push_str(t.trim());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if !paragraph.trim().is_empty() => {
                    lines.push(std::mem::take(&mut paragraph));
                }
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    if !paragraph.trim().is_empty() {
        lines.push(paragraph);
    }

    lines.join("\n")
}

/// Replace typographic glyphs that pdf-extract leaves behind
fn normalize_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\0' => {}
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2212}' => out.push('-'),
            '\u{2014}' => out.push_str("--"),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2022}' => out.push_str("* "),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' | '\u{2002}' | '\u{2003}' | '\u{2009}' => out.push(' '),
            '\u{FB00}' => out.push_str("ff"),
            '\u{FB01}' => out.push_str("fi"),
            '\u{FB02}' => out.push_str("fl"),
            '\u{FB03}' => out.push_str("ffi"),
            '\u{FB04}' => out.push_str("ffl"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_skips_scripts() {
        let html = r#"<html><head><title>T</title><style>p { color: red }</style></head>
            <body><h1>Pricing</h1><script>var x = 1;</script>
            <p>Plans start at <b>$10</b>.</p><noscript>enable js</noscript></body></html>"#;

        let text = FileParser::html_to_text(html);
        assert!(text.contains("Pricing"));
        assert!(text.contains("Plans start at"));
        assert!(text.contains("$10"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("enable js"));
    }

    #[test]
    fn test_parse_csv_rows() {
        let data = b"question,answer\nWhat do you sell?,Widgets\n,\nWhere?,Everywhere\n";
        let parsed = FileParser::parse("faq.csv", data).unwrap();
        assert_eq!(parsed.file_type, FileType::Csv);
        assert!(parsed
            .text
            .contains("question: What do you sell?, answer: Widgets"));
        assert_eq!(parsed.text.lines().count(), 2);
    }

    #[test]
    fn test_parse_text_and_unsupported() {
        let parsed = FileParser::parse("notes.md", "# Title\nbody".as_bytes()).unwrap();
        assert_eq!(parsed.file_type, FileType::Markdown);
        assert_eq!(parsed.text, "# Title\nbody");

        let err = FileParser::parse("image.png", b"\x89PNG").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(ref name) if name == "image.png"));
    }

    #[test]
    fn test_slide_xml_text() {
        let xml = r#"<p:sld xmlns:a="a" xmlns:p="p"><p:txBody>
            <a:p><a:r><a:t>Quarterly</a:t></a:r><a:r><a:t>report</a:t></a:r></a:p>
            <a:p><a:r><a:t>Growth &amp; hiring</a:t></a:r></a:p>
            </p:txBody></p:sld>"#;
        assert_eq!(slide_xml_text(xml), "Quarterly report\nGrowth & hiring");
    }

    #[test]
    fn test_normalize_pdf_text() {
        assert_eq!(normalize_pdf_text("\u{FB01}nal \u{2013} \u{201C}ok\u{201D}"), "final - \"ok\"");
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(selector("<<>>"), Err(Error::InvalidArgument(_))));
    }
}
