use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Reads law and contract files into plain text.
///
/// Supported: `.docx` (body paragraphs and tables, in document order) and plain
/// text (`.txt`, `.md`). Any failure is logged and yields an empty string so a
/// single bad file never aborts a batch.
#[derive(Debug, Clone, Default)]
pub struct DocumentReader;

impl DocumentReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, path: &Path) -> String {
        match self.try_read(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read document");
                String::new()
            }
        }
    }

    pub fn try_read(&self, path: &Path) -> Result<String> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "docx" => self.read_docx(path),
            _ => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read text file: {}", path.display())),
        }
    }

    fn read_docx(&self, path: &Path) -> Result<String> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open DOCX: {}", path.display()))?;

        let mut archive = zip::ZipArchive::new(file)
            .with_context(|| format!("Failed to read DOCX as ZIP: {}", path.display()))?;

        let mut xml_content = String::new();
        archive
            .by_name("word/document.xml")
            .with_context(|| format!("DOCX missing word/document.xml: {}", path.display()))?
            .read_to_string(&mut xml_content)
            .context("Failed to read document.xml from DOCX")?;

        Ok(extract_docx_body(&xml_content))
    }
}

/// Walk the WordprocessingML tag stream once. Top-level paragraphs become one
/// line each; a table row becomes one line of non-empty cells joined by ` | `.
fn extract_docx_body(xml: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut cell = String::new();
    let mut row: Vec<String> = Vec::new();
    let mut table_depth = 0usize;
    let mut in_text = false;
    let mut pos = 0;

    while let Some(offset) = xml[pos..].find('<') {
        let tag_start = pos + offset;
        if in_text {
            paragraph.push_str(&decode_entities(&xml[pos..tag_start]));
        }
        let Some(len) = xml[tag_start..].find('>') else {
            break;
        };
        let tag = &xml[tag_start + 1..tag_start + len];
        pos = tag_start + len + 1;

        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("");

        match name {
            "w:t" => in_text = !self_closing,
            "/w:t" => in_text = false,
            "w:tab" | "w:br" | "w:cr" => paragraph.push(' '),
            "/w:p" => {
                let text = paragraph.trim();
                if !text.is_empty() {
                    if table_depth > 0 {
                        if !cell.is_empty() {
                            cell.push(' ');
                        }
                        cell.push_str(text);
                    } else {
                        lines.push(text.to_string());
                    }
                }
                paragraph.clear();
            }
            "w:tbl" => table_depth += 1,
            "/w:tbl" => table_depth = table_depth.saturating_sub(1),
            "w:tr" if table_depth == 1 => row.clear(),
            "/w:tr" if table_depth == 1 => {
                let cells: Vec<String> = row.drain(..).filter(|c| !c.is_empty()).collect();
                if !cells.is_empty() {
                    lines.push(cells.join(" | "));
                }
            }
            "w:tc" if table_depth == 1 => cell.clear(),
            "/w:tc" if table_depth == 1 => row.push(cell.trim().to_string()),
            _ => {}
        }
    }

    lines.join("\n")
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
