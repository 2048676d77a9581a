use regex::Regex;
use std::sync::LazyLock;

/// Line-anchored article header: `Điều <n>.` or `Điều <n>:`.
static ARTICLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*Điều\s+\d+[.:]").expect("article header regex is valid")
});

const CONTINUATION_MARKER: &str = "(tiếp)...";
const MAX_HEADER_CHARS: usize = 200;

/// Splits law text into article-sized chunks, each prefixed with its source.
///
/// Text before the first article header (title pages, preamble) is not indexed.
/// When no header is present the text is split on blank lines instead.
pub struct LawChunker {
    min_fragment_len: usize,
    max_chunk_size: usize,
}

impl LawChunker {
    pub fn new(min_fragment_len: usize, max_chunk_size: usize) -> Self {
        Self {
            min_fragment_len,
            max_chunk_size,
        }
    }

    pub fn chunk(&self, text: &str, source_name: &str) -> Vec<String> {
        let provenance = format!("[NGUỒN: {}]\n", source_name);
        // The continuation pieces must fit the cap together with the provenance line.
        let body_cap = self
            .max_chunk_size
            .saturating_sub(provenance.chars().count())
            .max(MAX_HEADER_CHARS + 64);

        let bodies: Vec<&str> = {
            let starts: Vec<usize> = ARTICLE_RE.find_iter(text).map(|m| m.start()).collect();
            if starts.is_empty() {
                text.split("\n\n").map(str::trim).collect()
            } else {
                starts
                    .iter()
                    .enumerate()
                    .map(|(i, &start)| {
                        let end = starts.get(i + 1).copied().unwrap_or(text.len());
                        text[start..end].trim()
                    })
                    .collect()
            }
        };

        let mut chunks = Vec::new();
        for body in bodies {
            let len = body.chars().count();
            if len < self.min_fragment_len {
                continue;
            }
            if len + provenance.chars().count() > self.max_chunk_size {
                for piece in split_oversized(body, body_cap) {
                    chunks.push(format!("{}{}", provenance, piece));
                }
            } else {
                chunks.push(format!("{}{}", provenance, body));
            }
        }

        tracing::debug!(source = source_name, chunks = chunks.len(), "Chunked law text");
        chunks
    }
}

/// Accumulate lines up to `cap` chars. Every piece after the first starts with
/// the body's first line plus the continuation marker.
fn split_oversized(body: &str, cap: usize) -> Vec<String> {
    let header: String = body
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .chars()
        .take(MAX_HEADER_CHARS)
        .collect();
    let continuation = format!("{} {}", header, CONTINUATION_MARKER);
    let continuation_len = continuation.chars().count();
    let line_cap = cap.saturating_sub(continuation_len + 1).max(1);

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in body.lines().flat_map(|l| hard_wrap(l, line_cap)) {
        let line_len = line.chars().count();
        if !current.is_empty() && current_len + 1 + line_len > cap {
            pieces.push(std::mem::take(&mut current));
            current.push_str(&continuation);
            current_len = continuation_len;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.trim().is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Split a single line into slices of at most `cap` chars, on char boundaries.
fn hard_wrap(line: &str, cap: usize) -> Vec<&str> {
    if line.chars().count() <= cap {
        return vec![line];
    }
    let mut out = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in line.char_indices() {
        if count == cap {
            out.push(&line[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    out.push(&line[start..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker() -> LawChunker {
        LawChunker::new(20, 4500)
    }

    #[test]
    fn test_one_chunk_per_article() {
        let text = "LUẬT DOANH NGHIỆP\n\
                    Điều 1. Phạm vi điều chỉnh của luật này\nNội dung điều một.\n\
                    Điều 2. Đối tượng áp dụng của luật này\nNội dung điều hai.\n\
                    Điều 3: Giải thích từ ngữ trong luật\nNội dung điều ba.";
        let chunks = chunker().chunk(text, "LuatDN_2020.docx");

        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].starts_with("[NGUỒN: LuatDN_2020.docx]\nĐiều 1."));
        assert!(chunks[1].contains("Điều 2."));
        assert!(chunks[2].contains("Điều 3:"));
        assert!(chunks.iter().all(|c| !c.contains("LUẬT DOANH NGHIỆP")));
    }

    #[test]
    fn test_paragraph_fallback_without_headers() {
        let text = "Đoạn văn thứ nhất đủ dài để được giữ lại.\n\nngắn\n\nĐoạn văn thứ hai cũng đủ dài để giữ lại.";
        let chunks = chunker().chunk(text, "ThongTu_2021.txt");

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].ends_with("Đoạn văn thứ nhất đủ dài để được giữ lại."));
        assert!(chunks
            .iter()
            .all(|c| c.starts_with("[NGUỒN: ThongTu_2021.txt]\n")));
    }

    #[test]
    fn test_short_article_dropped() {
        let text = "Điều 1. Ngắn\nĐiều 2. Điều này có nội dung đủ dài để lập chỉ mục.";
        let chunks = chunker().chunk(text, "a_2020.txt");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("Điều 2."));
    }

    #[test]
    fn test_oversized_article_split_with_continuation() {
        let mut text = String::from("Điều 5. Quyền của doanh nghiệp\n");
        for i in 0..400 {
            text.push_str(&format!("Khoản {} quy định chi tiết về quyền tự chủ kinh doanh.\n", i));
        }
        let chunker = LawChunker::new(20, 1000);
        let chunks = chunker.chunk(&text, "LuatDN_2020.docx");

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000, "chunk too long: {}", chunk.chars().count());
            assert!(chunk.starts_with("[NGUỒN: LuatDN_2020.docx]\n"));
        }
        for chunk in &chunks[1..] {
            assert!(chunk.contains("Điều 5. Quyền của doanh nghiệp (tiếp)..."));
        }
    }

    #[test]
    fn test_single_long_line_is_hard_wrapped() {
        let text = format!("Điều 9. Tiêu đề\n{}", "á".repeat(3000));
        let chunks = LawChunker::new(20, 1000).chunk(&text, "x_2020.txt");
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(chunker().chunk("", "a_2020.txt").is_empty());
        assert!(chunker().chunk("   \n\n  ", "a_2020.txt").is_empty());
    }
}
