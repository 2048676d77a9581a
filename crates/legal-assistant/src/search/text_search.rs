use anyhow::{Context, Result};
use std::collections::BTreeSet;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{self, IndexRecordOption, Schema, Value as TantivyValue, STORED, TEXT};
use tantivy::tokenizer::TokenStream;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

/// In-memory BM25 index over chunk texts. Hits are reported by chunk position,
/// the same position space the dense index uses.
pub struct LexicalIndex {
    index: Index,
    reader: IndexReader,
    text_field: schema::Field,
    position_field: schema::Field,
    len: usize,
}

impl LexicalIndex {
    fn build_schema() -> (Schema, schema::Field, schema::Field) {
        let mut sb = Schema::builder();
        let text_field = sb.add_text_field("text", TEXT);
        let position_field = sb.add_u64_field("position", STORED);
        (sb.build(), text_field, position_field)
    }

    /// Index `texts`; hit positions refer to indices into this slice.
    pub fn build(texts: &[&str]) -> Result<Self> {
        let (schema, text_field, position_field) = Self::build_schema();
        let index = Index::create_in_ram(schema);

        {
            // One thread keeps doc ids in insertion order.
            let mut writer: IndexWriter = index
                .writer_with_num_threads(1, 50_000_000)
                .context("Failed to create Tantivy writer")?;
            for (position, text) in texts.iter().enumerate() {
                writer.add_document(doc!(
                    position_field => position as u64,
                    text_field => *text,
                ))?;
            }
            writer.commit().context("Tantivy commit failed")?;
        }

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .context("Failed to create Tantivy reader")?;

        Ok(Self {
            index,
            reader,
            text_field,
            position_field,
            len: texts.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Top `k` positions by BM25 score. The query is analyzed with the field's
    /// own tokenizer (word split + lowercase) and terms are OR-ed together, so
    /// punctuation in user text can never produce a parse error.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<(usize, f32)>> {
        if k == 0 || self.len == 0 {
            return Ok(Vec::new());
        }

        let mut analyzer = self
            .index
            .tokenizer_for_field(self.text_field)
            .context("No tokenizer for text field")?;
        let mut terms = BTreeSet::new();
        let mut stream = analyzer.token_stream(query);
        while stream.advance() {
            terms.insert(stream.token().text.clone());
        }
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = terms
            .iter()
            .map(|term| {
                let query: Box<dyn Query> = Box::new(TermQuery::new(
                    Term::from_field_text(self.text_field, term),
                    IndexRecordOption::WithFreqs,
                ));
                (Occur::Should, query)
            })
            .collect();
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(k))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc = searcher.doc::<TantivyDocument>(doc_address)?;
            if let Some(position) = doc
                .get_first(self.position_field)
                .and_then(|v| v.as_u64())
            {
                results.push((position as usize, score));
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> LexicalIndex {
        LexicalIndex::build(&[
            "Điều 1. Thủ tục đăng ký thành lập doanh nghiệp",
            "Điều 2. Nghĩa vụ nộp thuế của công ty",
            "Điều 3. Quyền của cổ đông phổ thông",
        ])
        .unwrap()
    }

    #[test]
    fn test_term_match_ranks_relevant_chunk() {
        let index = corpus();
        let hits = index.search("nộp thuế", 5).unwrap();
        assert_eq!(hits.first().map(|h| h.0), Some(1));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let index = corpus();
        let hits = index.search("CỔ ĐÔNG", 5).unwrap();
        assert_eq!(hits.first().map(|h| h.0), Some(2));
    }

    #[test]
    fn test_empty_or_punctuation_query_returns_nothing() {
        let index = corpus();
        assert!(index.search("", 5).unwrap().is_empty());
        assert!(index.search("?!...", 5).unwrap().is_empty());
        assert!(index.search("thuế", 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_index() {
        let index = LexicalIndex::build(&[]).unwrap();
        assert!(index.is_empty());
        assert!(index.search("thuế", 5).unwrap().is_empty());
    }
}
