use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use chunkeval_core::traits::Retriever;
use chunkeval_core::{Chunk, Error, Result, SearchField, SearchOptions, SearchResult};

use crate::tantivy_utils::{build_schema, register_tokenizer, ChunkFields};

const WRITER_MEMORY_BYTES: usize = 50_000_000;

/// Lexical scores are not comparable across queries, so results carry
/// `1.0 - rank * RANK_DECAY` instead.
pub const RANK_DECAY: f32 = 0.1;

struct Fitted {
	index: Index,
	reader: IndexReader,
	fields: ChunkFields,
}

/// BM25 term-overlap search over chunk `content`, `title`, `source` and `tags`.
///
/// Every `add` refits a fresh in-memory index over the accumulated corpus.
pub struct LexicalIndex {
	text_fields: Vec<SearchField>,
	corpus: Vec<Chunk>,
	fitted: Option<Fitted>,
}

impl Default for LexicalIndex {
	fn default() -> Self { Self::new(SearchField::ALL.to_vec()) }
}

impl LexicalIndex {
	pub fn new(text_fields: Vec<SearchField>) -> Self {
		Self { text_fields, corpus: Vec::new(), fitted: None }
	}

	pub fn text_fields(&self) -> &[SearchField] { &self.text_fields }

	fn fit(corpus: &[Chunk]) -> tantivy::Result<Fitted> {
		let (schema, fields) = build_schema();
		let index = Index::create_in_ram(schema);
		register_tokenizer(&index);
		let mut index_writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES)?;
		for (ord, c) in corpus.iter().enumerate() {
			let mut doc = doc!(
				fields.ord => ord as u64,
				fields.content => c.content.clone(),
				fields.title => c.title.clone(),
				fields.title_key => c.title.clone(),
				fields.source => c.source.clone(),
				fields.source_key => c.source.clone(),
			);
			for tag in &c.tags {
				doc.add_text(fields.tags, tag);
				doc.add_text(fields.tag_key, tag);
			}
			index_writer.add_document(doc)?;
		}
		index_writer.commit()?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		Ok(Fitted { index, reader, fields })
	}

	fn build_query(&self, fitted: &Fitted, query: &str, options: &SearchOptions) -> Box<dyn Query> {
		let default_fields = self.text_fields.iter().map(|f| fitted.fields.text(*f)).collect();
		let mut parser = QueryParser::for_index(&fitted.index, default_fields);
		for (field, boost) in &options.boost { parser.set_field_boost(fitted.fields.text(*field), *boost); }
		let (text_query, errors) = parser.parse_query_lenient(query);
		if !errors.is_empty() { tracing::debug!(query, errors = errors.len(), "lenient query parse dropped syntax"); }
		if options.filter.is_empty() { return text_query; }
		let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, text_query)];
		for (field, value) in &options.filter {
			if let Some(key) = fitted.fields.keyword(*field) {
				let term = Term::from_field_text(key, value);
				clauses.push((Occur::Must, Box::new(TermQuery::new(term, IndexRecordOption::Basic))));
			}
		}
		Box::new(BooleanQuery::new(clauses))
	}
}

impl Retriever for LexicalIndex {
	fn add(&mut self, chunks: &[Chunk]) -> Result<()> {
		if chunks.is_empty() {
			tracing::warn!("No chunks provided to add to lexical index");
			return Ok(());
		}
		self.corpus.extend_from_slice(chunks);
		self.fitted = Some(Self::fit(&self.corpus).map_err(Error::backend)?);
		tracing::debug!(added = chunks.len(), total = self.corpus.len(), "refit lexical index");
		Ok(())
	}

	fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
		if query.trim().is_empty() { return Err(Error::EmptyQuery); }
		options.validate()?;
		let Some(fitted) = self.fitted.as_ref() else {
			tracing::warn!("No documents in index to search");
			return Ok(Vec::new());
		};
		if options.num_results == 0 { return Ok(Vec::new()); }

		let q = self.build_query(fitted, query, options);
		let searcher = fitted.reader.searcher();
		let top_docs = searcher.search(&q, &TopDocs::with_limit(options.num_results)).map_err(Error::backend)?;
		let mut results = Vec::with_capacity(top_docs.len());
		for (rank, (_score, addr)) in top_docs.into_iter().enumerate() {
			let doc: TantivyDocument = searcher.doc(addr).map_err(Error::backend)?;
			let chunk = doc
				.get_first(fitted.fields.ord)
				.and_then(|v| v.as_u64())
				.and_then(|ord| usize::try_from(ord).ok())
				.and_then(|ord| self.corpus.get(ord))
				.ok_or_else(|| Error::backend(anyhow::anyhow!("indexed document {addr:?} has no corpus entry")))?;
			#[allow(clippy::cast_precision_loss)]
			let similarity = 1.0 - rank as f32 * RANK_DECAY;
			results.push(SearchResult::from_chunk(chunk, Some(similarity)));
		}
		tracing::debug!(query, hits = results.len(), "lexical search");
		Ok(results)
	}

	fn len(&self) -> usize { self.corpus.len() }
}
