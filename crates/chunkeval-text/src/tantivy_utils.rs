use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

use chunkeval_core::SearchField;

pub const TEXT_TOKENIZER: &str = "en_stem_stopwords";

/// Field handles of the chunk schema.
///
/// Every chunk field is indexed twice: tokenized for scoring and as a raw
/// keyword (`*_key`) for exact-match filters. `ord` points back into the corpus.
#[derive(Debug, Clone, Copy)]
pub struct ChunkFields {
	pub ord: Field,
	pub content: Field,
	pub title: Field,
	pub source: Field,
	pub tags: Field,
	pub title_key: Field,
	pub source_key: Field,
	pub tag_key: Field,
}

impl ChunkFields {
	pub fn text(&self, field: SearchField) -> Field {
		match field {
			SearchField::Content => self.content,
			SearchField::Title => self.title,
			SearchField::Source => self.source,
			SearchField::Tags => self.tags,
		}
	}

	pub fn keyword(&self, field: SearchField) -> Option<Field> {
		match field {
			SearchField::Content => None,
			SearchField::Title => Some(self.title_key),
			SearchField::Source => Some(self.source_key),
			SearchField::Tags => Some(self.tag_key),
		}
	}
}

pub fn build_schema() -> (Schema, ChunkFields) {
	let mut schema_builder = Schema::builder();
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TEXT_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
	let fields = ChunkFields {
		ord: schema_builder.add_u64_field("ord", STORED),
		content: schema_builder.add_text_field("content", text_options.clone()),
		title: schema_builder.add_text_field("title", text_options.clone()),
		source: schema_builder.add_text_field("source", text_options.clone()),
		tags: schema_builder.add_text_field("tags", text_options),
		title_key: schema_builder.add_text_field("title_key", STRING),
		source_key: schema_builder.add_text_field("source_key", STRING),
		tag_key: schema_builder.add_text_field("tag_key", STRING),
	};
	(schema_builder.build(), fields)
}

pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(40))
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.filter(Stemmer::new(Language::English))
		.build();
	index.tokenizers().register(TEXT_TOKENIZER, tokenizer);
}

#[cfg(test)]
mod tests {
	use super::*;
	use tantivy::tokenizer::TokenStream;

	#[test]
	fn stems_and_drops_stop_words() {
		let (schema, _) = build_schema();
		let index = Index::create_in_ram(schema);
		register_tokenizer(&index);
		let mut analyzer = index.tokenizers().get(TEXT_TOKENIZER).expect("registered");
		let mut stream = analyzer.token_stream("The users confused by Modals");
		let mut tokens = Vec::new();
		while stream.advance() {
			tokens.push(stream.token().text.clone());
		}
		assert_eq!(tokens, vec!["user", "confus", "modal"]);
	}
}
