use super::{
    FrameId, FrameMetadata, SearchMode, SearchRequest, SessionConfig, StoreEngine, StoreSearchResult,
    StoreSession, StoreStats, blend_scores, cosine_similarity, preview_bytes, sort_ranked,
};
use crate::error::StoreError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tantivy::collector::{DocSetCollector, TopDocs};
use tantivy::query::{AllQuery, QueryParser, TermQuery};
use tantivy::schema::{Field, INDEXED, IndexRecordOption, STORED, STRING, Schema, TEXT, Value};
use tantivy::{
    DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term,
};

/// Writer memory budget shared by all commits
const DEFAULT_WRITER_HEAP_BYTES: usize = 50_000_000;

/// Text candidates fetched per requested result in hybrid mode
const HYBRID_CANDIDATE_FACTOR: usize = 10;

/// Store engine backed by a Tantivy index directory
///
/// Each frame is one document: searchable text (BM25), stored content bytes,
/// an optional little-endian f32 vector with its model identity, and JSON
/// metadata. Staged frames are written with a single writer commit, so a
/// batch becomes visible all at once or not at all.
#[derive(Debug, Clone)]
pub struct TantivyEngine {
    writer_heap_bytes: usize,
}

impl TantivyEngine {
    pub fn new() -> Self {
        Self {
            writer_heap_bytes: DEFAULT_WRITER_HEAP_BYTES,
        }
    }

    pub fn with_writer_heap(writer_heap_bytes: usize) -> Self {
        Self { writer_heap_bytes }
    }
}

impl Default for TantivyEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct FrameFields {
    frame_id: Field,
    text: Field,
    content: Field,
    embedding: Field,
    identity: Field,
    metadata: Field,
}

impl FrameFields {
    fn build_schema() -> (Schema, Self) {
        let mut schema_builder = Schema::builder();
        let frame_id = schema_builder.add_u64_field("frame_id", STORED | INDEXED);
        let text = schema_builder.add_text_field("text", TEXT);
        let content = schema_builder.add_bytes_field("content", STORED);
        let embedding = schema_builder.add_bytes_field("embedding", STORED);
        let identity = schema_builder.add_text_field("identity", STRING | STORED);
        let metadata = schema_builder.add_text_field("metadata", STORED);
        let schema = schema_builder.build();

        (
            schema,
            Self {
                frame_id,
                text,
                content,
                embedding,
                identity,
                metadata,
            },
        )
    }

    fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
        Ok(Self {
            frame_id: schema.get_field("frame_id")?,
            text: schema.get_field("text")?,
            content: schema.get_field("content")?,
            embedding: schema.get_field("embedding")?,
            identity: schema.get_field("identity")?,
            metadata: schema.get_field("metadata")?,
        })
    }
}

#[derive(Debug)]
struct PendingFrame {
    id: FrameId,
    content: Vec<u8>,
    embedding: Option<Vec<f32>>,
    identity: Option<String>,
    metadata: FrameMetadata,
    text: String,
}

/// Session on a Tantivy-backed store
pub struct TantivySession {
    index: Index,
    reader: IndexReader,
    fields: FrameFields,
    path: PathBuf,
    config: SessionConfig,
    writer_heap_bytes: usize,
    pending: Vec<PendingFrame>,
    next_id: FrameId,
}

#[async_trait::async_trait]
impl StoreEngine for TantivyEngine {
    type Session = TantivySession;

    async fn create(
        &self,
        path: &Path,
        config: &SessionConfig,
    ) -> Result<Self::Session, StoreError> {
        let create_failed = |reason: String| StoreError::CreateFailed {
            path: path.display().to_string(),
            reason,
        };

        if path.exists() {
            return Err(create_failed("path already exists".to_string()));
        }

        std::fs::create_dir_all(path).map_err(|e| create_failed(e.to_string()))?;

        let (schema, fields) = FrameFields::build_schema();
        let index =
            Index::create_in_dir(path, schema).map_err(|e| create_failed(e.to_string()))?;

        tracing::info!("Created frame store at {}", path.display());
        TantivySession::new(index, fields, path, config, self.writer_heap_bytes)
            .map_err(|e| create_failed(e.to_string()))
    }

    async fn open(&self, path: &Path, config: &SessionConfig) -> Result<Self::Session, StoreError> {
        let open_failed = |reason: String| StoreError::OpenFailed {
            path: path.display().to_string(),
            reason,
        };

        let index = Index::open_in_dir(path).map_err(|e| open_failed(e.to_string()))?;
        let fields =
            FrameFields::from_schema(&index.schema()).map_err(|e| open_failed(e.to_string()))?;

        tracing::debug!("Opened frame store at {}", path.display());
        TantivySession::new(index, fields, path, config, self.writer_heap_bytes)
            .map_err(|e| open_failed(e.to_string()))
    }
}

impl TantivySession {
    fn new(
        index: Index,
        fields: FrameFields,
        path: &Path,
        config: &SessionConfig,
        writer_heap_bytes: usize,
    ) -> tantivy::Result<Self> {
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        // Frames are append-only, so the live document count is the next id
        let next_id = reader.searcher().num_docs();

        Ok(Self {
            index,
            reader,
            fields,
            path: path.to_path_buf(),
            config: config.clone(),
            writer_heap_bytes,
            pending: Vec::new(),
            next_id,
        })
    }

    fn to_document(&self, frame: &PendingFrame) -> Result<TantivyDocument, StoreError> {
        let metadata = serde_json::to_string(&frame.metadata)
            .map_err(|e| StoreError::CommitFailed(format!("invalid metadata: {}", e)))?;

        let mut doc = TantivyDocument::default();
        doc.add_u64(self.fields.frame_id, frame.id);
        doc.add_text(self.fields.text, &frame.text);
        doc.add_bytes(self.fields.content, frame.content.as_slice());
        if let Some(vector) = &frame.embedding {
            doc.add_bytes(self.fields.embedding, encode_vector(vector).as_slice());
        }
        if let Some(identity) = &frame.identity {
            doc.add_text(self.fields.identity, identity);
        }
        doc.add_text(self.fields.metadata, &metadata);
        Ok(doc)
    }

    fn frame_id_of(&self, doc: &TantivyDocument) -> Option<FrameId> {
        doc.get_first(self.fields.frame_id)
            .and_then(|value| value.as_u64())
    }

    fn find_frame(
        &self,
        searcher: &Searcher,
        frame_id: FrameId,
    ) -> Result<TantivyDocument, StoreError> {
        let read_failed = |reason: String| StoreError::ReadFailed { frame_id, reason };

        let term = Term::from_field_u64(self.fields.frame_id, frame_id);
        let query = TermQuery::new(term, IndexRecordOption::Basic);
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(1))
            .map_err(|e| read_failed(e.to_string()))?;

        let Some((_, address)) = top_docs.into_iter().next() else {
            return Err(StoreError::UnknownFrame(frame_id));
        };

        searcher
            .doc(address)
            .map_err(|e| read_failed(e.to_string()))
    }

    fn content_of(&self, doc: &TantivyDocument) -> Vec<u8> {
        doc.get_first(self.fields.content)
            .and_then(|value| value.as_bytes())
            .map(|bytes| bytes.to_vec())
            .unwrap_or_default()
    }

    /// BM25 scores for the query text, best first
    fn text_scores(
        &self,
        searcher: &Searcher,
        query_text: &str,
        limit: usize,
        addresses: &mut HashMap<FrameId, DocAddress>,
    ) -> Result<Vec<(FrameId, f32)>, StoreError> {
        let search_failed = |e: tantivy::TantivyError| StoreError::SearchFailed(e.to_string());

        // Lenient parsing so commit text like `fix(api): foo::bar` never errors
        let query_parser = QueryParser::for_index(&self.index, vec![self.fields.text]);
        let (query, _errors) = query_parser.parse_query_lenient(query_text);

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit.max(1)))
            .map_err(search_failed)?;

        let mut scores = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address).map_err(search_failed)?;
            if let Some(id) = self.frame_id_of(&doc) {
                addresses.insert(id, address);
                scores.push((id, score));
            }
        }
        Ok(scores)
    }

    /// Cosine similarity of every stored vector produced by the same model
    fn vector_scores(
        &self,
        searcher: &Searcher,
        query_vector: &[f32],
        identity: Option<&str>,
        addresses: &mut HashMap<FrameId, DocAddress>,
    ) -> Result<Vec<(FrameId, f32)>, StoreError> {
        let search_failed = |e: tantivy::TantivyError| StoreError::SearchFailed(e.to_string());

        let all_docs = searcher
            .search(&AllQuery, &DocSetCollector)
            .map_err(search_failed)?;

        let mut scores = Vec::new();
        let mut skipped = 0usize;
        for address in all_docs {
            let doc: TantivyDocument = searcher.doc(address).map_err(search_failed)?;
            let Some(bytes) = doc
                .get_first(self.fields.embedding)
                .and_then(|value| value.as_bytes())
            else {
                continue;
            };

            let stored_identity = doc
                .get_first(self.fields.identity)
                .and_then(|value| value.as_str());
            if let (Some(wanted), Some(stored)) = (identity, stored_identity)
                && wanted != stored
            {
                skipped += 1;
                continue;
            }

            let Some(id) = self.frame_id_of(&doc) else {
                continue;
            };
            let vector = decode_vector(bytes);
            if vector.len() != query_vector.len() {
                skipped += 1;
                continue;
            }

            addresses.insert(id, address);
            scores.push((id, cosine_similarity(query_vector, &vector)));
        }

        if skipped > 0 {
            tracing::debug!(
                "Skipped {} vectors from a different embedding model",
                skipped
            );
        }
        Ok(scores)
    }
}

#[async_trait::async_trait]
impl StoreSession for TantivySession {
    async fn put(
        &mut self,
        content: Vec<u8>,
        embedding: Option<Vec<f32>>,
        identity: Option<&str>,
        metadata: FrameMetadata,
    ) -> Result<FrameId, StoreError> {
        if let (Some(vector), Some(expected)) = (&embedding, self.config.vector_dimensions)
            && vector.len() != expected
        {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(PendingFrame {
            id,
            content,
            embedding,
            identity: identity.map(str::to_string),
            metadata,
            text: String::new(),
        });
        Ok(id)
    }

    async fn index_text(&mut self, frame_id: FrameId, text: &str) -> Result<(), StoreError> {
        let frame = self
            .pending
            .iter_mut()
            .find(|frame| frame.id == frame_id)
            .ok_or(StoreError::UnknownFrame(frame_id))?;

        if !frame.text.is_empty() {
            frame.text.push('\n');
        }
        frame.text.push_str(text);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let commit_failed = |e: tantivy::TantivyError| StoreError::CommitFailed(e.to_string());

        let mut index_writer: IndexWriter<TantivyDocument> = self
            .index
            .writer(self.writer_heap_bytes)
            .map_err(commit_failed)?;

        for frame in &self.pending {
            let doc = self.to_document(frame)?;
            index_writer.add_document(doc).map_err(commit_failed)?;
        }

        index_writer.commit().map_err(commit_failed)?;
        self.reader.reload().map_err(commit_failed)?;

        tracing::debug!(
            "Committed {} frames to {}",
            self.pending.len(),
            self.path.display()
        );
        self.pending.clear();
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<StoreSearchResult>, StoreError> {
        let searcher = self.reader.searcher();
        let top_k = request.top_k.max(1);
        let mut addresses = HashMap::new();

        let ranked = match (request.mode, &request.embedding) {
            (SearchMode::Hybrid { alpha }, Some(query_vector)) => {
                let text = self.text_scores(
                    &searcher,
                    &request.query,
                    top_k * HYBRID_CANDIDATE_FACTOR,
                    &mut addresses,
                )?;
                let vector = self.vector_scores(
                    &searcher,
                    query_vector,
                    request.identity.as_deref(),
                    &mut addresses,
                )?;
                blend_scores(&text, &vector, alpha, top_k)
            }
            (SearchMode::Hybrid { .. }, None) => {
                tracing::warn!("Hybrid search requested without a query vector, using text only");
                let mut text = self.text_scores(&searcher, &request.query, top_k, &mut addresses)?;
                sort_ranked(&mut text);
                text
            }
            (SearchMode::TextOnly, _) => {
                let mut text = self.text_scores(&searcher, &request.query, top_k, &mut addresses)?;
                sort_ranked(&mut text);
                text
            }
        };

        let mut results = Vec::with_capacity(ranked.len());
        for (frame_id, score) in ranked {
            let preview_text = match addresses.get(&frame_id) {
                Some(address) if request.preview_max_bytes > 0 => {
                    let doc: TantivyDocument = searcher
                        .doc(*address)
                        .map_err(|e| StoreError::SearchFailed(e.to_string()))?;
                    let content = self.content_of(&doc);
                    let preview = preview_bytes(&content, request.preview_max_bytes);
                    String::from_utf8(preview).ok()
                }
                _ => None,
            };
            results.push(StoreSearchResult {
                frame_id,
                score,
                preview_text,
            });
        }

        Ok(results)
    }

    async fn frame_content(&self, frame_id: FrameId) -> Result<Vec<u8>, StoreError> {
        let searcher = self.reader.searcher();
        let doc = self.find_frame(&searcher, frame_id)?;
        Ok(self.content_of(&doc))
    }

    async fn frame_preview(
        &self,
        frame_id: FrameId,
        max_bytes: usize,
    ) -> Result<Vec<u8>, StoreError> {
        let content = self.frame_content(frame_id).await?;
        Ok(preview_bytes(&content, max_bytes))
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(StoreStats {
            frame_count: self.reader.searcher().num_docs(),
        })
    }

    async fn close(self) -> Result<(), StoreError> {
        if !self.pending.is_empty() {
            tracing::warn!(
                "Closing store {} with {} uncommitted frames; they are discarded",
                self.path.display(),
                self.pending.len()
            );
        }
        Ok(())
    }
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|value| value.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
