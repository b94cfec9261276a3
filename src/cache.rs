// In-memory render cache keyed by a SHA-256 of (source text, rules).
// Any edit to the snippet or its annotations changes the key, so stale entries are never served.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::annotation::{annotate, Annotated, AnnotationRule, CodeBlock};

/// Hex-encoded SHA-256 content hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ContentKey(String);

impl ContentKey {
    /// Fields are length-prefixed so `("ab", "c")` and `("a", "bc")` hash differently
    pub fn compute(source_text: &str, rules: &[AnnotationRule]) -> Self {
        fn field(hasher: &mut Sha256, bytes: &[u8]) {
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }

        let mut hasher = Sha256::new();
        field(&mut hasher, source_text.as_bytes());
        hasher.update((rules.len() as u64).to_le_bytes());
        for rule in rules {
            hasher.update((rule.order as u64).to_le_bytes());
            field(&mut hasher, rule.pattern.as_bytes());
            field(&mut hasher, rule.explanation.as_bytes());
        }

        ContentKey(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolver and span builder output for one block, tagged with its content key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedBlock {
    pub key: ContentKey,
    /// Resolved ranges, diagnostics and render segments
    #[serde(flatten)]
    pub output: Annotated,
}

impl RenderedBlock {
    /// Render under a key the caller already computed
    pub fn render(key: ContentKey, block: &CodeBlock, rules: &[AnnotationRule]) -> Self {
        Self {
            key,
            output: annotate(&block.source_text, rules),
        }
    }
}

/// Render one block without caching
pub fn render_block(block: &CodeBlock, rules: &[AnnotationRule]) -> RenderedBlock {
    RenderedBlock::render(ContentKey::compute(&block.source_text, rules), block, rules)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to render
    pub misses: u64,
    /// Distinct keys stored
    pub entries: usize,
}

#[derive(Debug, Default)]
pub struct RenderCache {
    entries: HashMap<ContentKey, Arc<RenderedBlock>>,
    hits: u64,
    misses: u64,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_render(&mut self, block: &CodeBlock, rules: &[AnnotationRule]) -> Arc<RenderedBlock> {
        let key = ContentKey::compute(&block.source_text, rules);
        match self.get(&key) {
            Some(rendered) => rendered,
            None => self.insert(RenderedBlock::render(key, block, rules)),
        }
    }

    /// Look up a rendered block, counting the hit or miss
    pub fn get(&mut self, key: &ContentKey) -> Option<Arc<RenderedBlock>> {
        match self.entries.get(key) {
            Some(rendered) => {
                self.hits += 1;
                debug!(%key, "Render cache hit");
                Some(Arc::clone(rendered))
            }
            None => {
                self.misses += 1;
                debug!(%key, "Render cache miss");
                None
            }
        }
    }

    /// Store a rendered block. If another caller stored the same key first, that entry is kept and returned.
    pub fn insert(&mut self, rendered: RenderedBlock) -> Arc<RenderedBlock> {
        let entry = self
            .entries
            .entry(rendered.key.clone())
            .or_insert_with(|| Arc::new(rendered));
        Arc::clone(entry)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
