//! Ingestion pipeline (§5): walks a repo, builds the graph phase-sequentially
//! (extraction, then the three resolver sub-phases, then community/process
//! enrichment, then the search indexes), and stages everything for an atomic
//! persistence swap. Nothing is written to `data_dir` until the very last
//! step, so a cancellation or an internal error at any earlier point simply
//! discards in-memory work and leaves the previous artifact untouched (§7).

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use tree_sitter::Tree;

use crate::ast_cache::AstCache;
use crate::bm25::Bm25Index;
use crate::community;
use crate::config::Settings;
use crate::error::{GitNexusError, Result};
use crate::graph::GraphStore;
use crate::model::{self, CodeEmbeddingNode, CodeRelation, FileNode, FolderNode, GraphNode};
use crate::parsing::extractor::{self, ExtractionPatch};
use crate::parsing::ParserRegistry;
use crate::persistence::{self, Meta, Stats};
use crate::process;
use crate::repo_status;
use crate::resolver::{self, ImportMap, ImportResolver};
use crate::symtab::SymbolTable;
use crate::types::{Language, RelationType};
use crate::vector::{self, EmbeddingGenerator, NullEmbeddingGenerator, VectorIndex};
use crate::walker::{FileWalker, RoutedFile};

/// Number of symbols embedded per collaborator call (§4.9: "batched to
/// respect external embedder throughput").
const EMBED_BATCH: usize = 64;

/// Cooperative cancellation flag, checked between files and between phases.
/// Cloning shares the same underlying flag, so a caller can hold one end
/// while `analyze` runs on another thread.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Re-run even if `meta.lastCommit` already matches `HEAD` (§6).
    pub force: bool,
    /// Skip the embedding/vector-index phase entirely (§6).
    pub skip_embeddings: bool,
}

/// Summary returned by [`analyze`]: either a no-op ("already up to date") or
/// the counts from a fresh build, plus any file-level warnings collected
/// along the way (§7: file/phase issues are folded in here rather than
/// aborting the run).
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub up_to_date: bool,
    pub files: usize,
    pub nodes: usize,
    pub edges: usize,
    pub communities: usize,
    pub processes: usize,
    pub warnings: Vec<String>,
}

impl PipelineReport {
    fn from_meta(meta: &Meta) -> Self {
        Self {
            up_to_date: true,
            files: meta.stats.files,
            nodes: meta.stats.nodes,
            edges: meta.stats.edges,
            communities: meta.stats.communities,
            processes: meta.stats.processes,
            warnings: Vec::new(),
        }
    }
}

/// Runs the full ingestion flow over `settings.repo_path` (§5, §6 `analyze`).
pub fn analyze(settings: &Settings, options: &AnalyzeOptions, cancel: &CancellationToken) -> Result<PipelineReport> {
    let repo_root = settings.repo_path.clone();
    let status = repo_status::read_status(&repo_root);
    let data_dir = settings.data_path();

    if !options.force {
        if let Ok(meta) = Meta::read(&data_dir.join("meta.json")) {
            if meta.is_up_to_date(status.head_commit.as_deref()) {
                return Ok(PipelineReport::from_meta(&meta));
            }
        }
    }

    let mut warnings = Vec::new();

    let walker = FileWalker::new(Arc::new(settings.clone()));
    let files = walker.walk(&repo_root);
    bail_if_cancelled(cancel)?;

    let mut store = GraphStore::new();
    let (folder_nodes, folder_relations) = build_folder_hierarchy(&files);
    for node in folder_nodes {
        store.upsert_node(node);
    }

    let mut language_of: HashMap<String, Language> = HashMap::new();
    let known_files: HashSet<String> = files
        .iter()
        .filter(|f| f.language.is_some() && !f.is_binary())
        .map(|f| f.repo_relative.clone())
        .collect();

    let mut bm25_builder =
        Bm25Index::builder(settings.bm25.name_field_boost as f64, settings.bm25.fuzzy_edit_fraction as f64);

    for file in &files {
        let Some(bytes) = &file.bytes else { continue };
        let content = String::from_utf8_lossy(bytes).into_owned();
        let name = basename(&file.repo_relative);
        bm25_builder.add_document(&file.repo_relative, &content, &name);

        store.upsert_node(GraphNode::File(FileNode {
            id: model::file_id(&file.repo_relative),
            name,
            file_path: file.repo_relative.clone(),
            content: truncate_chars(&content, settings.ingestion.file_content_cap),
        }));

        if let Some(language) = file.language {
            language_of.insert(file.repo_relative.clone(), language);
        }
    }

    for relation in folder_relations {
        add_relation_or_warn(&mut store, relation, &mut warnings);
    }

    // Phase: parse + extract. Each file is parsed and extracted into its own
    // shard (own `SymbolTable`), then merged sequentially at the join, the
    // way `SymbolTable::merge` is documented to be used (§4.3, §5).
    let registry = ParserRegistry::new().map_err(GitNexusError::Parse)?;
    let ast_cache = AstCache::new(settings.ast_cache.capacity);
    let parse_warnings: Mutex<Vec<String>> = Mutex::new(Vec::new());

    struct FileExtraction {
        repo_relative: String,
        code: String,
        patch: ExtractionPatch,
        symtab: SymbolTable,
    }

    let extractions: Vec<FileExtraction> = files
        .par_iter()
        .filter_map(|file| {
            let language = file.language?;
            let bytes = file.bytes.as_ref()?;
            let code = String::from_utf8_lossy(bytes).into_owned();
            match registry.parse(language, bytes, &file.path) {
                Ok(tree) => {
                    ast_cache.set(&file.repo_relative, tree.clone());
                    let mut symtab = SymbolTable::new();
                    let file_id = model::file_id(&file.repo_relative);
                    let patch = extractor::extract_file(
                        registry.profile(language).as_ref(),
                        &tree,
                        &code,
                        &file.repo_relative,
                        &file_id,
                        settings.ingestion.symbol_snippet_cap,
                        &mut symtab,
                    );
                    Some(FileExtraction { repo_relative: file.repo_relative.clone(), code, patch, symtab })
                }
                Err(e) => {
                    parse_warnings.lock().unwrap().push(format!("{}: {e}", file.repo_relative));
                    None
                }
            }
        })
        .collect();
    warnings.extend(parse_warnings.into_inner().unwrap());

    let mut file_codes: HashMap<String, String> = HashMap::with_capacity(extractions.len());
    for extraction in &extractions {
        file_codes.insert(extraction.repo_relative.clone(), extraction.code.clone());
    }

    let mut symtab = SymbolTable::new();
    for extraction in extractions {
        for symbol in extraction.patch.symbols {
            store.upsert_node(GraphNode::Symbol(symbol));
        }
        for relation in extraction.patch.relations {
            add_relation_or_warn(&mut store, relation, &mut warnings);
        }
        symtab.merge(extraction.symtab);
    }
    bail_if_cancelled(cancel)?;

    // Phase: import resolution (§4.5(a)).
    let import_resolver = ImportResolver::new(&known_files);
    let mut import_map: ImportMap = ImportMap::new();
    for path in &known_files {
        let Some(code) = file_codes.get(path) else { continue };
        let language = language_of[path];
        let Some(tree) = tree_for(&ast_cache, &registry, path, code, language) else {
            warnings.push(format!("{path}: could not recover syntax tree for import resolution"));
            continue;
        };
        let profile = registry.profile(language);
        let patch = resolver::extract_imports(profile.as_ref(), &tree, code, path, &import_resolver);
        if !patch.targets.is_empty() {
            import_map.insert(path.clone(), patch.targets);
        }
        for relation in patch.relations {
            add_relation_or_warn(&mut store, relation, &mut warnings);
        }
    }

    // Phase: call resolution (§4.5(b)), one dedup set shared across every file.
    let mut call_dedup: HashSet<(RelationType, String, String)> = HashSet::new();
    for path in &known_files {
        let Some(code) = file_codes.get(path) else { continue };
        let language = language_of[path];
        let Some(tree) = tree_for(&ast_cache, &registry, path, code, language) else {
            warnings.push(format!("{path}: could not recover syntax tree for call resolution"));
            continue;
        };
        let profile = registry.profile(language);
        let file_id = model::file_id(path);
        let patch = resolver::resolve_calls(
            profile.as_ref(),
            &tree,
            code,
            path,
            &file_id,
            &symtab,
            &import_map,
            &mut call_dedup,
        );
        for relation in patch.relations {
            add_relation_or_warn(&mut store, relation, &mut warnings);
        }
    }

    // Phase: heritage resolution (§4.5(c)); parent targets may be synthetic
    // dangling ids, so these use `add_dangling_relation`.
    for path in &known_files {
        let Some(code) = file_codes.get(path) else { continue };
        let language = language_of[path];
        let Some(tree) = tree_for(&ast_cache, &registry, path, code, language) else {
            warnings.push(format!("{path}: could not recover syntax tree for heritage resolution"));
            continue;
        };
        let profile = registry.profile(language);
        let patch = resolver::resolve_heritage(profile.as_ref(), &tree, code, path, &symtab);
        for relation in patch.relations {
            add_dangling_relation_or_warn(&mut store, relation, &mut warnings);
        }
    }
    bail_if_cancelled(cancel)?;

    // Phase: community detection (§4.6).
    let community_result =
        community::detect_communities(&store, settings.community.resolution, settings.community.seed);
    let community_count = community_result.nodes.len();
    for node in community_result.nodes {
        store.upsert_node(GraphNode::Community(node));
    }
    for relation in community_result.relations {
        add_relation_or_warn(&mut store, relation, &mut warnings);
    }

    // Phase: process tracing (§4.7).
    let process_result = process::trace_processes(&store, &language_of, settings.process.max_depth);
    let process_count = process_result.nodes.len();
    for node in process_result.nodes {
        store.upsert_node(GraphNode::Process(node));
    }
    for relation in process_result.relations {
        add_relation_or_warn(&mut store, relation, &mut warnings);
    }
    bail_if_cancelled(cancel)?;

    // Phase: BM25 index (§4.8).
    let bm25_index = bm25_builder.build();
    let bm25_json = serde_json::to_string(&bm25_index).map_err(|e| GitNexusError::General(e.to_string()))?;

    // Phase: vector index (§4.9), skipped entirely when disabled or requested.
    let embeddings = build_embeddings(&store, settings, options.skip_embeddings, &mut warnings);
    bail_if_cancelled(cancel)?;

    // Phase: CSV build + SQLite persistence, staged then swapped in atomically (§4.10, §7).
    let meta = Meta {
        repo_path: repo_root.to_string_lossy().into_owned(),
        last_commit: status.head_commit.clone(),
        indexed_at: chrono::Utc::now(),
        stats: Stats {
            files: files.len(),
            nodes: store.node_count(),
            edges: store.edge_count(),
            communities: community_count,
            processes: process_count,
        },
    };

    persistence::persist(
        &store,
        &embeddings,
        &bm25_json,
        &repo_root,
        settings.ingestion.symbol_snippet_cap,
        &data_dir,
        &meta,
    )
    .map_err(GitNexusError::Persist)?;

    Ok(PipelineReport {
        up_to_date: false,
        files: meta.stats.files,
        nodes: meta.stats.nodes,
        edges: meta.stats.edges,
        communities: meta.stats.communities,
        processes: meta.stats.processes,
        warnings,
    })
}

/// Inserts `relation`, folding an undeclared-pair rejection into `warnings`
/// (§7 / [AMBIENT-2]: a schema warning, not an abort) rather than
/// propagating it out of `analyze`.
fn add_relation_or_warn(store: &mut GraphStore, relation: CodeRelation, warnings: &mut Vec<String>) {
    if let Err(e) = store.add_relation(relation) {
        warnings.push(format!("schema warning: {e}"));
    }
}

/// `add_dangling_relation` counterpart of [`add_relation_or_warn`].
fn add_dangling_relation_or_warn(store: &mut GraphStore, relation: CodeRelation, warnings: &mut Vec<String>) {
    if let Err(e) = store.add_dangling_relation(relation) {
        warnings.push(format!("schema warning: {e}"));
    }
}

fn bail_if_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(GitNexusError::Cancelled)
    } else {
        Ok(())
    }
}

/// Fetches `path`'s tree from the AST cache, reparsing from `code` on a miss
/// (capacity eviction between phases is expected, not a failure — §4.2).
fn tree_for(
    ast_cache: &AstCache,
    registry: &ParserRegistry,
    path: &str,
    code: &str,
    language: Language,
) -> Option<Tree> {
    if let Some(tree) = ast_cache.get(path) {
        return Some(tree);
    }
    registry.parse(language, code.as_bytes(), Path::new(path)).ok()
}

fn build_embeddings(
    store: &GraphStore,
    settings: &Settings,
    skip: bool,
    warnings: &mut Vec<String>,
) -> Vec<CodeEmbeddingNode> {
    if skip || !settings.vector.enabled {
        return Vec::new();
    }

    let symbols: Vec<&crate::model::CodeSymbolNode> = store
        .nodes()
        .filter_map(|n| match n {
            GraphNode::Symbol(sym) => Some(sym),
            _ => None,
        })
        .collect();
    if symbols.is_empty() {
        return Vec::new();
    }

    let generator = select_embedding_generator(settings, warnings);
    let mut index = VectorIndex::new(generator.dimension(), symbols.len());
    for chunk in symbols.chunks(EMBED_BATCH) {
        let inputs: Vec<String> = chunk.iter().map(|sym| vector::embedding_input(sym)).collect();
        match generator.embed(&inputs) {
            Ok(vectors) => {
                for (symbol, embedding) in chunk.iter().zip(vectors) {
                    index.insert(&symbol.id, embedding);
                }
            }
            Err(e) => warnings.push(format!("embedding batch failed: {e}")),
        }
    }
    index.records().to_vec()
}

pub(crate) fn select_embedding_generator(
    settings: &Settings,
    warnings: &mut Vec<String>,
) -> Box<dyn EmbeddingGenerator> {
    #[cfg(feature = "embeddings")]
    {
        match vector::FastEmbedGenerator::new() {
            Ok(generator) => return Box::new(generator),
            Err(e) => warnings.push(format!("failed to initialize embedding model, using null vectors: {e}")),
        }
    }
    Box::new(NullEmbeddingGenerator::new(settings.vector.dimension))
}

fn truncate_chars(s: &str, cap: usize) -> String {
    if s.chars().count() <= cap {
        s.to_string()
    } else {
        s.chars().take(cap).collect()
    }
}

fn basename(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Directories strictly above `path`, nearest first (`"a/b/c.ts"` ->
/// `["a/b", "a"]`).
fn ancestor_dirs(path: &str) -> Vec<&str> {
    let mut dirs = Vec::new();
    let mut rest = path;
    while let Some(idx) = rest.rfind('/') {
        rest = &rest[..idx];
        dirs.push(rest);
    }
    dirs
}

/// Synthesizes `Folder` nodes and their `CONTAINS` edges from the set of
/// walked file paths (§3): every directory prefix becomes a node, linked to
/// its parent directory and, at the leaf, to the files it directly holds.
/// There is no node for the repo root itself, so top-level files and
/// top-level directories are left unparented.
fn build_folder_hierarchy(files: &[RoutedFile]) -> (Vec<GraphNode>, Vec<CodeRelation>) {
    let mut dirs: BTreeSet<String> = BTreeSet::new();
    for file in files {
        for dir in ancestor_dirs(&file.repo_relative) {
            dirs.insert(dir.to_string());
        }
    }

    let mut nodes = Vec::with_capacity(dirs.len());
    let mut relations = Vec::new();
    for dir in &dirs {
        nodes.push(GraphNode::Folder(FolderNode {
            id: model::folder_id(dir),
            name: basename(dir),
            file_path: dir.clone(),
        }));
        if let Some((parent, _)) = dir.rsplit_once('/') {
            relations.push(CodeRelation::contains(model::folder_id(parent), model::folder_id(dir)));
        }
    }

    for file in files {
        if let Some(parent) = ancestor_dirs(&file.repo_relative).first() {
            relations.push(CodeRelation::contains(
                model::folder_id(parent),
                model::file_id(&file.repo_relative),
            ));
        }
    }

    (nodes, relations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn ancestor_dirs_walks_up_from_nearest_to_root() {
        assert_eq!(ancestor_dirs("a/b/c.ts"), vec!["a/b", "a"]);
        assert_eq!(ancestor_dirs("top.ts"), Vec::<&str>::new());
    }

    #[test]
    fn folder_hierarchy_links_folders_and_files() {
        let files = vec![
            RoutedFile {
                path: std::path::PathBuf::from("app/a.ts"),
                repo_relative: "app/a.ts".to_string(),
                language: Some(Language::TypeScript),
                bytes: Some(b"export function a() {}".to_vec()),
            },
            RoutedFile {
                path: std::path::PathBuf::from("app/sub/b.ts"),
                repo_relative: "app/sub/b.ts".to_string(),
                language: Some(Language::TypeScript),
                bytes: Some(b"export function b() {}".to_vec()),
            },
        ];

        let (nodes, relations) = build_folder_hierarchy(&files);
        let ids: HashSet<String> = nodes.iter().map(|n| n.id().to_string()).collect();
        assert!(ids.contains("Folder:app"));
        assert!(ids.contains("Folder:app/sub"));

        assert!(relations
            .iter()
            .any(|r| r.from == "Folder:app" && r.to == "Folder:app/sub" && r.kind == RelationType::Contains));
        assert!(relations
            .iter()
            .any(|r| r.from == "Folder:app" && r.to == "File:app/a.ts" && r.kind == RelationType::Contains));
        assert!(relations
            .iter()
            .any(|r| r.from == "Folder:app/sub" && r.to == "File:app/sub/b.ts" && r.kind == RelationType::Contains));
    }

    #[test]
    fn analyze_indexes_a_minimal_repo_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("main.rs"),
            "fn helper() {}\n\nfn main() {\n    helper();\n}\n",
        )
        .unwrap();

        let mut settings = Settings::default();
        settings.repo_path = dir.path().to_path_buf();
        settings.data_dir = std::path::PathBuf::from(".gitnexus");

        let options = AnalyzeOptions { force: true, skip_embeddings: true };
        let report = analyze(&settings, &options, &CancellationToken::new()).unwrap();

        assert!(!report.up_to_date);
        assert_eq!(report.files, 1);
        assert!(report.nodes >= 3, "expected at least a File node and two symbols, got {}", report.nodes);
        assert!(report.edges >= 3, "expected CONTAINS-free DEFINES x2 + CALLS, got {}", report.edges);
        assert!(settings.data_path().join("graph.sqlite3").exists());
        assert!(settings.data_path().join("meta.json").exists());

        // A second run without --force is a no-op against the unchanged worktree.
        let second = analyze(&settings, &AnalyzeOptions::default(), &CancellationToken::new()).unwrap();
        assert!(second.up_to_date || second.nodes == report.nodes);
    }
}
