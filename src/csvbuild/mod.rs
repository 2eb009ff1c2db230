//! Bulk CSV Builder (§4.10): streams the Graph Store out to one RFC-4180 CSV
//! per node label plus a relation CSV, ready for bulk loading into SQLite.
//! Grounded in codanna's batched-write style (`storage/graph.rs`'s
//! transaction batching) generalized from a single SQLite transaction to a
//! streaming CSV intermediate, since §4.10 calls for a bulk `COPY`-equivalent
//! rather than row-at-a-time inserts.

pub mod content_cache;

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;

use crate::model::{CodeRelation, GraphNode};
use content_cache::ContentCache;

/// Rows are flushed to disk every `FLUSH_EVERY` records rather than held
/// entirely in memory (§4.10).
const FLUSH_EVERY: usize = 500;

/// Characters stripped from any field before quoting: C0 control codes
/// other than tab/newline/carriage-return, and the UTF-8 BOM (§4.10:
/// "strips control characters ... and a leading byte-order mark").
/// Rust's `String` can never hold an unpaired UTF-16 surrogate, so the
/// "surrogate halves" rule in the original format has no analogue here.
fn sanitize_field(raw: &str) -> String {
    raw.chars()
        .filter(|&c| c == '\t' || c == '\n' || c == '\r' || !c.is_control())
        .filter(|&c| c != '\u{FEFF}')
        .collect()
}

/// Builds the ±2-line snippet around `[start_line, end_line]`, capped to
/// `cap` characters (§3: CodeSymbol `content`).
fn snippet(full_text: &str, start_line: u32, end_line: u32, cap: usize) -> String {
    let lines: Vec<&str> = full_text.lines().collect();
    let lo = start_line.saturating_sub(2) as usize;
    let hi = (end_line as usize + 2).min(lines.len().saturating_sub(1));
    if lines.is_empty() {
        return String::new();
    }
    let hi = hi.min(lines.len() - 1);
    let joined = lines[lo..=hi.max(lo)].join("\n");
    truncate_chars(&joined, cap)
}

fn truncate_chars(s: &str, cap: usize) -> String {
    if s.chars().count() <= cap {
        s.to_string()
    } else {
        s.chars().take(cap).collect()
    }
}

pub struct CsvBuildReport {
    pub node_files: Vec<(String, usize)>,
    pub relation_rows: usize,
}

/// Streams every node (grouped by `table_label`) and every relation out to
/// `out_dir/<Label>.csv` and `out_dir/relations.csv`. `repo_root` and
/// `snippet_cap` are used to lazily fill in CodeSymbol snippet content that
/// the extractor left empty (§9).
pub fn build_csvs(
    nodes: &[GraphNode],
    relations: &[CodeRelation],
    repo_root: &Path,
    snippet_cap: usize,
    out_dir: &Path,
) -> std::io::Result<CsvBuildReport> {
    std::fs::create_dir_all(out_dir)?;

    let mut by_label: HashMap<&str, Vec<&GraphNode>> = HashMap::new();
    for node in nodes {
        by_label.entry(node.table_label()).or_default().push(node);
    }

    let mut cache = ContentCache::new(3000);
    let mut node_files = Vec::new();

    for (label, rows) in &by_label {
        let path = out_dir.join(format!("{label}.csv"));
        let file = std::fs::File::create(&path)?;
        let mut writer = WriterBuilder::new().quote_style(csv::QuoteStyle::Always).from_writer(file);
        if let Some(first) = rows.first() {
            writer.write_record(header_for(first))?;
        }

        for (i, node) in rows.iter().enumerate() {
            write_node_row(&mut writer, node, repo_root, snippet_cap, &mut cache)?;
            if (i + 1) % FLUSH_EVERY == 0 {
                writer.flush()?;
            }
        }
        writer.flush()?;
        node_files.push((label.to_string(), rows.len()));
    }

    let relation_path = out_dir.join("relations.csv");
    let file = std::fs::File::create(&relation_path)?;
    let mut writer = WriterBuilder::new().quote_style(csv::QuoteStyle::Always).from_writer(file);
    writer.write_record(["from_id", "to_id", "type", "confidence", "reason", "step"])?;
    for (i, relation) in relations.iter().enumerate() {
        writer.write_record([
            sanitize_field(&relation.from),
            sanitize_field(&relation.to),
            relation.kind.as_str().to_string(),
            relation.confidence.to_string(),
            relation.reason.map(|r| r.as_str().to_string()).unwrap_or_default(),
            relation.step.map(|s| s.to_string()).unwrap_or_default(),
        ])?;
        if (i + 1) % FLUSH_EVERY == 0 {
            writer.flush()?;
        }
    }
    writer.flush()?;

    Ok(CsvBuildReport { node_files, relation_rows: relations.len() })
}

/// The CSV column header for the table a given node's variant routes to,
/// matching the field order `write_node_row` emits (§4.10/§6 schema).
fn header_for(node: &GraphNode) -> &'static [&'static str] {
    match node {
        GraphNode::File(_) => &["id", "name", "file_path", "content"],
        GraphNode::Folder(_) => &["id", "name", "file_path"],
        GraphNode::Symbol(_) => &[
            "id", "label", "name", "file_path", "start_line", "end_line", "content", "is_exported", "description",
        ],
        GraphNode::Community(_) => {
            &["id", "label", "heuristic_label", "keywords", "description", "enriched_by", "cohesion", "symbol_count"]
        }
        GraphNode::Process(_) => &[
            "id", "label", "heuristic_label", "process_type", "step_count", "communities", "entry_point_id",
            "terminal_id",
        ],
    }
}

fn write_node_row<W: Write>(
    writer: &mut csv::Writer<W>,
    node: &GraphNode,
    repo_root: &Path,
    snippet_cap: usize,
    cache: &mut ContentCache,
) -> std::io::Result<()> {
    match node {
        GraphNode::File(n) => {
            writer.write_record([sanitize_field(&n.id), sanitize_field(&n.name), sanitize_field(&n.file_path), sanitize_field(&n.content)])?;
        }
        GraphNode::Folder(n) => {
            writer.write_record([sanitize_field(&n.id), sanitize_field(&n.name), sanitize_field(&n.file_path)])?;
        }
        GraphNode::Symbol(n) => {
            let content = if n.content.is_empty() {
                cache
                    .get(repo_root, &n.file_path)
                    .map(|text| snippet(&text, n.start_line, n.end_line, snippet_cap))
                    .unwrap_or_default()
            } else {
                n.content.clone()
            };
            writer.write_record([
                sanitize_field(&n.id),
                sanitize_field(n.label.as_str()),
                sanitize_field(&n.name),
                sanitize_field(&n.file_path),
                n.start_line.to_string(),
                n.end_line.to_string(),
                sanitize_field(&content),
                n.is_exported.to_string(),
                n.description.as_deref().map(sanitize_field).unwrap_or_default(),
            ])?;
        }
        GraphNode::Community(n) => {
            writer.write_record([
                sanitize_field(&n.id),
                sanitize_field(&n.label),
                sanitize_field(&n.heuristic_label),
                sanitize_field(&n.keywords.join(";")),
                sanitize_field(&n.description),
                format!("{:?}", n.enriched_by),
                n.cohesion.to_string(),
                n.symbol_count.to_string(),
            ])?;
        }
        GraphNode::Process(n) => {
            writer.write_record([
                sanitize_field(&n.id),
                sanitize_field(&n.label),
                sanitize_field(&n.heuristic_label),
                n.process_type.as_str().to_string(),
                n.step_count.to_string(),
                sanitize_field(&n.communities.join(";")),
                sanitize_field(&n.entry_point_id),
                sanitize_field(&n.terminal_id),
            ])?;
        }
    }
    Ok(())
}

/// Splits an already-built `relations.csv` into one file per
/// `(fromLabel, toLabel)` pair, streaming row-by-row rather than loading the
/// whole file (§4.10: "the relation CSV is further split by
/// `(fromLabel, toLabel)` pairs for per-pair bulk load"). Labels are derived
/// from each id's own prefix using the same convention as the Graph Store.
pub fn split_relations_by_pair(relations_csv: &Path, out_dir: &Path) -> std::io::Result<Vec<(String, String, usize)>> {
    std::fs::create_dir_all(out_dir)?;
    let mut reader = csv::ReaderBuilder::new().from_path(relations_csv)?;
    let headers = reader.headers()?.clone();

    let mut writers: HashMap<(String, String), csv::Writer<std::fs::File>> = HashMap::new();
    let mut counts: HashMap<(String, String), usize> = HashMap::new();

    for result in reader.records() {
        let record = result?;
        let from = record.get(0).unwrap_or_default();
        let to = record.get(1).unwrap_or_default();
        let from_label = label_prefix(from);
        let to_label = label_prefix(to);
        let key = (from_label.clone(), to_label.clone());

        let writer = writers.entry(key.clone()).or_insert_with(|| {
            let path = out_dir.join(format!("{from_label}__{to_label}.csv"));
            let file = std::fs::File::create(&path).expect("create relation split file");
            let mut w = WriterBuilder::new().quote_style(csv::QuoteStyle::Always).from_writer(file);
            w.write_record(&headers).ok();
            w
        });
        writer.write_record(&record)?;
        *counts.entry(key).or_insert(0) += 1;
    }

    for (_, mut writer) in writers {
        writer.flush()?;
    }

    Ok(counts.into_iter().map(|((f, t), n)| (f, t, n)).collect())
}

fn label_prefix(id: &str) -> String {
    if id.starts_with("comm_") {
        return "Community".to_string();
    }
    if id.starts_with("proc_") {
        return "Process".to_string();
    }
    id.split(':').next().unwrap_or(id).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{file_id, symbol_id, FileNode};
    use crate::types::{CallReason, SymbolLabel};

    #[test]
    fn sanitize_strips_control_chars_but_keeps_tabs_and_newlines() {
        let dirty = "a\u{0007}b\tc\nd\u{FEFF}e";
        assert_eq!(sanitize_field(dirty), "ab\tc\nde");
    }

    #[test]
    fn snippet_adds_two_lines_of_context_and_caps_length() {
        let text = "l0\nl1\nl2\nl3\nl4\nl5\nl6";
        let s = snippet(text, 3, 3, 1000);
        assert_eq!(s, "l1\nl2\nl3\nl4\nl5");
    }

    #[test]
    fn builds_node_and_relation_csvs() {
        let dir = std::env::temp_dir().join(format!("gitnexus-csv-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let file_node = GraphNode::File(FileNode {
            id: file_id("a.ts"),
            name: "a.ts".to_string(),
            file_path: "a.ts".to_string(),
            content: "export function foo() {}".to_string(),
        });
        let symbol = GraphNode::Symbol(crate::model::CodeSymbolNode {
            id: symbol_id(SymbolLabel::Function, "a.ts", "foo"),
            label: SymbolLabel::Function,
            name: "foo".to_string(),
            file_path: "a.ts".to_string(),
            start_line: 0,
            end_line: 0,
            content: "export function foo() {}".to_string(),
            is_exported: true,
            description: None,
        });
        let relation = CodeRelation::calls(
            symbol_id(SymbolLabel::Function, "a.ts", "foo"),
            symbol_id(SymbolLabel::Function, "a.ts", "bar"),
            0.85,
            CallReason::SameFile,
        );

        let out_dir = dir.join("out");
        let report = build_csvs(&[file_node, symbol], &[relation], &dir, 5000, &out_dir).unwrap();
        assert!(report.node_files.iter().any(|(l, n)| l == "File" && *n == 1));
        assert!(report.node_files.iter().any(|(l, n)| l == "Function" && *n == 1));
        assert_eq!(report.relation_rows, 1);
        assert!(out_dir.join("relations.csv").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn splits_relations_by_label_pair() {
        let dir = std::env::temp_dir().join(format!("gitnexus-split-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let relations_csv = dir.join("relations.csv");
        {
            let mut w = csv::Writer::from_path(&relations_csv).unwrap();
            w.write_record(["from", "to", "type", "confidence", "reason", "step"]).unwrap();
            w.write_record(["Function:a.ts:foo", "Function:a.ts:bar", "CALLS", "0.85", "same-file", ""]).unwrap();
            w.write_record(["File:a.ts", "Function:a.ts:foo", "DEFINES", "1", "", ""]).unwrap();
            w.flush().unwrap();
        }
        let out_dir = dir.join("split");
        let counts = split_relations_by_pair(&relations_csv, &out_dir).unwrap();
        assert!(counts.iter().any(|(f, t, n)| f == "Function" && t == "Function" && *n == 1));
        assert!(counts.iter().any(|(f, t, n)| f == "File" && t == "Function" && *n == 1));

        std::fs::remove_dir_all(&dir).ok();
    }
}
