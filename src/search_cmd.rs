//! `recall search` and `recall vocab`.

use anyhow::Result;
use serde::Serialize;

use recall_core::models::SearchHit;

use crate::documents::format_ts;
use crate::engine::Engine;

const EXCERPT_CHARS: usize = 240;

pub async fn run_search(
    engine: &Engine,
    query: &str,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    let hits = engine.search(query, top_k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for hit in &hits {
        print_hit(hit);
    }
    Ok(())
}

fn print_hit(hit: &SearchHit) {
    println!(
        "{}. [{:.4}] {} #{}",
        hit.rank, hit.score, hit.file_name, hit.chunk_index
    );
    println!("    excerpt: \"{}\"", excerpt(&hit.text, EXCERPT_CHARS));
    println!("    document: {}", hit.document_id);
    println!("    chunk: {}", hit.chunk_id);
    println!();
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let head: String = flat.chars().take(max_chars).collect();
        format!("{}…", head.trim_end())
    }
}

#[derive(Debug, Serialize)]
struct VocabTerm<'a> {
    index: usize,
    term: &'a str,
    idf: f64,
}

pub async fn run_vocab(engine: &Engine, top: usize, json: bool) -> Result<()> {
    let model = engine.registry().snapshot();

    if json {
        let terms: Vec<VocabTerm> = model
            .terms()
            .take(top)
            .enumerate()
            .map(|(index, (term, idf))| VocabTerm { index, term, idf })
            .collect();
        let out = serde_json::json!({
            "version": model.version(),
            "size": model.len(),
            "corpus_size": model.corpus_size(),
            "fitted_at": model.fitted_at(),
            "terms": terms,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if !model.is_fit() {
        println!("No vocabulary yet. Index a document with `recall index`.");
        return Ok(());
    }

    println!("vocabulary v{}", model.version());
    println!("  terms:       {}", model.len());
    println!("  documents:   {}", model.corpus_size());
    println!("  fitted:      {}", format_ts(model.fitted_at()));
    println!();
    println!("  {:>5}  {:<24} {:>8}", "INDEX", "TERM", "IDF");
    for (index, (term, idf)) in model.terms().take(top).enumerate() {
        println!("  {:>5}  {:<24} {:>8.4}", index, term, idf);
    }
    println!();
    println!("  most discriminative:");
    for (term, idf) in model.top_by_idf(top.min(10)) {
        println!("    {:<24} {:.4}", term, idf);
    }
    Ok(())
}
