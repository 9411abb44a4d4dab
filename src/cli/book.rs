//! Book-level CLI commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::app::Session;
use crate::storage::{BookRegistry, TreeStore};

pub fn new_book(session: &mut Session, parent: &Path, title: &str) -> Result<()> {
    let root = BookRegistry::create_book_folder(parent, title)
        .with_context(|| format!("Failed to create book in {}", parent.display()))?;
    let root = root.canonicalize().unwrap_or(root);

    if session.config.path.is_some() && session.config.add_to_workspace(&root) {
        session.config.save()?;
        tracing::debug!(root = %root.display(), "added book to workspace");
    }

    if session.output.is_json() {
        session.output.data(&serde_json::json!({
            "root": root.display().to_string(),
            "title": title.trim(),
        }));
    } else {
        session.output.success(&format!(
            "Created book \"{}\" at {}",
            title.trim(),
            root.display()
        ));
    }

    Ok(())
}

fn load(session: &Session, registry: &mut BookRegistry) -> Result<PathBuf> {
    let root = session.book_root()?;
    registry
        .load(&root)
        .with_context(|| format!("Failed to open book at {}", root.display()))?;
    Ok(root)
}

pub fn tree(session: &Session) -> Result<()> {
    let mut registry = session.registry();
    let root = load(session, &mut registry)?;
    let store = registry.get(&root).context("Book was not loaded")?;
    let output = &session.output;

    if output.is_json() {
        output.data(store.book());
        return Ok(());
    }

    println!("{}", store.title());
    if store.roots().is_empty() {
        println!("  (no chapters)");
    }
    for (depth, chapter) in store.walk() {
        println!("{}{}  [{}]", "  ".repeat(depth + 1), chapter.title, chapter.id);
    }

    Ok(())
}

pub fn books(session: &Session) -> Result<()> {
    let workspace = &session.config.global.workspace;
    let output = &session.output;
    let mut registry = session.registry();
    let results = registry.load_all(workspace);

    if output.is_json() {
        let items: Vec<_> = results
            .iter()
            .map(|(root, result)| match result {
                Ok(()) => {
                    let store = registry.get(root);
                    serde_json::json!({
                        "root": root.display().to_string(),
                        "title": store.map(TreeStore::title),
                        "chapters": store.map(|s| s.book().chapter_count()),
                    })
                }
                Err(e) => serde_json::json!({
                    "root": root.display().to_string(),
                    "error": e.to_string(),
                }),
            })
            .collect();
        output.data(&items);
        return Ok(());
    }

    if results.is_empty() {
        println!("No books in workspace. Create one with 'gtbook new-book'.");
        return Ok(());
    }

    println!("{:<24} {:>8}  ROOT", "TITLE", "CHAPTERS");
    println!("{}", "-".repeat(60));
    for (root, result) in &results {
        match (result, registry.get(root)) {
            (Ok(()), Some(store)) => println!(
                "{:<24} {:>8}  {}",
                store.title(),
                store.book().chapter_count(),
                root.display()
            ),
            (Err(e), _) => println!("{:<24} {:>8}  {} ({e})", "(unavailable)", "-", root.display()),
            (Ok(()), None) => {}
        }
    }

    Ok(())
}

pub fn orphans(session: &Session) -> Result<()> {
    let mut registry = session.registry();
    let root = load(session, &mut registry)?;
    let store = registry.get(&root).context("Book was not loaded")?;
    let orphans = store.content().orphans(store.tree().index())?;
    let output = &session.output;

    if output.is_json() {
        let paths: Vec<_> = orphans.iter().map(|p| p.display().to_string()).collect();
        output.data(&paths);
    } else if orphans.is_empty() {
        println!("No orphaned content files");
    } else {
        for path in &orphans {
            println!("{}", path.display());
        }
    }

    Ok(())
}

pub fn status(session: &Session) -> Result<()> {
    let mut registry = session.registry();
    let root = load(session, &mut registry)?;
    let store = registry.get(&root).context("Book was not loaded")?;
    let book = store.book();
    let orphans = store.content().orphans(store.tree().index())?;
    let vcs = store.vcs_status();
    let output = &session.output;

    if output.is_json() {
        output.data(&serde_json::json!({
            "root": store.root().display().to_string(),
            "title": book.title,
            "chapters": book.chapter_count(),
            "top_level": book.roots.len(),
            "orphans": orphans.len(),
            "updated": book.updated_at.to_rfc3339(),
            "vcs": vcs,
        }));
        return Ok(());
    }

    println!("Book: {}", book.title);
    println!("Root: {}", store.root().display());
    println!();
    output.row(&["Chapters:", book.chapter_count().to_string().as_str()]);
    output.row(&["Top level:", book.roots.len().to_string().as_str()]);
    output.row(&["Orphans:", orphans.len().to_string().as_str()]);
    output.row(&["Updated:", book.updated_at.format("%Y-%m-%d %H:%M").to_string().as_str()]);

    match vcs {
        Some(status) if status.is_clean() => output.row(&["Git:", "clean"]),
        Some(status) => output.row(&["Git:", status.summary().as_str()]),
        None => output.row(&["Git:", "not a repository"]),
    }

    Ok(())
}
