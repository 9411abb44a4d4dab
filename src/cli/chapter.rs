//! Chapter CLI commands

use anyhow::{Context, Result};

use super::app::Session;
use crate::domain::{ChapterId, Direction, Title};

fn parse_id(raw: &str) -> Result<ChapterId> {
    raw.parse::<ChapterId>()
        .with_context(|| format!("Invalid chapter ID '{}'", raw))
}

fn parse_title(raw: &str) -> Result<Title> {
    Title::new(raw).context("Invalid chapter title")
}

pub fn add(session: &Session, title: &str, parent: Option<&str>) -> Result<()> {
    let title = parse_title(title)?;
    let parent = parent.map(parse_id).transpose()?;
    let root = session.book_root()?;
    let mut registry = session.registry();

    let chapter = registry
        .update(&root, |store| store.create_chapter(parent.as_ref(), title.clone()))
        .context("Failed to add chapter")?;

    let store = registry.get(&root).context("Book was not loaded")?;
    let content = store.content();
    content
        .create_stub(&chapter.id, &title, session.config.global.content_stub)
        .context("Failed to create chapter file")?;
    let file = content.path_for(&chapter.id);

    if session.output.is_json() {
        session.output.data(&serde_json::json!({
            "id": chapter.id,
            "title": chapter.title,
            "parent": parent,
            "file": file.display().to_string(),
        }));
    } else {
        session.output.success(&format!("Added chapter {}: {}", chapter.id, chapter.title));
    }

    Ok(())
}

pub fn rename(session: &Session, id: &str, title: &str) -> Result<()> {
    let id = parse_id(id)?;
    let title = parse_title(title)?;
    let root = session.book_root()?;
    let mut registry = session.registry();

    registry
        .update(&root, |store| store.rename_chapter(&id, title.clone()))
        .context("Failed to rename chapter")?;

    if session.output.is_json() {
        session.output.data(&serde_json::json!({
            "id": id,
            "title": title.as_str(),
        }));
    } else {
        session.output.success(&format!("Renamed {} to {}", id, title));
    }

    Ok(())
}

pub fn remove(session: &Session, id: &str, purge: bool) -> Result<()> {
    let id = parse_id(id)?;
    let root = session.book_root()?;
    let mut registry = session.registry();

    let removed = registry
        .update(&root, |store| store.delete_chapter(&id))
        .context("Failed to delete chapter")?;

    let purged = if purge {
        let store = registry.get(&root).context("Book was not loaded")?;
        store
            .content()
            .remove(&removed)
            .context("Failed to delete chapter files")?
    } else {
        Vec::new()
    };

    if session.output.is_json() {
        let files: Vec<_> = purged.iter().map(|p| p.display().to_string()).collect();
        session.output.data(&serde_json::json!({
            "removed": removed,
            "purged": files,
        }));
    } else {
        session.output.success(&format!(
            "Deleted {} chapter(s) starting at {}",
            removed.len(),
            id
        ));
        if !purged.is_empty() {
            println!("Deleted {} content file(s)", purged.len());
        }
    }

    Ok(())
}

pub fn step(session: &Session, id: &str, direction: Direction) -> Result<()> {
    let id = parse_id(id)?;
    let root = session.book_root()?;
    let mut registry = session.registry();

    let moved = registry
        .update(&root, |store| store.move_sibling(&id, direction))
        .context("Failed to move chapter")?;

    let (verb, edge) = match direction {
        Direction::Up => ("up", "first"),
        Direction::Down => ("down", "last"),
    };

    if session.output.is_json() {
        session.output.data(&serde_json::json!({
            "id": id,
            "moved": moved,
        }));
    } else if moved {
        session.output.success(&format!("Moved {} {}", id, verb));
    } else {
        println!("{} is unknown or already {} among its siblings", id, edge);
    }

    Ok(())
}

pub fn move_chapters(session: &Session, ids: &[String], to: Option<&str>) -> Result<()> {
    let sources = ids
        .iter()
        .map(|raw| parse_id(raw))
        .collect::<Result<Vec<_>>>()?;
    let target = to.map(parse_id).transpose()?;
    let root = session.book_root()?;
    let mut registry = session.registry();

    let moved = registry
        .update(&root, |store| store.move_subtree(target.as_ref(), &sources))
        .context("Failed to move chapters")?;

    let destination = target
        .as_ref()
        .map_or_else(|| "the top level".to_string(), |t| t.to_string());

    if session.output.is_json() {
        session.output.data(&serde_json::json!({
            "moved": moved,
            "target": target,
        }));
    } else if moved.is_empty() {
        println!("Nothing to move to {}", destination);
    } else {
        session.output.success(&format!(
            "Moved {} chapter(s) to {}",
            moved.len(),
            destination
        ));
    }

    Ok(())
}

pub fn path(session: &Session, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let root = session.book_root()?;
    let mut registry = session.registry();
    let store = registry
        .load(&root)
        .with_context(|| format!("Failed to open book at {}", root.display()))?;

    let ids = store
        .path(&id)
        .with_context(|| format!("Chapter not found: {}", id))?;
    let titles: Vec<&str> = ids
        .iter()
        .filter_map(|step| store.chapter(step))
        .map(|c| c.title.as_str())
        .collect();
    let file = store.content().path_for(&id);

    if session.output.is_json() {
        session.output.data(&serde_json::json!({
            "ids": ids,
            "titles": titles,
            "file": file.display().to_string(),
        }));
    } else {
        println!("{}", titles.join(" / "));
        println!("{}", file.display());
    }

    Ok(())
}
