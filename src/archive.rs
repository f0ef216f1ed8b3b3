use std::io::Write;
use anyhow::{Context, Result};
use log::*;

use crate::cancel::CancelToken;
use crate::drive::PhotoStore;
use crate::model::logical::Photo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NothingMatched,
    DryRun(usize),
    Trashed(usize),
}

/// Only ever look at photos that aren't already in the trash.
pub fn effective_query(query: &str) -> String {
    format!("trashed=false and ({})", query)
}

/// Every photo matching `query`, in the order the store returned them.
///
/// Stops at the first page that is empty or has no cursor.
pub fn fetch_matching<S: PhotoStore + ?Sized>(store: &mut S, query: &str, cancel: &CancelToken) -> Result<Vec<Photo>> {
    let query = effective_query(query);
    let mut photos = vec![];
    let mut next_page: Option<String> = None;
    loop {
        cancel.check()?;
        let page = store.list(&query, next_page.as_deref())
            .with_context(|| format!("Unable to list photos matching {:?}", query))?;
        debug!("Page of {} photo(s), next page {:?}", page.photos.len(), page.next_page);
        if page.photos.is_empty() {
            break;
        }
        photos.extend(page.photos);
        next_page = page.next_page;
        if next_page.is_none() {
            break;
        }
    }
    Ok(photos)
}

/// Trash `photos` in order, printing each name before its update.
///
/// The first failure aborts the run. Photos before it stay trashed, the rest are untouched.
pub fn archive<S, W>(store: &mut S, photos: &[Photo], out: &mut W, cancel: &CancelToken) -> Result<()>
    where S: PhotoStore + ?Sized, W: Write
{
    for (done, photo) in photos.iter().enumerate() {
        cancel.check()?;
        writeln!(out, "{}", photo.name)?;
        store.trash(&photo.id).with_context(|| format!(
            "Unable to trash {:?} ({}), {} of {} photo(s) were trashed before this failure",
            photo.name, photo.id, done, photos.len(),
        ))?;
    }
    Ok(())
}

/// Fetch, report, confirm, trash.
///
/// `confirm` runs exactly once, and only when something matched and this isn't a dry run.
pub fn run<S, W, C>(store: &mut S, query: &str, dry_run: bool, out: &mut W, cancel: &CancelToken, confirm: C) -> Result<Outcome>
    where S: PhotoStore + ?Sized, W: Write, C: FnOnce() -> Result<()>
{
    let photos = fetch_matching(store, query, cancel)?;
    writeln!(out, "Found {} photo(s) matching query \"{}\"", photos.len(), query)?;
    if photos.is_empty() {
        return Ok(Outcome::NothingMatched);
    }
    if dry_run {
        for photo in &photos {
            writeln!(out, "{}", photo.name)?;
        }
        return Ok(Outcome::DryRun(photos.len()));
    }
    confirm()?;
    archive(store, &photos, out, cancel)?;
    Ok(Outcome::Trashed(photos.len()))
}
