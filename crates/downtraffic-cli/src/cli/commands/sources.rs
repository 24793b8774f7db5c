//! `downtraffic sources` – print the effective URL list.

use anyhow::Result;
use downtraffic_core::config;
use downtraffic_core::sources::SourceList;
use std::path::PathBuf;

pub fn run_sources(url_file: Option<PathBuf>) -> Result<()> {
    let url_file = match url_file {
        Some(path) => Some(path),
        None => config::load_or_init()?.url_file,
    };
    let list = SourceList::load(url_file.as_deref());
    println!("{} URLs from {}", list.len(), list.origin());
    for (i, url) in list.urls().iter().enumerate() {
        println!("  {:>3}  {}", i + 1, url);
    }
    Ok(())
}
