use anyhow::{Context, Result};
use catalog::CatalogIndex;
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info,catalog=debug")
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/movies.dat".to_string());

    println!("Loading catalog from {}...\n", path);

    let start = Instant::now();
    let index = CatalogIndex::load_from_file(Path::new(&path))
        .with_context(|| format!("Failed to load catalog from {}", path))?;
    let elapsed = start.elapsed();

    println!("=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Movies: {}", index.len());

    for query in ["dreams", "machines simulation", "space travel"] {
        let hits = index.search_similar(query, 3);
        println!("\n{:?}:", query);
        for movie in hits {
            println!("  - {} ({})", movie.name, movie.id);
        }
    }
    Ok(())
}
