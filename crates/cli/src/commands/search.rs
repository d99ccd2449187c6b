//! `citeweave search`: Search one page of papers for a topic.

use citeweave_research::PaperListing;

pub async fn run(topic: &str, page: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let workspace = super::open_workspace(&config).await?;

    let listing = workspace.search(topic, page).await?;
    print_listing(&listing);
    Ok(())
}

/// Print the displayed page, marking selected papers.
pub(crate) fn print_listing(listing: &PaperListing) {
    if listing.papers.is_empty() {
        if listing.topic.is_empty() {
            println!("No search yet. Run `citeweave search <topic>` first.");
        } else {
            println!("No papers found for \"{}\".", listing.topic);
        }
        return;
    }

    println!(
        "\"{}\": page {} of {} ({} results, {} selected)",
        listing.topic, listing.page, listing.pages, listing.cursor.total, listing.selected_count
    );
    println!();

    for entry in &listing.papers {
        let paper = &entry.paper;
        let mark = if entry.selected { "[x]" } else { "[ ]" };
        let year = paper.year.map_or_else(|| "n.d.".to_string(), |y| y.to_string());
        let citations = paper.citation_count.unwrap_or(0);
        println!("{mark} {}  {} ({year}, {citations} citations)", paper.id, paper.title);
        if !paper.authors.is_empty() {
            println!("      {}", paper.authors.join(", "));
        }
    }
}
