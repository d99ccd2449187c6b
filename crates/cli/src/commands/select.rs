//! `citeweave select`: Manage the paper selection.
//!
//! With no arguments, prints the current page and selection.

pub async fn run(
    ids: Vec<String>,
    all: bool,
    limit: Option<usize>,
    clear: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let workspace = super::open_workspace(&config).await?;

    if clear {
        workspace.deselect_all().await;
        println!("Selection cleared.");
        return Ok(());
    }

    if all {
        let fetched = workspace.select_all_results(limit).await?;
        let selected = workspace.listing().await.selected_count;
        println!("Fetched {fetched} papers; {selected} selected.");
        return Ok(());
    }

    if !ids.is_empty() {
        let selected = workspace.select(ids).await;
        println!("{selected} papers selected.");
        return Ok(());
    }

    super::search::print_listing(&workspace.listing().await);
    Ok(())
}
