//! `citeweave generate`: Draft a section from the selected papers.

use citeweave_core::ProviderKind;
use citeweave_research::SectionKind;

pub async fn run(
    section: SectionKind,
    topic: Option<String>,
    provider: Option<ProviderKind>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let workspace = super::open_workspace(&config).await?;

    let preview = workspace.context_preview().await;
    let kind = match provider {
        Some(kind) => kind,
        None => workspace.active_provider().await,
    };
    eprintln!(
        "Generating {section} with {kind} from {} papers ({} words of context)...",
        preview.metadata.included, preview.metadata.word_count
    );

    let generated = workspace
        .generate(section, topic.as_deref(), Some(kind))
        .await?;

    println!("{}", generated.content);

    let sources = grounding_sources(generated.grounding.as_ref());
    if !sources.is_empty() {
        println!();
        println!("Web sources:");
        for (title, uri) in sources {
            println!("  - {title}: {uri}");
        }
    }

    Ok(())
}

/// Title and URI of each web source in Gemini grounding metadata.
fn grounding_sources(grounding: Option<&serde_json::Value>) -> Vec<(String, String)> {
    grounding
        .and_then(|g| g.get("groundingChunks"))
        .and_then(|c| c.as_array())
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| {
                    let web = chunk.get("web")?;
                    let uri = web.get("uri")?.as_str()?;
                    let title = web.get("title").and_then(|t| t.as_str()).unwrap_or(uri);
                    Some((title.to_string(), uri.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sources_are_read_from_grounding_chunks() {
        let grounding = json!({
            "groundingChunks": [
                {"web": {"uri": "https://a.example", "title": "A"}},
                {"web": {"uri": "https://b.example"}},
                {"retrievedContext": {}}
            ]
        });
        let sources = grounding_sources(Some(&grounding));
        assert_eq!(
            sources,
            vec![
                ("A".to_string(), "https://a.example".to_string()),
                ("https://b.example".to_string(), "https://b.example".to_string()),
            ]
        );
    }

    #[test]
    fn missing_grounding_has_no_sources() {
        assert!(grounding_sources(None).is_empty());
        assert!(grounding_sources(Some(&json!({}))).is_empty());
    }
}
