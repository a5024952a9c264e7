//! Command handlers for `discover` and `slug`.

use codehound_core::{AppConfig, Confidence, DiscoveryOutcome};
use codehound_engine::{store_slug, Discoverer, StoreSlug};

/// Runs one discovery against the configured browser and prints the result.
///
/// # Errors
///
/// Returns an error for an invalid URL, when no browser can be acquired, or
/// when the outcome cannot be serialized.
pub(crate) async fn run_discover(config: &AppConfig, url: &str, json: bool) -> anyhow::Result<()> {
    let discoverer = Discoverer::from_app_config(config);
    let outcome = discoverer.discover(url).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        if outcome.confidence != Confidence::Discovered {
            eprintln!("{}", confidence_note(&outcome));
        }
        print!("{}", format_codes(&outcome));
    }
    Ok(())
}

/// Prints the slug forms derived from `url`.
///
/// # Errors
///
/// Returns an error if `url` is not an absolute web URL.
pub(crate) fn run_slug(url: &str) -> anyhow::Result<()> {
    let slug = store_slug(url)?;
    print!("{}", format_slug(&slug));
    Ok(())
}

/// One code per line.
fn format_codes(outcome: &DiscoveryOutcome) -> String {
    outcome.codes.iter().map(|c| format!("{c}\n")).collect()
}

fn confidence_note(outcome: &DiscoveryOutcome) -> &'static str {
    match outcome.confidence {
        Confidence::Discovered => "",
        Confidence::Placeholder => "no codes found; showing generic guesses",
        Confidence::Empty => "no codes found",
    }
}

fn format_slug(slug: &StoreSlug) -> String {
    format!(
        "label:      {}\nsearch key: {}\ncompact:    {}\n",
        slug.label(),
        slug.search_key(),
        slug.compact().as_deref().unwrap_or("-"),
    )
}
