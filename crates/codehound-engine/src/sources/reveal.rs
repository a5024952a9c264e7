//! Reveal-and-popup interaction.

use crate::browser::PageContext;
use crate::error::PageError;
use crate::grammar::normalize_code;

use super::SourceSettings;

/// Clicks the `index`-th reveal control on `page` and reads the code from
/// the page it opens.
///
/// The popup is closed before returning on every path that obtained one.
/// `Ok(None)` means the popup loaded but held nothing code-shaped.
pub(super) async fn reveal_code(
    page: &dyn PageContext,
    reveal_css: &str,
    index: usize,
    code_holder_css: &str,
    settings: &SourceSettings,
) -> Result<Option<String>, PageError> {
    let watch = page.watch_popup().await?;
    page.click(reveal_css, index).await?;
    let popup = watch.opened(settings.popup_timeout).await?;

    let code = read_code(popup.as_ref(), code_holder_css, settings).await;
    popup.close().await;
    code
}

async fn read_code(
    popup: &dyn PageContext,
    code_holder_css: &str,
    settings: &SourceSettings,
) -> Result<Option<String>, PageError> {
    popup.bring_to_front().await?;
    popup
        .wait_for_selector(code_holder_css, settings.popup_timeout)
        .await?;
    let raw = popup.text_of(code_holder_css).await?;
    Ok(raw.as_deref().and_then(normalize_code))
}
