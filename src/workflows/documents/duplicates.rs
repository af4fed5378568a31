use chrono::{DateTime, Duration, Utc};

use super::domain::{Document, DocumentId};
use super::repository::{DocumentRepository, RepositoryError};

/// Flag a document colliding with a previously accepted one in the same
/// workflow universe.
///
/// The key is the canonical counterparty id (falling back to the normalized
/// vendor string) plus the clean invoice number, bounded by the lookback
/// window. Detection is symmetric: whichever document was accepted first is
/// canonical, so re-running with the roles swapped flags the same collision.
pub fn find_duplicate<R>(
    document: &Document,
    repository: &R,
    lookback_days: i64,
    now: DateTime<Utc>,
) -> Result<Option<DocumentId>, RepositoryError>
where
    R: DocumentRepository + ?Sized,
{
    let Some(key) = document.counterparty_key() else {
        return Ok(None);
    };
    let Some(invoice_number) = document.normalized.invoice_number.as_deref() else {
        return Ok(None);
    };

    let cutoff = now - Duration::days(lookback_days);
    let collision = repository.find_collision(key, invoice_number, cutoff, &document.id)?;
    Ok(collision.map(|canonical| canonical.id))
}
