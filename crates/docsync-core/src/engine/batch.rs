//! Keyset-paginated iteration over a relation

use crate::error::{Error, Result};
use crate::model::RelatedRecord;
use crate::traits::{RecordSource, RelationQuery};

/// Cursor over the pages of one relation
///
/// Pages are fetched lazily and strictly one at a time. Iteration ends at
/// the first empty or short page.
pub struct RelationBatches<'a> {
    source: &'a dyn RecordSource,
    query: &'a RelationQuery,
    batch_size: usize,
    after: Option<u64>,
    exhausted: bool,
}

impl<'a> RelationBatches<'a> {
    pub fn new(source: &'a dyn RecordSource, query: &'a RelationQuery, batch_size: usize) -> Self {
        Self {
            source,
            query,
            batch_size,
            after: None,
            exhausted: batch_size == 0,
        }
    }

    /// Fetch the next page, or `None` once the relation is exhausted
    pub async fn next_batch(&mut self) -> Result<Option<Vec<RelatedRecord>>> {
        if self.exhausted {
            return Ok(None);
        }

        let batch = self
            .source
            .fetch_batch(self.query, self.after, self.batch_size)
            .await?;

        let Some(last) = batch.last() else {
            self.exhausted = true;
            return Ok(None);
        };

        // A cursor that does not move forward would page forever
        if let Some(after) = self.after
            && last.id <= after
        {
            return Err(Error::record_source(format!(
                "{} returned id {} after cursor {} for {}",
                self.source.source_name(),
                last.id,
                after,
                self.query
            )));
        }

        if batch.len() < self.batch_size {
            self.exhausted = true;
        }
        self.after = Some(last.id);

        Ok(Some(batch))
    }
}

/// Whether a relation has at least one record
pub async fn relation_has_records(source: &dyn RecordSource, query: &RelationQuery) -> Result<bool> {
    Ok(!source.fetch_batch(query, None, 1).await?.is_empty())
}
