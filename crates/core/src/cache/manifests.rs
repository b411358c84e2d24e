//! History of activated manifests.

use super::connection::CacheDb;
use super::entries::timestamp;
use crate::Error;
use crate::manifest::Manifest;
use chrono::Utc;
use serde::Serialize;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Activated manifests kept per cache; older rows are pruned on insert.
pub const MANIFEST_HISTORY: usize = 10;

/// A manifest recorded by an activate step.
#[derive(Debug, Clone, Serialize)]
pub struct ActivatedManifest {
    pub cache_name: String,
    pub manifest: Manifest,
    pub activated_at: String,
}

impl CacheDb {
    /// Record the manifest that was just activated for a cache, keeping the
    /// latest [`MANIFEST_HISTORY`] rows.
    pub async fn record_manifest(&self, cache_name: &str, manifest: &Manifest) -> Result<(), Error> {
        let cache_name = cache_name.to_string();
        let json = serde_json::to_string(manifest)?;
        let count = manifest.len() as i64;
        let activated_at = timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO manifests (cache_name, manifest_json, entry_count, activated_at)
                    VALUES (?1, ?2, ?3, ?4)",
                    params![cache_name, json, count, activated_at],
                )?;
                tx.execute(
                    "DELETE FROM manifests WHERE cache_name = ?1 AND id NOT IN (
                        SELECT id FROM manifests WHERE cache_name = ?1 ORDER BY id DESC LIMIT ?2
                    )",
                    params![cache_name, MANIFEST_HISTORY as i64],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// The most recently activated manifest for a cache, if any.
    pub async fn latest_manifest(&self, cache_name: &str) -> Result<Option<ActivatedManifest>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ActivatedManifest>, Error> {
                let result = conn.query_row(
                    "SELECT manifest_json, activated_at FROM manifests
                    WHERE cache_name = ?1 ORDER BY id DESC LIMIT 1",
                    params![cache_name],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                );

                match result {
                    Ok((json, activated_at)) => {
                        Ok(Some(ActivatedManifest { cache_name, manifest: Manifest::from_json(&json)?, activated_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}
